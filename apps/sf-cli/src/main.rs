use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sf_app::{
    AppResult, EquationOutcome, PipelineProgressEvent, PipelineReport, PipelineStage, query,
    run_from_config_with_progress,
};
use sf_core::{CancelToken, EquationId};
use sf_sim::RangeMargin;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(
    about = "surroflow CLI - extract costly non-linear systems and generate surrogate training data",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the hotspot equations of a profiling trace
    Profile {
        /// Path to the profiling trace (JSON)
        trace_path: PathBuf,
        /// Minimum fraction of total simulation time
        #[arg(long, default_value_t = sf_trace::DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Resolve inputs and iteration variables of every hotspot
    Deps {
        /// Path to the profiling trace (JSON)
        trace_path: PathBuf,
        /// Path to the model structure (JSON)
        model_path: PathBuf,
        /// Minimum fraction of total simulation time
        #[arg(long, default_value_t = sf_trace::DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Show sampling ranges of variables in a simulation result
    Ranges {
        /// Path to the simulation result (CSV)
        result_path: PathBuf,
        /// Variable names
        #[arg(required = true)]
        variables: Vec<String>,
        /// Relative margin applied to observed bounds
        #[arg(long, default_value_t = 0.01)]
        relative: f64,
        /// Additive margin for bounds observed at zero
        #[arg(long, default_value_t = 0.01)]
        absolute: f64,
    },
    /// Run the full pipeline from a configuration file
    Run {
        /// Path to the pipeline YAML file
        config_path: PathBuf,
        /// Skip cached datasets and regenerate
        #[arg(long)]
        no_cache: bool,
    },
    /// Show a stored dataset, or the run report when no id is given
    Show {
        /// Pipeline output directory
        output_dir: PathBuf,
        /// Equation id (e.g. 14 or eq_14)
        id: Option<EquationId>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile {
            trace_path,
            threshold,
        } => cmd_profile(&trace_path, threshold),
        Commands::Deps {
            trace_path,
            model_path,
            threshold,
        } => cmd_deps(&trace_path, &model_path, threshold),
        Commands::Ranges {
            result_path,
            variables,
            relative,
            absolute,
        } => cmd_ranges(&result_path, &variables, RangeMargin { relative, absolute }),
        Commands::Run {
            config_path,
            no_cache,
        } => cmd_run(&config_path, !no_cache),
        Commands::Show { output_dir, id } => match id {
            Some(id) => cmd_show_dataset(&output_dir, id),
            None => cmd_show_report(&output_dir),
        },
    }
}

fn cmd_profile(trace_path: &Path, threshold: f64) -> AppResult<()> {
    let hotspots = query::profile_trace(trace_path, threshold)?;
    if hotspots.is_empty() {
        println!("No non-linear systems above {:.1}% of total time", threshold * 100.0);
        return Ok(());
    }

    println!("Hotspots (threshold {:.1}%):", threshold * 100.0);
    println!("  {:>8}  {:>8}  {:>10}  {:>12}", "id", "share", "calls", "time [s]");
    for record in hotspots {
        println!(
            "  {:>8}  {:>7.2}%  {:>10}  {:>12.6}",
            format!("{:?}", record.id),
            record.fraction_of_total() * 100.0,
            record.call_count,
            record.total_time_s
        );
    }
    Ok(())
}

fn cmd_deps(trace_path: &Path, model_path: &Path, threshold: f64) -> AppResult<()> {
    let resolved = query::resolve_hotspots(trace_path, model_path, threshold)?;
    if resolved.is_empty() {
        println!("No hotspots to resolve");
        return Ok(());
    }

    for (id, result) in resolved {
        match result {
            Ok(info) => {
                println!("{:?}:", id);
                println!("  inputs:     {}", info.using_vars.join(", "));
                println!("  iteration:  {}", info.iteration_variables.join(", "));
                if !info.inner_equations.is_empty() {
                    let inner: Vec<String> =
                        info.inner_equations.iter().map(|e| format!("{:?}", e)).collect();
                    println!("  inner:      {}", inner.join(", "));
                }
            }
            Err(err) => println!("{:?}: ✗ {}", id, err),
        }
    }
    Ok(())
}

fn cmd_ranges(result_path: &Path, variables: &[String], margin: RangeMargin) -> AppResult<()> {
    let ranges = query::discover_variable_ranges(result_path, variables, &margin)?;
    println!(
        "  {:<24}  {:>14}  {:>14}  {:>14}  {:>14}",
        "variable", "min", "max", "observed min", "observed max"
    );
    for r in &ranges {
        println!(
            "  {:<24}  {:>14.6e}  {:>14.6e}  {:>14.6e}  {:>14.6e}",
            r.name, r.min, r.max, r.observed_min, r.observed_max
        );
    }
    Ok(())
}

fn cmd_run(config_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running pipeline: {}", config_path.display());
    tracing::info!(config = %config_path.display(), use_cache, "starting pipeline run");

    let cancel = CancelToken::new();
    interrupt::cancel_on_interrupt(cancel.clone());

    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let report = run_from_config_with_progress(
        config_path,
        Some(use_cache),
        Some(&cancel),
        Some(&mut |event: PipelineProgressEvent| {
            let stage_key = event.stage.label();
            let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Pipeline completed for {}", report.model);
    print_report(&report);
    Ok(())
}

fn cmd_show_dataset(output_dir: &Path, id: EquationId) -> AppResult<()> {
    let summary = query::show_dataset(output_dir, id)?;
    let m = &summary.manifest;

    println!("Dataset {:?}", m.equation_id);
    println!("  Created: {}", m.created_at);
    println!("  Fingerprint: {}", m.fingerprint);
    println!("  Strategy: {}  seed: {}", m.strategy, m.seed);
    println!(
        "  Samples: {}/{} in {} attempts",
        m.collected, m.requested, m.attempts
    );
    println!(
        "  Failures: not converged {}, timeout {}, invalid output {}, evaluator error {}",
        m.failures.not_converged,
        m.failures.timeout,
        m.failures.invalid_output,
        m.failures.evaluator_error
    );
    if let Some(warning) = &m.warning {
        println!("  ⚠ {}", warning);
    }
    if m.cancelled {
        println!("  ⚠ generation was cancelled");
    }

    println!("  Columns:");
    for (i, (name, lo, hi)) in summary.column_bounds.iter().enumerate() {
        let role = if i < m.using_vars.len() { "in " } else { "out" };
        let bounds = m
            .ranges
            .get(i)
            .map(|r| format!("  range [{:.6e}, {:.6e}]", r.min, r.max))
            .unwrap_or_default();
        if m.collected == 0 {
            println!("    {} {}{}", role, name, bounds);
        } else {
            println!("    {} {}  samples [{:.6e}, {:.6e}]{}", role, name, lo, hi, bounds);
        }
    }
    Ok(())
}

fn cmd_show_report(output_dir: &Path) -> AppResult<()> {
    let report = query::load_report(output_dir)?;
    println!("Report for {} ({})", report.model, report.created_at);
    print_report(&report);

    let datasets = query::list_datasets(output_dir)?;
    println!("Stored datasets: {}", datasets.len());
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("  Threshold: {:.1}%", report.threshold * 100.0);
    println!(
        "  Equations: {} selected, {} with datasets, {} skipped",
        report.equations.len(),
        report.datasets(),
        report.skipped()
    );
    for eq in &report.equations {
        let marker = match &eq.outcome {
            EquationOutcome::Generated { warning: None, cancelled: false, .. }
            | EquationOutcome::Cached { .. } => "✓",
            EquationOutcome::Generated { .. } => "⚠",
            EquationOutcome::Skipped { .. } => "✗",
            EquationOutcome::Folded { .. } => "·",
        };
        println!(
            "  {} {:>6} ({:>5.1}%)  {}",
            marker,
            format!("{:?}", eq.id),
            eq.fraction_of_total * 100.0,
            eq.outcome
        );
    }

    let t = &report.timing;
    println!("Timing:");
    println!("  Select:     {:.3} s", t.select_time_s);
    println!("  Resolve:    {:.3} s", t.resolve_time_s);
    println!(
        "  Simulation: {:.3} s ({} run{})",
        t.simulation_time_s,
        report.reference_simulation_runs,
        if report.reference_simulation_runs == 1 { "" } else { "s" }
    );
    println!("  Sampling:   {:.3} s (evaluator {:.3} s)", t.sampling_time_s, t.eval_time_s);
    println!("  Total:      {:.3} s", t.total_time_s);
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &PipelineProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    if matches!(event.stage, PipelineStage::Completed) {
        line.push_str("  done");
    }
    print!("{:<120}", line);
    let _ = io::stdout().flush();
}

/// Ctrl-C stops new sample requests; evaluations already running finish.
/// A second Ctrl-C terminates the process.
#[cfg(unix)]
mod interrupt {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction, signal};
    use sf_core::CancelToken;

    static INTERRUPTED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_interrupt(_signal: nix::libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    pub fn cancel_on_interrupt(cancel: CancelToken) {
        let action = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only stores to an atomic.
        if let Err(err) = unsafe { sigaction(Signal::SIGINT, &action) } {
            tracing::warn!(error = %err, "cannot install Ctrl-C handler");
            return;
        }

        std::thread::spawn(move || {
            while !INTERRUPTED.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }
            eprintln!("\ninterrupted, finishing in-flight evaluations (Ctrl-C again to abort)");
            cancel.cancel();
            // SAFETY: restores the default disposition.
            let _ = unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) };
        });
    }
}

#[cfg(not(unix))]
mod interrupt {
    use sf_core::CancelToken;

    pub fn cancel_on_interrupt(_cancel: CancelToken) {}
}
