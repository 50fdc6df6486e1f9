//! Where the reference simulation comes from.
//!
//! The simulator itself is external. A source either points at a result file
//! that already exists or runs a simulator command that writes one.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sf_core::{WaitOutcome, own_process_group, wait_with_timeout};

use crate::error::{SimError, SimResult};
use crate::result::{SimulationResult, read_result_csv};

/// Produces the full-model simulation result for one model.
pub trait SimulationSource: Send + Sync {
    /// Identity of the simulated model; results are memoized per key.
    fn model_key(&self) -> String;

    /// Run (or load) the simulation. `timeout` bounds the run where the
    /// source supports it.
    fn run(&self, timeout: Option<Duration>) -> SimResult<SimulationResult>;
}

/// A result file produced ahead of time.
#[derive(Clone, Debug)]
pub struct CsvResultFile {
    path: PathBuf,
}

impl CsvResultFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SimulationSource for CsvResultFile {
    fn model_key(&self) -> String {
        self.path.display().to_string()
    }

    fn run(&self, _timeout: Option<Duration>) -> SimResult<SimulationResult> {
        read_result_csv(&self.path)
    }
}

/// An external simulator invocation that writes a CSV result file.
#[derive(Clone, Debug)]
pub struct SimulatorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// File the simulator writes; read after a successful exit.
    pub result_file: PathBuf,
}

impl SimulatorCommand {
    pub fn new(program: impl Into<PathBuf>, result_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            result_file: result_file.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn resolved_result_file(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) if self.result_file.is_relative() => dir.join(&self.result_file),
            _ => self.result_file.clone(),
        }
    }
}

impl SimulationSource for SimulatorCommand {
    fn model_key(&self) -> String {
        let mut key = self.program.display().to_string();
        for arg in &self.args {
            key.push(' ');
            key.push_str(arg);
        }
        key
    }

    fn run(&self, timeout: Option<Duration>) -> SimResult<SimulationResult> {
        let result_file = self.resolved_result_file();
        // A stale file from an earlier run must not pass for this run's output.
        if result_file.exists() {
            std::fs::remove_file(&result_file).map_err(|source| SimError::Read {
                path: result_file.clone(),
                source,
            })?;
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        own_process_group(&mut command);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| SimError::Failed {
            message: format!("failed to start {}: {e}", self.program.display()),
        })?;
        let outcome = wait_with_timeout(&mut child, timeout).map_err(|e| SimError::Failed {
            message: format!("failed to wait for simulator: {e}"),
        })?;

        match outcome {
            WaitOutcome::TimedOut => Err(SimError::Timeout {
                after_s: started.elapsed().as_secs_f64(),
            }),
            WaitOutcome::Exited(status) if !status.success() => Err(SimError::Failed {
                message: format!("simulator exited with {status}"),
            }),
            WaitOutcome::Exited(_) => {
                tracing::debug!(
                    program = %self.program.display(),
                    elapsed_s = started.elapsed().as_secs_f64(),
                    "simulator finished"
                );
                read_result_csv(&result_file)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sf_sim_source_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn command_writes_result() {
        let dir = temp_dir("ok");
        let source = SimulatorCommand::new("sh", "out.csv")
            .arg("-c")
            .arg("printf 'time,x\\n0,1\\n1,3\\n' > out.csv")
            .working_dir(&dir);
        let result = source.run(Some(Duration::from_secs(10))).unwrap();
        assert_eq!(result.column("x").unwrap(), &[1.0, 3.0]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failing_command_is_reported() {
        let dir = temp_dir("fail");
        let source = SimulatorCommand::new("sh", "out.csv")
            .arg("-c")
            .arg("exit 3")
            .working_dir(&dir);
        let err = source.run(Some(Duration::from_secs(10))).unwrap_err();
        assert!(matches!(err, SimError::Failed { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn hanging_command_times_out() {
        let dir = temp_dir("hang");
        let source = SimulatorCommand::new("sleep", "out.csv")
            .arg("5")
            .working_dir(&dir);
        let err = source.run(Some(Duration::from_millis(50))).unwrap_err();
        assert!(matches!(err, SimError::Timeout { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn timeout_stops_background_writers() {
        let dir = temp_dir("bg");
        let source = SimulatorCommand::new("sh", "out.csv")
            .arg("-c")
            .arg("(sleep 1; printf 'time,x\\n0,1\\n' > out.csv) & wait")
            .working_dir(&dir);
        let err = source.run(Some(Duration::from_millis(50))).unwrap_err();
        assert!(matches!(err, SimError::Timeout { .. }));
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!dir.join("out.csv").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_result_file_is_an_error() {
        let source = CsvResultFile::new("/nonexistent/sf_sim/result.csv");
        assert!(matches!(source.run(None), Err(SimError::Read { .. })));
    }
}
