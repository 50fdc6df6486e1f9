//! Process-isolated evaluator.
//!
//! Each evaluation starts the configured command, writes one JSON request line
//! to its stdin and reads one JSON reply from its stdout:
//!
//! ```text
//! -> {"equation":14,"inputs":[1.0,2.0],"start":[0.5]}
//! <- {"status":"converged","outputs":[0.73]}
//! ```
//!
//! Separate processes share no state, so calls may run concurrently.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sf_core::{EquationId, WaitOutcome, kill_process_tree, own_process_group, wait_with_timeout};

use crate::error::EvalError;
use crate::evaluator::{Concurrency, EvalRequest, Evaluation, Evaluator};

/// Placeholder replaced by the equation id in arguments.
pub const EQUATION_PLACEHOLDER: &str = "{equation}";

#[derive(Serialize)]
struct WireRequest<'a> {
    equation: EquationId,
    inputs: &'a [f64],
    start: &'a [f64],
}

#[derive(Clone, Debug)]
pub struct ProcessEvaluator {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command(&self, equation: EquationId) -> Command {
        let id = equation.to_string();
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|a| a.replace(EQUATION_PLACEHOLDER, &id)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        own_process_group(&mut command);
        command
    }
}

impl Evaluator for ProcessEvaluator {
    fn concurrency(&self) -> Concurrency {
        Concurrency::Reentrant
    }

    fn evaluate(&self, request: &EvalRequest<'_>) -> Result<Evaluation, EvalError> {
        let mut line = serde_json::to_string(&WireRequest {
            equation: request.equation,
            inputs: request.inputs,
            start: request.initial_guess,
        })
        .map_err(|e| EvalError::Protocol {
            message: e.to_string(),
        })?;
        line.push('\n');

        let started = Instant::now();
        let mut child = self
            .command(request.equation)
            .spawn()
            .map_err(|e| EvalError::Process {
                message: format!("failed to start {}: {e}", self.program.display()),
            })?;

        // Drain stdout on a separate thread so a chatty child cannot block on
        // a full pipe while we wait for it. The thread is never joined: a
        // process that escaped the group may hold the pipe open indefinitely.
        let stdout = child.stdout.take();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_string(&mut buf);
            }
            let _ = tx.send(buf);
        });

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading is judged by its exit status.
            let _ = stdin.write_all(line.as_bytes());
        }

        let outcome = wait_with_timeout(&mut child, request.timeout).map_err(|e| {
            EvalError::Process {
                message: format!("failed to wait for evaluator: {e}"),
            }
        })?;
        let timed_out = || EvalError::Timeout {
            after_s: started.elapsed().as_secs_f64(),
        };

        match outcome {
            WaitOutcome::TimedOut => Err(timed_out()),
            WaitOutcome::Exited(status) if !status.success() => Err(EvalError::Process {
                message: format!("evaluator exited with {status}"),
            }),
            WaitOutcome::Exited(_) => {
                let output = match request.timeout {
                    None => rx.recv().ok(),
                    Some(limit) => {
                        let remaining = limit.saturating_sub(started.elapsed());
                        rx.recv_timeout(remaining.max(Duration::from_millis(1))).ok()
                    }
                };
                match output {
                    Some(output) => parse_reply(&output),
                    None => {
                        // A background member of the group still holds stdout,
                        // which keeps the group id in use.
                        kill_process_tree(&mut child);
                        Err(timed_out())
                    }
                }
            }
        }
    }
}

/// Parse the first non-empty line of the evaluator's stdout.
fn parse_reply(output: &str) -> Result<Evaluation, EvalError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| EvalError::Protocol {
            message: "empty reply".to_string(),
        })?;
    serde_json::from_str(line).map_err(|e| EvalError::Protocol {
        message: format!("invalid reply: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvalStatus;

    #[test]
    fn reply_parsing() {
        let ok = parse_reply("\n{\"status\":\"converged\",\"outputs\":[1.5]}\n").unwrap();
        assert_eq!(ok, Evaluation::converged(vec![1.5]));
        let failed = parse_reply("{\"status\":\"failed\"}").unwrap();
        assert_eq!(failed.status, EvalStatus::Failed);
        assert!(parse_reply("").is_err());
        assert!(parse_reply("{\"status\":\"maybe\"}").is_err());
    }

    #[test]
    fn request_wire_format() {
        let json = serde_json::to_string(&WireRequest {
            equation: EquationId::new(14),
            inputs: &[1.0, 2.0],
            start: &[0.5],
        })
        .unwrap();
        assert_eq!(json, r#"{"equation":14,"inputs":[1.0,2.0],"start":[0.5]}"#);
    }

    #[cfg(unix)]
    mod unix {
        use std::time::Duration;

        use super::*;

        fn request<'a>(inputs: &'a [f64], timeout: Option<Duration>) -> EvalRequest<'a> {
            EvalRequest {
                equation: EquationId::new(14),
                inputs,
                initial_guess: &[0.0],
                timeout,
            }
        }

        #[test]
        fn converged_reply() {
            let eval = ProcessEvaluator::new("sh").arg("-c").arg(
                "read line; echo '{\"status\":\"converged\",\"outputs\":[2.5]}'",
            );
            let result = eval
                .evaluate(&request(&[1.0], Some(Duration::from_secs(10))))
                .unwrap();
            assert_eq!(result, Evaluation::converged(vec![2.5]));
        }

        #[test]
        fn equation_placeholder_is_substituted() {
            let eval = ProcessEvaluator::new("sh").arg("-c").arg(
                "read line; echo \"{\\\"status\\\":\\\"converged\\\",\\\"outputs\\\":[$0]}\"",
            ).arg("{equation}");
            let result = eval
                .evaluate(&request(&[1.0], Some(Duration::from_secs(10))))
                .unwrap();
            assert_eq!(result.outputs, vec![14.0]);
        }

        #[test]
        fn non_zero_exit_is_a_process_error() {
            let eval = ProcessEvaluator::new("sh").arg("-c").arg("exit 2");
            let err = eval
                .evaluate(&request(&[1.0], Some(Duration::from_secs(10))))
                .unwrap_err();
            assert!(matches!(err, EvalError::Process { .. }));
        }

        #[test]
        fn hanging_evaluator_is_killed() {
            let eval = ProcessEvaluator::new("sleep").arg("5");
            let started = Instant::now();
            let err = eval
                .evaluate(&request(&[1.0], Some(Duration::from_millis(50))))
                .unwrap_err();
            assert!(matches!(err, EvalError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn shell_wrapped_sleep_respects_timeout() {
            let eval = ProcessEvaluator::new("sh").arg("-c").arg(
                "read line; sleep 3; echo '{\"status\":\"converged\",\"outputs\":[1.0]}'",
            );
            let started = Instant::now();
            let err = eval
                .evaluate(&request(&[1.0], Some(Duration::from_millis(100))))
                .unwrap_err();
            assert!(matches!(err, EvalError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(2));
        }

        #[test]
        fn background_process_holding_stdout_is_bounded() {
            let eval = ProcessEvaluator::new("sh").arg("-c").arg("read line; sleep 3 &");
            let started = Instant::now();
            let err = eval
                .evaluate(&request(&[1.0], Some(Duration::from_millis(200))))
                .unwrap_err();
            assert!(matches!(err, EvalError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(2));
        }
    }
}
