//! Access to the Snack Sound Toolkit.
//!
//! Snack can be reached three ways, each behind [`EstimatorGateway`]:
//!
//! * [`ExeGateway`] runs the standalone Windows binary.
//! * [`TclScriptGateway`] writes a throwaway Tcl script and runs it in a Tcl shell.
//! * [`EmbeddedGateway`] drives an interactive Tcl interpreter over stdin.
//!
//! All of them return raw, un-padded frames. Frame 0 sits half an analysis
//! window into the recording.
//!
//! Pitch values agree across transports. Formant values do not: the
//! standalone binary and the Tcl-based transports produce noticeably different
//! numbers for the same input, which appears to come from randomness inside
//! Snack's LPC step. Compare formant output only against references produced
//! with the same transport.

mod embedded;
mod exe;
mod parse;
mod scratch;
mod script;
mod tcl;

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::{SnackConfig, SnackMethod};
use crate::error::{SnackError, SnackResult};
use crate::params::{FormantParams, PitchParams};
use crate::track::{FormantTracks, PitchTrack};

pub use embedded::EmbeddedGateway;
pub use exe::ExeGateway;
pub use tcl::TclScriptGateway;

/// How often a running Snack process is checked for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extension of the pitch result file Snack writes next to its input.
pub const PITCH_EXT: &str = "f0";
/// Extension of the formant result file Snack writes next to its input.
pub const FORMANT_EXT: &str = "frm";

/// Raw Snack estimates for one file.
pub trait EstimatorGateway: Send + Sync {
    /// The transport this gateway uses.
    fn method(&self) -> SnackMethod;

    /// Per-frame F0 and voicing from the ESPS pitch tracker.
    fn raw_pitch(&self, wav: &Path, params: &PitchParams) -> SnackResult<PitchTrack>;

    /// Per-frame formant frequencies and bandwidths from the LPC formant tracker.
    fn raw_formants(&self, wav: &Path, params: &FormantParams) -> SnackResult<FormantTracks>;
}

/// Builds the gateway `config` asks for.
pub fn gateway_for(config: &SnackConfig) -> SnackResult<Box<dyn EstimatorGateway>> {
    cancellable_gateway_for(config, &CancelToken::new())
}

/// Like [`gateway_for`], but every Snack process it starts is killed once
/// `cancel` is set.
pub fn cancellable_gateway_for(
    config: &SnackConfig,
    cancel: &CancelToken,
) -> SnackResult<Box<dyn EstimatorGateway>> {
    config.validate()?;
    debug!(method = %config.method, "selecting Snack gateway");
    let gateway: Box<dyn EstimatorGateway> = match config.method {
        SnackMethod::Exe => Box::new(
            ExeGateway::new(&config.exe_path)
                .isolate(config.isolate)
                .cancel_token(cancel.clone()),
        ),
        SnackMethod::Tcl => Box::new(
            TclScriptGateway::new(&config.tcl_shell_cmd)
                .snack_lib_path(config.snack_lib_path.as_deref())
                .isolate(config.isolate)
                .cancel_token(cancel.clone()),
        ),
        SnackMethod::Embedded => Box::new(
            EmbeddedGateway::new(&config.tcl_shell_cmd)
                .snack_lib_path(config.snack_lib_path.as_deref())
                .cancel_token(cancel.clone()),
        ),
    };
    Ok(gateway)
}

/// Runs `cmd` to completion and turns every failure mode into a [`SnackError`].
pub(crate) fn run_tool(
    cmd: &mut Command,
    tool: &str,
    cancel: &CancelToken,
) -> SnackResult<Output> {
    if cancel.is_cancelled() {
        return Err(SnackError::Cancelled(tool.into()));
    }
    debug!(command = ?cmd, "invoking Snack");
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;
    let output = wait_output(child, tool, cancel)?;
    check_output(tool, &output)?;
    Ok(output)
}

/// Collects the output of `child`, killing it as soon as `cancel` is set.
pub(crate) fn wait_output(
    mut child: Child,
    tool: &str,
    cancel: &CancelToken,
) -> SnackResult<Output> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            warn!(tool, pid = child.id(), "cancelled, killing Snack");
            if let Err(e) = child.kill() {
                // already exited
                debug!(tool, error = %e, "could not kill Snack");
            }
            child.wait()?;
            return Err(SnackError::Cancelled(tool.into()));
        }
        thread::sleep(POLL_INTERVAL);
    };
    // an interrupt reaching the whole process group also stops the child
    if cancel.is_cancelled() && !status.success() {
        return Err(SnackError::Cancelled(tool.into()));
    }
    Ok(Output {
        status,
        stdout: join_pipe(stdout)?,
        stderr: join_pipe(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_pipe(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> SnackResult<Vec<u8>> {
    match reader {
        Some(reader) => reader
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe reader panicked"))?
            .map_err(Into::into),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn spawn_error(tool: &str, e: io::Error) -> SnackError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            SnackError::tool_unavailable(tool, e.to_string())
        }
        _ => SnackError::invocation(tool, e.to_string()),
    }
}

pub(crate) fn check_output(tool: &str, output: &Output) -> SnackResult<()> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Some(line) = stderr.lines().find(|l| l.contains("can't find package snack")) {
        return Err(SnackError::tool_unavailable(tool, line.trim()));
    }
    if !output.status.success() {
        return Err(SnackError::invocation(
            tool,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }
    // Snack reports bad parameters with an `ERROR:` line but may still exit cleanly.
    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Some(line) = stderr
        .lines()
        .chain(stdout.lines())
        .find(|l| l.trim_start().starts_with("ERROR:"))
    {
        return Err(SnackError::invocation(tool, line.trim()));
    }
    Ok(())
}

#[cfg(all(test, unix))]
pub(crate) mod fake {
    //! Shell scripts standing in for `tclsh` and `snack.exe`.

    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    pub(crate) const F0_ROWS: &str = "0.0 0.0 110.3 0.31\n\n\
                                      180.5 1.0 812.4 0.93\n\n\
                                      181.0 1.0 830.1 0.94\n";

    pub(crate) const FRM_ROWS: &str =
        "512.0 1480.5 2510.0 3520.0 60.1 80.2 120.3 200.4\n\
         515.0 1475.5 2505.0 3515.0 61.1 81.2 121.3 201.4\n";

    /// Writes an executable `sh` script named `name` into `dir`.
    pub(crate) fn tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub(crate) fn wav(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"RIFF\0\0\0\0WAVE").unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_for_selects_transport() {
        let tcl = SnackConfig {
            method: SnackMethod::Tcl,
            ..Default::default()
        };
        assert_eq!(gateway_for(&tcl).unwrap().method(), SnackMethod::Tcl);

        let embedded = SnackConfig {
            method: SnackMethod::Embedded,
            ..Default::default()
        };
        assert_eq!(
            gateway_for(&embedded).unwrap().method(),
            SnackMethod::Embedded
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_gateway_for_rejects_exe() {
        let config = SnackConfig {
            method: SnackMethod::Exe,
            ..Default::default()
        };
        assert!(matches!(
            gateway_for(&config),
            Err(SnackError::Configuration(_))
        ));
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;
        use std::time::Instant;

        use super::*;

        fn output(code: i32, stdout: &str, stderr: &str) -> Output {
            Output {
                status: ExitStatus::from_raw(code << 8),
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            }
        }

        #[test]
        fn test_check_output_success() {
            assert!(check_output("tclsh", &output(0, "120 1 0 0\n", "")).is_ok());
        }

        #[test]
        fn test_check_output_missing_package() {
            let out = output(
                1,
                "",
                "can't find package snack\n    while executing\n\"package require snack\"",
            );
            assert!(matches!(
                check_output("tclsh", &out),
                Err(SnackError::ToolUnavailable { .. })
            ));
        }

        #[test]
        fn test_check_output_failures() {
            assert!(matches!(
                check_output("tclsh", &output(1, "", "boom")),
                Err(SnackError::Invocation { .. })
            ));
            let err = check_output(
                "snack.exe",
                &output(0, "", "ERROR: wind_dur parameter must be between [0.0001, 0.1].\n"),
            )
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                "snack.exe failed: ERROR: wind_dur parameter must be between [0.0001, 0.1]."
            );
        }

        #[test]
        fn test_spawn_missing_binary() {
            let mut cmd = Command::new("/nonexistent/snack-track/tclsh");
            assert!(matches!(
                run_tool(&mut cmd, "tclsh", &CancelToken::new()),
                Err(SnackError::ToolUnavailable { .. })
            ));
        }

        #[test]
        fn test_run_tool_collects_output() {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", "echo '120 1 0 0'; echo 'cannot open /dev/mixer' >&2"]);
            let output = run_tool(&mut cmd, "sh", &CancelToken::new()).unwrap();
            assert_eq!(String::from_utf8_lossy(&output.stdout), "120 1 0 0\n");
            assert_eq!(
                String::from_utf8_lossy(&output.stderr),
                "cannot open /dev/mixer\n"
            );
        }

        #[test]
        fn test_cancelled_before_spawn() {
            let cancel = CancelToken::new();
            cancel.cancel();
            let mut cmd = Command::new("/nonexistent/snack-track/tclsh");
            assert!(matches!(
                run_tool(&mut cmd, "tclsh", &cancel),
                Err(SnackError::Cancelled(_))
            ));
        }

        #[test]
        fn test_cancel_kills_running_tool() {
            let cancel = CancelToken::new();
            let canceller = {
                let cancel = cancel.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(200));
                    cancel.cancel();
                })
            };
            let started = Instant::now();
            let mut cmd = Command::new("sh");
            cmd.args(["-c", "exec sleep 30"]);
            let err = run_tool(&mut cmd, "sh", &cancel).unwrap_err();
            canceller.join().unwrap();
            assert!(matches!(err, SnackError::Cancelled(_)));
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
