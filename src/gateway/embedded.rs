use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::parse::{parse_formants, parse_pitch};
use super::scratch::require_input;
use super::script::{formant_command, pitch_command, session_script, FRAMES_MARKER};
use super::{check_output, spawn_error, wait_output, EstimatorGateway};
use crate::cancel::CancelToken;
use crate::config::SnackMethod;
use crate::error::{SnackError, SnackResult};
use crate::params::{FormantParams, PitchParams};
use crate::track::{FormantTracks, PitchTrack};

/// Drives an interactive Tcl interpreter with Snack loaded.
///
/// Commands go in over stdin and the frame rows come back on stdout, so no
/// file is written next to the input.
#[derive(Debug, Clone)]
pub struct EmbeddedGateway {
    shell: String,
    snack_lib_path: Option<PathBuf>,
    cancel: CancelToken,
}

impl EmbeddedGateway {
    pub fn new(shell: impl Into<String>) -> Self {
        EmbeddedGateway {
            shell: shell.into(),
            snack_lib_path: None,
            cancel: CancelToken::new(),
        }
    }

    /// Load Snack from `lib_path` instead of the Tcl library path.
    pub fn snack_lib_path(mut self, lib_path: Option<&Path>) -> Self {
        self.snack_lib_path = lib_path.map(Path::to_path_buf);
        self
    }

    /// Kill the Snack process and fail with
    /// [`SnackError::Cancelled`](crate::SnackError::Cancelled) once `cancel` is set.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Evaluates `command` on `wav` and returns everything printed after the
    /// frames marker.
    fn eval(&self, wav: &Path, command: &str) -> SnackResult<String> {
        require_input(wav)?;
        let script = session_script(wav, command, self.snack_lib_path.as_deref());
        if self.cancel.is_cancelled() {
            return Err(SnackError::Cancelled(self.shell.clone()));
        }
        debug!(shell = %self.shell, command, "starting Tcl session");

        let mut child = Command::new(&self.shell)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.shell, e))?;
        if let Some(mut stdin) = child.stdin.take() {
            // An interpreter that dies early closes its end; its exit status says why.
            if let Err(e) = stdin.write_all(script.as_bytes()) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        let output = wait_output(child, &self.shell, &self.cancel)?;
        check_output(&self.shell, &output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.split_once(FRAMES_MARKER) {
            Some((_, frames)) => Ok(frames.to_string()),
            None => Err(SnackError::OutputMissing(format!(
                "frame data on {} stdout",
                self.shell
            ))),
        }
    }
}

impl EstimatorGateway for EmbeddedGateway {
    fn method(&self) -> SnackMethod {
        SnackMethod::Embedded
    }

    fn raw_pitch(&self, wav: &Path, params: &PitchParams) -> SnackResult<PitchTrack> {
        params.validate()?;
        let text = self.eval(wav, &pitch_command(params))?;
        parse_pitch(&text, &format!("{} session", self.shell))
    }

    fn raw_formants(&self, wav: &Path, params: &FormantParams) -> SnackResult<FormantTracks> {
        params.validate()?;
        let text = self.eval(wav, &formant_command(params))?;
        parse_formants(&text, &format!("{} session", self.shell))
    }
}
