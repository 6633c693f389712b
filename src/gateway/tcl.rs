use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::parse::{parse_formants, parse_pitch};
use super::scratch::{script_file, ArtifactGuard, StagedInput};
use super::script::{file_script, formant_command, pitch_command};
use super::{run_tool, EstimatorGateway, FORMANT_EXT, PITCH_EXT};
use crate::cancel::CancelToken;
use crate::config::SnackMethod;
use crate::error::SnackResult;
use crate::params::{FormantParams, PitchParams};
use crate::track::{FormantTracks, PitchTrack};

/// Runs a generated Tcl script through a Tcl shell.
///
/// The script loads Snack, analyses the input and writes the frame rows to
/// `<stem>.f0` or `<stem>.frm` next to it. Both the script and the result file
/// are removed afterwards, on success and on failure.
#[derive(Debug, Clone)]
pub struct TclScriptGateway {
    shell: String,
    snack_lib_path: Option<PathBuf>,
    isolate: bool,
    cancel: CancelToken,
}

impl TclScriptGateway {
    pub fn new(shell: impl Into<String>) -> Self {
        TclScriptGateway {
            shell: shell.into(),
            snack_lib_path: None,
            isolate: false,
            cancel: CancelToken::new(),
        }
    }

    /// Load Snack from `lib_path` instead of the Tcl library path.
    pub fn snack_lib_path(mut self, lib_path: Option<&Path>) -> Self {
        self.snack_lib_path = lib_path.map(Path::to_path_buf);
        self
    }

    /// Run on a private copy of each input.
    pub fn isolate(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    /// Kill the Snack process and fail with
    /// [`SnackError::Cancelled`](crate::SnackError::Cancelled) once `cancel` is set.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn run(&self, wav: &Path, command: &str, ext: &str) -> SnackResult<(String, String)> {
        let staged = StagedInput::new(wav, self.isolate)?;
        let artifact = ArtifactGuard::acquire(staged.sibling(ext))?;
        let script = script_file(&file_script(
            staged.path(),
            ext,
            command,
            self.snack_lib_path.as_deref(),
        ))?;
        debug!(script = %script.display(), "wrote Snack script");

        let mut cmd = Command::new(&self.shell);
        cmd.arg(&*script);
        run_tool(&mut cmd, &self.shell, &self.cancel)?;

        Ok((artifact.read()?, artifact.path().display().to_string()))
    }
}

impl EstimatorGateway for TclScriptGateway {
    fn method(&self) -> SnackMethod {
        SnackMethod::Tcl
    }

    fn raw_pitch(&self, wav: &Path, params: &PitchParams) -> SnackResult<PitchTrack> {
        params.validate()?;
        let (text, source_name) = self.run(wav, &pitch_command(params), PITCH_EXT)?;
        parse_pitch(&text, &source_name)
    }

    fn raw_formants(&self, wav: &Path, params: &FormantParams) -> SnackResult<FormantTracks> {
        params.validate()?;
        let (text, source_name) = self.run(wav, &formant_command(params), FORMANT_EXT)?;
        parse_formants(&text, &source_name)
    }
}
