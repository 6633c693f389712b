use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::parse::{parse_formants, parse_pitch};
use super::scratch::{ArtifactGuard, StagedInput};
use super::script::{formant_flags, pitch_flags};
use super::{run_tool, EstimatorGateway, FORMANT_EXT, PITCH_EXT};
use crate::cancel::CancelToken;
use crate::config::SnackMethod;
use crate::error::SnackResult;
use crate::params::{FormantParams, PitchParams};
use crate::track::{FormantTracks, PitchTrack};

/// Calls the standalone Snack executable.
///
/// The executable writes `<stem>.f0` or `<stem>.frm` next to its input. That
/// file is read and then removed.
#[derive(Debug, Clone)]
pub struct ExeGateway {
    exe_path: PathBuf,
    isolate: bool,
    cancel: CancelToken,
}

impl ExeGateway {
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        ExeGateway {
            exe_path: exe_path.into(),
            isolate: false,
            cancel: CancelToken::new(),
        }
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

    fn tool_name(&self) -> String {
        self.exe_path.display().to_string()
    }

    /// Returns the result file contents and its name.
    fn run(
        &self,
        subcommand: &str,
        wav: &Path,
        flags: Vec<String>,
        ext: &str,
    ) -> SnackResult<(String, String)> {
        let staged = StagedInput::new(wav, self.isolate)?;
        let artifact = ArtifactGuard::acquire(staged.sibling(ext))?;

        let mut cmd = Command::new(&self.exe_path);
        cmd.arg(subcommand).arg(staged.path()).args(flags);
        run_tool(&mut cmd, &self.tool_name(), &self.cancel)?;

        debug!(path = %artifact.path().display(), "reading Snack output");
        Ok((artifact.read()?, artifact.path().display().to_string()))
    }
}

impl EstimatorGateway for ExeGateway {
    fn method(&self) -> SnackMethod {
        SnackMethod::Exe
    }

    fn raw_pitch(&self, wav: &Path, params: &PitchParams) -> SnackResult<PitchTrack> {
        params.validate()?;
        let (text, source_name) = self.run("pitch", wav, pitch_flags(params), PITCH_EXT)?;
        parse_pitch(&text, &source_name)
    }

    fn raw_formants(&self, wav: &Path, params: &FormantParams) -> SnackResult<FormantTracks> {
        params.validate()?;
        let (text, source_name) = self.run("formant", wav, formant_flags(params), FORMANT_EXT)?;
        parse_formants(&text, &source_name)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    use super::super::fake;
    use super::*;
    use crate::error::SnackError;
    use crate::track::FormantChannel;

    /// Fake executable writing `rows` to `<stem>.<ext>` of its second argument.
    fn fake_exe(dir: &Path, ext: &str, rows: &str) -> PathBuf {
        fake::tool(
            dir,
            "snack.exe",
            &format!(
                "echo \"$@\" > \"{}\"\nprintf '{}' > \"${{2%.*}}.{ext}\"",
                dir.join("args.txt").display(),
                rows.replace('\n', "\\n"),
            ),
        )
    }

    #[test]
    fn test_raw_pitch() {
        let dir = tempfile::tempdir().unwrap();
        let wav = fake::wav(dir.path(), "clip.wav");
        let exe = fake_exe(dir.path(), "f0", fake::F0_ROWS);

        let track = ExeGateway::new(&exe)
            .raw_pitch(&wav, &PitchParams::default())
            .unwrap();
        assert_abs_diff_eq!(track.f0, arr1(&[0., 180.5, 181.]), epsilon = 1e-12);
        assert_abs_diff_eq!(track.voicing, arr1(&[0., 1., 1.]), epsilon = 1e-12);

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            format!(
                "pitch {} -method esps -framelength 0.001 -windowlength 0.025 -maxpitch 500 -minpitch 40",
                wav.display()
            )
        );
        assert!(!dir.path().join("clip.f0").exists());
    }

    #[test]
    fn test_raw_formants_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let wav = fake::wav(dir.path(), "clip.wav");
        let exe = fake_exe(dir.path(), "frm", fake::FRM_ROWS);

        let tracks = ExeGateway::new(&exe)
            .isolate(true)
            .raw_formants(&wav, &FormantParams::default())
            .unwrap();
        assert_eq!(tracks.len(), 8);
        assert_abs_diff_eq!(
            *tracks.get(FormantChannel::F3).unwrap(),
            arr1(&[2510., 2505.]),
            epsilon = 1e-12
        );

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.starts_with("formant "));
        assert!(!args.contains(&wav.display().to_string()));
        assert!(!dir.path().join("clip.frm").exists());
    }

    #[test]
    fn test_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let wav = fake::wav(dir.path(), "clip.wav");
        let exe = fake::tool(dir.path(), "snack.exe", "exit 0");

        let err = ExeGateway::new(&exe)
            .raw_pitch(&wav, &PitchParams::default())
            .unwrap_err();
        assert!(matches!(err, SnackError::OutputMissing(_)));
    }

    #[test]
    fn test_nonzero_exit_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let wav = fake::wav(dir.path(), "clip.wav");
        let exe = fake::tool(
            dir.path(),
            "snack.exe",
            "echo '1 1 0 0' > \"${2%.*}.f0\"\necho 'bad wav' >&2\nexit 3",
        );

        let err = ExeGateway::new(&exe)
            .raw_pitch(&wav, &PitchParams::default())
            .unwrap_err();
        assert!(matches!(err, SnackError::Invocation { .. }));
        assert!(!dir.path().join("clip.f0").exists());
    }

    #[test]
    fn test_invalid_params_skip_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let wav = fake::wav(dir.path(), "clip.wav");
        let params = PitchParams {
            min_pitch: 600.,
            ..Default::default()
        };
        let err = ExeGateway::new(dir.path().join("missing.exe"))
            .raw_pitch(&wav, &params)
            .unwrap_err();
        assert!(matches!(err, SnackError::InvalidParameter(_)));
    }
}
