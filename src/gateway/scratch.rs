//! Scoped ownership of the files a Snack run leaves behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{TempDir, TempPath};
use tracing::{debug, warn};

use crate::error::{SnackError, SnackResult};

/// Result file written by the toolkit next to its input.
///
/// Any stale file at the path is removed on acquisition, and whatever is
/// there is removed again on drop, whether the run succeeded or not.
pub(crate) struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    pub(crate) fn acquire(path: PathBuf) -> SnackResult<Self> {
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale Snack output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(ArtifactGuard { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn read(&self) -> SnackResult<String> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SnackError::OutputMissing(self.path.display().to_string()),
            _ => e.into(),
        })
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove Snack output"),
        }
    }
}

/// Fails with [`SnackError::InvalidParameter`] unless `wav` is an existing file.
///
/// Every transport checks this before spawning anything.
pub(crate) fn require_input(wav: &Path) -> SnackResult<()> {
    if !wav.is_file() {
        return Err(SnackError::InvalidParameter(format!(
            "input file {} does not exist",
            wav.display()
        )));
    }
    Ok(())
}

/// The input as the toolkit sees it.
///
/// With isolation the WAV is copied into a private temporary directory, so
/// sibling result files of concurrent runs on one input never collide. The
/// directory and everything in it goes away on drop.
pub(crate) struct StagedInput {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl StagedInput {
    pub(crate) fn new(wav: &Path, isolate: bool) -> SnackResult<Self> {
        require_input(wav)?;
        if !isolate {
            return Ok(StagedInput {
                path: wav.to_path_buf(),
                _dir: None,
            });
        }
        let file_name = wav.file_name().ok_or_else(|| {
            SnackError::InvalidParameter(format!("{} has no file name", wav.display()))
        })?;
        let dir = tempfile::Builder::new().prefix("snack-track").tempdir()?;
        let path = dir.path().join(file_name);
        fs::copy(wav, &path)?;
        debug!(from = %wav.display(), to = %path.display(), "staged input");
        Ok(StagedInput {
            path,
            _dir: Some(dir),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// `<stem>.<ext>` next to the staged input, where Snack writes results.
    pub(crate) fn sibling(&self, ext: &str) -> PathBuf {
        self.path.with_extension(ext)
    }
}

/// Writes `contents` to a fresh temporary `.tcl` file, deleted on drop.
pub(crate) fn script_file(contents: &str) -> SnackResult<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("snack-track")
        .suffix(".tcl")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}
