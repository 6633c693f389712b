//! Toolkit configuration.
//!
//! The configuration is a plain value handed to [`gateway_for`](crate::gateway::gateway_for).
//! [`SnackConfig::from_env`] is the only place that looks at the environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{SnackError, SnackResult};

/// How Snack is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnackMethod {
    /// Standalone `snack.exe` binary (Windows only).
    Exe,
    /// Generated Tcl script run through a Tcl shell.
    Tcl,
    /// Interactive Tcl interpreter session fed over stdin.
    Embedded,
}

impl SnackMethod {
    pub const ALL: [SnackMethod; 3] = [Self::Exe, Self::Tcl, Self::Embedded];

    /// `exe` on Windows, `tcl` everywhere else.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Exe
        } else {
            Self::Tcl
        }
    }

    pub fn is_supported(self) -> bool {
        self != Self::Exe || cfg!(windows)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Exe => "exe",
            Self::Tcl => "tcl",
            Self::Embedded => "embedded",
        }
    }
}

impl fmt::Display for SnackMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SnackMethod {
    type Err = SnackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exe" => Ok(Self::Exe),
            "tcl" => Ok(Self::Tcl),
            // older configurations named the interpreter transport after its host
            "embedded" | "python" => Ok(Self::Embedded),
            other => Err(SnackError::Configuration(format!(
                "invalid Snack calling method `{other}`, choices are exe, tcl, embedded"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnackConfig {
    pub method: SnackMethod,
    /// command starting the Tcl shell. (used by `tcl` and `embedded`)
    pub tcl_shell_cmd: String,
    /// directory holding the Snack library, for hosts without a system-wide install.
    pub snack_lib_path: Option<PathBuf>,
    /// path of the standalone executable. (used by `exe`)
    pub exe_path: PathBuf,
    /// run file-based transports on a private copy of the input.
    pub isolate: bool,
}

impl Default for SnackConfig {
    fn default() -> Self {
        SnackConfig {
            method: SnackMethod::platform_default(),
            tcl_shell_cmd: "tclsh".into(),
            snack_lib_path: None,
            exe_path: PathBuf::from("snack.exe"),
            isolate: false,
        }
    }
}

impl SnackConfig {
    /// Defaults overridden by `SNACK_METHOD`, `SNACK_TCL_SHELL`,
    /// `SNACK_LIB_PATH`, `SNACK_EXE_PATH` and `SNACK_ISOLATE`.
    pub fn from_env() -> SnackResult<Self> {
        let mut config = Self::default();
        if let Some(method) = non_empty_var("SNACK_METHOD") {
            config.method = method.parse()?;
        }
        if let Some(shell) = non_empty_var("SNACK_TCL_SHELL") {
            config.tcl_shell_cmd = shell;
        }
        if let Some(lib_path) = non_empty_var("SNACK_LIB_PATH") {
            config.snack_lib_path = Some(PathBuf::from(lib_path));
        }
        if let Some(exe_path) = non_empty_var("SNACK_EXE_PATH") {
            config.exe_path = PathBuf::from(exe_path);
        }
        if let Some(isolate) = non_empty_var("SNACK_ISOLATE") {
            config.isolate = parse_flag("SNACK_ISOLATE", &isolate)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> SnackResult<()> {
        if !self.method.is_supported() {
            return Err(SnackError::Configuration(format!(
                "cannot use `{}` as Snack calling method on this platform",
                self.method
            )));
        }
        if self.method != SnackMethod::Exe && self.tcl_shell_cmd.trim().is_empty() {
            return Err(SnackError::Configuration(
                "Tcl shell command must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(key: &str, value: &str) -> SnackResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SnackError::Configuration(format!(
            "invalid {key} value `{other}`"
        ))),
    }
}
