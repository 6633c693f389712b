//! Snack command lines and Tcl scripts.

use std::path::Path;

use crate::params::{ms_to_sec, FormantParams, PitchParams};

/// Formant analysis runs on a signal downsampled to this rate.
const DS_FREQ: u32 = 10000;

/// Marker printed by an interpreter session right before the frame rows.
pub(crate) const FRAMES_MARKER: &str = "#snack-track frames";

/// Tcl word for `path`, with forward slashes on every platform.
///
/// Paths are brace-quoted. A path containing braces cannot be, so each
/// character special to Tcl is backslash-escaped instead.
pub(crate) fn tcl_path(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if !path.contains(|c| c == '{' || c == '}') {
        return format!("{{{path}}}");
    }
    let mut word = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        match c {
            '\n' => word.push_str("\\n"),
            '\t' => word.push_str("\\t"),
            '{' | '}' | '[' | ']' | '$' | '"' | ';' | ' ' => {
                word.push('\\');
                word.push(c);
            }
            _ => word.push(c),
        }
    }
    word
}

pub(crate) fn pitch_flags(params: &PitchParams) -> Vec<String> {
    vec![
        "-method".into(),
        "esps".into(),
        "-framelength".into(),
        ms_to_sec(params.frame_shift).to_string(),
        "-windowlength".into(),
        ms_to_sec(params.window_size).to_string(),
        "-maxpitch".into(),
        params.max_pitch.to_string(),
        "-minpitch".into(),
        params.min_pitch.to_string(),
    ]
}

pub(crate) fn formant_flags(params: &FormantParams) -> Vec<String> {
    vec![
        "-windowlength".into(),
        ms_to_sec(params.window_size).to_string(),
        "-framelength".into(),
        ms_to_sec(params.frame_shift).to_string(),
        "-windowtype".into(),
        "Hamming".into(),
        "-lpctype".into(),
        "0".into(),
        "-preemphasisfactor".into(),
        params.pre_emphasis.to_string(),
        "-ds_freq".into(),
        DS_FREQ.to_string(),
        "-lpcorder".into(),
        params.lpc_order.to_string(),
    ]
}

/// Tcl command running the pitch tracker on sound `s`.
pub(crate) fn pitch_command(params: &PitchParams) -> String {
    format!("s pitch {}", pitch_flags(params).join(" "))
}

/// Tcl command running the formant tracker on sound `s`.
pub(crate) fn formant_command(params: &FormantParams) -> String {
    format!("s formant {}", formant_flags(params).join(" "))
}

fn preamble(wav: &Path, snack_lib_path: Option<&Path>) -> String {
    let mut script = String::new();
    if let Some(lib_path) = snack_lib_path {
        let lib_path = tcl_path(lib_path);
        script += &format!("pkg_mkIndex {lib_path} snack.tcl libsnack.dylib libsound.dylib\n");
        script += &format!("lappend auto_path {lib_path}\n\n");
    }
    script += "package require snack\n\n";
    script += "snack::sound s\n\n";
    script += &format!("s read {}\n\n", tcl_path(wav));
    script
}

/// Script writing the frame rows of `command` to `[file rootname wav].<ext>`.
pub(crate) fn file_script(
    wav: &Path,
    ext: &str,
    command: &str,
    snack_lib_path: Option<&Path>,
) -> String {
    let mut script = preamble(wav, snack_lib_path);
    script += &format!("set fd [open [file rootname {}].{ext} w]\n", tcl_path(wav));
    script += &format!("puts $fd [join [{command}] \"\\n\"]\n");
    script += "close $fd\n\n";
    script += "exit\n";
    script
}

/// Script printing the frame rows of `command` to stdout after [`FRAMES_MARKER`].
pub(crate) fn session_script(wav: &Path, command: &str, snack_lib_path: Option<&Path>) -> String {
    let mut script = preamble(wav, snack_lib_path);
    script += &format!("set data [{command}]\n");
    script += &format!("puts \"{FRAMES_MARKER}\"\n");
    script += "puts [join $data \"\\n\"]\n";
    script += "flush stdout\n";
    script += "exit\n";
    script
}
