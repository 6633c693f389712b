use ndarray::prelude::*;

use crate::error::{SnackError, SnackResult};
use crate::track::{FormantChannel, FormantTracks, PitchTrack};

/// Columns read from a pitch result. Snack also writes RMS and ACF peak,
/// which are ignored.
pub(crate) const PITCH_COLUMNS: usize = 2;
pub(crate) const FORMANT_COLUMNS: usize = FormantChannel::ALL.len();

/// Reads whitespace-separated frame rows into a `(frames, n_cols)` matrix.
///
/// Blank lines are skipped and columns past `n_cols` are ignored. No rows at
/// all is a valid zero-frame result.
pub(crate) fn parse_frames(text: &str, n_cols: usize, source_name: &str) -> SnackResult<Array2<f64>> {
    let mut values = Vec::new();
    let mut n_rows = 0;
    for (i_line, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace().peekable();
        if fields.peek().is_none() {
            continue;
        }
        for i_col in 0..n_cols {
            let field = fields.next().ok_or_else(|| {
                SnackError::malformed(
                    source_name,
                    format!(
                        "line {}: expected at least {n_cols} columns, found {i_col}",
                        i_line + 1
                    ),
                )
            })?;
            let value = field.parse::<f64>().map_err(|e| {
                SnackError::malformed(
                    source_name,
                    format!("line {}: `{field}` is not a number ({e})", i_line + 1),
                )
            })?;
            values.push(value);
        }
        n_rows += 1;
    }
    Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|e| SnackError::malformed(source_name, e.to_string()))
}

pub(crate) fn parse_pitch(text: &str, source_name: &str) -> SnackResult<PitchTrack> {
    let frames = parse_frames(text, PITCH_COLUMNS, source_name)?;
    Ok(PitchTrack {
        f0: frames.column(0).to_owned(),
        voicing: frames.column(1).to_owned(),
    })
}

pub(crate) fn parse_formants(text: &str, source_name: &str) -> SnackResult<FormantTracks> {
    let frames = parse_frames(text, FORMANT_COLUMNS, source_name)?;
    Ok(FormantTracks::from_columns(frames.view()))
}
