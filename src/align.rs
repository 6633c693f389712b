//! Placement of Snack frame estimates on the canonical output time axis.
//!
//! Snack reports its first estimate at the centre of its first analysis
//! window, so frame 0 of the toolkit output corresponds to output sample
//! `floor(window_size / frame_shift / 2)`. Everything before that, and
//! everything after the last toolkit frame, is NaN.

use getset::CopyGetters;
use ndarray::{prelude::*, Data};

use crate::error::{SnackError, SnackResult};
use crate::pad::Pad;
use crate::params::validate_framing;
use crate::track::{FormantChannel, FormantTracks, PitchTrack};

/// Number of output samples preceding toolkit frame 0.
///
/// Only the ratio of the two durations matters, so milliseconds and seconds
/// give the same result. The operation order (divide, halve, floor) is fixed.
#[inline]
pub fn head_len(frame_shift: f64, window_size: f64) -> usize {
    (window_size / frame_shift / 2.).floor() as usize
}

/// Frame sizing plus the length every aligned series must have.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FrameLayout {
    /// frame shift, in the same unit as `window_size`.
    frame_shift: f64,
    /// analysis window length, in the same unit as `frame_shift`.
    window_size: f64,
    /// length of every aligned series.
    data_len: usize,
}

impl FrameLayout {
    pub fn new(frame_shift: f64, window_size: f64, data_len: usize) -> SnackResult<Self> {
        validate_framing(frame_shift, window_size)?;
        // no array can hold more than isize::MAX elements
        let half_ratio = window_size / frame_shift / 2.;
        if half_ratio >= isize::MAX as f64 {
            return Err(SnackError::InvalidParameter(format!(
                "window_size / frame_shift = {} is too large to place frames on an array",
                window_size / frame_shift
            )));
        }
        Ok(FrameLayout {
            frame_shift,
            window_size,
            data_len,
        })
    }

    pub fn head_len(&self) -> usize {
        head_len(self.frame_shift, self.window_size)
    }

    /// NaN samples needed after `n_raw` frames.
    ///
    /// Fails with [`SnackError::LengthMismatch`] when the head pad and the raw
    /// frames already exceed `data_len`.
    pub fn tail_len(&self, n_raw: usize) -> SnackResult<usize> {
        let mismatch = |required| SnackError::LengthMismatch {
            data_len: self.data_len,
            required,
        };
        let required = n_raw
            .checked_add(self.head_len())
            .ok_or_else(|| mismatch(usize::MAX))?;
        self.data_len
            .checked_sub(required)
            .ok_or_else(|| mismatch(required))
    }

    /// `[NaN; head_len] ++ raw ++ [NaN; tail_len]`, exactly `data_len` long.
    pub fn align<S>(&self, raw: &ArrayBase<S, Ix1>) -> SnackResult<Array1<f64>>
    where
        S: Data<Elem = f64>,
    {
        let tail_len = self.tail_len(raw.len())?;
        Ok(raw.pad((self.head_len(), tail_len), Axis(0), f64::NAN))
    }

    pub fn align_pitch(&self, raw: &PitchTrack) -> SnackResult<PitchTrack> {
        Ok(PitchTrack {
            f0: self.align(&raw.f0)?,
            voicing: self.align(&raw.voicing)?,
        })
    }

    /// Aligns each of the eight channels on its own.
    pub fn align_formants(&self, raw: &FormantTracks) -> SnackResult<FormantTracks> {
        FormantChannel::ALL
            .into_iter()
            .map(|ch| -> SnackResult<_> { Ok((ch, self.align(raw.channel(ch)?)?)) })
            .collect()
    }
}

pub fn align(
    raw: ArrayView1<f64>,
    frame_shift: f64,
    window_size: f64,
    data_len: usize,
) -> SnackResult<Array1<f64>> {
    FrameLayout::new(frame_shift, window_size, data_len)?.align(&raw)
}

pub fn align_formants(
    raw: &FormantTracks,
    frame_shift: f64,
    window_size: f64,
    data_len: usize,
) -> SnackResult<FormantTracks> {
    FrameLayout::new(frame_shift, window_size, data_len)?.align_formants(raw)
}
