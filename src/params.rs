//! Snack analysis parameters.
//!
//! Durations are in milliseconds and frequencies in Hertz. Defaults are the
//! values VoiceSauce uses.

use crate::error::{SnackError, SnackResult};

/// Parameters of the Snack ESPS pitch tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchParams {
    /// frame shift in milliseconds.
    pub frame_shift: f64,
    /// analysis window length in milliseconds.
    pub window_size: f64,
    /// highest F0 candidate in Hz.
    pub max_pitch: f64,
    /// lowest F0 candidate in Hz.
    pub min_pitch: f64,
}

impl Default for PitchParams {
    fn default() -> Self {
        PitchParams {
            frame_shift: 1.,
            window_size: 25.,
            max_pitch: 500.,
            min_pitch: 40.,
        }
    }
}

impl PitchParams {
    pub fn validate(&self) -> SnackResult<()> {
        validate_framing(self.frame_shift, self.window_size)?;
        if !(self.min_pitch > 0. && self.max_pitch > self.min_pitch && self.max_pitch.is_finite()) {
            return Err(SnackError::InvalidParameter(format!(
                "pitch range must satisfy max_pitch > min_pitch > 0, got max_pitch = {}, min_pitch = {}",
                self.max_pitch, self.min_pitch
            )));
        }
        Ok(())
    }
}

/// Parameters of the Snack LPC formant tracker.
///
/// Window type (Hamming), LPC type (autocorrelation) and the 10 kHz
/// downsampling rate are fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantParams {
    /// frame shift in milliseconds.
    pub frame_shift: f64,
    /// analysis window length in milliseconds.
    pub window_size: f64,
    /// pre-emphasis factor applied before windowing, in `[0, 1)`.
    pub pre_emphasis: f64,
    /// order of the LPC analysis.
    pub lpc_order: usize,
}

impl Default for FormantParams {
    fn default() -> Self {
        FormantParams {
            frame_shift: 1.,
            window_size: 25.,
            pre_emphasis: 0.96,
            lpc_order: 12,
        }
    }
}

impl FormantParams {
    pub fn validate(&self) -> SnackResult<()> {
        validate_framing(self.frame_shift, self.window_size)?;
        if !(0. ..1.).contains(&self.pre_emphasis) {
            return Err(SnackError::InvalidParameter(format!(
                "pre_emphasis must be in [0, 1), got {}",
                self.pre_emphasis
            )));
        }
        if self.lpc_order == 0 {
            return Err(SnackError::InvalidParameter(
                "lpc_order must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_framing(frame_shift: f64, window_size: f64) -> SnackResult<()> {
    let valid = |x: f64| x.is_finite() && x > 0.;
    if !valid(frame_shift) || !valid(window_size) {
        return Err(SnackError::InvalidParameter(format!(
            "frame_shift and window_size must be positive, got frame_shift = {frame_shift}, window_size = {window_size}"
        )));
    }
    Ok(())
}

/// Milliseconds to the seconds Snack expects on its command line.
pub(crate) fn ms_to_sec(ms: f64) -> f64 {
    ms / 1000.
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PitchParams::default().validate().is_ok());
        assert!(FormantParams::default().validate().is_ok());
    }

    #[rstest]
    #[case(500., 40., true)]
    #[case(40., 40., false)]
    #[case(40., 500., false)]
    #[case(500., 0., false)]
    #[case(f64::INFINITY, 40., false)]
    fn test_pitch_range(#[case] max_pitch: f64, #[case] min_pitch: f64, #[case] ok: bool) {
        let params = PitchParams {
            max_pitch,
            min_pitch,
            ..Default::default()
        };
        assert_eq!(params.validate().is_ok(), ok);
    }

    #[rstest]
    #[case(0.96, 12, true)]
    #[case(0., 1, true)]
    #[case(1., 12, false)]
    #[case(-0.1, 12, false)]
    #[case(0.96, 0, false)]
    fn test_formant_params(#[case] pre_emphasis: f64, #[case] lpc_order: usize, #[case] ok: bool) {
        let params = FormantParams {
            pre_emphasis,
            lpc_order,
            ..Default::default()
        };
        assert_eq!(params.validate().is_ok(), ok);
    }

    #[test]
    fn test_framing() {
        assert!(validate_framing(1., 25.).is_ok());
        assert!(validate_framing(0., 25.).is_err());
        assert!(validate_framing(1., -25.).is_err());
        assert!(validate_framing(f64::NAN, 25.).is_err());
    }

    #[test]
    fn test_ms_to_sec_formatting() {
        assert_eq!(ms_to_sec(1.).to_string(), "0.001");
        assert_eq!(ms_to_sec(25.).to_string(), "0.025");
    }
}
