use std::path::Path;

use tracing::debug;

use crate::align::FrameLayout;
use crate::error::SnackResult;
use crate::gateway::EstimatorGateway;
use crate::params::{FormantParams, PitchParams};
use crate::track::{FormantChannel, FormantTracks, PitchTrack};

/// F0 and voicing of `wav`, each exactly `data_len` samples long.
///
/// Snack's first estimate belongs to the centre of its first window, so the
/// first `floor(window_size / frame_shift / 2)` samples are NaN, as is
/// everything after the last frame.
pub fn snack_pitch<G>(
    gateway: &G,
    wav: &Path,
    data_len: usize,
    params: &PitchParams,
) -> SnackResult<PitchTrack>
where
    G: EstimatorGateway + ?Sized,
{
    params.validate()?;
    let layout = FrameLayout::new(params.frame_shift, params.window_size, data_len)?;
    let raw = gateway.raw_pitch(wav, params)?;
    debug!(
        path = %wav.display(),
        method = %gateway.method(),
        n_frames = raw.len(),
        head_len = layout.head_len(),
        data_len,
        "aligning Snack pitch"
    );
    layout.align_pitch(&raw)
}

/// Formants `sF1`..`sF4` and bandwidths `sB1`..`sB4` of `wav`, each exactly
/// `data_len` samples long and padded like [`snack_pitch`].
pub fn snack_formants<G>(
    gateway: &G,
    wav: &Path,
    data_len: usize,
    params: &FormantParams,
) -> SnackResult<FormantTracks>
where
    G: EstimatorGateway + ?Sized,
{
    params.validate()?;
    let layout = FrameLayout::new(params.frame_shift, params.window_size, data_len)?;
    let raw = gateway.raw_formants(wav, params)?;
    debug!(
        path = %wav.display(),
        method = %gateway.method(),
        n_frames = raw.get(FormantChannel::F1).map_or(0, |x| x.len()),
        head_len = layout.head_len(),
        data_len,
        "aligning Snack formants"
    );
    layout.align_formants(&raw)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ndarray::prelude::*;

    use super::*;
    use crate::config::SnackMethod;
    use crate::error::SnackError;

    /// Gateway returning canned frames.
    struct FixedGateway {
        n_frames: usize,
        calls: AtomicUsize,
    }

    impl FixedGateway {
        fn new(n_frames: usize) -> Self {
            FixedGateway {
                n_frames,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EstimatorGateway for FixedGateway {
        fn method(&self) -> SnackMethod {
            SnackMethod::Tcl
        }

        fn raw_pitch(&self, _wav: &Path, _params: &PitchParams) -> SnackResult<PitchTrack> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PitchTrack {
                f0: Array1::range(100., 100. + 5. * self.n_frames as f64, 5.),
                voicing: Array1::ones(self.n_frames),
            })
        }

        fn raw_formants(&self, _wav: &Path, _params: &FormantParams) -> SnackResult<FormantTracks> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FormantChannel::ALL
                .into_iter()
                .enumerate()
                .map(|(i, ch)| (ch, Array1::from_elem(self.n_frames, i as f64)))
                .collect())
        }
    }

    #[test]
    fn test_snack_pitch_pads_to_data_len() {
        let gateway = FixedGateway::new(3);
        let track = snack_pitch(&gateway, Path::new("a.wav"), 20, &PitchParams::default()).unwrap();
        assert_eq!(track.len(), 20);
        assert_eq!(track.f0.slice(s![12..15]), arr1(&[100., 105., 110.]));
        assert_eq!(track.voicing.slice(s![12..15]), arr1(&[1., 1., 1.]));
        assert!(track.f0.slice(s![..12]).iter().all(|x| x.is_nan()));
        assert!(track.voicing.slice(s![15..]).iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_snack_pitch_through_trait_object() {
        let gateway: Box<dyn EstimatorGateway> = Box::new(FixedGateway::new(2));
        let track = snack_pitch(gateway.as_ref(), Path::new("a.wav"), 14, &PitchParams::default())
            .unwrap();
        assert_eq!(track.f0[13], 105.);
    }

    #[test]
    fn test_snack_formants_pads_every_channel() {
        let gateway = FixedGateway::new(4);
        let tracks =
            snack_formants(&gateway, Path::new("a.wav"), 30, &FormantParams::default()).unwrap();
        assert_eq!(tracks.len(), 8);
        for (i, ch) in FormantChannel::ALL.into_iter().enumerate() {
            let series = tracks.channel(ch).unwrap();
            assert_eq!(series.len(), 30);
            assert_eq!(series.slice(s![12..16]), Array1::from_elem(4, i as f64));
            assert_eq!(series.iter().filter(|x| x.is_nan()).count(), 26);
        }
    }

    #[test]
    fn test_overrun_reported() {
        let gateway = FixedGateway::new(10);
        let err = snack_pitch(&gateway, Path::new("a.wav"), 20, &PitchParams::default()).unwrap_err();
        assert!(matches!(
            err,
            SnackError::LengthMismatch {
                data_len: 20,
                required: 22
            }
        ));
    }

    #[test]
    fn test_invalid_params_never_reach_gateway() {
        let gateway = FixedGateway::new(3);
        let params = FormantParams {
            lpc_order: 0,
            ..Default::default()
        };
        assert!(snack_formants(&gateway, Path::new("a.wav"), 20, &params).is_err());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }
}
