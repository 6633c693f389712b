//! Snack Sound Toolkit pitch and formant tracks on a fixed per-frame time axis.
//!
//! Snack reports one estimate per analysis frame, starting half a window into
//! the recording. [`snack_pitch`] and [`snack_formants`] fetch those raw frames
//! through an [`EstimatorGateway`] and pad them with NaN so that every series
//! has exactly the caller's data length, with frame 0 at sample
//! `floor(window_size / frame_shift / 2)`.

pub mod align;
pub mod audio;
pub mod cancel;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pad;
mod params;
mod snack;
mod track;

use std::mem;
use std::slice;

use libc::{self, c_double, c_uint, c_void};
use ndarray::prelude::*;

pub use align::{align, align_formants, head_len, FrameLayout};
pub use cancel::CancelToken;
pub use config::{SnackConfig, SnackMethod};
pub use error::{SnackError, SnackResult};
pub use gateway::{cancellable_gateway_for, gateway_for, EstimatorGateway};
pub use params::{FormantParams, PitchParams};
pub use snack::{snack_formants, snack_pitch};
pub use track::{FormantChannel, FormantTracks, PitchChannel, PitchTrack};

/// Aligns `n_raw` frame estimates onto an output of `data_len` samples.
///
/// On success `*out` holds a `malloc`ed buffer of `data_len` doubles that the
/// caller releases with `free`. Returns `EINVAL` for bad pointers or
/// parameters and `ERANGE` when the frames do not fit in `data_len`.
///
/// # Safety
/// `raw` must point to `n_raw` readable doubles (it may be null when `n_raw`
/// is zero), and `out` must point to a null pointer.
#[no_mangle]
pub unsafe extern "C" fn snack_align(
    out: *mut *mut c_double,
    raw: *const c_double,
    n_raw: c_uint,
    frame_shift: c_double,
    window_size: c_double,
    data_len: c_uint,
) -> isize {
    if out.is_null() || !(*out).is_null() || (raw.is_null() && n_raw > 0) {
        return libc::EINVAL as isize;
    }
    let raw = if n_raw > 0 {
        ArrayView1::from(slice::from_raw_parts(raw, n_raw as usize))
    } else {
        ArrayView1::from(&[] as &[f64])
    };
    let aligned = match align(raw, frame_shift, window_size, data_len as usize) {
        Ok(aligned) => aligned,
        Err(SnackError::LengthMismatch { .. }) => return libc::ERANGE as isize,
        Err(_) => return libc::EINVAL as isize,
    };

    let memsize = aligned.len() * mem::size_of::<c_double>();
    *out = libc::malloc(memsize.max(1)) as *mut c_double;
    if (*out).is_null() {
        return libc::ENOMEM as isize;
    }
    libc::memcpy(
        *out as *mut c_void,
        aligned.as_ptr() as *const c_void,
        memsize,
    );
    0
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    #[test]
    fn test_snack_align() {
        let raw = [100., 105., 110.];
        let mut out: *mut c_double = ptr::null_mut();
        let ret = unsafe { snack_align(&mut out, raw.as_ptr(), 3, 1., 25., 20) };
        assert_eq!(ret, 0);

        let aligned = unsafe { slice::from_raw_parts(out, 20) }.to_vec();
        unsafe { libc::free(out as *mut c_void) };
        assert!(aligned[..12].iter().all(|x| x.is_nan()));
        assert_eq!(&aligned[12..15], &raw);
        assert!(aligned[15..].iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_snack_align_errors() {
        let raw = [1.; 9];
        let mut out: *mut c_double = ptr::null_mut();
        assert_eq!(
            unsafe { snack_align(&mut out, raw.as_ptr(), 9, 1., 25., 20) },
            libc::ERANGE as isize
        );
        assert!(out.is_null());
        assert_eq!(
            unsafe { snack_align(&mut out, ptr::null(), 3, 1., 25., 20) },
            libc::EINVAL as isize
        );
        assert_eq!(
            unsafe { snack_align(&mut out, raw.as_ptr(), 3, 0., 25., 20) },
            libc::EINVAL as isize
        );
        assert_eq!(
            unsafe { snack_align(&mut out, raw.as_ptr(), 1, 1e-300, 1., 10) },
            libc::EINVAL as isize
        );
        assert!(out.is_null());
    }
}
