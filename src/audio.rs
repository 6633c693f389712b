//! Output length of an analysis, derived from the input recording.

#[cfg(feature = "creak")]
use std::path::Path;

#[cfg(feature = "creak")]
use crate::error::{SnackError, SnackResult};
use crate::params::ms_to_sec;

/// Number of output samples for a recording of `n_samples` at `sample_rate`:
/// `floor(n_samples / sample_rate / frame_shift_sec)`.
pub fn data_len(n_samples: usize, sample_rate: u32, frame_shift_ms: f64) -> usize {
    (n_samples as f64 / sample_rate as f64 / ms_to_sec(frame_shift_ms)).floor() as usize
}

/// Duration facts of a decoded recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    /// samples per channel.
    pub n_samples: usize,
    pub sample_rate: u32,
}

impl AudioInfo {
    pub fn data_len(&self, frame_shift_ms: f64) -> usize {
        data_len(self.n_samples, self.sample_rate, frame_shift_ms)
    }
}

/// Decodes `path` to count its samples.
#[cfg(feature = "creak")]
pub fn probe(path: &Path) -> SnackResult<AudioInfo> {
    let decoding_error = |reason: String| SnackError::AudioDecoding {
        path: path.to_path_buf(),
        reason,
    };
    let decoder = creak::Decoder::open(path).map_err(|e| decoding_error(e.to_string()))?;
    let info = decoder.info();
    let channels = info.channels().max(1);
    let sample_rate = info.sample_rate();
    if sample_rate == 0 {
        return Err(decoding_error("sample rate is zero".into()));
    }
    let mut n_interleaved = 0usize;
    for sample in decoder
        .into_samples()
        .map_err(|e| decoding_error(e.to_string()))?
    {
        sample.map_err(|e| decoding_error(e.to_string()))?;
        n_interleaved += 1;
    }
    Ok(AudioInfo {
        n_samples: n_interleaved / channels,
        sample_rate,
    })
}
