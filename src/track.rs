//! Per-channel estimate containers.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::prelude::*;

use crate::error::{SnackError, SnackResult};

/// Formant frequency and bandwidth channels, in `.frm` column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormantChannel {
    F1,
    F2,
    F3,
    F4,
    B1,
    B2,
    B3,
    B4,
}

impl FormantChannel {
    pub const ALL: [FormantChannel; 8] = [
        Self::F1,
        Self::F2,
        Self::F3,
        Self::F4,
        Self::B1,
        Self::B2,
        Self::B3,
        Self::B4,
    ];

    /// Measurement name used by the downstream pipeline (`sF1` .. `sB4`).
    pub fn name(self) -> &'static str {
        match self {
            Self::F1 => "sF1",
            Self::F2 => "sF2",
            Self::F3 => "sF3",
            Self::F4 => "sF4",
            Self::B1 => "sB1",
            Self::B2 => "sB2",
            Self::B3 => "sB3",
            Self::B4 => "sB4",
        }
    }
}

impl fmt::Display for FormantChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormantChannel {
    type Err = SnackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ch| ch.name() == s)
            .ok_or_else(|| SnackError::InvalidParameter(format!("unknown formant channel `{s}`")))
    }
}

/// Pitch channels, in `.f0` column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchChannel {
    F0,
    Voicing,
}

impl PitchChannel {
    pub const ALL: [PitchChannel; 2] = [Self::F0, Self::Voicing];

    pub fn name(self) -> &'static str {
        match self {
            Self::F0 => "sF0",
            Self::Voicing => "sV",
        }
    }
}

impl fmt::Display for PitchChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// F0 estimates with their voicing flags.
///
/// Gateways return this un-padded, one entry per toolkit frame. After
/// alignment both series have the requested data length.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTrack {
    pub f0: Array1<f64>,
    pub voicing: Array1<f64>,
}

impl PitchTrack {
    pub fn get(&self, channel: PitchChannel) -> &Array1<f64> {
        match channel {
            PitchChannel::F0 => &self.f0,
            PitchChannel::Voicing => &self.voicing,
        }
    }

    pub fn len(&self) -> usize {
        self.f0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.f0.is_empty()
    }

    /// Rows in [`PitchChannel::ALL`] order.
    pub fn to_array(&self) -> SnackResult<Array2<f64>> {
        if self.f0.len() != self.voicing.len() {
            return Err(SnackError::InvalidParameter(format!(
                "F0 has {} frames but voicing has {}",
                self.f0.len(),
                self.voicing.len()
            )));
        }
        Ok(Array2::from_shape_fn((2, self.len()), |(i, j)| {
            self.get(PitchChannel::ALL[i])[j]
        }))
    }
}

/// Formant and bandwidth series keyed by channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormantTracks(BTreeMap<FormantChannel, Array1<f64>>);

impl FormantTracks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a `(frames, channels)` matrix into one series per column.
    pub(crate) fn from_columns(frames: ArrayView2<f64>) -> Self {
        FormantChannel::ALL
            .into_iter()
            .zip(frames.columns())
            .map(|(ch, col)| (ch, col.to_owned()))
            .collect()
    }

    pub fn insert(&mut self, channel: FormantChannel, series: Array1<f64>) -> Option<Array1<f64>> {
        self.0.insert(channel, series)
    }

    pub fn get(&self, channel: FormantChannel) -> Option<&Array1<f64>> {
        self.0.get(&channel)
    }

    /// Like [`get`](Self::get), but a missing channel is an error.
    pub fn channel(&self, channel: FormantChannel) -> SnackResult<&Array1<f64>> {
        self.get(channel).ok_or_else(|| {
            SnackError::malformed("formant tracks", format!("channel {channel} is missing"))
        })
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FormantChannel, Array1<f64>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stacks all eight channels into rows in [`FormantChannel::ALL`] order.
    pub fn to_array(&self) -> SnackResult<Array2<f64>> {
        let rows = FormantChannel::ALL
            .into_iter()
            .map(|ch| self.channel(ch).map(|x| x.view()))
            .collect::<SnackResult<Vec<_>>>()?;
        ndarray::stack(Axis(0), &rows)
            .map_err(|e| SnackError::malformed("formant tracks", e.to_string()))
    }
}

impl FromIterator<(FormantChannel, Array1<f64>)> for FormantTracks {
    fn from_iter<I: IntoIterator<Item = (FormantChannel, Array1<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FormantTracks {
    type Item = (&'a FormantChannel, &'a Array1<f64>);
    type IntoIter = btree_map::Iter<'a, FormantChannel, Array1<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
