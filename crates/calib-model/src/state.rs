//! Instrument state identity.
//!
//! Acquisition hardware reports readings with more precision than matters for
//! "same setup" comparisons, so readings are rounded before they become an
//! identity. Two runs whose readings round identically share one state and
//! therefore one set of calibration artifacts.

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::{ModelError, Result};

/// Rounded instrument configuration. Its digest names the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateFingerprint {
    #[serde(rename = "vdet_arc1")]
    pub arc_angle1: f64,
    #[serde(rename = "vdet_arc2")]
    pub arc_angle2: f64,
    #[serde(rename = "WavelengthUserReq")]
    pub wavelength_request: f64,
    #[serde(rename = "Frequency")]
    pub frequency: i64,
    #[serde(rename = "Pos")]
    pub position: i64,
}

impl StateFingerprint {
    /// Build a fingerprint from raw readings.
    ///
    /// Angles round to the nearest 0.5, the wavelength request to one decimal
    /// and the frequency to the nearest integer. Halves round away from zero.
    pub fn from_readings(
        arc1: f64,
        arc2: f64,
        wavelength_request: f64,
        frequency: f64,
        position: i64,
    ) -> Result<Self> {
        let arc1 = finite("vdet_arc1", arc1)?;
        let arc2 = finite("vdet_arc2", arc2)?;
        let wavelength_request = finite("WavelengthUserReq", wavelength_request)?;
        let frequency = finite("Frequency", frequency)?;
        Ok(Self {
            arc_angle1: round_to_step(arc1, 2.0),
            arc_angle2: round_to_step(arc2, 2.0),
            wavelength_request: round_to_step(wavelength_request, 10.0),
            frequency: frequency.round() as i64,
            position,
        })
    }

    /// The canonical state identifier.
    pub fn state_id(&self) -> Result<ContentDigest> {
        ContentDigest::from_object(self)
    }

    /// Same as [`StateFingerprint::state_id`] with a non-default digest length.
    pub fn state_id_with_len(&self, length: usize) -> Result<ContentDigest> {
        ContentDigest::from_object_with_len(self, length)
    }
}

/// Raw detector readings as reported for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorState {
    pub arc: (f64, f64),
    pub lin: (f64, f64),
    pub wav: f64,
    pub freq: f64,
    pub guide_stat: i64,
}

impl DetectorState {
    /// Reduce the readings to the fields that define a state.
    pub fn fingerprint(&self) -> Result<StateFingerprint> {
        finite("lin.0", self.lin.0)?;
        finite("lin.1", self.lin.1)?;
        StateFingerprint::from_readings(self.arc.0, self.arc.1, self.wav, self.freq, self.guide_stat)
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::InvalidReading { field, value })
    }
}

/// Round `value` to the nearest `1 / steps_per_unit`.
fn round_to_step(value: f64, steps_per_unit: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so both serialize (and hash) the same.
    (value * steps_per_unit).round() / steps_per_unit + 0.0
}
