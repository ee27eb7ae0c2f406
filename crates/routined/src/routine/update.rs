//! Wire and canonical types for device updates.
//!
//! The language model's reply is decoded in two stages: first into the
//! loosely-typed `Raw*` shapes (which tolerate the casing and boolean
//! inconsistencies models actually produce), then normalized into the
//! strongly-typed [`DeviceUpdate`]. Nothing downstream of the normalizer
//! ever sees an untyped map.

use serde::Deserialize;
use serde::Serialize;

/// Canonical on/off switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    /// Canonicalize a raw onoff string: anything matching "off"
    /// case-insensitively is `Off`, everything else is `On`.
    pub fn canonicalize(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("off") {
            OnOff::Off
        } else {
            OnOff::On
        }
    }
}

/// The outer shape the language model is instructed to produce.
///
/// A reply without an `updates` array is malformed and rejected outright.
#[derive(Debug, Clone, Deserialize)]
pub struct RawParse {
    pub updates: Vec<RawUpdate>,
}

/// One update entry as emitted by the language model, before validation.
///
/// Field types are deliberately loose: `onoff` arrives in mixed case and
/// `is_active` arrives as `true`, `"True"`, or `"true"` depending on the
/// model's mood. Every field must still be present; a missing field fails
/// the decode.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUpdate {
    pub appliance_id: i64,
    pub user_id: i64,
    pub name: String,
    pub onoff: String,
    pub state: String,
    pub is_active: serde_json::Value,
}

/// One normalized state assertion for one appliance.
///
/// Invariants (enforced by the normalizer):
/// - `onoff == Off` implies `is_active == false` and `state` is the standby
///   sentinel; `onoff == On` implies `is_active == true`.
/// - at most one update per `appliance_id` within a parse result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceUpdate {
    pub appliance_id: u32,
    pub user_id: i64,
    pub name: String,
    pub onoff: OnOff,
    pub state: String,
    pub is_active: bool,
}

/// The pipeline's final output: normalized updates plus the original
/// routine sentence, kept for audit and display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineParseResult {
    pub updates: Vec<DeviceUpdate>,
    pub routine: String,
}
