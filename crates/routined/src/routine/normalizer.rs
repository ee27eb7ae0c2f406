//! Post-processing of raw language-model output into canonical updates.

use std::collections::HashMap;

use crate::catalog;
use crate::catalog::STANDBY_STATE;

use super::error::ParseFailure;
use super::update::DeviceUpdate;
use super::update::OnOff;
use super::update::RawParse;

/// How the normalizer treats entries that violate catalog or uniqueness
/// invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Unknown appliance ids are dropped with a warning; when the same id
    /// appears twice, the later entry overwrites the earlier one in place.
    #[default]
    Lenient,

    /// Any unknown or duplicated appliance id fails the whole parse.
    Strict,
}

/// Normalize raw update entries into the canonical, invariant-satisfying
/// sequence.
///
/// Canonicalization rules:
/// - `onoff` is compared case-insensitively; "off" becomes canonical off,
///   everything else canonical on.
/// - off forces `state` to [`STANDBY_STATE`] and `is_active` to false.
/// - on keeps the supplied `state` (whitespace-trimmed) and forces
///   `is_active` to true. The raw `is_active` value is ignored entirely;
///   it is derived from the canonical onoff.
///
/// Device ordering follows first appearance in the raw sequence. Under
/// [`Policy::Lenient`], a duplicated id keeps its first-appearance position
/// but takes the value of its last occurrence.
pub fn normalize(raw: RawParse, policy: Policy) -> Result<Vec<DeviceUpdate>, ParseFailure> {
    let mut order: Vec<u32> = Vec::new();
    let mut by_id: HashMap<u32, DeviceUpdate> = HashMap::new();

    for entry in raw.updates {
        let id = match u32::try_from(entry.appliance_id)
            .ok()
            .filter(|id| catalog::get(*id).is_some())
        {
            Some(id) => id,
            None => match policy {
                Policy::Lenient => {
                    tracing::warn!(
                        appliance_id = entry.appliance_id,
                        name = %entry.name,
                        "dropping update for unknown appliance"
                    );
                    continue;
                }
                Policy::Strict => {
                    return Err(ParseFailure::Validation(format!(
                        "unknown appliance_id {} ({})",
                        entry.appliance_id, entry.name
                    )));
                }
            },
        };

        let onoff = OnOff::canonicalize(&entry.onoff);
        let (state, is_active) = match onoff {
            OnOff::Off => (STANDBY_STATE.to_string(), false),
            OnOff::On => (entry.state.trim().to_string(), true),
        };

        let update = DeviceUpdate {
            appliance_id: id,
            user_id: entry.user_id,
            name: entry.name,
            onoff,
            state,
            is_active,
        };

        if by_id.insert(id, update).is_some() {
            if policy == Policy::Strict {
                return Err(ParseFailure::Validation(format!(
                    "duplicate update for appliance_id {id}"
                )));
            }
            tracing::debug!(appliance_id = id, "duplicate appliance update, last wins");
        } else {
            order.push(id);
        }
    }

    Ok(order.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::update::RawUpdate;

    fn raw(appliance_id: i64, name: &str, onoff: &str, state: &str) -> RawUpdate {
        RawUpdate {
            appliance_id,
            user_id: 6,
            name: name.to_string(),
            onoff: onoff.to_string(),
            state: state.to_string(),
            is_active: serde_json::json!("True"),
        }
    }

    #[test]
    fn test_on_and_off_entries() {
        let input = RawParse {
            updates: vec![
                raw(1, "에어컨", "ON", "26도"),
                raw(4, "TV", "OFF", "영화 모드"),
            ],
        };

        let updates = normalize(input, Policy::Lenient).unwrap();
        assert_eq!(updates.len(), 2);

        assert_eq!(updates[0].appliance_id, 1);
        assert_eq!(updates[0].onoff, OnOff::On);
        assert_eq!(updates[0].state, "26도");
        assert!(updates[0].is_active);

        assert_eq!(updates[1].appliance_id, 4);
        assert_eq!(updates[1].onoff, OnOff::Off);
        assert_eq!(updates[1].state, STANDBY_STATE);
        assert!(!updates[1].is_active);
    }

    #[test]
    fn test_onoff_casing_normalizes_identically() {
        for casing in ["off", "OFF", "Off"] {
            let input = RawParse {
                updates: vec![raw(4, "TV", casing, "영화 모드")],
            };
            let updates = normalize(input, Policy::Lenient).unwrap();
            assert_eq!(updates[0].onoff, OnOff::Off);
            assert_eq!(updates[0].state, STANDBY_STATE);
            assert!(!updates[0].is_active);
        }
    }

    #[test]
    fn test_onoff_and_is_active_always_consistent() {
        let input = RawParse {
            updates: vec![
                raw(1, "에어컨", "ON", "26도"),
                raw(2, "공기청정기", "on", "강풍"),
                raw(4, "TV", "OFF", "영화 모드"),
            ],
        };

        for update in normalize(input, Policy::Lenient).unwrap() {
            assert_eq!(update.is_active, update.onoff == OnOff::On);
            if update.onoff == OnOff::Off {
                assert_eq!(update.state, STANDBY_STATE);
            }
        }
    }

    #[test]
    fn test_on_state_is_trimmed() {
        let input = RawParse {
            updates: vec![raw(2, "공기청정기", "ON", "  강풍  ")],
        };
        let updates = normalize(input, Policy::Lenient).unwrap();
        assert_eq!(updates[0].state, "강풍");
    }

    #[test]
    fn test_unknown_appliance_is_dropped_by_default() {
        let input = RawParse {
            updates: vec![
                raw(999, "커튼", "ON", "열기"),
                raw(5, "조명", "ON", "밝게"),
            ],
        };
        let updates = normalize(input, Policy::Lenient).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].appliance_id, 5);
    }

    #[test]
    fn test_unknown_appliance_fails_in_strict_mode() {
        let input = RawParse {
            updates: vec![raw(999, "커튼", "ON", "열기")],
        };
        let err = normalize(input, Policy::Strict).unwrap_err();
        assert!(matches!(err, ParseFailure::Validation(_)));
    }

    #[test]
    fn test_negative_appliance_id_is_unknown() {
        let input = RawParse {
            updates: vec![raw(-1, "에어컨", "ON", "26도")],
        };
        let updates = normalize(input, Policy::Lenient).unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn test_duplicate_appliance_last_wins() {
        let input = RawParse {
            updates: vec![
                raw(2, "공기청정기", "ON", "약풍"),
                raw(5, "조명", "ON", "밝게"),
                raw(2, "공기청정기", "ON", "강풍"),
            ],
        };

        let updates = normalize(input, Policy::Lenient).unwrap();
        assert_eq!(updates.len(), 2);
        // first-appearance position, last-occurrence value
        assert_eq!(updates[0].appliance_id, 2);
        assert_eq!(updates[0].state, "강풍");
        assert_eq!(updates[1].appliance_id, 5);
    }

    #[test]
    fn test_duplicate_appliance_fails_in_strict_mode() {
        let input = RawParse {
            updates: vec![
                raw(2, "공기청정기", "ON", "약풍"),
                raw(2, "공기청정기", "ON", "강풍"),
            ],
        };
        let err = normalize(input, Policy::Strict).unwrap_err();
        assert!(matches!(err, ParseFailure::Validation(_)));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let updates = vec![
            raw(1, "에어컨", "on", " 냉방 모드 "),
            raw(4, "TV", "Off", "영화 모드"),
            raw(1, "에어컨", "ON", "26도"),
        ];

        let first = normalize(RawParse { updates: updates.clone() }, Policy::Lenient).unwrap();
        let second = normalize(RawParse { updates }, Policy::Lenient).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let input = RawParse {
            updates: vec![
                raw(1, "에어컨", "ON", " 26도 "),
                raw(4, "TV", "OFF", "영화 모드"),
            ],
        };
        let once = normalize(input, Policy::Lenient).unwrap();

        // Feed the normalized output back through as raw entries.
        let again = RawParse {
            updates: once
                .iter()
                .map(|u| RawUpdate {
                    appliance_id: u.appliance_id as i64,
                    user_id: u.user_id,
                    name: u.name.clone(),
                    onoff: u.onoff.to_string(),
                    state: u.state.clone(),
                    is_active: serde_json::json!(u.is_active),
                })
                .collect(),
        };
        let twice = normalize(again, Policy::Lenient).unwrap();
        assert_eq!(once, twice);
    }
}
