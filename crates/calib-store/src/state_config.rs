use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use calib_model::{ContentDigest, ModelError, StateFingerprint};

use crate::grouping::GroupingMap;

/// Per-state configuration persisted at `<state>/stateConfig.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    pub state_id: ContentDigest,
    pub fingerprint: StateFingerprint,
    pub grouping_map: GroupingMap,
    #[serde(with = "calib_model::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl StateConfig {
    pub fn new(fingerprint: StateFingerprint, state_id: ContentDigest, grouping_map: GroupingMap) -> Self {
        Self {
            state_id,
            fingerprint,
            grouping_map,
            created_at: Utc::now(),
        }
    }

    /// Check that the nested grouping map and the fingerprint both name this
    /// state.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.grouping_map.state_id != self.state_id.as_str() {
            return Err(ModelError::StateIdentityMismatch {
                field: "groupingMap.stateId",
                expected: self.state_id.to_string(),
                found: self.grouping_map.state_id.clone(),
            });
        }
        let derived = self
            .fingerprint
            .state_id_with_len(self.state_id.as_str().len())?;
        if derived != self.state_id {
            return Err(ModelError::StateIdentityMismatch {
                field: "fingerprint",
                expected: self.state_id.to_string(),
                found: derived.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> StateFingerprint {
        StateFingerprint::from_readings(1.0, 2.0, 1.1, 1.2, 1).unwrap()
    }

    #[test]
    fn consistent_config_validates() {
        let fp = fingerprint();
        let id = fp.state_id().unwrap();
        let config = StateConfig::new(fp, id.clone(), GroupingMap::new(id.as_str()));
        config.validate().unwrap();
    }

    #[test]
    fn foreign_grouping_map_is_rejected() {
        let fp = fingerprint();
        let id = fp.state_id().unwrap();
        let config = StateConfig::new(fp, id, GroupingMap::new("ffffffffffffffff"));
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::StateIdentityMismatch {
                field: "groupingMap.stateId",
                ..
            }
        ));
    }

    #[test]
    fn fingerprint_must_hash_to_state_id() {
        let id = ContentDigest::from_hex("0123456789abcdef").unwrap();
        let config = StateConfig::new(fingerprint(), id.clone(), GroupingMap::new(id.as_str()));
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::StateIdentityMismatch {
                field: "fingerprint",
                ..
            }
        ));
    }
}
