//! Per-plant observation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observation lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    #[default]
    Completed,
}

impl ObservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ObservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ObservationStatus::Completed),
            other => Err(format!("Unknown observation status: {}", other)),
        }
    }
}

/// One plant inspected during a survey session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub observed_at: DateTime<Utc>,
    /// Unique within the session, starting at 1
    pub plant_sequence_number: i64,
    pub pest_ids: Vec<Uuid>,
    pub disease_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub status: ObservationStatus,
}

impl Observation {
    pub fn has_pests(&self) -> bool {
        !self.pest_ids.is_empty()
    }

    pub fn has_diseases(&self) -> bool {
        !self.disease_ids.is_empty()
    }
}

/// Data submitted for a new observation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationInput {
    /// Omit to take the next number in the session
    #[serde(default)]
    pub plant_sequence_number: Option<i64>,
    #[serde(default)]
    pub pest_ids: Vec<Uuid>,
    #[serde(default)]
    pub disease_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ObservationInput {
    /// Explicitly requested sequence number. Zero or negative counts as omitted.
    pub fn requested_sequence(&self) -> Option<i64> {
        self.plant_sequence_number.filter(|n| *n > 0)
    }

    pub fn into_observation(
        self,
        session_id: Uuid,
        plant_sequence_number: i64,
        observed_at: DateTime<Utc>,
    ) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            session_id,
            observed_at,
            plant_sequence_number,
            pest_ids: dedup(self.pest_ids),
            disease_ids: dedup(self.disease_ids),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            status: ObservationStatus::Completed,
        }
    }
}

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_sequence_is_treated_as_omitted() {
        let mut input = ObservationInput::default();
        assert_eq!(input.requested_sequence(), None);
        input.plant_sequence_number = Some(0);
        assert_eq!(input.requested_sequence(), None);
        input.plant_sequence_number = Some(-3);
        assert_eq!(input.requested_sequence(), None);
        input.plant_sequence_number = Some(4);
        assert_eq!(input.requested_sequence(), Some(4));
    }

    #[test]
    fn test_reference_sets_are_deduplicated() {
        let pest = Uuid::new_v4();
        let input = ObservationInput {
            plant_sequence_number: None,
            pest_ids: vec![pest, pest],
            disease_ids: vec![],
            notes: Some("   ".to_string()),
        };
        let obs = input.into_observation(Uuid::new_v4(), 1, Utc::now());
        assert_eq!(obs.pest_ids, vec![pest]);
        assert!(obs.has_pests());
        assert!(!obs.has_diseases());
        assert!(obs.notes.is_none());
        assert_eq!(obs.status, ObservationStatus::Completed);
    }
}
