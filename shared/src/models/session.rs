//! Survey session state machine
//!
//! A session moves from `in_progress` to either `completed` or `abandoned`
//! and never leaves a terminal state. Observation counts are supplied by the
//! caller, which reads them under the same lock it writes with.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

use super::Observation;

/// Sessions running longer than a day are treated as bad data
pub const MAX_PLAUSIBLE_DURATION_MINUTES: f64 = 1440.0;

/// Survey session status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(format!("Unknown session status: {}", other)),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::InProgress => write!(f, "In Progress"),
            SessionStatus::Completed => write!(f, "Completed"),
            SessionStatus::Abandoned => write!(f, "Abandoned"),
        }
    }
}

/// Outcome of checking a session's elapsed time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationCheck {
    /// Still running, or no end time recorded
    Open,
    /// Plausible duration in minutes, one decimal place
    Minutes(f64),
    Negative(f64),
    Excessive(f64),
}

impl DurationCheck {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, DurationCheck::Negative(_) | DurationCheck::Excessive(_))
    }
}

/// Observation bookkeeping read from storage while the session is locked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationLedger {
    pub observed: i64,
    pub max_sequence: Option<i64>,
    /// Whether the explicitly requested sequence number already exists
    pub requested_taken: bool,
}

/// A timed round of plant inspections on one farm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySession {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub surveyor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub target_plants: Option<i64>,
}

impl SurveySession {
    pub fn start(
        farm_id: Uuid,
        surveyor_id: Uuid,
        target_plants: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            farm_id,
            surveyor_id,
            start_time: now,
            end_time: None,
            status: SessionStatus::InProgress,
            target_plants,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// Target that constrains recording and finishing; zero means no target
    pub fn effective_target(&self) -> Option<i64> {
        self.target_plants.filter(|t| *t > 0)
    }

    /// Still running after `threshold`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.is_active() && self.start_time < now - threshold
    }

    pub fn duration_check(&self) -> DurationCheck {
        if !self.status.is_terminal() {
            return DurationCheck::Open;
        }
        let Some(end) = self.end_time else {
            return DurationCheck::Open;
        };

        let minutes = (end - self.start_time).num_milliseconds() as f64 / 60_000.0;
        if minutes < 0.0 {
            DurationCheck::Negative(minutes)
        } else if minutes > MAX_PLAUSIBLE_DURATION_MINUTES {
            DurationCheck::Excessive(minutes)
        } else {
            DurationCheck::Minutes((minutes * 10.0).round() / 10.0)
        }
    }

    /// Elapsed minutes for finished sessions. Implausible values are logged and hidden.
    pub fn duration_minutes(&self) -> Option<f64> {
        match self.duration_check() {
            DurationCheck::Open => None,
            DurationCheck::Minutes(m) => Some(m),
            DurationCheck::Negative(m) => {
                tracing::warn!(
                    session_id = %self.id,
                    start = %self.start_time,
                    end = ?self.end_time,
                    minutes = m,
                    "Negative session duration detected"
                );
                None
            }
            DurationCheck::Excessive(m) => {
                tracing::warn!(session_id = %self.id, minutes = m, "Unrealistic session duration detected");
                None
            }
        }
    }

    /// `"N/A"`, `"42 min"`, `"2h"` or `"1h 5m"`
    pub fn duration_display(&self) -> String {
        let Some(minutes) = self.duration_minutes() else {
            return "N/A".to_string();
        };
        if minutes < 60.0 {
            return format!("{} min", minutes as i64);
        }
        let hours = (minutes / 60.0).floor() as i64;
        let rest = (minutes % 60.0) as i64;
        if rest == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, rest)
        }
    }

    /// Percent of the target covered, 0 without a target
    pub fn progress_percentage(&self, observed: i64) -> u8 {
        match self.effective_target() {
            Some(target) => ((observed.max(0) * 100) / target).clamp(0, 100) as u8,
            None => 0,
        }
    }

    pub fn can_finish(&self, observed: i64) -> bool {
        match self.effective_target() {
            Some(target) => observed >= target,
            None => observed > 0,
        }
    }

    pub fn remaining_plants(&self, observed: i64) -> i64 {
        self.effective_target()
            .map(|target| (target - observed).max(0))
            .unwrap_or(0)
    }

    /// Validate a new observation and pick its plant sequence number.
    pub fn plan_observation(
        &self,
        ledger: &ObservationLedger,
        requested: Option<i64>,
    ) -> Result<i64, SessionError> {
        self.ensure_active()?;

        if let Some(target) = self.effective_target() {
            if ledger.observed >= target {
                return Err(SessionError::TargetReached { target });
            }
        }

        match requested.filter(|n| *n > 0) {
            Some(number) if ledger.requested_taken => Err(SessionError::SequenceInUse(number)),
            Some(number) => Ok(number),
            None => Ok(ledger.max_sequence.unwrap_or(0) + 1),
        }
    }

    /// Complete the session once exactly the target has been observed.
    pub fn finish(&mut self, observed: i64, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;

        match self.effective_target() {
            Some(target) if observed < target => {
                return Err(SessionError::NotEnoughObservations { observed, target });
            }
            Some(target) if observed > target => {
                tracing::warn!(
                    session_id = %self.id,
                    observed,
                    target,
                    "Session has more observations than its target"
                );
                return Err(SessionError::OverCollected { observed, target });
            }
            None if observed == 0 => return Err(SessionError::NoObservations),
            _ => {}
        }

        self.status = SessionStatus::Completed;
        self.end_time = Some(now);
        Ok(())
    }

    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.status = SessionStatus::Abandoned;
        self.end_time = Some(now);
        Ok(())
    }

    /// Plausible end time derived from the observation count, for repairing bad records
    pub fn estimated_end_time(
        &self,
        observed: i64,
        minutes_per_observation: i64,
        minimum_minutes: i64,
    ) -> DateTime<Utc> {
        let minutes = (observed * minutes_per_observation).max(minimum_minutes);
        self.start_time + Duration::minutes(minutes)
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotActive {
                status: self.status.to_string(),
            })
        }
    }
}

/// Read model combining a session with its observations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub surveyor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub duration_minutes: Option<f64>,
    pub duration_display: String,
    pub observation_count: i64,
    pub target_plants: Option<i64>,
    pub progress_percentage: u8,
    pub remaining_plants: i64,
    pub unique_pests_count: usize,
    pub unique_diseases_count: usize,
    pub has_issues: bool,
    pub can_finish: bool,
}

impl SessionSummary {
    pub fn build(session: &SurveySession, observations: &[Observation]) -> Self {
        let observed = observations.len() as i64;
        let pests: HashSet<Uuid> = observations
            .iter()
            .flat_map(|o| o.pest_ids.iter().copied())
            .collect();
        let diseases: HashSet<Uuid> = observations
            .iter()
            .flat_map(|o| o.disease_ids.iter().copied())
            .collect();

        SessionSummary {
            id: session.id,
            farm_id: session.farm_id,
            surveyor_id: session.surveyor_id,
            start_time: session.start_time,
            end_time: session.end_time,
            status: session.status,
            duration_minutes: session.duration_minutes(),
            duration_display: session.duration_display(),
            observation_count: observed,
            target_plants: session.target_plants,
            progress_percentage: session.progress_percentage(observed),
            remaining_plants: session.remaining_plants(observed),
            unique_pests_count: pests.len(),
            unique_diseases_count: diseases.len(),
            has_issues: !pests.is_empty() || !diseases.is_empty(),
            can_finish: session.is_active() && session.can_finish(observed),
        }
    }
}
