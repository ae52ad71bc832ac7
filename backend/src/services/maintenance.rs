//! Administrative maintenance: stale-session sweeps and record repair
//!
//! Every operation supports a dry run that reports what would change without
//! writing anything. Repairs are only ever applied when explicitly invoked.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use shared::{resolve_target, unresolved_reason, validate_staleness_hours, Clock, TargetStrategy};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SurveillanceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{DurationCheck, Farm, SessionStatus, SurveySession};
use crate::services::store::SurveillanceStore;
use crate::services::survey::target_inputs;

#[derive(Clone)]
pub struct MaintenanceService {
    store: Arc<dyn SurveillanceStore>,
    clock: Arc<dyn Clock>,
    settings: SurveillanceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleSession {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub surveyor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub age_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub dry_run: bool,
    pub threshold_hours: i64,
    pub cutoff: DateTime<Utc>,
    pub stale_sessions: Vec<StaleSession>,
    pub deleted: u64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationProblem {
    Negative,
    Excessive,
    MissingEndTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationRepair {
    pub session_id: Uuid,
    pub problem: DurationProblem,
    pub observation_count: i64,
    pub old_end_time: Option<DateTime<Utc>>,
    pub new_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationRepairReport {
    pub dry_run: bool,
    pub checked: usize,
    pub repairs: Vec<DurationRepair>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRepair {
    pub session_id: Uuid,
    pub farm_id: Uuid,
    pub old_target: Option<i64>,
    pub new_target: Option<i64>,
    pub source: Option<TargetStrategy>,
    /// Set when no target could be derived
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRepairReport {
    pub dry_run: bool,
    pub status: SessionStatus,
    pub checked: usize,
    pub repaired: usize,
    pub sessions: Vec<TargetRepair>,
}

impl MaintenanceService {
    pub fn new(
        store: Arc<dyn SurveillanceStore>,
        clock: Arc<dyn Clock>,
        settings: SurveillanceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    /// Delete in-progress sessions older than `hours` (configured threshold by default)
    pub async fn sweep_stale(&self, hours: Option<i64>, dry_run: bool) -> AppResult<SweepReport> {
        let threshold_hours = hours.unwrap_or(self.settings.staleness_hours);
        validate_staleness_hours(threshold_hours)
            .map_err(|msg| AppError::validation("hours", msg))?;

        let now = self.clock.now();
        let cutoff = now - chrono::Duration::hours(threshold_hours);
        let stale_sessions: Vec<StaleSession> = self
            .store
            .stale_sessions(cutoff)
            .await?
            .into_iter()
            .map(|s| StaleSession {
                id: s.id,
                farm_id: s.farm_id,
                surveyor_id: s.surveyor_id,
                start_time: s.start_time,
                age_minutes: (now - s.start_time).num_minutes(),
            })
            .collect();

        let deleted = if dry_run {
            0
        } else {
            self.store.delete_stale_sessions(cutoff).await?
        };

        if deleted > 0 {
            tracing::info!(deleted, threshold_hours, "Stale survey sessions deleted");
        }

        Ok(SweepReport {
            dry_run,
            threshold_hours,
            cutoff,
            stale_sessions,
            deleted,
        })
    }

    /// Re-derive end times for completed sessions whose duration is implausible
    pub async fn repair_durations(&self, dry_run: bool) -> AppResult<DurationRepairReport> {
        let sessions = self.store.sessions_with_status(SessionStatus::Completed).await?;
        let checked = sessions.len();
        let mut repairs = Vec::new();

        for session in sessions {
            let problem = match (session.end_time, session.duration_check()) {
                (None, _) => DurationProblem::MissingEndTime,
                (Some(_), DurationCheck::Negative(_)) => DurationProblem::Negative,
                (Some(_), DurationCheck::Excessive(_)) => DurationProblem::Excessive,
                _ => continue,
            };

            let observation_count = self.store.observation_count(session.id).await?;
            let new_end_time = session.estimated_end_time(
                observation_count,
                self.settings.repair_minutes_per_observation,
                self.settings.repair_minimum_minutes,
            );

            if !dry_run {
                self.store
                    .update_session_end_time(session.id, new_end_time)
                    .await?;
                tracing::info!(
                    session_id = %session.id,
                    problem = ?problem,
                    old_end = ?session.end_time,
                    new_end = %new_end_time,
                    "Repaired session end time"
                );
            }

            repairs.push(DurationRepair {
                session_id: session.id,
                problem,
                observation_count,
                old_end_time: session.end_time,
                new_end_time,
            });
        }

        Ok(DurationRepairReport {
            dry_run,
            checked,
            repairs,
        })
    }

    /// Fill in missing or zero targets using the session-start strategy chain
    pub async fn repair_targets(
        &self,
        status: SessionStatus,
        dry_run: bool,
    ) -> AppResult<TargetRepairReport> {
        let sessions: Vec<SurveySession> = self
            .store
            .sessions_with_status(status)
            .await?
            .into_iter()
            .filter(|s| s.effective_target().is_none())
            .collect();

        let mut farms: HashMap<Uuid, Option<Farm>> = HashMap::new();
        let mut report = TargetRepairReport {
            dry_run,
            status,
            checked: sessions.len(),
            repaired: 0,
            sessions: Vec::with_capacity(sessions.len()),
        };

        for session in sessions {
            if !farms.contains_key(&session.farm_id) {
                let farm = self.store.farm(session.farm_id).await?;
                farms.insert(session.farm_id, farm);
            }
            let Some(Some(farm)) = farms.get(&session.farm_id) else {
                report.sessions.push(TargetRepair {
                    session_id: session.id,
                    farm_id: session.farm_id,
                    old_target: session.target_plants,
                    new_target: None,
                    source: None,
                    reason: Some("farm not found".to_string()),
                });
                continue;
            };

            let inputs = target_inputs(
                self.store.as_ref(),
                farm,
                session.start_time.month(),
                &self.settings,
            )
            .await?;

            let entry = match resolve_target(&inputs) {
                Some(resolved) => {
                    if !dry_run {
                        self.store
                            .update_session_target(session.id, resolved.target_plants)
                            .await?;
                        tracing::info!(
                            session_id = %session.id,
                            target = resolved.target_plants,
                            source = resolved.source.description(),
                            "Repaired session target"
                        );
                    }
                    report.repaired += 1;
                    TargetRepair {
                        session_id: session.id,
                        farm_id: session.farm_id,
                        old_target: session.target_plants,
                        new_target: Some(resolved.target_plants),
                        source: Some(resolved.source),
                        reason: None,
                    }
                }
                None => TargetRepair {
                    session_id: session.id,
                    farm_id: session.farm_id,
                    old_target: session.target_plants,
                    new_target: None,
                    source: None,
                    reason: Some(unresolved_reason(&inputs).to_string()),
                },
            };
            report.sessions.push(entry);
        }

        Ok(report)
    }

    /// Run the staleness sweep on a fixed interval until `cancel` fires.
    pub async fn run_sweeper(self, cancel: CancellationToken) {
        let every = std::time::Duration::from_secs(self.settings.sweep_interval_minutes * 60);
        tracing::info!(
            interval_minutes = self.settings.sweep_interval_minutes,
            threshold_hours = self.settings.staleness_hours,
            "Stale session sweeper started"
        );

        let mut interval = tokio::time::interval(every);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Stale session sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep_stale(None, false).await {
                        Ok(report) if report.deleted == 0 => {
                            tracing::debug!("Stale session sweep: nothing to delete");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Stale session sweep failed");
                        }
                    }
                }
            }
        }
    }
}
