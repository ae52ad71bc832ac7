//! PostgreSQL implementation of [`SurveillanceStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::SessionError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    parse_months, ActiveThreat, ConfidenceLevel, Farm, NewCalculation, Observation,
    ObservationInput, ObservationLedger, ObservationStatus, SeasonalStage, SessionStatus,
    SurveillanceCalculation, SurveySession,
};
use crate::services::store::{SessionTransition, SurveillanceStore};

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Lock the session row for the rest of the transaction
    async fn lock_session(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
    ) -> AppResult<SurveySession> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, farm_id, surveyor_id, start_time, end_time, status, target_plants
            FROM survey_sessions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(session_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Survey session".to_string()))?;

        SurveySession::try_from(row)
    }

    async fn count_observations(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
    ) -> AppResult<(i64, Option<i64>)> {
        let counts = sqlx::query_as::<_, (i64, Option<i64>)>(
            r#"
            SELECT COUNT(*), MAX(plant_sequence_number)
            FROM observations
            WHERE session_id = $1 AND status = 'completed'
            "#,
        )
        .bind(session_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(counts)
    }
}

// ── Row types ──

#[derive(Debug, sqlx::FromRow)]
struct FarmRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    region: Option<String>,
    size_hectares: Option<Decimal>,
    stocking_rate: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<FarmRow> for Farm {
    fn from(row: FarmRow) -> Self {
        Farm {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            region: row.region,
            size_hectares: row.size_hectares,
            stocking_rate: row.stocking_rate,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StageRow {
    id: Uuid,
    name: String,
    months: String,
    prevalence: Decimal,
    active_pests: Json<Vec<ActiveThreat>>,
    active_diseases: Json<Vec<ActiveThreat>>,
}

impl TryFrom<StageRow> for SeasonalStage {
    type Error = AppError;

    fn try_from(row: StageRow) -> Result<Self, Self::Error> {
        let months = parse_months(&row.months).map_err(|msg| {
            AppError::CorruptRecord(format!("seasonal stage {}: {}", row.name, msg))
        })?;

        Ok(SeasonalStage {
            id: row.id,
            name: row.name,
            months,
            prevalence: row.prevalence,
            active_pests: row.active_pests.0,
            active_diseases: row.active_diseases.0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CalculationRow {
    id: Uuid,
    farm_id: Uuid,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    season: String,
    confidence_level: i32,
    population_size: i64,
    prevalence: Decimal,
    margin_of_error: Decimal,
    required_plants: i64,
    percentage_of_total: Decimal,
    survey_frequency: Option<i64>,
    is_current: bool,
    notes: Option<String>,
}

impl From<CalculationRow> for SurveillanceCalculation {
    fn from(row: CalculationRow) -> Self {
        SurveillanceCalculation {
            id: row.id,
            farm_id: row.farm_id,
            created_by: row.created_by,
            created_at: row.created_at,
            season: row.season,
            confidence_level: ConfidenceLevel::from_percent(i64::from(row.confidence_level)),
            population_size: row.population_size,
            prevalence: row.prevalence,
            margin_of_error: row.margin_of_error,
            required_plants: row.required_plants,
            percentage_of_total: row.percentage_of_total,
            survey_frequency: row.survey_frequency,
            is_current: row.is_current,
            notes: row.notes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    farm_id: Uuid,
    surveyor_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: String,
    target_plants: Option<i64>,
}

impl TryFrom<SessionRow> for SurveySession {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<SessionStatus>().map_err(|_| {
            AppError::CorruptRecord(format!("session {} has status '{}'", row.id, row.status))
        })?;

        Ok(SurveySession {
            id: row.id,
            farm_id: row.farm_id,
            surveyor_id: row.surveyor_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            target_plants: row.target_plants,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ObservationRow {
    id: Uuid,
    session_id: Uuid,
    observed_at: DateTime<Utc>,
    plant_sequence_number: i64,
    pest_ids: Vec<Uuid>,
    disease_ids: Vec<Uuid>,
    notes: Option<String>,
    status: String,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = AppError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<ObservationStatus>().map_err(|_| {
            AppError::CorruptRecord(format!("observation {} has status '{}'", row.id, row.status))
        })?;

        Ok(Observation {
            id: row.id,
            session_id: row.session_id,
            observed_at: row.observed_at,
            plant_sequence_number: row.plant_sequence_number,
            pest_ids: row.pest_ids,
            disease_ids: row.disease_ids,
            notes: row.notes,
            status,
        })
    }
}

fn into_sessions(rows: Vec<SessionRow>) -> AppResult<Vec<SurveySession>> {
    rows.into_iter().map(SurveySession::try_from).collect()
}

fn into_observations(rows: Vec<ObservationRow>) -> AppResult<Vec<Observation>> {
    rows.into_iter().map(Observation::try_from).collect()
}

/// A concurrent insert took the same plant number
fn sequence_conflict(err: sqlx::Error, sequence: i64) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return SessionError::SequenceInUse(sequence).into();
        }
    }
    err.into()
}

#[async_trait]
impl SurveillanceStore for PgStore {
    async fn farm(&self, farm_id: Uuid) -> AppResult<Option<Farm>> {
        let row = sqlx::query_as::<_, FarmRow>(
            r#"
            SELECT id, owner_id, name, region, size_hectares, stocking_rate, created_at
            FROM farms
            WHERE id = $1
            "#,
        )
        .bind(farm_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Farm::from))
    }

    async fn seasonal_stages(&self) -> AppResult<Vec<SeasonalStage>> {
        let rows = sqlx::query_as::<_, StageRow>(
            r#"
            SELECT id, name, months, prevalence, active_pests, active_diseases
            FROM seasonal_stages
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(SeasonalStage::try_from).collect()
    }

    async fn current_calculation(
        &self,
        farm_id: Uuid,
    ) -> AppResult<Option<SurveillanceCalculation>> {
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, farm_id, created_by, created_at, season, confidence_level,
                   population_size, prevalence, margin_of_error, required_plants,
                   percentage_of_total, survey_frequency, is_current, notes
            FROM surveillance_calculations
            WHERE farm_id = $1 AND is_current
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(farm_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(SurveillanceCalculation::from))
    }

    async fn calculations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveillanceCalculation>> {
        let rows = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, farm_id, created_by, created_at, season, confidence_level,
                   population_size, prevalence, margin_of_error, required_plants,
                   percentage_of_total, survey_frequency, is_current, notes
            FROM surveillance_calculations
            WHERE farm_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SurveillanceCalculation::from).collect())
    }

    async fn replace_current_calculation(
        &self,
        calculation: NewCalculation,
        created_at: DateTime<Utc>,
    ) -> AppResult<SurveillanceCalculation> {
        let mut tx = self.db.begin().await?;

        // Serialises concurrent submissions for the same farm
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM farms WHERE id = $1 FOR UPDATE")
            .bind(calculation.farm_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        sqlx::query(
            r#"
            UPDATE surveillance_calculations
            SET is_current = FALSE
            WHERE farm_id = $1 AND is_current
            "#,
        )
        .bind(calculation.farm_id)
        .execute(&mut *tx)
        .await?;

        let record = calculation.into_record(Uuid::new_v4(), created_at);
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            INSERT INTO surveillance_calculations (
                id, farm_id, created_by, created_at, season, confidence_level,
                population_size, prevalence, margin_of_error, required_plants,
                percentage_of_total, survey_frequency, is_current, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13)
            RETURNING id, farm_id, created_by, created_at, season, confidence_level,
                      population_size, prevalence, margin_of_error, required_plants,
                      percentage_of_total, survey_frequency, is_current, notes
            "#,
        )
        .bind(record.id)
        .bind(record.farm_id)
        .bind(record.created_by)
        .bind(record.created_at)
        .bind(&record.season)
        .bind(record.confidence_level.percent() as i32)
        .bind(record.population_size)
        .bind(record.prevalence)
        .bind(record.margin_of_error)
        .bind(record.required_plants)
        .bind(record.percentage_of_total)
        .bind(record.survey_frequency)
        .bind(&record.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SurveillanceCalculation::from(row))
    }

    async fn insert_session(&self, session: &SurveySession) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO survey_sessions (id, farm_id, surveyor_id, start_time, end_time, status, target_plants)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id)
        .bind(session.farm_id)
        .bind(session.surveyor_id)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.status.as_str())
        .bind(session.target_plants)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn session(&self, session_id: Uuid) -> AppResult<Option<SurveySession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, farm_id, surveyor_id, start_time, end_time, status, target_plants
            FROM survey_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(SurveySession::try_from).transpose()
    }

    async fn sessions_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveySession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, farm_id, surveyor_id, start_time, end_time, status, target_plants
            FROM survey_sessions
            WHERE farm_id = $1
            ORDER BY start_time DESC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        into_sessions(rows)
    }

    async fn sessions_with_status(&self, status: SessionStatus) -> AppResult<Vec<SurveySession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, farm_id, surveyor_id, start_time, end_time, status, target_plants
            FROM survey_sessions
            WHERE status = $1
            ORDER BY start_time DESC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await?;

        into_sessions(rows)
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM survey_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_active_sessions(&self, farm_id: Uuid, surveyor_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM survey_sessions
            WHERE farm_id = $1 AND surveyor_id = $2 AND status = 'in_progress'
            "#,
        )
        .bind(farm_id)
        .bind(surveyor_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<SurveySession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, farm_id, surveyor_id, start_time, end_time, status, target_plants
            FROM survey_sessions
            WHERE status = 'in_progress' AND start_time < $1
            ORDER BY start_time
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        into_sessions(rows)
    }

    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM survey_sessions
            WHERE status = 'in_progress' AND start_time < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn transition_session(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
        at: DateTime<Utc>,
    ) -> AppResult<SurveySession> {
        let mut tx = self.db.begin().await?;
        let mut session = Self::lock_session(&mut tx, session_id).await?;

        match transition {
            SessionTransition::Finish => {
                let (observed, _) = Self::count_observations(&mut tx, session_id).await?;
                session.finish(observed, at)?;
            }
            SessionTransition::Abandon => session.abandon(at)?,
        }

        sqlx::query(
            r#"
            UPDATE survey_sessions
            SET status = $2, end_time = $3
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(session.end_time)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    async fn update_session_end_time(
        &self,
        session_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE survey_sessions SET end_time = $2 WHERE id = $1")
            .bind(session_id)
            .bind(end_time)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Survey session".to_string()));
        }
        Ok(())
    }

    async fn update_session_target(&self, session_id: Uuid, target_plants: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE survey_sessions SET target_plants = $2 WHERE id = $1")
            .bind(session_id)
            .bind(target_plants)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Survey session".to_string()));
        }
        Ok(())
    }

    async fn append_observation(
        &self,
        session_id: Uuid,
        input: ObservationInput,
        at: DateTime<Utc>,
    ) -> AppResult<Observation> {
        let mut tx = self.db.begin().await?;
        let session = Self::lock_session(&mut tx, session_id).await?;
        let (observed, max_sequence) = Self::count_observations(&mut tx, session_id).await?;

        let requested = input.requested_sequence();
        let requested_taken = match requested {
            Some(number) => {
                sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM observations
                        WHERE session_id = $1 AND plant_sequence_number = $2
                    )
                    "#,
                )
                .bind(session_id)
                .bind(number)
                .fetch_one(&mut *tx)
                .await?
            }
            None => false,
        };

        let ledger = ObservationLedger {
            observed,
            max_sequence,
            requested_taken,
        };
        let sequence = session.plan_observation(&ledger, requested)?;
        let observation = input.into_observation(session_id, sequence, at);

        sqlx::query(
            r#"
            INSERT INTO observations (
                id, session_id, observed_at, plant_sequence_number,
                pest_ids, disease_ids, notes, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(observation.id)
        .bind(observation.session_id)
        .bind(observation.observed_at)
        .bind(observation.plant_sequence_number)
        .bind(&observation.pest_ids)
        .bind(&observation.disease_ids)
        .bind(&observation.notes)
        .bind(observation.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| sequence_conflict(e, sequence))?;

        tx.commit().await?;

        Ok(observation)
    }

    async fn observations(&self, session_id: Uuid) -> AppResult<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, session_id, observed_at, plant_sequence_number,
                   pest_ids, disease_ids, notes, status
            FROM observations
            WHERE session_id = $1
            ORDER BY plant_sequence_number, observed_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        into_observations(rows)
    }

    async fn observation_count(&self, session_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM observations WHERE session_id = $1 AND status = 'completed'",
        )
        .bind(session_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn completed_observations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT o.id, o.session_id, o.observed_at, o.plant_sequence_number,
                   o.pest_ids, o.disease_ids, o.notes, o.status
            FROM observations o
            JOIN survey_sessions s ON s.id = o.session_id
            WHERE s.farm_id = $1 AND s.status = 'completed' AND o.status = 'completed'
            ORDER BY o.observed_at
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        into_observations(rows)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
