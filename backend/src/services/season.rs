//! Seasonal stage lookup

use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;
use shared::Clock;

use crate::error::{AppError, AppResult};
use crate::models::{Season, SeasonalInfo};
use crate::services::store::SurveillanceStore;

#[derive(Clone)]
pub struct SeasonService {
    store: Arc<dyn SurveillanceStore>,
    clock: Arc<dyn Clock>,
}

/// Stage lookup plus the calendar season for the same month
#[derive(Debug, Clone, Serialize)]
pub struct SeasonOverview {
    pub season: Season,
    #[serde(flatten)]
    pub info: SeasonalInfo,
}

impl SeasonService {
    pub fn new(store: Arc<dyn SurveillanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stage information for the month the clock is in
    pub async fn current_info(&self) -> AppResult<SeasonalInfo> {
        let month = self.clock.now().month();
        let stages = self.store.seasonal_stages().await?;
        Ok(SeasonalInfo::for_month(&stages, month))
    }

    /// Stage information for an explicit month (1-12), defaulting to the current one
    pub async fn overview(&self, month: Option<u32>) -> AppResult<SeasonOverview> {
        let month = match month {
            Some(m) if (1..=12).contains(&m) => m,
            Some(_) => return Err(AppError::validation("month", "Month must be between 1 and 12")),
            None => self.clock.now().month(),
        };

        let stages = self.store.seasonal_stages().await?;
        Ok(SeasonOverview {
            season: Season::for_month(month),
            info: SeasonalInfo::for_month(&stages, month),
        })
    }
}
