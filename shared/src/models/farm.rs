//! Farm models

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Season;

/// A mango farm registered by a grower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub region: Option<String>,
    /// Planted area in hectares
    pub size_hectares: Option<Decimal>,
    /// Trees planted per hectare
    pub stocking_rate: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Farm {
    /// Plant population N, `floor(size_hectares × stocking_rate)`.
    ///
    /// `None` when either dimension is unknown.
    pub fn total_plants(&self) -> Option<i64> {
        let size = self.size_hectares?;
        let rate = self.stocking_rate?;
        (size * Decimal::from(rate)).floor().to_i64()
    }

    /// Calendar season the farm is in on the given day
    pub fn current_season(&self, today: NaiveDate) -> Season {
        Season::for_month(today.month())
    }
}
