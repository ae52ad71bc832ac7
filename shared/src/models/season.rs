//! Seasonal stage models
//!
//! A seasonal stage maps calendar months to an expected prevalence and the
//! pests and diseases growers should look for during that period.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calendar season for mango growing in northern Australia
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Season {
    Wet,
    Flowering,
    Dry,
}

impl Season {
    /// Wet: Nov-Mar, Flowering: Apr-Jul, Dry: Aug-Oct
    pub fn for_month(month: u32) -> Self {
        match month {
            4..=7 => Season::Flowering,
            8..=10 => Season::Dry,
            _ => Season::Wet,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Wet => write!(f, "Wet Season"),
            Season::Flowering => write!(f, "Flowering Period"),
            Season::Dry => write!(f, "Dry Season"),
        }
    }
}

/// A pest or disease active during a stage, with the plant parts it affects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveThreat {
    pub name: String,
    #[serde(default)]
    pub affected_parts: Vec<String>,
}

/// Month-to-prevalence mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalStage {
    pub id: Uuid,
    pub name: String,
    pub months: Vec<u32>,
    /// Expected prevalence p in [0, 1]
    pub prevalence: Decimal,
    pub active_pests: Vec<ActiveThreat>,
    pub active_diseases: Vec<ActiveThreat>,
}

impl SeasonalStage {
    pub fn covers_month(&self, month: u32) -> bool {
        self.months.contains(&month)
    }
}

/// Parse a stored month list such as `"11,12,1"`
pub fn parse_months(raw: &str) -> Result<Vec<u32>, &'static str> {
    let mut months = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let month: u32 = part.parse().map_err(|_| "Months must be numbers")?;
        if !(1..=12).contains(&month) {
            return Err("Months must be between 1 and 12");
        }
        months.push(month);
    }
    if months.is_empty() {
        return Err("At least one month is required");
    }
    Ok(months)
}

/// Render a month list in its stored form
pub fn format_months(months: &[u32]) -> String {
    months
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Stage lookup result for one month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalInfo {
    pub stage_name: Option<String>,
    pub prevalence: Option<Decimal>,
    pub pest_names: Vec<String>,
    pub disease_names: Vec<String>,
    /// Sorted union of the parts affected by the active pests and diseases
    pub part_names: Vec<String>,
    pub month_used: u32,
}

impl SeasonalInfo {
    /// Resolve the stage for `month`. If several stages claim the month the first wins.
    pub fn for_month(stages: &[SeasonalStage], month: u32) -> Self {
        let Some(stage) = stages.iter().find(|s| s.covers_month(month)) else {
            tracing::warn!(month, "No seasonal stage configured for month");
            return SeasonalInfo {
                stage_name: None,
                prevalence: None,
                pest_names: Vec::new(),
                disease_names: Vec::new(),
                part_names: Vec::new(),
                month_used: month,
            };
        };

        let part_names: BTreeSet<String> = stage
            .active_pests
            .iter()
            .chain(stage.active_diseases.iter())
            .flat_map(|threat| threat.affected_parts.iter().cloned())
            .collect();

        SeasonalInfo {
            stage_name: Some(stage.name.clone()),
            prevalence: Some(stage.prevalence),
            pest_names: stage.active_pests.iter().map(|p| p.name.clone()).collect(),
            disease_names: stage.active_diseases.iter().map(|d| d.name.clone()).collect(),
            part_names: part_names.into_iter().collect(),
            month_used: month,
        }
    }

    /// Label stored with calculations
    pub fn season_label(&self) -> String {
        self.stage_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
