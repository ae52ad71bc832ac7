//! Shared fixtures for backend integration tests
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::{calculate_surveillance_effort, FixedClock, DEFAULT_MARGIN_OF_ERROR};
use surveillance_backend::config::SurveillanceConfig;
use surveillance_backend::models::{
    ActiveThreat, ConfidenceLevel, Farm, NewCalculation, SeasonalStage, SurveillanceCalculation,
};
use surveillance_backend::services::{
    CalculationService, FarmService, MaintenanceService, MemoryStore, SurveillanceStore,
    SurveyService,
};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 15 May 2024, inside the flowering stage
pub fn start_of_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap()
}

fn threat(name: &str, parts: &[&str]) -> ActiveThreat {
    ActiveThreat {
        name: name.to_string(),
        affected_parts: parts.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn mango_stages() -> Vec<SeasonalStage> {
    vec![
        SeasonalStage {
            id: Uuid::new_v4(),
            name: "Flowering".to_string(),
            months: vec![4, 5, 6, 7],
            prevalence: dec("0.1"),
            active_pests: vec![threat("Mango Hopper", &["Flowers", "Leaves"])],
            active_diseases: vec![threat("Powdery Mildew", &["Flowers"])],
        },
        SeasonalStage {
            id: Uuid::new_v4(),
            name: "Fruit Development".to_string(),
            months: vec![8, 9, 10],
            prevalence: dec("0.05"),
            active_pests: vec![threat("Fruit Fly", &["Fruit"])],
            active_diseases: vec![threat("Anthracnose", &["Fruit", "Leaves"])],
        },
    ]
}

/// Farm with `size_hectares × stocking_rate` plants; `None` leaves the dimension unknown
pub fn farm(size_hectares: Option<&str>, stocking_rate: Option<i32>) -> Farm {
    Farm {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Test Orchard".to_string(),
        region: Some("Chiang Mai".to_string()),
        size_hectares: size_hectares.map(dec),
        stocking_rate,
        created_at: start_of_day(),
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub settings: SurveillanceConfig,
    /// 1000 plants
    pub farm: Farm,
    pub surveyor: Uuid,
}

impl Fixture {
    /// Seeded store with the mango stages and one 1000-plant farm
    pub async fn new() -> Self {
        let fixture = Self::without_stages().await;
        for stage in mango_stages() {
            fixture.store.insert_stage(stage).await.unwrap();
        }
        fixture
    }

    /// Seeded store with no seasonal data
    pub async fn without_stages() -> Self {
        let store = Arc::new(MemoryStore::new());
        let farm = farm(Some("10"), Some(100));
        store.insert_farm(farm.clone()).await.unwrap();

        Self {
            store,
            clock: Arc::new(FixedClock::new(start_of_day())),
            settings: SurveillanceConfig::default(),
            farm,
            surveyor: Uuid::new_v4(),
        }
    }

    pub async fn add_farm(&self, size_hectares: Option<&str>, stocking_rate: Option<i32>) -> Farm {
        let farm = farm(size_hectares, stocking_rate);
        self.store.insert_farm(farm.clone()).await.unwrap();
        farm
    }

    pub fn surveys(&self) -> SurveyService {
        SurveyService::new(self.store.clone(), self.clock.clone(), self.settings.clone())
    }

    pub fn calculations(&self) -> CalculationService {
        CalculationService::new(self.store.clone(), self.clock.clone(), self.settings.clone())
    }

    pub fn maintenance(&self) -> MaintenanceService {
        MaintenanceService::new(self.store.clone(), self.clock.clone(), self.settings.clone())
    }

    pub fn farms(&self) -> FarmService {
        FarmService::new(self.store.clone(), self.clock.clone(), self.settings.clone())
    }
}

impl Fixture {
    pub fn clock_now(&self) -> DateTime<Utc> {
        use shared::Clock;
        self.clock.now()
    }

    /// Save a current calculation for the main farm made at zero prevalence
    pub async fn save_zero_calculation(&self) -> SurveillanceCalculation {
        let result = calculate_surveillance_effort(
            self.farm.total_plants(),
            ConfidenceLevel::NinetyFive,
            Decimal::ZERO,
            DEFAULT_MARGIN_OF_ERROR,
        )
        .unwrap();
        self.store
            .replace_current_calculation(
                NewCalculation {
                    farm_id: self.farm.id,
                    created_by: self.surveyor,
                    season: "Off Season".to_string(),
                    notes: None,
                    result,
                },
                self.clock_now(),
            )
            .await
            .unwrap()
    }
}
