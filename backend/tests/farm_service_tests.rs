//! Farm overview and statistics tests

mod common;

use chrono::Duration;
use common::Fixture;
use shared::SurveillanceStatus;
use surveillance_backend::error::AppError;
use surveillance_backend::models::{ObservationInput, Season};
use uuid::Uuid;

/// Run a complete one-plant session on a 1-plant farm
async fn completed_round(fx: &Fixture, farm_id: Uuid, input: ObservationInput) {
    let surveys = fx.surveys();
    let session = surveys.start_session(farm_id, Uuid::new_v4()).await.unwrap().session;
    surveys.record_observation(session.id, input).await.unwrap();
    surveys.finish(session.id).await.unwrap();
}

#[tokio::test]
async fn test_never_surveyed_farm() {
    let fx = Fixture::new().await;

    let overview = fx.farms().surveillance(fx.farm.id).await.unwrap();

    assert_eq!(overview.total_plants, Some(1000));
    assert_eq!(overview.season, Season::Flowering);
    assert_eq!(overview.seasonal.stage_name.as_deref(), Some("Flowering"));
    assert_eq!(overview.seasonal.part_names, vec!["Flowers", "Leaves"]);
    assert_eq!(overview.compliance.status, SurveillanceStatus::NeverSurveyed);
    assert_eq!(overview.compliance.next_due_date, fx.clock_now().date_naive());
    assert!(overview.current_calculation.is_none());
}

#[tokio::test]
async fn test_compliance_follows_last_completed_session() {
    let fx = Fixture::without_stages().await;
    let tiny = fx.add_farm(Some("0.1"), Some(10)).await;
    completed_round(&fx, tiny.id, ObservationInput::default()).await;
    let finished_on = fx.clock_now().date_naive();

    let farms = fx.farms();
    let overview = farms.surveillance(tiny.id).await.unwrap();
    assert_eq!(overview.compliance.status, SurveillanceStatus::UpToDate);
    assert_eq!(overview.compliance.days_since_last, Some(0));
    assert_eq!(overview.compliance.next_due_date, finished_on + Duration::days(14));

    fx.clock.advance(Duration::days(12));
    let overview = farms.surveillance(tiny.id).await.unwrap();
    assert_eq!(overview.compliance.status, SurveillanceStatus::DueSoon);

    fx.clock.advance(Duration::days(3));
    let overview = farms.surveillance(tiny.id).await.unwrap();
    assert_eq!(overview.compliance.status, SurveillanceStatus::Overdue);
    assert_eq!(overview.compliance.next_due_date, fx.clock_now().date_naive());
}

#[tokio::test]
async fn test_abandoned_sessions_do_not_count_as_surveillance() {
    let fx = Fixture::new().await;
    let surveys = fx.surveys();
    let session = surveys.start_session(fx.farm.id, fx.surveyor).await.unwrap().session;
    surveys.abandon(session.id).await.unwrap();

    let overview = fx.farms().surveillance(fx.farm.id).await.unwrap();

    assert_eq!(overview.compliance.status, SurveillanceStatus::NeverSurveyed);
}

#[tokio::test]
async fn test_farm_stats() {
    let fx = Fixture::without_stages().await;
    let tiny = fx.add_farm(Some("0.1"), Some(10)).await;
    let hopper = Uuid::new_v4();
    let weevil = Uuid::new_v4();
    let anthracnose = Uuid::new_v4();

    completed_round(
        &fx,
        tiny.id,
        ObservationInput {
            pest_ids: vec![hopper, weevil],
            disease_ids: vec![anthracnose],
            ..Default::default()
        },
    )
    .await;
    fx.clock.advance(Duration::days(40));
    completed_round(
        &fx,
        tiny.id,
        ObservationInput {
            pest_ids: vec![hopper],
            ..Default::default()
        },
    )
    .await;

    // In-progress sessions are not counted
    let open = fx.surveys().start_session(tiny.id, fx.surveyor).await.unwrap().session;
    fx.surveys()
        .record_observation(
            open.id,
            ObservationInput {
                pest_ids: vec![weevil],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stats = fx.farms().stats(tiny.id).await.unwrap();

    assert_eq!(stats.completed_sessions, 2);
    assert_eq!(stats.completed_observations, 2);
    assert_eq!(stats.recent_window_days, 30);
    assert_eq!(stats.recent_sessions, 1);
    assert_eq!(stats.top_pests[0].id, hopper);
    assert_eq!(stats.top_pests[0].occurrences, 2);
    assert_eq!(stats.top_pests[1].id, weevil);
    assert_eq!(stats.top_pests[1].occurrences, 1);
    assert_eq!(stats.top_diseases.len(), 1);
}

#[tokio::test]
async fn test_unknown_farm() {
    let fx = Fixture::new().await;

    assert!(matches!(
        fx.farms().surveillance(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.farms().stats(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}
