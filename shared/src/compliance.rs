//! Recurring surveillance schedule

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a farm stands against its inspection cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurveillanceStatus {
    NeverSurveyed,
    Overdue,
    DueSoon,
    UpToDate,
}

impl std::fmt::Display for SurveillanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveillanceStatus::NeverSurveyed => write!(f, "Never Surveyed"),
            SurveillanceStatus::Overdue => write!(f, "Overdue"),
            SurveillanceStatus::DueSoon => write!(f, "Due Soon"),
            SurveillanceStatus::UpToDate => write!(f, "Up to Date"),
        }
    }
}

/// Inspection cycle settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplianceSchedule {
    pub cycle_days: i64,
    pub due_soon_days: i64,
}

impl Default for ComplianceSchedule {
    fn default() -> Self {
        Self {
            cycle_days: 14,
            due_soon_days: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceReport {
    pub last_surveillance: Option<DateTime<Utc>>,
    pub days_since_last: Option<i64>,
    pub next_due_date: NaiveDate,
    pub status: SurveillanceStatus,
}

impl ComplianceSchedule {
    /// `last_surveillance` is the end time of the latest completed session
    pub fn evaluate(
        &self,
        last_surveillance: Option<DateTime<Utc>>,
        today: NaiveDate,
    ) -> ComplianceReport {
        let Some(last) = last_surveillance else {
            return ComplianceReport {
                last_surveillance: None,
                days_since_last: None,
                next_due_date: today,
                status: SurveillanceStatus::NeverSurveyed,
            };
        };

        let last_date = last.date_naive();
        let days_since = (today - last_date).num_days();
        let next_due = (last_date + Duration::days(self.cycle_days)).max(today);

        let status = if days_since > self.cycle_days {
            SurveillanceStatus::Overdue
        } else if days_since > self.due_soon_days {
            SurveillanceStatus::DueSoon
        } else {
            SurveillanceStatus::UpToDate
        };

        ComplianceReport {
            last_surveillance: Some(last),
            days_since_last: Some(days_since),
            next_due_date: next_due,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 20, 9, 0, 0).unwrap() - Duration::days(days)
    }

    #[test]
    fn test_never_surveyed_is_due_today() {
        let report = ComplianceSchedule::default().evaluate(None, today());
        assert_eq!(report.status, SurveillanceStatus::NeverSurveyed);
        assert_eq!(report.next_due_date, today());
    }

    #[test]
    fn test_status_bands() {
        let schedule = ComplianceSchedule::default();
        assert_eq!(schedule.evaluate(Some(days_ago(3)), today()).status, SurveillanceStatus::UpToDate);
        assert_eq!(schedule.evaluate(Some(days_ago(10)), today()).status, SurveillanceStatus::UpToDate);
        assert_eq!(schedule.evaluate(Some(days_ago(11)), today()).status, SurveillanceStatus::DueSoon);
        assert_eq!(schedule.evaluate(Some(days_ago(14)), today()).status, SurveillanceStatus::DueSoon);
        assert_eq!(schedule.evaluate(Some(days_ago(15)), today()).status, SurveillanceStatus::Overdue);
    }

    #[test]
    fn test_next_due_never_in_the_past() {
        let schedule = ComplianceSchedule::default();
        let recent = schedule.evaluate(Some(days_ago(4)), today());
        assert_eq!(recent.next_due_date, today() + Duration::days(10));

        let overdue = schedule.evaluate(Some(days_ago(30)), today());
        assert_eq!(overdue.next_due_date, today());
        assert_eq!(overdue.days_since_last, Some(30));
    }
}
