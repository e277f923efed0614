use serde::{Deserialize, Serialize};

/// Schema and vocabulary of the planner's time-series layout: measurement,
/// tag and field names, the reserved marker values, and the colors used when
/// the engine derives a record itself (overlay and removal fallback).
///
/// `Default` mirrors the layout the bundled dashboards expect; deployments
/// with a different store layout can load their own from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub measurements: MeasurementNames,
    pub tags: TagNames,
    pub fields: FieldNames,
    pub markers: MarkerNames,
    pub colors: MarkerColors,
    /// Number of months the overlay window is widened on each side of a
    /// requested range before generation.
    pub overlay_margin_months: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementNames {
    pub projects: String,
    pub unassigned_projects: String,
    pub report: String,
    pub calendar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNames {
    pub employee: String,
    pub year_month: String,
    pub index: String,
    pub calendar_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    pub project: String,
    pub booking_status: String,
    pub color: String,
    pub daily_rate: String,
    pub daily_expenses: String,
    pub notes: String,
    pub working_day: String,
    pub calendar_value: String,
    pub expenses: String,
    pub costs: String,
    pub revenue: String,
    pub profit: String,
    pub utilization: String,
    pub return_on_sales: String,
}

/// Reserved project-name values denoting non-customer states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerNames {
    pub weekend: String,
    pub not_available: String,
    pub removed: String,
    pub training: String,
    pub conference: String,
    pub other: String,
}

impl MarkerNames {
    /// All reserved markers, i.e. every project value that is not a customer
    /// project.
    pub fn all(&self) -> Vec<String> {
        vec![
            self.weekend.clone(),
            self.not_available.clone(),
            self.removed.clone(),
            self.training.clone(),
            self.conference.clone(),
            self.other.clone(),
        ]
    }

    /// Markers that block assignment when an assignment asks to skip
    /// existing events. "Removed" stays assignable and is excluded here.
    pub fn exclusion_set(&self) -> Vec<String> {
        vec![
            self.weekend.clone(),
            self.not_available.clone(),
            self.training.clone(),
            self.conference.clone(),
            self.other.clone(),
        ]
    }

    /// Markers ignored by the deletion guard before the "exactly one
    /// project" check. Deliberately narrower than [`MarkerNames::all`]:
    /// training/conference/other in a range make a deletion ambiguous.
    pub fn administrative(&self) -> Vec<String> {
        vec![
            self.weekend.clone(),
            self.removed.clone(),
            self.not_available.clone(),
        ]
    }

    pub fn is_marker(&self, project: &str) -> bool {
        self.all().iter().any(|m| m == project)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerColors {
    pub weekend: String,
    pub not_available: String,
    pub default: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            measurements: MeasurementNames {
                projects: "projects".to_string(),
                unassigned_projects: "unassigned_projects".to_string(),
                report: "report".to_string(),
                calendar: "calendar".to_string(),
            },
            tags: TagNames {
                employee: "employee".to_string(),
                year_month: "year_month".to_string(),
                index: "index".to_string(),
                calendar_type: "type".to_string(),
            },
            fields: FieldNames {
                project: "project".to_string(),
                booking_status: "booking_status".to_string(),
                color: "color".to_string(),
                daily_rate: "daily_rate".to_string(),
                daily_expenses: "daily_expenses".to_string(),
                notes: "notes".to_string(),
                working_day: "working_day".to_string(),
                calendar_value: "value".to_string(),
                expenses: "expenses".to_string(),
                costs: "costs".to_string(),
                revenue: "revenue".to_string(),
                profit: "profit".to_string(),
                utilization: "utilization".to_string(),
                return_on_sales: "return_on_sales".to_string(),
            },
            markers: MarkerNames {
                weekend: "WEEKEND".to_string(),
                not_available: "NOT AVAILABLE".to_string(),
                removed: "REMOVED".to_string(),
                training: "TRAINING".to_string(),
                conference: "CONFERENCE".to_string(),
                other: "OTHER".to_string(),
            },
            colors: MarkerColors {
                weekend: "#d6d6d6".to_string(),
                not_available: "#e24d42".to_string(),
                default: "#ffffff".to_string(),
            },
            overlay_margin_months: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let config = PlannerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PlannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn removed_is_not_in_the_exclusion_set() {
        let markers = PlannerConfig::default().markers;
        assert!(!markers.exclusion_set().contains(&markers.removed));
        assert!(markers.all().contains(&markers.removed));
        assert!(markers.is_marker("WEEKEND"));
        assert!(!markers.is_marker("Acme"));
    }
}
