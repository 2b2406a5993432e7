//! Technical request (aval técnico): the substantive content of a case.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

define_state_enum! {
    /// Role of a person on the travelling roster.
    RosterRole {
        Athlete => "ATHLETE",
        Coach => "COACH",
    }
}

define_state_enum! {
    Sex {
        Male => "M",
        Female => "F",
    }
}

/// A person on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub person_id: DbId,
    pub full_name: String,
    pub role: RosterRole,
    pub sex: Sex,
}

/// A budget line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LineItem {
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "Unit amount must not be negative"))]
    pub unit_amount_cents: i64,
}

impl LineItem {
    /// Line total, or `None` if it does not fit in an `i64`.
    pub fn total_cents(&self) -> Option<i64> {
        i64::from(self.quantity).checked_mul(self.unit_amount_cents)
    }
}

/// Travel arrangements for the delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_travel_dates"))]
pub struct Transport {
    #[validate(length(min = 1, max = 100, message = "Transport mode must be 1-100 characters"))]
    pub mode: String,
    pub departure_on: Date,
    pub return_on: Date,
    pub notes: Option<String>,
}

fn validate_travel_dates(transport: &Transport) -> Result<(), ValidationError> {
    if transport.return_on < transport.departure_on {
        let mut err = ValidationError::new("return_before_departure");
        err.message = Some("Return date must not precede departure date".into());
        return Err(err);
    }
    Ok(())
}

/// Headcounts derived from the roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headcounts {
    pub athletes_male: i32,
    pub athletes_female: i32,
    pub coaches_male: i32,
    pub coaches_female: i32,
}

impl Headcounts {
    pub fn from_roster(roster: &[RosterMember]) -> Self {
        roster.iter().fold(Self::default(), |mut acc, member| {
            let slot = match (member.role, member.sex) {
                (RosterRole::Athlete, Sex::Male) => &mut acc.athletes_male,
                (RosterRole::Athlete, Sex::Female) => &mut acc.athletes_female,
                (RosterRole::Coach, Sex::Male) => &mut acc.coaches_male,
                (RosterRole::Coach, Sex::Female) => &mut acc.coaches_female,
            };
            *slot += 1;
            acc
        })
    }

    pub fn athletes(&self) -> i32 {
        self.athletes_male + self.athletes_female
    }

    pub fn coaches(&self) -> i32 {
        self.coaches_male + self.coaches_female
    }
}

/// Submission payload for a technical request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTechnicalRequest {
    #[validate(length(min = 1, message = "At least one objective is required"))]
    pub objectives: Vec<String>,
    #[validate(length(min = 1, message = "At least one selection criterion is required"))]
    pub selection_criteria: Vec<String>,
    #[validate(nested)]
    pub line_items: Vec<LineItem>,
    #[validate(nested)]
    pub transport: Transport,
    #[validate(length(min = 1, message = "The roster must not be empty"))]
    pub roster: Vec<RosterMember>,
}

impl NewTechnicalRequest {
    pub fn headcounts(&self) -> Headcounts {
        Headcounts::from_roster(&self.roster)
    }

    /// Sum of the line totals. Fails with [`CoreError::Validation`] when a
    /// line or the sum overflows.
    pub fn budget_total_cents(&self) -> Result<i64, CoreError> {
        self.line_items.iter().try_fold(0i64, |acc, item| {
            item.total_cents()
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Budget total overflows at line item '{}'",
                        item.description
                    ))
                })
        })
    }
}

/// A stored technical request with its sub-entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalRequest {
    pub id: DbId,
    pub case_id: DbId,
    pub objectives: Vec<String>,
    pub selection_criteria: Vec<String>,
    pub line_items: Vec<LineItem>,
    pub transport: Transport,
    pub roster: Vec<RosterMember>,
    pub headcounts: Headcounts,
    pub budget_total_cents: i64,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TechnicalRequest {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: DbId, role: RosterRole, sex: Sex) -> RosterMember {
        RosterMember {
            person_id: id,
            full_name: format!("Person {id}"),
            role,
            sex,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn payload() -> NewTechnicalRequest {
        NewTechnicalRequest {
            objectives: vec!["Podium finish".into()],
            selection_criteria: vec!["National ranking".into()],
            line_items: vec![
                LineItem {
                    description: "Flights".into(),
                    quantity: 3,
                    unit_amount_cents: 45_000,
                },
                LineItem {
                    description: "Lodging".into(),
                    quantity: 2,
                    unit_amount_cents: 10_000,
                },
            ],
            transport: Transport {
                mode: "Air".into(),
                departure_on: date(2026, 5, 1),
                return_on: date(2026, 5, 9),
                notes: None,
            },
            roster: vec![
                member(1, RosterRole::Athlete, Sex::Male),
                member(2, RosterRole::Athlete, Sex::Female),
                member(3, RosterRole::Coach, Sex::Female),
            ],
        }
    }

    #[test]
    fn headcounts_split_by_role_and_sex() {
        let counts = payload().headcounts();
        assert_eq!(counts.athletes_male, 1);
        assert_eq!(counts.athletes_female, 1);
        assert_eq!(counts.coaches_female, 1);
        assert_eq!(counts.athletes(), 2);
        assert_eq!(counts.coaches(), 1);
    }

    #[test]
    fn budget_total_sums_line_items() {
        assert_eq!(payload().budget_total_cents().unwrap(), 3 * 45_000 + 2 * 10_000);
    }

    #[test]
    fn overflowing_budget_is_a_validation_error() {
        let mut p = payload();
        p.line_items[0].unit_amount_cents = i64::MAX / 2;
        assert!(p.validate().is_ok());
        assert_eq!(p.line_items[0].total_cents(), None);
        assert!(matches!(p.budget_total_cents(), Err(CoreError::Validation(_))));

        let mut p = payload();
        p.line_items[0].quantity = 1;
        p.line_items[0].unit_amount_cents = i64::MAX;
        assert_eq!(p.line_items[0].total_cents(), Some(i64::MAX));
        assert!(matches!(p.budget_total_cents(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn empty_objectives_fail_validation() {
        let mut p = payload();
        p.objectives.clear();
        assert!(p.validate().is_err());
    }

    #[test]
    fn return_before_departure_fails_validation() {
        let mut p = payload();
        p.transport.return_on = date(2026, 4, 1);
        assert!(p.validate().is_err());
    }

    #[test]
    fn zero_quantity_line_item_fails_validation() {
        let mut p = payload();
        p.line_items[0].quantity = 0;
        assert!(p.validate().is_err());
    }
}
