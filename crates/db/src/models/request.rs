//! Technical request rows and their sub-entity rows.

use aval_core::error::CoreError;
use aval_core::request::{Headcounts, LineItem, RosterMember, TechnicalRequest, Transport};
use aval_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `technical_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct TechnicalRequestRow {
    pub id: DbId,
    pub case_id: DbId,
    pub transport_mode: String,
    pub departure_on: Date,
    pub return_on: Date,
    pub transport_notes: Option<String>,
    pub athletes_male: i32,
    pub athletes_female: i32,
    pub coaches_male: i32,
    pub coaches_female: i32,
    pub budget_total_cents: i64,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A row from `request_objectives` or `request_criteria`.
#[derive(Debug, Clone, FromRow)]
pub struct TextItemRow {
    pub request_id: DbId,
    pub position: i32,
    pub description: String,
}

/// A row from `request_line_items`.
#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    pub request_id: DbId,
    pub position: i32,
    pub description: String,
    pub quantity: i32,
    pub unit_amount_cents: i64,
}

/// A row from `request_roster`.
#[derive(Debug, Clone, FromRow)]
pub struct RosterRow {
    pub request_id: DbId,
    pub position: i32,
    pub person_id: DbId,
    pub full_name: String,
    pub role: String,
    pub sex: String,
}

/// Sub-entity rows of one request, each ordered by `position`.
#[derive(Debug, Default)]
pub struct RequestChildren {
    pub objectives: Vec<TextItemRow>,
    pub criteria: Vec<TextItemRow>,
    pub line_items: Vec<LineItemRow>,
    pub roster: Vec<RosterRow>,
}

impl TechnicalRequestRow {
    /// Assemble the domain request from this row and its children.
    pub fn into_domain(self, children: RequestChildren) -> Result<TechnicalRequest, CoreError> {
        let roster = children
            .roster
            .into_iter()
            .map(|r| {
                Ok(RosterMember {
                    person_id: r.person_id,
                    full_name: r.full_name,
                    role: r.role.parse()?,
                    sex: r.sex.parse()?,
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(TechnicalRequest {
            id: self.id,
            case_id: self.case_id,
            objectives: children.objectives.into_iter().map(|o| o.description).collect(),
            selection_criteria: children.criteria.into_iter().map(|c| c.description).collect(),
            line_items: children
                .line_items
                .into_iter()
                .map(|li| LineItem {
                    description: li.description,
                    quantity: li.quantity,
                    unit_amount_cents: li.unit_amount_cents,
                })
                .collect(),
            transport: Transport {
                mode: self.transport_mode,
                departure_on: self.departure_on,
                return_on: self.return_on,
                notes: self.transport_notes,
            },
            roster,
            headcounts: Headcounts {
                athletes_male: self.athletes_male,
                athletes_female: self.athletes_female,
                coaches_male: self.coaches_male,
                coaches_female: self.coaches_female,
            },
            budget_total_cents: self.budget_total_cents,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
        })
    }
}
