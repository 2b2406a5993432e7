//! Competition/travel events that require an aval.
//!
//! Events are registered outside the workflow engine. The engine only reads
//! them and mirrors the case state onto [`Event::state`].

use serde::{Deserialize, Serialize};

use crate::types::{Date, DbId, Timestamp};

define_state_enum! {
    /// Availability of an event for a new aval request.
    EventState {
        Available => "AVAILABLE",
        Requested => "REQUESTED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
    }
}

/// A competition or trip requiring authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub place: String,
    pub discipline_id: DbId,
    pub category_id: DbId,
    pub starts_on: Date,
    pub ends_on: Date,
    pub coaches_male: i32,
    pub coaches_female: i32,
    pub athletes_male: i32,
    pub athletes_female: i32,
    pub state: EventState,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    /// Athletes the event declares, both sexes.
    pub fn declared_athletes(&self) -> i32 {
        self.athletes_male + self.athletes_female
    }

    /// Coaches the event declares, both sexes.
    pub fn declared_coaches(&self) -> i32 {
        self.coaches_male + self.coaches_female
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// DTO for registering an event. Registration itself belongs to the
/// surrounding application; stores accept it for seeding and tests.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub code: String,
    pub name: String,
    pub place: String,
    pub discipline_id: DbId,
    pub category_id: DbId,
    pub starts_on: Date,
    pub ends_on: Date,
    pub coaches_male: i32,
    pub coaches_female: i32,
    pub athletes_male: i32,
    pub athletes_female: i32,
}
