use std::sync::Arc;

use aval_core::event::{Event, NewEvent};
use aval_core::request::{LineItem, NewTechnicalRequest, RosterMember, RosterRole, Sex, Transport};
use aval_core::store::MemoryCaseStore;
use aval_core::types::{Date, DbId};
use aval_core::CaseStateMachine;

pub fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_event(code: &str, athletes_male: i32, athletes_female: i32) -> NewEvent {
    NewEvent {
        code: code.to_string(),
        name: format!("Event {code}"),
        place: "Santiago".to_string(),
        discipline_id: 1,
        category_id: 2,
        starts_on: date(2026, 11, 2),
        ends_on: date(2026, 11, 8),
        coaches_male: 1,
        coaches_female: 1,
        athletes_male,
        athletes_female,
    }
}

/// Payload with `male + female` athletes and two coaches.
pub fn payload(male: usize, female: usize) -> NewTechnicalRequest {
    let mut roster = Vec::new();
    for i in 0..male {
        roster.push(member(i as DbId, RosterRole::Athlete, Sex::Male));
    }
    for i in 0..female {
        roster.push(member(100 + i as DbId, RosterRole::Athlete, Sex::Female));
    }
    roster.push(member(500, RosterRole::Coach, Sex::Male));
    roster.push(member(501, RosterRole::Coach, Sex::Female));

    NewTechnicalRequest {
        objectives: vec!["Reach the final".to_string()],
        selection_criteria: vec!["National championship results".to_string()],
        line_items: vec![LineItem {
            description: "Air tickets".to_string(),
            quantity: (male + female + 2) as i32,
            unit_amount_cents: 52_000,
        }],
        transport: Transport {
            mode: "Air".to_string(),
            departure_on: date(2026, 11, 1),
            return_on: date(2026, 11, 9),
            notes: Some("Checked sports equipment".to_string()),
        },
        roster,
    }
}

fn member(person_id: DbId, role: RosterRole, sex: Sex) -> RosterMember {
    RosterMember {
        person_id,
        full_name: format!("Person {person_id}"),
        role,
        sex,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryCaseStore>,
    pub machine: CaseStateMachine,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryCaseStore::new());
    let machine = CaseStateMachine::new(store.clone());
    Fixture { store, machine }
}

impl Fixture {
    pub fn event(&self, code: &str, male: i32, female: i32) -> Event {
        self.store.insert_event(new_event(code, male, female)).unwrap()
    }
}
