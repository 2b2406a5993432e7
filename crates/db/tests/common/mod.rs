use aval_core::event::{Event, NewEvent};
use aval_core::request::{LineItem, NewTechnicalRequest, RosterMember, RosterRole, Sex, Transport};
use aval_core::types::{Date, DbId};
use aval_db::PgCaseStore;

pub fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_event(code: &str, athletes_male: i32, athletes_female: i32) -> NewEvent {
    NewEvent {
        code: code.to_string(),
        name: format!("Regional games {code}"),
        place: "Valparaiso".to_string(),
        discipline_id: 3,
        category_id: 1,
        starts_on: date(2026, 12, 1),
        ends_on: date(2026, 12, 5),
        coaches_male: 1,
        coaches_female: 0,
        athletes_male,
        athletes_female,
    }
}

/// Payload with `male + female` athletes and one coach.
pub fn payload(male: usize, female: usize) -> NewTechnicalRequest {
    let mut roster: Vec<RosterMember> = (0..male)
        .map(|i| member(i as DbId + 1, RosterRole::Athlete, Sex::Male))
        .chain((0..female).map(|i| member(i as DbId + 100, RosterRole::Athlete, Sex::Female)))
        .collect();
    roster.push(member(900, RosterRole::Coach, Sex::Male));

    NewTechnicalRequest {
        objectives: vec!["Podium finish".to_string(), "Qualify for nationals".to_string()],
        selection_criteria: vec!["Ranking".to_string()],
        line_items: vec![
            LineItem {
                description: "Bus".to_string(),
                quantity: 1,
                unit_amount_cents: 150_000,
            },
            LineItem {
                description: "Lodging".to_string(),
                quantity: 4,
                unit_amount_cents: 30_000,
            },
        ],
        transport: Transport {
            mode: "Land".to_string(),
            departure_on: date(2026, 11, 30),
            return_on: date(2026, 12, 6),
            notes: None,
        },
        roster,
    }
}

fn member(person_id: DbId, role: RosterRole, sex: Sex) -> RosterMember {
    RosterMember {
        person_id,
        full_name: format!("Member {person_id}"),
        role,
        sex,
    }
}

pub async fn seed_event(store: &PgCaseStore, code: &str, male: i32, female: i32) -> Event {
    store.insert_event(&new_event(code, male, female)).await.unwrap()
}
