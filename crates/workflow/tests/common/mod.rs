#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aval_core::event::{Event, NewEvent};
use aval_core::hashing::content_key;
use aval_core::request::{LineItem, NewTechnicalRequest, RosterMember, RosterRole, Sex, Transport};
use aval_core::store::{Audience, MemoryCaseStore};
use aval_core::types::{Date, DbId};
use aval_core::CaseStateMachine;
use aval_documents::artifact::extension_for;
use aval_documents::{
    ArtifactError, ArtifactStore, DocumentRenderer, FetchError, RemoteFetch, RenderError, ReportKind,
};
use aval_events::{EventBus, Notification, Notifier, NotifyOutcome, WorkflowEvent};
use aval_workflow::{Collaborators, WorkflowEngine};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PDFs
// ---------------------------------------------------------------------------

/// Cover, PDA and DTM reports are told apart by page width.
pub fn width_for(kind: ReportKind) -> i64 {
    match kind {
        ReportKind::Consolidated => 100,
        ReportKind::Pda => 200,
        ReportKind::Dtm => 300,
    }
}

pub fn pdf(width: i64, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tj", vec![Object::string_literal(format!("{width}/{i}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 500.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Page widths in page order, following inherited `MediaBox`es.
pub fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let mut dict = doc.get_dictionary(id).unwrap();
            loop {
                if let Ok(media_box) = dict.get(b"MediaBox") {
                    return media_box.as_array().unwrap()[2].as_i64().unwrap();
                }
                let parent = dict.get(b"Parent").unwrap().as_reference().unwrap();
                dict = doc.get_dictionary(parent).unwrap();
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRenderer {
    failing: Mutex<HashSet<ReportKind>>,
    calls: Mutex<Vec<ReportKind>>,
}

impl FakeRenderer {
    pub fn fail(&self, kind: ReportKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn calls(&self) -> Vec<ReportKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, kind: ReportKind, data: &serde_json::Value) -> Result<Vec<u8>, RenderError> {
        assert_eq!(data["report"], kind.as_str());
        self.calls.lock().unwrap().push(kind);
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(RenderError::Renderer {
                status: 500,
                body: "template crashed".into(),
            });
        }
        Ok(pdf(width_for(kind), 1))
    }
}

/// In-memory artifact store that can also serve its objects back.
#[derive(Default)]
pub struct MemoryArtifacts {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unreadable: Mutex<HashSet<String>>,
}

impl MemoryArtifacts {
    /// Make fetches of anything under `folder` fail.
    pub fn break_folder(&self, folder: &str) {
        self.unreadable.lock().unwrap().insert(folder.to_string());
    }

    pub fn bytes(&self, url: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String, ArtifactError> {
        let url = format!("mem://{}", content_key(folder, &bytes, extension_for(&bytes)));
        self.objects.lock().unwrap().insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), ArtifactError> {
        self.objects.lock().unwrap().remove(url);
        Ok(())
    }
}

#[async_trait]
impl RemoteFetch for MemoryArtifacts {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let broken = self
            .unreadable
            .lock()
            .unwrap()
            .iter()
            .any(|folder| url.starts_with(&format!("mem://{folder}/")));
        if broken {
            return Err(FetchError::HttpStatus(503));
        }
        self.bytes(url).ok_or(FetchError::HttpStatus(404))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Vec<String>, Notification)>>,
    fail_all: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, tokens: &[String], notification: &Notification) -> NotifyOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((tokens.to_vec(), notification.clone()));
        if self.fail_all.load(Ordering::SeqCst) {
            NotifyOutcome {
                delivered: 0,
                failed: tokens.len(),
            }
        } else {
            NotifyOutcome {
                delivered: tokens.len(),
                failed: 0,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryCaseStore>,
    pub renderer: Arc<FakeRenderer>,
    pub artifacts: Arc<MemoryArtifacts>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: WorkflowEngine,
    events: broadcast::Receiver<WorkflowEvent>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryCaseStore::new());
    store.register_token(Audience::Reviewers, "rev-1").unwrap();
    store.register_token(Audience::Requesters, "req-1").unwrap();
    store.register_token(Audience::Requesters, "req-2").unwrap();

    let renderer = Arc::new(FakeRenderer::default());
    let artifacts = Arc::new(MemoryArtifacts::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();

    let engine = WorkflowEngine::new(
        CaseStateMachine::new(store.clone()),
        Collaborators {
            renderer: renderer.clone(),
            artifacts: artifacts.clone(),
            fetch: artifacts.clone(),
            notifier: notifier.clone(),
        },
        bus,
    );

    Harness {
        store,
        renderer,
        artifacts,
        notifier,
        engine,
        events,
    }
}

impl Harness {
    pub fn event(&self, code: &str, male: i32, female: i32) -> Event {
        self.store.insert_event(new_event(code, male, female)).unwrap()
    }

    /// Event types published since the last call.
    pub fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn failures(&mut self) -> Vec<WorkflowEvent> {
        self.drain_events().into_iter().filter(|e| e.is_failure()).collect()
    }
}

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_event(code: &str, athletes_male: i32, athletes_female: i32) -> NewEvent {
    NewEvent {
        code: code.to_string(),
        name: format!("South American Championship {code}"),
        place: "Cali".to_string(),
        discipline_id: 7,
        category_id: 2,
        starts_on: date(2027, 3, 10),
        ends_on: date(2027, 3, 14),
        coaches_male: 1,
        coaches_female: 1,
        athletes_male,
        athletes_female,
    }
}

/// Payload with `male + female` athletes and one coach.
pub fn payload(male: usize, female: usize) -> NewTechnicalRequest {
    let mut roster = Vec::new();
    for i in 0..male {
        roster.push(member(i as DbId + 1, RosterRole::Athlete, Sex::Male));
    }
    for i in 0..female {
        roster.push(member(i as DbId + 50, RosterRole::Athlete, Sex::Female));
    }
    roster.push(member(99, RosterRole::Coach, Sex::Female));

    NewTechnicalRequest {
        objectives: vec!["Top eight".to_string()],
        selection_criteria: vec!["Selection trials".to_string()],
        line_items: vec![LineItem {
            description: "Per diem".to_string(),
            quantity: 5,
            unit_amount_cents: 4_000,
        }],
        transport: Transport {
            mode: "Air".to_string(),
            departure_on: date(2027, 3, 9),
            return_on: date(2027, 3, 15),
            notes: None,
        },
        roster,
    }
}

fn member(person_id: DbId, role: RosterRole, sex: Sex) -> RosterMember {
    RosterMember {
        person_id,
        full_name: format!("Athlete {person_id}"),
        role,
        sex,
    }
}
