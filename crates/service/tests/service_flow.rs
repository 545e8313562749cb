#![forbid(unsafe_code)]

use pf_core::{Actor, FormRef, HoldStatus, PostStatus, TaskStatus};
use pf_service::{
    Config, CreatePostInput, ErrorKind, EscalateInput, MemorySink, NotificationSink,
    TransitionInput, WorkflowService,
};
use pf_storage::EventRow;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("pf_service_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open(test_name: &str) -> (WorkflowService, MemorySink) {
    let config = Config {
        storage_dir: temp_dir(test_name),
        ..Config::default()
    };
    let sink = MemorySink::default();
    let service = WorkflowService::open(&config, Box::new(sink.clone())).expect("open service");
    (service, sink)
}

fn operator() -> Actor {
    Actor::new("u-operator", "Line Operator")
}

fn supervisor() -> Actor {
    Actor::new("u-supervisor", "Shift Supervisor")
}

fn spill_input() -> CreatePostInput {
    CreatePostInput {
        template: "chemical spill".to_string(),
        departments: None,
        actor: operator(),
        facility: "Plant 1".to_string(),
        location: Some("Line 3".to_string()),
        form_data: Some(serde_json::json!({ "chemical": "caustic", "litres": 4 })),
        photo_url: Some("https://photos.example/spill.jpg".to_string()),
        notes: None,
    }
}

fn transition(service: &mut WorkflowService, task_id: &str, status: &str, actor: Actor) {
    service
        .transition(TransitionInput {
            task_id: task_id.to_string(),
            status: status.to_string(),
            actor,
            notes: None,
            form_type: None,
            module_reference: None,
            expected_revision: None,
        })
        .expect("transition");
}

#[test]
fn chemical_spill_end_to_end_through_the_service() {
    let (mut service, sink) = open("spill_end_to_end");
    let written = service.create_post(spill_input()).expect("create post");
    assert_eq!(written.post.template_snapshot.name, "Chemical Spill");
    assert_eq!(written.tasks.len(), 5);
    assert_eq!(
        service
            .evaluate_hold(written.post.id.as_str())
            .expect("hold"),
        HoldStatus::Active
    );

    for task in &written.tasks {
        transition(&mut service, task.id.as_str(), "completed", operator());
        if task.requires_signoff {
            transition(&mut service, task.id.as_str(), "signed_off", supervisor());
        }
    }

    let detail = service
        .get_detail(written.post.id.as_str())
        .expect("detail");
    assert_eq!(detail.post.status, PostStatus::Completed);
    assert!((detail.post.completion_rate - 1.0).abs() < 1e-9);
    assert_eq!(detail.hold, HoldStatus::Cleared);
    assert!(!service.production_blocked("Plant 1", None).expect("blocked"));

    let kinds = sink
        .events()
        .into_iter()
        .map(|event| event.event_type)
        .collect::<Vec<_>>();
    assert_eq!(kinds.first().map(String::as_str), Some("post_created"));
    assert!(kinds.iter().any(|kind| kind == "hold_activated"));
    assert_eq!(
        kinds.iter().filter(|kind| kind.as_str() == "post_resolved").count(),
        1
    );
    assert_eq!(kinds.last().map(String::as_str), Some("hold_cleared"));
}

#[test]
fn photo_required_templates_reject_posts_without_photo() {
    let (mut service, sink) = open("photo_required");
    let mut input = spill_input();
    input.photo_url = Some("   ".to_string());
    let err = service.create_post(input).expect_err("photo missing");
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(err.ids.get("template").map(String::as_str), Some("Chemical Spill"));
    assert!(sink.events().is_empty());
}

#[test]
fn unknown_template_and_ids_are_not_found_or_invalid() {
    let (mut service, _sink) = open("unknown_things");
    let mut input = spill_input();
    input.template = "volcano".to_string();
    let err = service.create_post(input).expect_err("unknown template");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(!err.is_retryable());

    let err = service.get_detail("POST-424242").expect_err("unknown post");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.ids.get("post_id").map(String::as_str), Some("POST-424242"));

    let err = service
        .escalate(EscalateInput {
            post_id: "POST-000001".to_string(),
            department: "q".to_string(),
            actor: supervisor(),
            escalated_from: None,
            expected_revision: None,
        })
        .expect_err("bad department code");
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = service
        .transition(TransitionInput {
            task_id: "DTASK-000001".to_string(),
            status: "done".to_string(),
            actor: operator(),
            notes: None,
            form_type: None,
            module_reference: None,
            expected_revision: None,
        })
        .expect_err("bad status");
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[test]
fn duplicate_escalation_and_stale_revision_are_typed() {
    let (mut service, _sink) = open("escalation_errors");
    let written = service.create_post(spill_input()).expect("create post");
    let post_id = written.post.id.as_str().to_string();

    let err = service
        .escalate(EscalateInput {
            post_id: post_id.clone(),
            department: "safe".to_string(),
            actor: supervisor(),
            escalated_from: None,
            expected_revision: None,
        })
        .expect_err("already assigned");
    assert_eq!(err.kind, ErrorKind::AlreadyAssigned);
    assert_eq!(err.ids.get("department").map(String::as_str), Some("SAFE"));
    assert!(!err.is_retryable());

    let added = service
        .escalate(EscalateInput {
            post_id: post_id.clone(),
            department: "ENV".to_string(),
            actor: supervisor(),
            escalated_from: Some("SAFE".to_string()),
            expected_revision: Some(0),
        })
        .expect("escalate");
    assert_eq!(added.post.revision, 1);
    assert_eq!(added.task.department_name, "Environmental");

    let err = service
        .escalate(EscalateInput {
            post_id,
            department: "HR".to_string(),
            actor: supervisor(),
            escalated_from: None,
            expected_revision: Some(0),
        })
        .expect_err("stale revision");
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.is_retryable());
}

#[test]
fn signoff_by_completing_actor_is_an_invalid_transition() {
    let (mut service, _sink) = open("signoff_actor");
    let written = service.create_post(spill_input()).expect("create post");
    let safety = written
        .tasks
        .iter()
        .find(|task| task.department_code.as_str() == "SAFE")
        .expect("safety task");
    transition(&mut service, safety.id.as_str(), "completed", operator());
    let err = service
        .transition(TransitionInput {
            task_id: safety.id.as_str().to_string(),
            status: "signed_off".to_string(),
            actor: operator(),
            notes: None,
            form_type: None,
            module_reference: None,
            expected_revision: None,
        })
        .expect_err("same actor");
    assert_eq!(err.kind, ErrorKind::InvalidTransition);
    assert_eq!(err.ids.get("to").map(String::as_str), Some("signed_off"));
    let task = service
        .get_detail(written.post.id.as_str())
        .expect("detail")
        .tasks
        .into_iter()
        .find(|task| task.id == safety.id)
        .expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
}

#[test]
fn search_and_evidence_round_through_the_service() {
    let (mut service, sink) = open("search_evidence");
    let written = service.create_post(spill_input()).expect("create post");

    let hits = service.search_posts("line 3", 500).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, written.post.id);

    let form = FormRef::new("corrective_action", "CA-9");
    let link = service
        .set_evidence_link(form.clone(), Some(written.post.id.as_str()), supervisor())
        .expect("link");
    assert!(link.is_enabled());
    assert_eq!(service.get_evidence_link(&form).expect("get"), link);
    assert_eq!(
        sink.events().last().map(|event| event.event_type.clone()),
        Some("evidence_linked".to_string())
    );

    let err = service
        .set_evidence_link(form.clone(), Some("POST-777777"), supervisor())
        .expect_err("unknown post");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

struct FailingSink;

impl NotificationSink for FailingSink {
    fn publish(&mut self, _event: &EventRow) -> Result<(), String> {
        Err("dispatcher offline".to_string())
    }
}

#[test]
fn failing_sink_never_fails_the_operation() {
    let config = Config {
        storage_dir: temp_dir("failing_sink"),
        ..Config::default()
    };
    let mut service = WorkflowService::open(&config, Box::new(FailingSink)).expect("open service");
    let written = service.create_post(spill_input()).expect("create post");
    assert_eq!(written.tasks.len(), 5);
    let failure = service.take_notify_failure().expect("failure recorded");
    assert!(failure.contains("dispatcher offline"), "{failure}");
    assert!(service.take_notify_failure().is_none());
}
