#![forbid(unsafe_code)]

use pf_core::{
    Actor, DepartmentCode, EvidenceLink, FormRef, HoldStatus, IncidentTemplate, ModuleReference,
    ModuleReferenceKind, PostId, PostStatus, TaskStatus, TemplateRegistry,
};
use pf_storage::{
    CreatePostRequest, DB_FILE_NAME, DetailSource, SetEvidenceLinkRequest, SqliteStore,
    StoreError, TransitionRequest, WorkOrderVia,
};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("pf_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn operator() -> Actor {
    Actor::new("u-operator", "Line Operator")
}

const LEGACY_SCHEMA: &str = "CREATE TABLE task_verifications(
       id TEXT PRIMARY KEY, reference_id TEXT, task_name TEXT, department_code TEXT,
       department_name TEXT, status TEXT, verified_by TEXT, verified_at_ms INTEGER,
       created_by TEXT, facility TEXT, location TEXT, notes TEXT, photo_url TEXT,
       work_order_id TEXT, created_at_ms INTEGER);";

const WORK_ORDER_SCHEMA: &str = "CREATE TABLE work_orders(
       id TEXT PRIMARY KEY, title TEXT, description TEXT, status TEXT,
       source_post_id TEXT, created_at_ms INTEGER);";

fn seed(storage_dir: &Path, sql: &str) {
    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute_batch(sql).expect("seed foreign tables");
}

fn insert_verification(
    storage_dir: &Path,
    id: &str,
    reference_id: Option<&str>,
    status: &str,
    work_order_id: Option<&str>,
    created_at_ms: i64,
) {
    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute(
        "INSERT INTO task_verifications(
           id, reference_id, task_name, department_code, department_name, status, verified_by,
           verified_at_ms, created_by, facility, location, notes, photo_url, work_order_id,
           created_at_ms)
         VALUES (?1, ?2, 'Sanitation Check', 'sani', NULL, ?3, 'u-lead', ?4, 'u-tech',
                 'Plant 1', 'Dock 2', 'wiped down', NULL, ?5, ?6)",
        params![
            id,
            reference_id,
            status,
            created_at_ms + 500,
            work_order_id,
            created_at_ms
        ],
    )
    .expect("insert verification");
}

fn create_post(store: &mut SqliteStore, template_name: &str, location: &str) -> pf_storage::PostWrite {
    let template = TemplateRegistry::builtin()
        .lookup(template_name)
        .expect("builtin template")
        .clone();
    store
        .create_post(CreatePostRequest {
            template,
            departments: None,
            actor: operator(),
            facility: "Plant 1".to_string(),
            location: Some(location.to_string()),
            form_data_json: None,
            photo_url: None,
            notes: None,
            at_ms: 1_000,
        })
        .expect("create post")
}

#[test]
fn verified_legacy_record_reads_as_resolved_single_department_post() {
    let storage_dir = temp_dir("legacy_verified");
    seed(&storage_dir, LEGACY_SCHEMA);
    insert_verification(&storage_dir, "tv-100", Some("TV-0100"), "verified", None, 5_000);

    let store = SqliteStore::open(&storage_dir).expect("open store");
    let detail = store
        .get_detail("tv-100")
        .expect("detail")
        .expect("legacy record");
    assert_eq!(detail.source, DetailSource::LegacyVerification);
    assert_eq!(detail.post.post_number, "TV-0100");
    assert_eq!(detail.post.status, PostStatus::Completed);
    assert_eq!(detail.post.total_departments, 1);
    assert_eq!(detail.post.completed_departments, 1);
    assert!((detail.post.completion_rate - 1.0).abs() < 1e-9);
    assert_eq!(detail.post.completed_at_ms, Some(5_500));
    assert_eq!(detail.hold, HoldStatus::None);
    assert_eq!(detail.tasks.len(), 1);
    let task = &detail.tasks[0];
    assert_eq!(task.status, TaskStatus::SignedOff);
    assert!(task.is_resolved());
    assert_eq!(task.department_code.as_str(), "SANI");
    assert_eq!(task.department_name, "Sanitation");
    assert_eq!(task.signed_off_by, Some(Actor::new("u-lead", "u-lead")));
}

#[test]
fn legacy_lookup_by_reference_prefers_most_recent_record() {
    let storage_dir = temp_dir("legacy_reference");
    seed(&storage_dir, LEGACY_SCHEMA);
    insert_verification(&storage_dir, "tv-1", Some("REF-9"), "verified", None, 1_000);
    insert_verification(&storage_dir, "tv-2", Some("REF-9"), "in_progress", None, 2_000);

    let store = SqliteStore::open(&storage_dir).expect("open store");
    let detail = store
        .get_detail("REF-9")
        .expect("detail")
        .expect("legacy record");
    assert_eq!(detail.post.id.as_str(), "tv-2");
    assert_eq!(detail.post.status, PostStatus::InProgress);
    assert_eq!(detail.post.completed_departments, 0);
    assert_eq!(detail.post.completed_at_ms, None);
    assert_eq!(detail.tasks[0].status, TaskStatus::InProgress);
}

#[test]
fn legacy_record_with_unchecked_id_still_reads() {
    let storage_dir = temp_dir("legacy_long_id");
    seed(&storage_dir, LEGACY_SCHEMA);
    let long_id = "tv-".repeat(70);
    insert_verification(&storage_dir, &long_id, Some("REF-L"), "verified", None, 3_000);

    let store = SqliteStore::open(&storage_dir).expect("open store");
    let detail = store
        .get_detail("REF-L")
        .expect("detail")
        .expect("legacy record");
    assert_eq!(detail.source, DetailSource::LegacyVerification);
    assert_eq!(detail.post.id.as_str(), long_id);
    assert_eq!(detail.tasks[0].id.as_str(), long_id);
    assert_eq!(detail.post.status, PostStatus::Completed);
}

#[test]
fn unrecognized_legacy_status_reads_as_pending() {
    let storage_dir = temp_dir("legacy_rejected");
    seed(&storage_dir, LEGACY_SCHEMA);
    insert_verification(&storage_dir, "tv-404", Some("REF-R"), "rejected", None, 4_000);

    let store = SqliteStore::open(&storage_dir).expect("open store");
    let detail = store
        .get_detail("tv-404")
        .expect("detail")
        .expect("legacy record");
    assert_eq!(detail.post.status, PostStatus::Pending);
    assert_eq!(detail.post.completed_departments, 0);
    assert_eq!(detail.post.completion_rate, 0.0);
    assert_eq!(detail.post.completed_at_ms, None);
    let task = &detail.tasks[0];
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(!task.is_resolved());
    assert!(task.signed_off_by.is_none());
}

#[test]
fn unknown_id_without_legacy_table_is_not_found() {
    let storage_dir = temp_dir("legacy_missing_table");
    let store = SqliteStore::open(&storage_dir).expect("open store");
    assert!(store.get_detail("tv-100").expect("detail").is_none());
    let err = store
        .resolve_work_orders("tv-100")
        .expect_err("unknown post");
    assert!(matches!(err, StoreError::UnknownId), "{err:?}");
}

#[test]
fn canonical_post_wins_over_legacy_record_with_same_reference() {
    let storage_dir = temp_dir("canonical_first");
    seed(&storage_dir, LEGACY_SCHEMA);
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Pest Sighting", "Dock 2");
    insert_verification(
        &storage_dir,
        written.post.id.as_str(),
        None,
        "verified",
        None,
        500,
    );

    let detail = store
        .get_detail(written.post.id.as_str())
        .expect("detail")
        .expect("post exists");
    assert_eq!(detail.source, DetailSource::Canonical);
    assert_eq!(detail.tasks.len(), 2);
}

#[test]
fn work_orders_are_unioned_and_deduplicated() {
    let storage_dir = temp_dir("work_orders");
    seed(&storage_dir, LEGACY_SCHEMA);
    seed(&storage_dir, WORK_ORDER_SCHEMA);
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Equipment Failure", "Line 1");
    let post_id = written.post.id.as_str().to_string();
    let post_number = written.post.post_number.clone();

    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute_batch(&format!(
        "INSERT INTO work_orders VALUES ('W1', 'Replace bearing', 'bearing seized', 'open', NULL, 10);
         INSERT INTO work_orders VALUES ('W2', 'Guard repair', NULL, 'open', '{post_id}', 20);
         INSERT INTO work_orders VALUES ('W3', 'Follow-up', 'see {post_number} for context', 'open', NULL, 30);
         INSERT INTO work_orders VALUES ('W4', 'Unrelated', 'nothing to see', 'open', NULL, 40);"
    ))
    .expect("seed work orders");
    drop(conn);
    insert_verification(&storage_dir, "tv-7", Some(&post_id), "verified", Some("W1"), 50);

    let maintenance = written.tasks[0].id.clone();
    store
        .transition(TransitionRequest {
            task_id: maintenance,
            status: TaskStatus::Completed,
            actor: operator(),
            notes: Some("bearing swapped".to_string()),
            form_type: Some("work_order".to_string()),
            module_reference: Some(ModuleReference {
                kind: ModuleReferenceKind::WorkOrder,
                id: "W1".to_string(),
            }),
            expected_revision: None,
            at_ms: 2_000,
        })
        .expect("complete with work order");

    let links = store.resolve_work_orders(&post_id).expect("resolve");
    let ids = links
        .iter()
        .map(|link| (link.id.as_str(), link.via))
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![
            ("W1", WorkOrderVia::TaskReference),
            ("W2", WorkOrderVia::SourcePost),
            ("W3", WorkOrderVia::DescriptionMatch),
        ]
    );
    assert_eq!(
        links[0].row.as_ref().and_then(|row| row.title.as_deref()),
        Some("Replace bearing")
    );
}

#[test]
fn description_match_requires_post_number_boundary() {
    let storage_dir = temp_dir("work_orders_boundary");
    seed(&storage_dir, WORK_ORDER_SCHEMA);
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    seed(
        &storage_dir,
        "INSERT INTO counters(name, value) VALUES ('post_seq', 999)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value;",
    );
    let short = create_post(&mut store, "Pest Sighting", "Dock 2");
    assert_eq!(short.post.post_number, "INC-1000");

    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute(
        "UPDATE counters SET value = 9999 WHERE name = 'post_seq'",
        [],
    )
    .expect("advance post counter");
    drop(conn);
    let long = create_post(&mut store, "Pest Sighting", "Dock 3");
    assert_eq!(long.post.post_number, "INC-10000");

    seed(
        &storage_dir,
        "INSERT INTO work_orders VALUES ('WO-B', 'Trap check', 'Follow-up for INC-10000', 'open', NULL, 10);
         INSERT INTO work_orders VALUES ('WO-A', 'Trap check', 'Follow-up for INC-1000, dock 2', 'open', NULL, 20);
         INSERT INTO work_orders VALUES ('WO-C', 'Seal gap', 'see INC-10001 then INC-1000', 'open', NULL, 30);",
    );

    let short_ids = store
        .resolve_work_orders(short.post.id.as_str())
        .expect("resolve short")
        .into_iter()
        .map(|link| link.id)
        .collect::<Vec<_>>();
    assert_eq!(short_ids, vec!["WO-A".to_string(), "WO-C".to_string()]);

    let long_ids = store
        .resolve_work_orders(long.post.id.as_str())
        .expect("resolve long")
        .into_iter()
        .map(|link| link.id)
        .collect::<Vec<_>>();
    assert_eq!(long_ids, vec!["WO-B".to_string()]);
}

#[test]
fn dangling_and_missing_work_order_tables_are_tolerated() {
    let storage_dir = temp_dir("work_orders_missing");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Equipment Failure", "Line 1");
    store
        .transition(TransitionRequest {
            task_id: written.tasks[0].id.clone(),
            status: TaskStatus::InProgress,
            actor: operator(),
            notes: None,
            form_type: None,
            module_reference: Some(ModuleReference {
                kind: ModuleReferenceKind::WorkOrder,
                id: "W-GONE".to_string(),
            }),
            expected_revision: None,
            at_ms: 2_000,
        })
        .expect("start with work order");

    let links = store
        .resolve_work_orders(written.post.id.as_str())
        .expect("resolve");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].id, "W-GONE");
    assert!(links[0].row.is_none());
}

#[test]
fn search_filters_recent_window_by_substring() {
    let storage_dir = temp_dir("search");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    create_post(&mut store, "Chemical Spill", "Line 3");
    create_post(&mut store, "Pest Sighting", "Warehouse Dock");
    create_post(&mut store, "Chemical Spill", "Dock 5");

    let hits = store.search_posts("dock", 10, 50).expect("search");
    let numbers = hits
        .iter()
        .map(|hit| hit.post_number.as_str())
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec!["INC-0003", "INC-0002"]);

    let hits = store.search_posts("chemical", 1, 50).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post_number, "INC-0003");

    // Only the most recent post is inside a window of one.
    let hits = store.search_posts("pest", 10, 1).expect("search");
    assert!(hits.is_empty());

    let hits = store.search_posts("line operator", 10, 50).expect("search");
    assert_eq!(hits.len(), 3);
}

#[test]
fn evidence_toggle_links_and_clears_without_tombstone() {
    let storage_dir = temp_dir("evidence");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Foreign Material", "Line 2");
    let form = FormRef::new("haccp_deviation", "HD-42");

    assert_eq!(
        store.get_evidence_link(&form).expect("get link"),
        EvidenceLink::Disabled
    );

    let linked = store
        .set_evidence_link(SetEvidenceLinkRequest {
            form: form.clone(),
            post_id: Some(written.post.id.clone()),
            actor: operator(),
            at_ms: 2_000,
        })
        .expect("link")
        .link;
    assert_eq!(
        linked,
        EvidenceLink::Enabled {
            post_id: written.post.id.clone(),
            post_number: "INC-0001".to_string(),
        }
    );
    assert_eq!(store.get_evidence_link(&form).expect("get link"), linked);

    let err = store
        .set_evidence_link(SetEvidenceLinkRequest {
            form: form.clone(),
            post_id: Some(PostId::try_new("POST-404404").expect("post id")),
            actor: operator(),
            at_ms: 2_100,
        })
        .expect_err("unknown post");
    assert!(matches!(err, StoreError::UnknownId), "{err:?}");
    assert_eq!(store.get_evidence_link(&form).expect("get link"), linked);

    let cleared = store
        .set_evidence_link(SetEvidenceLinkRequest {
            form: form.clone(),
            post_id: None,
            actor: operator(),
            at_ms: 2_200,
        })
        .expect("clear")
        .link;
    assert_eq!(cleared, EvidenceLink::Disabled);
    assert_eq!(
        store.get_evidence_link(&form).expect("get link"),
        EvidenceLink::Disabled
    );

    let kinds = store
        .list_events(None, 100)
        .expect("events")
        .into_iter()
        .map(|event| event.event_type)
        .filter(|kind| kind.starts_with("evidence_"))
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["evidence_linked", "evidence_unlinked"]);
}

#[test]
fn detail_recomputes_drifted_counters() {
    let storage_dir = temp_dir("counter_drift");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let template = IncidentTemplate::new("Drift", "")
        .with_department(DepartmentCode::try_new("QUAL").expect("code"), Vec::new());
    let written = store
        .create_post(CreatePostRequest {
            template,
            departments: None,
            actor: operator(),
            facility: "Plant 9".to_string(),
            location: None,
            form_data_json: None,
            photo_url: None,
            notes: None,
            at_ms: 1_000,
        })
        .expect("create post");

    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute(
        "UPDATE posts SET completed_departments = 7, completion_rate = 3.5 WHERE id = ?1",
        params![written.post.id.as_str()],
    )
    .expect("corrupt counters");
    drop(conn);

    let detail = store
        .get_detail(written.post.id.as_str())
        .expect("detail")
        .expect("post exists");
    assert_eq!(detail.post.completed_departments, 0);
    assert_eq!(detail.post.completion_rate, 0.0);
    assert_eq!(detail.post.status, PostStatus::Pending);
}

#[test]
fn corrupt_template_snapshot_is_reported_as_corrupt() {
    let storage_dir = temp_dir("corrupt_snapshot");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Pest Sighting", "Dock 2");

    let conn = Connection::open(storage_dir.join(DB_FILE_NAME)).expect("open sqlite db");
    conn.execute(
        "UPDATE posts SET template_json = 'not json' WHERE id = ?1",
        params![written.post.id.as_str()],
    )
    .expect("corrupt snapshot");
    drop(conn);

    let err = store
        .get_detail(written.post.id.as_str())
        .expect_err("corrupt row");
    assert!(matches!(err, StoreError::Corrupt(_)), "{err:?}");
}

#[test]
fn detail_read_releases_its_snapshot_before_writes() {
    let storage_dir = temp_dir("detail_snapshot");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let written = create_post(&mut store, "Pest Sighting", "Dock 2");
    let post_id = written.post.id.as_str().to_string();

    let before = store.get_detail(&post_id).expect("detail").expect("post exists");
    store
        .transition(TransitionRequest {
            task_id: written.tasks[0].id.clone(),
            status: TaskStatus::InProgress,
            actor: operator(),
            notes: None,
            form_type: None,
            module_reference: None,
            expected_revision: Some(before.post.revision),
            at_ms: 2_000,
        })
        .expect("write after detail read");

    let after = store.get_detail(&post_id).expect("detail").expect("post exists");
    assert_eq!(after.post.revision, before.post.revision + 1);
    assert_eq!(after.tasks[0].status, TaskStatus::InProgress);
}
