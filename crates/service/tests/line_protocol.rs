#![forbid(unsafe_code)]

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

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

struct Engine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    storage_dir: PathBuf,
}

impl Engine {
    fn start(test_name: &str) -> Self {
        Self::start_with_args(test_name, &[])
    }

    fn start_with_args(test_name: &str, extra_args: &[&str]) -> Self {
        let storage_dir = temp_dir(test_name);
        let mut child = Command::new(env!("CARGO_BIN_EXE_plantflow"))
            .arg("--storage-dir")
            .arg(&storage_dir)
            .args(extra_args)
            .env_remove("PLANTFLOW_TEMPLATES")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn plantflow");
        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));
        Self {
            child,
            stdin,
            stdout,
            storage_dir,
        }
    }

    fn send_raw(&mut self, line: &str) -> Value {
        writeln!(self.stdin, "{line}").expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.stdout.read_line(&mut out).expect("read response");
        assert!(!out.trim().is_empty(), "empty response line");
        serde_json::from_str(&out).expect("parse response json")
    }

    fn call(&mut self, op: &str, args: Value) -> Value {
        self.send_raw(&json!({ "op": op, "args": args }).to_string())
    }

    fn ok(&mut self, op: &str, args: Value) -> Value {
        let response = self.call(op, args);
        assert_eq!(response["success"], true, "{op} failed: {response}");
        response["result"].clone()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.storage_dir);
    }
}

fn actor(id: &str) -> Value {
    json!({ "id": id, "display_name": id })
}

#[test]
fn equipment_failure_lifecycle_over_stdio() {
    let mut engine = Engine::start("equipment_failure");

    let created = engine.ok(
        "create_post",
        json!({
            "template": "Equipment Failure",
            "actor": actor("op-1"),
            "facility": "Plant 2",
            "location": "Filler",
            "form_data": { "asset": "FILL-07" },
        }),
    );
    assert_eq!(created["post"]["post_number"], "INC-0001");
    assert_eq!(created["post"]["hold_status"], "active");
    assert_eq!(created["post"]["form_data"]["asset"], "FILL-07");
    let tasks = created["tasks"].as_array().expect("tasks").clone();
    assert_eq!(tasks.len(), 2);
    let post_id = created["post"]["id"].as_str().expect("post id").to_string();

    let blocked = engine.ok("production_blocked", json!({ "facility": "Plant 2" }));
    assert_eq!(blocked["blocked"], true);
    assert_eq!(blocked["active_holds"].as_array().map(Vec::len), Some(1));

    for task in &tasks {
        let mut args = json!({
            "task_id": task["id"],
            "status": "completed",
            "actor": actor("tech-1"),
        });
        if task["department_code"] == "MAINT" {
            args["work_order_id"] = json!("WO-55");
        }
        engine.ok("transition", args);
    }

    let hold = engine.ok("evaluate_hold", json!({ "post_id": post_id }));
    assert_eq!(hold["hold"], "cleared");
    assert_eq!(hold["production_blocked"], false);

    let detail = engine.ok("get_detail", json!({ "post_id": post_id }));
    assert_eq!(detail["source"], "canonical");
    assert_eq!(detail["post"]["status"], "completed");
    assert_eq!(detail["post"]["completion_rate"], 1.0);
    assert_eq!(detail["work_orders"][0]["id"], "WO-55");
    assert_eq!(detail["work_orders"][0]["via"], "task_reference");
    assert!(detail["work_orders"][0]["work_order"].is_null());

    let reopened = engine.ok(
        "escalate",
        json!({ "post_id": post_id, "department": "QUAL", "actor": actor("sup-1") }),
    );
    assert_eq!(reopened["task"]["provenance"]["kind"], "escalated");
    assert_eq!(reopened["post"]["hold_status"], "reinstated");

    let events = engine.ok("list_events", json!({ "limit": 500 }));
    let kinds = events["events"]
        .as_array()
        .expect("events")
        .iter()
        .filter_map(|event| event["type"].as_str())
        .collect::<Vec<_>>();
    assert!(kinds.contains(&"hold_reinstated"), "{kinds:?}");
    assert!(kinds.contains(&"post_reopened"), "{kinds:?}");
    let next_since = events["next_since"].as_str().expect("cursor").to_string();
    let tail = engine.ok("list_events", json!({ "since": next_since }));
    assert_eq!(tail["events"].as_array().map(Vec::len), Some(0));
}

#[test]
fn failures_use_the_typed_envelope() {
    let mut engine = Engine::start("typed_failures");

    let response = engine.send_raw("{not json");
    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["kind"], "INVALID_INPUT");

    let response = engine.call("teleport", json!({}));
    assert_eq!(response["op"], "teleport");
    assert_eq!(response["error"]["kind"], "INVALID_INPUT");

    let response = engine.call("get_detail", json!({ "post_id": "POST-000404" }));
    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["kind"], "NOT_FOUND");
    assert_eq!(response["error"]["retryable"], false);
    assert_eq!(response["error"]["ids"]["post_id"], "POST-000404");

    let response = engine.call(
        "create_post",
        json!({
            "template": "Temperature Deviation",
            "departments": [],
            "actor": actor("op-1"),
            "facility": "Plant 2",
        }),
    );
    assert_eq!(response["error"]["kind"], "INVALID_TEMPLATE");

    let response = engine.call(
        "create_post",
        json!({ "template": "Temperature Deviation", "facility": "Plant 2" }),
    );
    assert_eq!(response["error"]["kind"], "INVALID_INPUT");
    assert_eq!(response["error"]["message"], "actor is required");
}

#[test]
fn templates_and_evidence_ops() {
    let mut engine = Engine::start("templates_evidence");

    let listed = engine.ok("templates", json!({}));
    let names = listed["templates"]
        .as_array()
        .expect("templates")
        .iter()
        .filter_map(|template| template["name"].as_str())
        .collect::<Vec<_>>();
    assert_eq!(names.first(), Some(&"Chemical Spill"));

    let one = engine.ok("templates", json!({ "query": "allergen" }));
    assert_eq!(one["template"]["name"], "Allergen Cross-Contact");
    assert_eq!(one["template"]["production_hold"], true);

    let created = engine.ok(
        "create_post",
        json!({
            "template": "Temperature Deviation",
            "actor": actor("op-2"),
            "facility": "Plant 3",
            "location": "Cooler 4",
        }),
    );
    let post_id = created["post"]["id"].clone();

    let hits = engine.ok("search_posts", json!({ "query": "cooler" }));
    assert_eq!(hits["posts"].as_array().map(Vec::len), Some(1));

    let form = json!({ "form_type": "temperature_log", "form_id": "TL-1" });
    let mut args = form.clone();
    args["post_id"] = post_id.clone();
    args["actor"] = actor("qa-1");
    let linked = engine.ok("set_evidence_link", args);
    assert_eq!(linked["enabled"], true);
    assert_eq!(linked["post_number"], "INC-0001");

    let mut args = form.clone();
    args["post_id"] = Value::Null;
    args["actor"] = actor("qa-1");
    let cleared = engine.ok("set_evidence_link", args);
    assert_eq!(cleared["enabled"], false);
    let fetched = engine.ok("get_evidence_link", form);
    assert_eq!(fetched["enabled"], false);
}

#[test]
fn yaml_catalog_replaces_builtin_templates() {
    let catalog_dir = temp_dir("yaml_catalog_file");
    let catalog = catalog_dir.join("templates.yaml");
    std::fs::write(
        &catalog,
        "- name: Metal Detect Reject\n  departments: [QUAL, PROD]\n  production_hold: true\n",
    )
    .expect("write catalog");
    let catalog_arg = catalog.to_string_lossy().to_string();
    let mut engine = Engine::start_with_args("yaml_catalog", &["--templates", &catalog_arg]);

    let listed = engine.ok("templates", json!({}));
    assert_eq!(listed["templates"].as_array().map(Vec::len), Some(1));
    let response = engine.call("templates", json!({ "query": "Chemical Spill" }));
    assert_eq!(response["error"]["kind"], "NOT_FOUND");

    let created = engine.ok(
        "create_post",
        json!({
            "template": "metal",
            "actor": actor("op-3"),
            "facility": "Plant 4",
        }),
    );
    assert_eq!(created["post"]["template_name"], "Metal Detect Reject");
    let _ = std::fs::remove_dir_all(&catalog_dir);
}

#[test]
fn session_log_records_last_op() {
    let mut engine = Engine::start("session_log");
    engine.ok("templates", json!({}));
    let log = std::fs::read_to_string(engine.storage_dir.join("plantflow_last_session.txt"))
        .expect("session log");
    assert!(log.contains("last_op=templates"), "{log}");
    assert!(log.contains("requests=1"), "{log}");
}
