#![forbid(unsafe_code)]

use crate::args::*;
use crate::error::WorkflowError;
use crate::render::*;
use crate::service::{
    CreatePostInput, DEFAULT_EVENT_LIMIT, DEFAULT_SEARCH_LIMIT, EscalateInput, TransitionInput,
    WorkflowService,
};
use pf_core::{FormRef, ModuleReference, ModuleReferenceKind};
use serde::Deserialize;
use serde_json::{Value, json};

pub const OPS: &[&str] = &[
    "create_post",
    "escalate",
    "transition",
    "get_detail",
    "evaluate_hold",
    "search_posts",
    "resolve_work_orders",
    "set_evidence_link",
    "get_evidence_link",
    "production_blocked",
    "list_events",
    "templates",
];

#[derive(Debug, Deserialize)]
struct LineRequest {
    op: String,
    #[serde(default)]
    args: Option<Value>,
}

/// Outcome of one request line: the envelope to write back plus what the session log needs.
#[derive(Clone, Debug)]
pub struct LineOutcome {
    pub op: Option<String>,
    pub response: Value,
    pub error: Option<WorkflowError>,
}

pub fn success_envelope(op: &str, result: Value) -> Value {
    json!({ "success": true, "op": op, "result": result, "error": null })
}

pub fn error_envelope(op: Option<&str>, err: &WorkflowError) -> Value {
    json!({
        "success": false,
        "op": op,
        "result": null,
        "error": {
            "kind": err.kind.as_str(),
            "message": err.message,
            "retryable": err.is_retryable(),
            "ids": err.ids,
        },
    })
}

pub fn handle_line(service: &mut WorkflowService, raw: &str) -> LineOutcome {
    let request: LineRequest = match serde_json::from_str(raw) {
        Ok(request) => request,
        Err(err) => {
            let err = WorkflowError::invalid_input(format!("request must be {{\"op\", \"args\"}} JSON: {err}"));
            return LineOutcome {
                op: None,
                response: error_envelope(None, &err),
                error: Some(err),
            };
        }
    };
    let op = request.op.trim().to_string();
    let args = match request.args {
        None | Some(Value::Null) => Args::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            let err = WorkflowError::invalid_input("args must be an object");
            return LineOutcome {
                response: error_envelope(Some(&op), &err),
                op: Some(op),
                error: Some(err),
            };
        }
    };

    match dispatch(service, &op, &args) {
        Ok(result) => LineOutcome {
            response: success_envelope(&op, result),
            op: Some(op),
            error: None,
        },
        Err(err) => LineOutcome {
            response: error_envelope(Some(&op), &err),
            op: Some(op),
            error: Some(err),
        },
    }
}

pub fn dispatch(
    service: &mut WorkflowService,
    op: &str,
    args: &Args,
) -> Result<Value, WorkflowError> {
    match op {
        "create_post" => create_post(service, args),
        "escalate" => escalate(service, args),
        "transition" => transition(service, args),
        "get_detail" => {
            let detail = service.get_detail(&require_string(args, "post_id")?)?;
            Ok(detail_json(&detail))
        }
        "evaluate_hold" => {
            let post_id = require_string(args, "post_id")?;
            let hold = service.evaluate_hold(&post_id)?;
            Ok(json!({
                "post_id": post_id,
                "hold": hold.as_str(),
                "production_blocked": hold.is_blocking(),
            }))
        }
        "search_posts" => {
            let query = optional_string(args, "query")?.unwrap_or_default();
            let limit = optional_usize(args, "limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
            let posts = service.search_posts(&query, limit)?;
            Ok(json!({ "posts": posts.iter().map(summary_json).collect::<Vec<_>>() }))
        }
        "resolve_work_orders" => {
            let links = service.resolve_work_orders(&require_string(args, "post_id")?)?;
            Ok(json!({ "work_orders": links.iter().map(work_order_json).collect::<Vec<_>>() }))
        }
        "set_evidence_link" => {
            let form = form_ref(args)?;
            let post_id = optional_string(args, "post_id")?;
            let actor = require_actor(args)?;
            let link = service.set_evidence_link(form, post_id.as_deref(), actor)?;
            Ok(evidence_json(&link))
        }
        "get_evidence_link" => Ok(evidence_json(&service.get_evidence_link(&form_ref(args)?)?)),
        "production_blocked" => {
            let facility = require_string(args, "facility")?;
            let location = optional_string(args, "location")?;
            let blocked = service.production_blocked(&facility, location.as_deref())?;
            let holds = service.active_holds(&facility)?;
            Ok(json!({
                "facility": facility,
                "location": location,
                "blocked": blocked,
                "active_holds": holds.iter().map(summary_json).collect::<Vec<_>>(),
            }))
        }
        "list_events" => {
            let since = optional_string(args, "since")?;
            let limit = optional_usize(args, "limit")?.unwrap_or(DEFAULT_EVENT_LIMIT);
            let events = service.list_events(since.as_deref(), limit)?;
            let next_since = events.last().map(|event| event.event_id()).or(since);
            Ok(json!({
                "events": events.iter().map(event_json).collect::<Vec<_>>(),
                "next_since": next_since,
            }))
        }
        "templates" => match optional_string(args, "query")? {
            Some(query) => Ok(json!({ "template": template_json(service.template(&query)?) })),
            None => Ok(json!({
                "templates": service
                    .registry()
                    .templates()
                    .iter()
                    .map(template_json)
                    .collect::<Vec<_>>(),
            })),
        },
        other => Err(WorkflowError::invalid_input(format!(
            "unknown op '{other}' (expected one of: {})",
            OPS.join(", ")
        ))),
    }
}

fn create_post(service: &mut WorkflowService, args: &Args) -> Result<Value, WorkflowError> {
    let form_data = match args.get("form_data") {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(_)) => Some(value.clone()),
        Some(_) => return Err(WorkflowError::invalid_input("form_data must be an object")),
    };
    let written = service.create_post(CreatePostInput {
        template: require_string(args, "template")?,
        departments: optional_string_list(args, "departments")?,
        actor: require_actor(args)?,
        facility: require_string(args, "facility")?,
        location: optional_string(args, "location")?,
        form_data,
        photo_url: optional_string(args, "photo_url")?,
        notes: optional_string(args, "notes")?,
    })?;
    Ok(json!({
        "post": post_json(&written.post),
        "tasks": written.tasks.iter().map(task_json).collect::<Vec<_>>(),
    }))
}

fn escalate(service: &mut WorkflowService, args: &Args) -> Result<Value, WorkflowError> {
    let written = service.escalate(EscalateInput {
        post_id: require_string(args, "post_id")?,
        department: require_string(args, "department")?,
        actor: require_actor(args)?,
        escalated_from: optional_string(args, "escalated_from")?,
        expected_revision: optional_i64(args, "expected_revision")?,
    })?;
    Ok(json!({ "task": task_json(&written.task), "post": post_json(&written.post) }))
}

fn transition(service: &mut WorkflowService, args: &Args) -> Result<Value, WorkflowError> {
    let module_reference = match optional_object(args, "module_reference")? {
        Some(reference) => Some(ModuleReference {
            kind: ModuleReferenceKind::parse(&require_string(reference, "type")?),
            id: require_string(reference, "id")?,
        }),
        None => optional_string(args, "work_order_id")?.map(|id| ModuleReference {
            kind: ModuleReferenceKind::WorkOrder,
            id,
        }),
    };
    let written = service.transition(TransitionInput {
        task_id: require_string(args, "task_id")?,
        status: require_string(args, "status")?,
        actor: require_actor(args)?,
        notes: optional_string(args, "notes")?,
        form_type: optional_string(args, "form_type")?,
        module_reference,
        expected_revision: optional_i64(args, "expected_revision")?,
    })?;
    Ok(json!({ "task": task_json(&written.task), "post": post_json(&written.post) }))
}

fn form_ref(args: &Args) -> Result<FormRef, WorkflowError> {
    Ok(FormRef::new(
        require_string(args, "form_type")?,
        require_string(args, "form_id")?,
    ))
}
