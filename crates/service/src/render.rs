#![forbid(unsafe_code)]

use crate::time::ts_ms_to_rfc3339;
use pf_core::{
    Actor, DepartmentTask, EvidenceLink, IncidentPost, IncidentTemplate, PostSummary,
    TaskProvenance,
};
use pf_storage::{EventRow, IncidentDetail, WorkOrderLink};
use serde_json::{Value, json};

fn actor_json(actor: &Actor) -> Value {
    json!({ "id": actor.id, "display_name": actor.display_name })
}

fn ts_json(ts_ms: Option<i64>) -> Value {
    match ts_ms {
        Some(ts_ms) => Value::String(ts_ms_to_rfc3339(ts_ms)),
        None => Value::Null,
    }
}

pub(crate) fn post_json(post: &IncidentPost) -> Value {
    let form_data = serde_json::from_str::<Value>(&post.form_data_json).unwrap_or(Value::Null);
    json!({
        "id": post.id.as_str(),
        "post_number": post.post_number,
        "template_id": post.template_id,
        "template_name": post.template_snapshot.name,
        "created_by": actor_json(&post.created_by),
        "facility": post.facility,
        "location": post.location,
        "form_data": form_data,
        "photo_url": post.photo_url,
        "notes": post.notes,
        "status": post.status.as_str(),
        "total_departments": post.total_departments,
        "completed_departments": post.completed_departments,
        "completion_rate": post.completion_rate,
        "completed_at": ts_json(post.completed_at_ms),
        "hold_status": post.hold_status.as_str(),
        "revision": post.revision,
        "created_at": ts_json(Some(post.created_at_ms)),
        "updated_at": ts_json(Some(post.updated_at_ms)),
    })
}

pub(crate) fn task_json(task: &DepartmentTask) -> Value {
    let provenance = match &task.provenance {
        TaskProvenance::Original => json!({ "kind": "original" }),
        TaskProvenance::Escalated {
            initiated_by,
            escalated_from,
        } => json!({
            "kind": "escalated",
            "initiated_by": actor_json(initiated_by),
            "escalated_from": escalated_from.as_ref().map(|code| code.as_str()),
        }),
    };
    let module_reference = task.module_reference.as_ref().map(|reference| {
        json!({ "type": reference.kind.as_str(), "id": reference.id })
    });
    json!({
        "id": task.id.as_str(),
        "post_id": task.post_id.as_str(),
        "department_code": task.department_code.as_str(),
        "department_name": task.department_name,
        "status": task.status.as_str(),
        "requires_signoff": task.requires_signoff,
        "resolved": task.is_resolved(),
        "is_original": task.is_original(),
        "provenance": provenance,
        "completed_by": task.completed_by.as_ref().map(actor_json),
        "completed_at": ts_json(task.completed_at_ms),
        "completion_notes": task.completion_notes,
        "signed_off_by": task.signed_off_by.as_ref().map(actor_json),
        "signed_off_at": ts_json(task.signed_off_at_ms),
        "form_type": task.form_type,
        "module_reference": module_reference,
    })
}

pub(crate) fn work_order_json(link: &WorkOrderLink) -> Value {
    let row = link.row.as_ref().map(|row| {
        json!({
            "title": row.title,
            "description": row.description,
            "status": row.status,
            "source_post_id": row.source_post_id,
            "created_at": ts_json(row.created_at_ms),
        })
    });
    json!({ "id": link.id, "via": link.via.as_str(), "work_order": row })
}

pub(crate) fn detail_json(detail: &IncidentDetail) -> Value {
    json!({
        "source": detail.source.as_str(),
        "post": post_json(&detail.post),
        "tasks": detail.tasks.iter().map(task_json).collect::<Vec<_>>(),
        "hold": detail.hold.as_str(),
        "production_blocked": detail.hold.is_blocking(),
        "work_orders": detail.work_orders.iter().map(work_order_json).collect::<Vec<_>>(),
    })
}

pub(crate) fn summary_json(summary: &PostSummary) -> Value {
    json!({
        "id": summary.id.as_str(),
        "post_number": summary.post_number,
        "template_name": summary.template_name,
        "facility": summary.facility,
        "location": summary.location,
        "author": summary.author,
        "status": summary.status.as_str(),
        "completion_rate": summary.completion_rate,
        "hold_status": summary.hold_status.as_str(),
        "created_at": ts_json(Some(summary.created_at_ms)),
    })
}

pub(crate) fn event_json(event: &EventRow) -> Value {
    crate::notify::notification_json(event)
}

pub(crate) fn evidence_json(link: &EvidenceLink) -> Value {
    match link {
        EvidenceLink::Disabled => json!({ "enabled": false }),
        EvidenceLink::Enabled {
            post_id,
            post_number,
        } => json!({
            "enabled": true,
            "post_id": post_id.as_str(),
            "post_number": post_number,
        }),
    }
}

pub(crate) fn template_json(template: &IncidentTemplate) -> Value {
    let departments = template
        .departments
        .iter()
        .map(|code| {
            let forms = template
                .forms_for(code)
                .iter()
                .map(|form| {
                    json!({
                        "form_id": form.form_id,
                        "form_type": form.form_type,
                        "route": form.route,
                        "required": form.required,
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "code": code.as_str(),
                "name": code.display_name(),
                "requires_signoff": template.requires_signoff(code),
                "forms": forms,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "id": template.id,
        "name": template.name,
        "description": template.description,
        "production_hold": template.is_production_hold,
        "photo_required": template.photo_required,
        "departments": departments,
    })
}
