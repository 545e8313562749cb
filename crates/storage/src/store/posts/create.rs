#![forbid(unsafe_code)]

use super::super::*;
use pf_core::{
    DepartmentCode, DepartmentTask, EventKind, HoldStatus, IncidentPost, PostId, PostStatus,
    TaskId, TaskProvenance, TaskStatus, evaluate_hold, ids::post_number_from_seq,
};
use rusqlite::params;
use serde_json::json;

impl SqliteStore {
    /// Fans a new incident out into one pending task per assigned department, atomically.
    pub fn create_post(&mut self, request: CreatePostRequest) -> Result<PostWrite, StoreError> {
        let CreatePostRequest {
            template,
            departments,
            actor,
            facility,
            location,
            form_data_json,
            photo_url,
            notes,
            at_ms,
        } = request;

        let assigned = dedupe_departments(departments.unwrap_or_else(|| template.departments.clone()));
        if assigned.is_empty() {
            return Err(StoreError::InvalidTemplate {
                template: template.name.clone(),
            });
        }
        let facility = facility.trim().to_string();
        if facility.is_empty() {
            return Err(StoreError::InvalidInput("facility is required"));
        }
        let form_data_json = match form_data_json {
            None => "{}".to_string(),
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|_| StoreError::InvalidInput("form_data must be valid JSON"))?;
                value.to_string()
            }
        };

        let tx = self.write_tx()?;
        let seq = next_counter_tx(&tx, "post_seq")?;
        let post_id = PostId::from_seq(seq);
        let post_number = post_number_from_seq(seq);
        let hold = evaluate_hold(template.is_production_hold, false, false);
        let total = u32::try_from(assigned.len())
            .map_err(|_| StoreError::InvalidInput("too many departments"))?;

        tx.execute(
            r#"
            INSERT INTO posts(
              id, seq, post_number, template_id, template_name, template_json,
              created_by_id, created_by_name, facility, location, form_data_json,
              photo_url, notes, status, total_departments, completed_departments,
              completion_rate, completed_at_ms, hold_status, revision, created_at_ms, updated_at_ms)
            VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,0,0.0,NULL,?16,0,?17,?17)
            "#,
            params![
                post_id.as_str(),
                seq,
                post_number,
                template.id,
                template.name,
                template_to_json(&template),
                actor.id,
                actor.display_name,
                facility,
                location,
                form_data_json,
                photo_url,
                notes,
                PostStatus::Pending.as_str(),
                i64::from(total),
                hold.as_str(),
                at_ms
            ],
        )?;

        let mut events = vec![insert_event_tx(
            &tx,
            EventInsert {
                ts_ms: at_ms,
                post_id: Some(post_id.as_str()),
                task_id: None,
                kind: EventKind::PostCreated,
                payload: json!({
                    "post_number": post_number,
                    "template": template.name,
                    "facility": facility,
                    "location": location,
                    "created_by": actor.id,
                    "departments": assigned.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                }),
            },
        )?];

        let mut tasks = Vec::with_capacity(assigned.len());
        for code in assigned {
            let task_seq = next_counter_tx(&tx, "task_seq")?;
            let task = DepartmentTask {
                id: TaskId::from_seq(task_seq),
                post_id: post_id.clone(),
                department_name: code.display_name(),
                requires_signoff: template.requires_signoff(&code),
                department_code: code,
                status: TaskStatus::Pending,
                provenance: TaskProvenance::Original,
                completed_by: None,
                completed_at_ms: None,
                completion_notes: None,
                signed_off_by: None,
                signed_off_at_ms: None,
                form_type: None,
                module_reference: None,
                created_at_ms: at_ms,
                updated_at_ms: at_ms,
            };
            insert_task_tx(&tx, &task)?;
            events.push(insert_event_tx(
                &tx,
                EventInsert {
                    ts_ms: at_ms,
                    post_id: Some(post_id.as_str()),
                    task_id: Some(task.id.as_str()),
                    kind: EventKind::DepartmentAssigned,
                    payload: json!({
                        "post_number": post_number,
                        "department": task.department_code.as_str(),
                        "requires_signoff": task.requires_signoff,
                    }),
                },
            )?);
            tasks.push(task);
        }

        if hold == HoldStatus::Active {
            events.push(insert_event_tx(
                &tx,
                EventInsert {
                    ts_ms: at_ms,
                    post_id: Some(post_id.as_str()),
                    task_id: None,
                    kind: EventKind::HoldActivated,
                    payload: json!({
                        "post_number": post_number,
                        "facility": facility,
                        "location": location,
                    }),
                },
            )?);
        }

        tx.commit()?;

        let post = IncidentPost {
            id: post_id,
            post_number,
            template_id: template.id.clone(),
            template_snapshot: template,
            created_by: actor,
            facility,
            location,
            form_data_json,
            photo_url,
            notes,
            status: PostStatus::Pending,
            total_departments: total,
            completed_departments: 0,
            completion_rate: 0.0,
            completed_at_ms: None,
            hold_status: hold,
            revision: 0,
            created_at_ms: at_ms,
            updated_at_ms: at_ms,
        };
        Ok(PostWrite {
            post,
            tasks,
            events,
        })
    }
}

fn dedupe_departments(codes: Vec<DepartmentCode>) -> Vec<DepartmentCode> {
    let mut out: Vec<DepartmentCode> = Vec::with_capacity(codes.len());
    for code in codes {
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}
