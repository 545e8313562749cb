#![forbid(unsafe_code)]

use crate::config::Config;
use crate::error::{ErrorKind, WorkflowError};
use crate::notify::NotificationSink;
use crate::templates::load_registry;
use crate::time::now_ms_i64;
use pf_core::{
    Actor, DepartmentCode, EvidenceLink, FormRef, HoldStatus, IncidentTemplate, ModuleReference,
    PostId, PostSummary, TaskId, TaskStatus, TemplateRegistry,
};
use pf_storage::{
    CreatePostRequest, EscalateRequest, EventRow, IncidentDetail, PostWrite,
    SetEvidenceLinkRequest, SqliteStore, TaskWrite, TransitionRequest, WorkOrderLink,
};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 200;
pub const DEFAULT_EVENT_LIMIT: usize = 100;

#[derive(Clone, Debug)]
pub struct CreatePostInput {
    pub template: String,
    /// Explicit department set for this incident; `None` keeps the template's.
    pub departments: Option<Vec<String>>,
    pub actor: Actor,
    pub facility: String,
    pub location: Option<String>,
    pub form_data: Option<serde_json::Value>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EscalateInput {
    pub post_id: String,
    pub department: String,
    pub actor: Actor,
    pub escalated_from: Option<String>,
    pub expected_revision: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct TransitionInput {
    pub task_id: String,
    pub status: String,
    pub actor: Actor,
    pub notes: Option<String>,
    pub form_type: Option<String>,
    pub module_reference: Option<ModuleReference>,
    pub expected_revision: Option<i64>,
}

/// Synchronous workflow front door: template lookup, identifier validation, store calls and
/// post-commit notification fan-out.
pub struct WorkflowService {
    store: SqliteStore,
    registry: TemplateRegistry,
    sink: Box<dyn NotificationSink>,
    search_window: usize,
    last_notify_failure: Option<String>,
}

impl WorkflowService {
    pub fn new(
        store: SqliteStore,
        registry: TemplateRegistry,
        sink: Box<dyn NotificationSink>,
        search_window: usize,
    ) -> Self {
        Self {
            store,
            registry,
            sink,
            search_window: search_window.max(1),
            last_notify_failure: None,
        }
    }

    pub fn open(config: &Config, sink: Box<dyn NotificationSink>) -> Result<Self, WorkflowError> {
        let registry = match &config.templates_path {
            Some(path) => load_registry(path)?,
            None => TemplateRegistry::builtin(),
        };
        let store = SqliteStore::open_with_timeout(&config.storage_dir, config.store_timeout())?;
        Ok(Self::new(store, registry, sink, config.search_window))
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn template(&self, query: &str) -> Result<&IncidentTemplate, WorkflowError> {
        Ok(self.registry.lookup(query)?)
    }

    /// Most recent notification delivery failure, cleared on read.
    pub fn take_notify_failure(&mut self) -> Option<String> {
        self.last_notify_failure.take()
    }

    pub fn create_post(&mut self, input: CreatePostInput) -> Result<PostWrite, WorkflowError> {
        let template = self.template(&input.template)?.clone();
        let departments = input
            .departments
            .map(|codes| {
                codes
                    .iter()
                    .map(DepartmentCode::try_new)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let photo_url = non_blank(input.photo_url);
        if template.photo_required && photo_url.is_none() {
            return Err(WorkflowError::invalid_input(format!(
                "a photo is required for '{}' incidents",
                template.name
            ))
            .with_id("template", template.name.clone()));
        }
        let written = self.store.create_post(CreatePostRequest {
            template,
            departments,
            actor: checked_actor(input.actor)?,
            facility: input.facility,
            location: non_blank(input.location),
            form_data_json: input.form_data.map(|value| value.to_string()),
            photo_url,
            notes: non_blank(input.notes),
            at_ms: now_ms_i64(),
        })?;
        self.publish(&written.events);
        Ok(written)
    }

    pub fn escalate(&mut self, input: EscalateInput) -> Result<TaskWrite, WorkflowError> {
        let post_id = PostId::try_new(input.post_id)?;
        let department = DepartmentCode::try_new(&input.department)?;
        let escalated_from = input
            .escalated_from
            .as_deref()
            .map(DepartmentCode::try_new)
            .transpose()?;
        let written = self
            .store
            .escalate(EscalateRequest {
                post_id: post_id.clone(),
                department,
                initiated_by: checked_actor(input.actor)?,
                escalated_from,
                expected_revision: input.expected_revision,
                at_ms: now_ms_i64(),
            })
            .map_err(|err| with_post_id(err.into(), &post_id))?;
        self.publish(&written.events);
        Ok(written)
    }

    pub fn transition(&mut self, input: TransitionInput) -> Result<TaskWrite, WorkflowError> {
        let task_id = TaskId::try_new(input.task_id)?;
        let Some(status) = TaskStatus::parse(&input.status) else {
            return Err(WorkflowError::invalid_input(format!(
                "status must be one of pending, in_progress, completed, signed_off (got '{}')",
                input.status
            )));
        };
        let written = self
            .store
            .transition(TransitionRequest {
                task_id: task_id.clone(),
                status,
                actor: checked_actor(input.actor)?,
                notes: non_blank(input.notes),
                form_type: non_blank(input.form_type),
                module_reference: input.module_reference,
                expected_revision: input.expected_revision,
                at_ms: now_ms_i64(),
            })
            .map_err(|err| {
                let err = WorkflowError::from(err);
                if err.kind == ErrorKind::NotFound {
                    err.with_id("task_id", task_id.as_str())
                } else {
                    err
                }
            })?;
        self.publish(&written.events);
        Ok(written)
    }

    pub fn get_detail(&self, post_id: &str) -> Result<IncidentDetail, WorkflowError> {
        let post_id = PostId::try_new(post_id)?;
        self.store
            .get_detail(post_id.as_str())?
            .ok_or_else(|| unknown_post(&post_id))
    }

    pub fn evaluate_hold(&self, post_id: &str) -> Result<HoldStatus, WorkflowError> {
        Ok(self.get_detail(post_id)?.hold)
    }

    pub fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<PostSummary>, WorkflowError> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        Ok(self.store.search_posts(query, limit, self.search_window)?)
    }

    pub fn resolve_work_orders(&self, post_id: &str) -> Result<Vec<WorkOrderLink>, WorkflowError> {
        let post_id = PostId::try_new(post_id)?;
        self.store
            .resolve_work_orders(post_id.as_str())
            .map_err(|err| with_post_id(err.into(), &post_id))
    }

    pub fn set_evidence_link(
        &mut self,
        form: FormRef,
        post_id: Option<&str>,
        actor: Actor,
    ) -> Result<EvidenceLink, WorkflowError> {
        let post_id = post_id.map(PostId::try_new).transpose()?;
        let written = self
            .store
            .set_evidence_link(SetEvidenceLinkRequest {
                form,
                post_id: post_id.clone(),
                actor: checked_actor(actor)?,
                at_ms: now_ms_i64(),
            })
            .map_err(|err| match &post_id {
                Some(post_id) => with_post_id(err.into(), post_id),
                None => err.into(),
            })?;
        self.publish(&written.events);
        Ok(written.link)
    }

    pub fn get_evidence_link(&self, form: &FormRef) -> Result<EvidenceLink, WorkflowError> {
        Ok(self.store.get_evidence_link(form)?)
    }

    pub fn production_blocked(
        &self,
        facility: &str,
        location: Option<&str>,
    ) -> Result<bool, WorkflowError> {
        Ok(self.store.production_blocked(facility, location)?)
    }

    pub fn active_holds(&self, facility: &str) -> Result<Vec<PostSummary>, WorkflowError> {
        Ok(self.store.active_holds(facility)?)
    }

    pub fn list_events(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRow>, WorkflowError> {
        Ok(self.store.list_events(since, limit)?)
    }

    fn publish(&mut self, events: &[EventRow]) {
        for event in events {
            if let Err(err) = self.sink.publish(event) {
                self.last_notify_failure = Some(format!("{}: {err}", event.event_id()));
            }
        }
    }
}

fn checked_actor(actor: Actor) -> Result<Actor, WorkflowError> {
    let id = actor.id.trim().to_string();
    if id.is_empty() {
        return Err(WorkflowError::invalid_input("actor.id is required"));
    }
    let display_name = match actor.display_name.trim() {
        "" => id.clone(),
        name => name.to_string(),
    };
    Ok(Actor { id, display_name })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unknown_post(post_id: &PostId) -> WorkflowError {
    WorkflowError::not_found(format!("no incident or legacy verification with id {post_id}"))
        .with_id("post_id", post_id.as_str())
}

fn with_post_id(err: WorkflowError, post_id: &PostId) -> WorkflowError {
    if err.kind == ErrorKind::NotFound {
        return unknown_post(post_id);
    }
    if err.ids.contains_key("post_id") {
        return err;
    }
    err.with_id("post_id", post_id.as_str())
}
