#![forbid(unsafe_code)]

use crate::error::WorkflowError;
use pf_core::Actor;
use serde_json::{Map, Value};

pub(crate) type Args = Map<String, Value>;

pub(crate) fn require_string(args: &Args, key: &str) -> Result<String, WorkflowError> {
    match args.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.to_string()),
        Some(Value::String(_)) => Err(WorkflowError::invalid_input(format!(
            "{key} must not be empty"
        ))),
        Some(Value::Null) | None => Err(WorkflowError::invalid_input(format!("{key} is required"))),
        Some(_) => Err(WorkflowError::invalid_input(format!("{key} must be a string"))),
    }
}

pub(crate) fn optional_string(args: &Args, key: &str) -> Result<Option<String>, WorkflowError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.to_string())),
        Some(_) => Err(WorkflowError::invalid_input(format!("{key} must be a string"))),
    }
}

pub(crate) fn optional_i64(args: &Args, key: &str) -> Result<Option<i64>, WorkflowError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| WorkflowError::invalid_input(format!("{key} must be an integer"))),
        Some(_) => Err(WorkflowError::invalid_input(format!("{key} must be an integer"))),
    }
}

pub(crate) fn optional_usize(args: &Args, key: &str) -> Result<Option<usize>, WorkflowError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                WorkflowError::invalid_input(format!("{key} must be a positive integer"))
            }),
        Some(_) => Err(WorkflowError::invalid_input(format!(
            "{key} must be a positive integer"
        ))),
    }
}

pub(crate) fn optional_string_list(
    args: &Args,
    key: &str,
) -> Result<Option<Vec<String>>, WorkflowError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    WorkflowError::invalid_input(format!("{key} must be a list of strings"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(WorkflowError::invalid_input(format!(
            "{key} must be a list of strings"
        ))),
    }
}

pub(crate) fn optional_object<'a>(
    args: &'a Args,
    key: &str,
) -> Result<Option<&'a Args>, WorkflowError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(WorkflowError::invalid_input(format!("{key} must be an object"))),
    }
}

/// `actor: { id, display_name? }`; every mutating op requires one.
pub(crate) fn require_actor(args: &Args) -> Result<Actor, WorkflowError> {
    let Some(actor) = optional_object(args, "actor")? else {
        return Err(WorkflowError::invalid_input("actor is required"));
    };
    let id = require_string(actor, "id")
        .map_err(|_| WorkflowError::invalid_input("actor.id is required"))?;
    let display_name = optional_string(actor, "display_name")?.unwrap_or_else(|| id.clone());
    Ok(Actor::new(id, display_name))
}
