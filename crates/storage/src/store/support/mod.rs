#![forbid(unsafe_code)]

mod counters;
mod events;
mod recompute;
mod rows;
mod schema;
mod snapshot;
mod sqlite;
mod tasks;

pub(super) use counters::*;
pub(super) use events::*;
pub(super) use recompute::*;
pub(super) use rows::*;
pub(super) use schema::{install_schema, preflight_gate};
pub(super) use snapshot::*;
pub(super) use sqlite::*;
pub(super) use tasks::*;
