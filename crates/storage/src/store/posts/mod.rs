#![forbid(unsafe_code)]

mod create;
mod escalate;
mod queries;
mod transition;
