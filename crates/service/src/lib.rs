#![forbid(unsafe_code)]

mod args;
pub mod config;
pub mod error;
pub mod notify;
pub mod protocol;
mod render;
mod service;
pub mod session_log;
pub mod templates;
pub mod time;

pub use config::Config;
pub use error::{ErrorKind, WorkflowError};
pub use notify::{JsonLinesSink, MemorySink, NotificationSink, NullSink};
pub use protocol::{LineOutcome, handle_line};
pub use service::{CreatePostInput, EscalateInput, TransitionInput, WorkflowService};
pub use session_log::SessionLog;
