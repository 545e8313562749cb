#![forbid(unsafe_code)]

mod events;
mod links;
mod posts;

pub use events::*;
pub use links::*;
pub use posts::*;
