//! Outbound IRC commands.

mod serialize;
mod types;

pub use self::types::Command;
