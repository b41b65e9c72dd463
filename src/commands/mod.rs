/// Result structs for command output. Commands return these instead of printing
/// directly; main.rs formats them as human-readable or JSON based on --json.
mod config;
mod emit;
mod get;
mod show;

pub use config::*;
pub use emit::*;
pub use get::*;
pub use show::*;
