//! CLI command implementations.

mod config;
mod doctor;
mod explain;
mod serve;
mod transcript;

pub use config::run_config;
pub use doctor::run_doctor;
pub use explain::run_explain;
pub use serve::run_serve;
pub use transcript::run_transcript;
