// avh-core: Device-run orchestration between avh-api and the avh-run binary.

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod provision;
pub mod runner;
pub mod select;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{ConsoleStream, VirtualHardware};
pub use config::{InstanceSource, RunConfig, ScenarioTiming, TlsVerification, WaitPolicy};
pub use error::CoreError;
pub use runner::{Phase, RunError, RunReport, build_client, run};
