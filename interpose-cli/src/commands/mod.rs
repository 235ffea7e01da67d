//! CLI command implementations.

pub mod check;
pub mod run;

pub use check::check_scenario;
pub use run::run_scenario;
