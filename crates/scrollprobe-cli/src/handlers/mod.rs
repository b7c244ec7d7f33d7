//! Command handlers

pub mod plan;
pub mod run;
pub mod validate;

pub use plan::{build_plan, checkpoints_from, RunPlan};
pub use run::{execute_run, exit_code_for, run_plan, write_report};
pub use validate::{execute_validate, render_plan};
