//! Application-level orchestration utilities.
//!
//! This module owns the dashboard lifecycle (loading, analysis jobs, teardown) and the
//! post-load processing such as exports. UI/CLI layers call into this module to keep
//! responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, DashboardController, UiCommand};
pub(crate) use post_process::process_view_output;
