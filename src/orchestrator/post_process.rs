//! Post-load processing utilities.
//!
//! Handles exports of the current view once the headless modes have settled.

use crate::cli::Cli;
use crate::export;
use crate::model::DashboardSnapshot;

/// Result of post-load processing, ready for presentation layers.
pub(crate) struct ProcessedView {
    pub export_messages: Vec<String>,
    pub job_message: Option<String>,
}

/// Run the requested exports and describe how the analysis job ended, if one was run.
pub(crate) fn process_view_output(args: &Cli, snapshot: &DashboardSnapshot) -> ProcessedView {
    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match export::export_json(export_path, snapshot) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = args.export_csv.as_deref() {
        match export::export_csv(export_path, &snapshot.view) {
            Ok(_) => export_messages.push(format!("Exported CSV: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
        }
    }

    let job_message = args.analyze.then(|| {
        let job = &snapshot.job;
        match job.error_message.as_deref() {
            Some(msg) => format!("Analysis {:?}: {msg}", job.phase),
            None => format!(
                "Analysis {:?} (last run {})",
                job.phase,
                job.last_completed_at.as_deref().unwrap_or("-")
            ),
        }
    });

    ProcessedView {
        export_messages,
        job_message,
    }
}
