use anyhow::{Context, Result};
use std::path::PathBuf;

use super::state::UiState;

fn current_snapshot(state: &UiState) -> Result<&crate::model::DashboardSnapshot> {
    state.snapshot.as_ref().context("nothing loaded yet")
}

pub fn export_view_json(state: &UiState) -> Result<PathBuf> {
    let snapshot = current_snapshot(state)?;
    let path = crate::export::default_export_path("json")?;
    crate::export::export_json(&path, snapshot)?;
    Ok(path)
}

pub fn export_view_csv(state: &UiState) -> Result<PathBuf> {
    let snapshot = current_snapshot(state)?;
    let path = crate::export::default_export_path("csv")?;
    crate::export::export_csv(&path, &snapshot.view)?;
    Ok(path)
}

/// Run an export and report the outcome on the status line.
pub fn export_and_show_path(
    state: &mut UiState,
    kind: &str,
    export: fn(&UiState) -> Result<PathBuf>,
) {
    match export(state) {
        Ok(p) => {
            tracing::info!(path = %p.display(), kind, "view exported");
            state.info = format!("Exported {kind}: {}", p.display());
        }
        Err(e) => {
            tracing::warn!(error = %e, kind, "view export failed");
            state.info = format!("{kind} export failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_without_snapshot_reports_failure() {
        let mut state = UiState::default();
        export_and_show_path(&mut state, "JSON", export_view_json);
        assert_eq!(state.info, "JSON export failed: nothing loaded yet");
    }
}
