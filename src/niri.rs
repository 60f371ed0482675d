use crate::daemon::supervisor::StreamSpec;
use anyhow::{bail, Context, Result};
use log::warn;
use serde::Deserialize;
use std::process::Command;

/// Subset of `niri msg --json windows` output we care about; unknown fields
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Window {
    pub id: u64,
    pub title: Option<String>,
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Workspace {
    pub id: u64,
    pub idx: u8,
    pub name: Option<String>,
    pub is_active: bool,
    pub is_focused: bool,
}

/// Command line the supervisor keeps alive for the lifetime of the daemon.
pub fn event_stream_spec(niri_bin: &str) -> StreamSpec {
    StreamSpec {
        program: niri_bin.to_string(),
        args: vec![
            "msg".to_string(),
            "--json".to_string(),
            "event-stream".to_string(),
        ],
    }
}

pub fn list_windows(niri_bin: &str) -> Result<Vec<Window>> {
    let stdout = run_query(niri_bin, "windows")?;
    serde_json::from_slice(&stdout).context("parse niri window list")
}

pub fn list_workspaces(niri_bin: &str) -> Result<Vec<Workspace>> {
    let stdout = run_query(niri_bin, "workspaces")?;
    serde_json::from_slice(&stdout).context("parse niri workspace list")
}

pub fn focus_window(niri_bin: &str, id: u64) -> Result<()> {
    run_action(niri_bin, &["focus-window", "--id", &id.to_string()])
}

pub fn focus_workspace(niri_bin: &str, id: u64) -> Result<()> {
    run_action(niri_bin, &["focus-workspace", &id.to_string()])
}

pub fn move_window_to_workspace(niri_bin: &str, id: u64) -> Result<()> {
    run_action(niri_bin, &["move-window-to-workspace", &id.to_string()])
}

fn run_query(niri_bin: &str, subject: &str) -> Result<Vec<u8>> {
    let output = Command::new(niri_bin)
        .args(["msg", "--json", subject])
        .output()
        .with_context(|| format!("run {niri_bin} msg --json {subject}"))?;

    if !output.status.success() {
        log_process_output(subject, &output);
        bail!("niri msg --json {} exited with {}", subject, output.status);
    }

    Ok(output.stdout)
}

fn run_action(niri_bin: &str, action: &[&str]) -> Result<()> {
    let output = Command::new(niri_bin)
        .args(["msg", "action"])
        .args(action)
        .output()
        .with_context(|| format!("run {niri_bin} msg action {}", action.join(" ")))?;

    if !output.status.success() {
        log_process_output(action[0], &output);
        bail!("niri msg action {} exited with {}", action[0], output.status);
    }

    Ok(())
}

fn log_process_output(what: &str, output: &std::process::Output) {
    if !output.stdout.is_empty() {
        warn!(
            "niri {} stdout: {}",
            what,
            String::from_utf8_lossy(&output.stdout)
        );
    }
    if !output.stderr.is_empty() {
        warn!(
            "niri {} stderr: {}",
            what,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_list_with_extra_and_missing_fields() {
        let json = r#"[
            {"id": 5, "title": "shell", "app_id": "Alacritty", "pid": 4242, "is_focused": true},
            {"id": 9, "title": null, "app_id": null}
        ]"#;
        let windows: Vec<Window> = serde_json::from_str(json).expect("parse windows");
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].id, 5);
        assert_eq!(windows[0].app_id.as_deref(), Some("Alacritty"));
        assert!(windows[1].title.is_none());
    }

    #[test]
    fn parses_workspace_list() {
        let json = r#"[
            {"id": 1, "idx": 1, "name": null, "is_active": true, "is_focused": true, "output": "eDP-1"},
            {"id": 2, "idx": 2, "name": "mail", "is_active": false, "is_focused": false}
        ]"#;
        let workspaces: Vec<Workspace> = serde_json::from_str(json).expect("parse workspaces");
        assert_eq!(workspaces[1].name.as_deref(), Some("mail"));
        assert!(workspaces[0].is_focused);
    }

    #[test]
    fn event_stream_spec_requests_json_events() {
        let spec = event_stream_spec("niri");
        assert_eq!(spec.program, "niri");
        assert_eq!(spec.args, ["msg", "--json", "event-stream"]);
    }
}
