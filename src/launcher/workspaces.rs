use crate::launcher::{Entry, Source};
use crate::niri;
use anyhow::{bail, Context, Result};

const PREFIX: &str = "workspace";
const SWITCH: &str = "switch";
const MOVE: &str = "move";

/// Niri workspaces, two entries each: switch to the workspace, or move the
/// active window onto it.
pub struct WorkspacesSource {
    niri_bin: String,
}

impl WorkspacesSource {
    pub fn new(niri_bin: &str) -> Self {
        Self {
            niri_bin: niri_bin.to_string(),
        }
    }
}

impl Source for WorkspacesSource {
    fn name(&self) -> &'static str {
        "workspaces"
    }

    fn prefix(&self) -> &'static str {
        PREFIX
    }

    fn list(&self) -> Result<Vec<Entry>> {
        let workspaces = niri::list_workspaces(&self.niri_bin)?;

        let mut entries = Vec::with_capacity(workspaces.len() * 2);
        for workspace in workspaces {
            let label = workspace
                .name
                .clone()
                .unwrap_or_else(|| workspace.idx.to_string());

            entries.push(Entry::new(
                format!("Niri: Switch to workspace {label}"),
                format!("{PREFIX}:{}:{SWITCH}", workspace.id),
            ));
            entries.push(Entry::new(
                format!("Niri: Move active window to workspace {label}"),
                format!("{PREFIX}:{}:{MOVE}", workspace.id),
            ));
        }

        Ok(entries)
    }

    fn handle(&self, entry: &Entry) -> Result<()> {
        let payload = entry
            .id
            .strip_prefix(&format!("{PREFIX}:"))
            .with_context(|| format!("not a workspace id: {}", entry.id))?;
        let (id, verb) = payload
            .split_once(':')
            .with_context(|| format!("workspace id '{payload}' is missing its action"))?;
        let workspace_id: u64 = id
            .parse()
            .with_context(|| format!("not a valid workspace id: '{id}'"))?;

        match verb {
            SWITCH => niri::focus_workspace(&self.niri_bin, workspace_id),
            MOVE => niri::move_window_to_workspace(&self.niri_bin, workspace_id),
            other => bail!("unknown workspace action '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_rejects_unknown_actions_and_bad_ids() {
        let source = WorkspacesSource::new("niri");
        assert!(source.handle(&Entry::new("x", "workspace:3:teleport")).is_err());
        assert!(source.handle(&Entry::new("x", "workspace:3")).is_err());
        assert!(source.handle(&Entry::new("x", "workspace:three:switch")).is_err());
        assert!(source.handle(&Entry::new("x", "window:3")).is_err());
    }
}
