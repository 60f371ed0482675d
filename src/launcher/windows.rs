use crate::launcher::{recency, Entry, Source};
use crate::niri;
use anyhow::{Context, Result};
use log::warn;

const PREFIX: &str = "window";

/// Open niri windows, sorted most-recently-used first when the history
/// daemon is reachable.
pub struct WindowsSource {
    niri_bin: String,
    history_url: String,
}

impl WindowsSource {
    pub fn new(niri_bin: &str, history_url: String) -> Self {
        Self {
            niri_bin: niri_bin.to_string(),
            history_url,
        }
    }
}

impl Source for WindowsSource {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn prefix(&self) -> &'static str {
        PREFIX
    }

    fn list(&self) -> Result<Vec<Entry>> {
        // No history daemon just means no recency ordering.
        let history = recency::fetch_history(&self.history_url).unwrap_or_else(|e| {
            warn!("error getting history from daemon: {:#}", e);
            Vec::new()
        });

        let mut windows = niri::list_windows(&self.niri_bin)?;
        recency::sort_windows_by_history(&mut windows, &history);

        Ok(windows
            .into_iter()
            .map(|window| {
                let app = window.app_id.as_deref().unwrap_or("unknown");
                let title = window.title.as_deref().unwrap_or(app);
                Entry::new(
                    format!("{title} ({app})"),
                    format!("{PREFIX}:{}", window.id),
                )
            })
            .collect())
    }

    fn handle(&self, entry: &Entry) -> Result<()> {
        let payload = entry
            .id
            .strip_prefix(&format!("{PREFIX}:"))
            .with_context(|| format!("not a window id: {}", entry.id))?;
        let window_id: u64 = payload
            .parse()
            .with_context(|| format!("not a valid window id: '{payload}'"))?;
        niri::focus_window(&self.niri_bin, window_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_rejects_foreign_and_malformed_ids() {
        let source = WindowsSource::new("niri", recency::history_url(17324));
        assert!(source.handle(&Entry::new("x", "workspace:1:switch")).is_err());
        assert!(source.handle(&Entry::new("x", "window:abc")).is_err());
        assert!(source.handle(&Entry::new("x", "window:")).is_err());
    }
}
