pub mod commands;
pub mod recency;
pub mod windows;
pub mod workspaces;

use crate::util::config::AppConfig;
use crate::util::paths;
use anyhow::{bail, Context, Result};
use log::warn;
use std::io::Write;

/// One launchable item. The id carries a `<prefix>:` so a later invocation
/// can route the selection back to the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub description: String,
    pub id: String,
}

impl Entry {
    pub fn new(description: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            id: id.into(),
        }
    }

    /// Wire format toward the picker: `description<TAB>id`, one per line.
    /// Tabs and newlines inside the description are flattened so the line
    /// stays parseable.
    pub fn line(&self) -> String {
        format!(
            "{}\t{}",
            self.description.replace(['\t', '\n'], " "),
            self.id.replace(['\t', '\n'], " ")
        )
    }

    /// Parse one selected line as echoed back by the picker.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r', '\0']);
        let (description, id) = line
            .split_once('\t')
            .context("selection is missing the tab-separated id field")?;
        if id.is_empty() {
            bail!("selection has an empty id");
        }
        Ok(Self::new(description, id))
    }

    /// Routing prefix, the id text before the first `:`.
    pub fn prefix(&self) -> Option<&str> {
        self.id.split_once(':').map(|(prefix, _)| prefix)
    }
}

pub trait Source {
    fn name(&self) -> &'static str;
    fn prefix(&self) -> &'static str;
    fn list(&self) -> Result<Vec<Entry>>;
    fn handle(&self, entry: &Entry) -> Result<()>;
}

pub struct SourceSet {
    sources: Vec<Box<dyn Source>>,
}

impl SourceSet {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Result<Self> {
        if sources.is_empty() {
            bail!("invalid source list: expected at least one source");
        }
        for (i, a) in sources.iter().enumerate() {
            if sources[i + 1..].iter().any(|b| b.prefix() == a.prefix()) {
                bail!("duplicate source prefix '{}'", a.prefix());
            }
        }
        Ok(Self { sources })
    }

    pub fn defaults(config: &AppConfig) -> Result<Self> {
        Self::new(vec![
            Box::new(windows::WindowsSource::new(
                &config.niri_bin,
                recency::history_url(config.listen_port),
            )),
            Box::new(workspaces::WorkspacesSource::new(&config.niri_bin)),
            Box::new(commands::CommandsSource::new(paths::commands_file())),
        ])
    }

    /// Concatenate entries from every source. A failing source is logged and
    /// skipped; listing never fails the caller.
    pub fn list(&self) -> Vec<Entry> {
        let mut entries = Vec::new();
        for source in &self.sources {
            match source.list() {
                Ok(mut source_entries) => entries.append(&mut source_entries),
                Err(e) => warn!("error listing {} entries: {:#}", source.name(), e),
            }
        }
        entries
    }

    pub fn write_entries(&self, writer: &mut impl Write) -> Result<()> {
        for entry in self.list() {
            writeln!(writer, "{}", entry.line()).context("write entry")?;
        }
        Ok(())
    }

    /// Route a selected entry to the source whose prefix matches its id.
    pub fn handle(&self, entry: &Entry) -> Result<()> {
        let prefix = entry
            .prefix()
            .with_context(|| format!("id '{}' has no source prefix", entry.id))?;
        let source = self
            .sources
            .iter()
            .find(|source| source.prefix() == prefix)
            .with_context(|| format!("no source for prefix '{prefix}'"))?;
        source.handle(entry)
    }
}
