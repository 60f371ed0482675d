use crate::launcher::{Entry, Source};
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;

const PREFIX: &str = "command";

#[derive(Debug, Clone, Deserialize)]
pub struct CannedCommand {
    pub id: String,
    pub description: String,
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CommandsFile {
    #[serde(default)]
    command: Vec<CannedCommand>,
}

/// User-defined shell commands read from `commands.toml` in the config
/// directory. A missing file simply means no command entries.
pub struct CommandsSource {
    path: PathBuf,
}

impl CommandsSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_commands(&self) -> Result<Vec<CannedCommand>> {
        if !self.path.exists() {
            debug!("no commands file at {:?}", self.path);
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read commands file {:?}", self.path))?;
        let file: CommandsFile = toml::from_str(&contents)
            .with_context(|| format!("parse commands file {:?}", self.path))?;
        Ok(file.command)
    }
}

impl Source for CommandsSource {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn prefix(&self) -> &'static str {
        PREFIX
    }

    fn list(&self) -> Result<Vec<Entry>> {
        Ok(self
            .read_commands()?
            .into_iter()
            .map(|command| {
                Entry::new(command.description, format!("{PREFIX}:{}", command.id))
            })
            .collect())
    }

    fn handle(&self, entry: &Entry) -> Result<()> {
        let commands = self.read_commands()?;
        let Some(command) = commands
            .iter()
            .find(|command| format!("{PREFIX}:{}", command.id) == entry.id)
        else {
            bail!("no command found with id {}", entry.id);
        };

        let output = Command::new(&command.executable)
            .args(&command.args)
            .output()
            .with_context(|| format!("run command '{}'", command.id))?;

        if !output.status.success() {
            if !output.stdout.is_empty() {
                warn!(
                    "command '{}' stdout: {}",
                    command.id,
                    String::from_utf8_lossy(&output.stdout)
                );
            }
            if !output.stderr.is_empty() {
                warn!(
                    "command '{}' stderr: {}",
                    command.id,
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            bail!("command '{}' exited with {}", command.id, output.status);
        }

        Ok(())
    }
}
