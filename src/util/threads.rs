use anyhow::{anyhow, Result};
use std::thread::{self, JoinHandle};

/// Factory for the daemon's named worker threads.
#[derive(Clone, Default)]
pub struct ThreadRegistry;

impl ThreadRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn spawn<F>(&self, name: impl Into<String>, f: F) -> Result<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(f)
            .map_err(|e| anyhow!("failed to spawn thread '{name}': {e}"))?;

        Ok(ThreadHandle { name, handle })
    }
}

pub struct ThreadHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl ThreadHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
