pub mod history;
pub mod rate_limit;
pub mod server;
pub mod supervisor;

use crate::niri;
use crate::util::config::AppConfig;
use crate::util::threads::ThreadRegistry;
use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

/// Wire explicitly-constructed tracker, supervisor, and query API instances
/// together and block until shutdown (Ctrl-C / SIGTERM).
pub fn run(config: &AppConfig) -> Result<()> {
    let threads = ThreadRegistry::new();
    let tracker = Arc::new(history::HistoryTracker::new());

    let supervisor = Arc::new(supervisor::EventStreamSupervisor::new(
        niri::event_stream_spec(&config.niri_bin),
        supervisor::RestartPolicy {
            backoff_floor: config.backoff_floor(),
            backoff_ceiling: config.backoff_ceiling(),
            cooldown: config.cooldown(),
        },
        Arc::clone(&tracker),
    ));
    let supervisor_handle = supervisor
        .spawn(&threads)
        .context("spawn event-stream supervisor")?;

    let state = server::ApiState::new(Arc::clone(&tracker), config.max_requests_per_minute);
    let server_handle = match server::spawn_http_server(
        config.listen_port,
        state,
        Arc::clone(&supervisor),
        &threads,
    ) {
        Ok(handle) => handle,
        Err(e) => {
            supervisor.shutdown();
            let _ = supervisor_handle.join();
            return Err(e).context("spawn query API server");
        }
    };

    info!("history daemon running");

    server_handle
        .join()
        .map_err(|_| anyhow::anyhow!("query API thread panicked"))?;
    // The server triggers supervisor shutdown on its way out.
    supervisor_handle
        .join()
        .map_err(|_| anyhow::anyhow!("supervisor thread panicked"))?;

    info!("history daemon stopped");
    Ok(())
}
