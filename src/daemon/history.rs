use serde::Deserialize;
use std::sync::RwLock;

/// One event from `niri msg --json event-stream`, one JSON object per line.
/// Event kinds we do not track fail to deserialize and are ignored.
#[derive(Debug, Deserialize)]
pub enum WindowEvent {
    WindowFocusChanged { id: u64 },
    WindowClosed { id: u64 },
    WindowOpenedOrChanged { window: WindowRef },
}

#[derive(Debug, Deserialize)]
pub struct WindowRef {
    pub id: u64,
}

#[derive(Default)]
struct HistoryState {
    // Most recently active window is last; each id appears at most once.
    window_history: Vec<u64>,
    last_event: String,
}

/// Single source of truth for window recency, shared between the supervisor
/// (sole writer) and the query API (readers).
#[derive(Default)]
pub struct HistoryTracker {
    state: RwLock<HistoryState>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one raw line from the event stream. The raw text is always
    /// recorded for diagnostics; lines that fail to parse are otherwise a
    /// no-op so a malformed event can never take the stream down.
    pub fn record_event(&self, line: &str) {
        let mut state = self.state.write().expect("history lock poisoned");
        state.last_event = line.to_string();

        match serde_json::from_str::<WindowEvent>(line) {
            Ok(WindowEvent::WindowFocusChanged { id }) => bump(&mut state.window_history, id),
            Ok(WindowEvent::WindowOpenedOrChanged { window }) => {
                bump(&mut state.window_history, window.id)
            }
            Ok(WindowEvent::WindowClosed { id }) => {
                state.window_history.retain(|&known| known != id)
            }
            Err(_) => {}
        }
    }

    /// Recency ordering, most recently active last. Returns an independent
    /// copy; the live list is never exposed.
    pub fn history(&self) -> Vec<u64> {
        self.state
            .read()
            .expect("history lock poisoned")
            .window_history
            .clone()
    }

    /// Last raw event line seen, empty before the first event.
    pub fn last_event(&self) -> String {
        self.state
            .read()
            .expect("history lock poisoned")
            .last_event
            .clone()
    }
}

// Move `id` to the most-recent end, dropping any earlier occurrence.
fn bump(history: &mut Vec<u64>, id: u64) {
    history.retain(|&known| known != id);
    history.push(id);
}
