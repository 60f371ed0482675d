use crate::niri::Window;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

pub fn history_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}/api/v1/history")
}

/// Fetch the recency ordering from the history daemon, most recent last.
/// Callers treat any failure as "no recency information available".
pub fn fetch_history(url: &str) -> Result<Vec<u64>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("build history client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("read {url}"))?;
    if !response.status().is_success() {
        bail!("history query returned status {}", response.status());
    }

    response.json().context("parse history JSON")
}

/// Sort windows in place, most recently focused first. Windows absent from
/// history sort after all present ones and keep their original relative
/// order; the caller-supplied order is the explicit tie-break.
pub fn sort_windows_by_history(windows: &mut [Window], history: &[u64]) {
    let position: HashMap<u64, usize> = history
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();

    // History is most-recent-last, so a higher position sorts earlier.
    // sort_by is stable, which preserves caller order for the (None, None)
    // case.
    windows.sort_by(|a, b| match (position.get(&a.id), position.get(&b.id)) {
        (Some(pos_a), Some(pos_b)) => pos_b.cmp(pos_a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
