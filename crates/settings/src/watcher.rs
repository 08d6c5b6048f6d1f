//! Poll-based config file watching.
//!
//! Polling (with content comparison) is used instead of native filesystem
//! events so editors that save via atomic replace still produce changes.

use anyhow::{Context, Result};
use notify::{Config, PollWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default poll cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Keeps the underlying watcher alive; dropping it stops all deliveries.
pub struct ConfigWatcher {
    _watcher: PollWatcher,
}

/// Watch the given files, delivering the path of each change on the returned
/// channel. Parent directories are watched (non-recursively) so files that
/// do not exist yet still produce a change when they appear.
pub fn watch(paths: Vec<PathBuf>) -> Result<(ConfigWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    watch_with_interval(paths, POLL_INTERVAL)
}

pub fn watch_with_interval(
    paths: Vec<PathBuf>,
    interval: Duration,
) -> Result<(ConfigWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let watched = paths.clone();

    let mut watcher = PollWatcher::new(
        move |result: std::result::Result<notify::Event, notify::Error>| {
            let event = match result {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!("file watch error: {}", error);
                    return;
                }
            };
            for path in &event.paths {
                if watched.iter().any(|candidate| candidate == path) {
                    let _ = tx.send(path.clone());
                }
            }
        },
        Config::default()
            .with_poll_interval(interval)
            .with_compare_contents(true),
    )
    .context("failed to create poll watcher")?;

    let mut parents: Vec<PathBuf> = paths
        .iter()
        .filter_map(|path| path.parent().map(|parent| parent.to_path_buf()))
        .collect();
    parents.sort();
    parents.dedup();

    for parent in parents {
        if !parent.exists() {
            tracing::debug!("not watching missing directory {:?}", parent);
            continue;
        }
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {:?}", parent))?;
        tracing::debug!("watching {:?}", parent);
    }

    Ok((ConfigWatcher { _watcher: watcher }, rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn change_to_watched_file_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chalet.json");
        std::fs::write(&path, "{}").unwrap();

        let (_guard, mut rx) =
            watch_with_interval(vec![path.clone()], Duration::from_millis(50)).unwrap();

        // Let the watcher take its baseline snapshot before mutating.
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, r#"{"changed":true}"#).unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for change event")
            .expect("watcher channel closed");
        assert_eq!(delivered, path);
    }

    #[tokio::test]
    async fn changes_to_unwatched_siblings_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("chalet.json");
        let sibling = dir.path().join("notes.txt");
        std::fs::write(&watched, "{}").unwrap();
        std::fs::write(&sibling, "a").unwrap();

        let (_guard, mut rx) =
            watch_with_interval(vec![watched.clone()], Duration::from_millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&sibling, "b").unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(outcome.is_err(), "sibling change should not be delivered");
    }

    #[test]
    fn missing_parent_directory_is_skipped_not_fatal() {
        let result = watch_with_interval(
            vec![PathBuf::from("/nonexistent-dir-for-test/chalet.json")],
            Duration::from_millis(50),
        );
        assert!(result.is_ok());
    }
}
