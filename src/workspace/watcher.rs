//! File system watcher for opened folders.
//!
//! Reports external changes so cached document buffers can be dropped and
//! re-read before the next edit.

use super::scan::DEFAULT_HIDDEN_PATTERNS;
use crate::error::{Error, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// File system events the workspace cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// A file was modified externally
    FileModified(PathBuf),
    /// A file was created
    FileCreated(PathBuf),
    /// A file was deleted
    FileDeleted(PathBuf),
    /// The watcher encountered an error
    Error(String),
}

impl WorkspaceEvent {
    pub fn path(&self) -> Option<&Path> {
        match self {
            WorkspaceEvent::FileModified(p)
            | WorkspaceEvent::FileCreated(p)
            | WorkspaceEvent::FileDeleted(p) => Some(p),
            WorkspaceEvent::Error(_) => None,
        }
    }
}

/// Watches one folder recursively.
#[derive(Debug)]
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<WorkspaceEvent>,
    root_path: PathBuf,
}

impl WorkspaceWatcher {
    pub fn new(root_path: PathBuf) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                Self::handle_event(result, &tx);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )
        .map_err(|e| Error::Watcher(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&root_path, RecursiveMode::Recursive)
            .map_err(|e| {
                Error::Watcher(format!(
                    "Failed to watch path {}: {}",
                    root_path.display(),
                    e
                ))
            })?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root_path,
        })
    }

    fn handle_event(
        result: std::result::Result<Event, notify::Error>,
        tx: &Sender<WorkspaceEvent>,
    ) {
        match result {
            Ok(event) => {
                for path in event.paths {
                    let workspace_event = match event.kind {
                        EventKind::Create(_) => Some(WorkspaceEvent::FileCreated(path)),
                        EventKind::Modify(_) => Some(WorkspaceEvent::FileModified(path)),
                        EventKind::Remove(_) => Some(WorkspaceEvent::FileDeleted(path)),
                        _ => None,
                    };

                    if let Some(evt) = workspace_event {
                        let _ = tx.send(evt);
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(WorkspaceEvent::Error(e.to_string()));
            }
        }
    }

    /// Drain pending events without blocking, minus hidden paths.
    pub fn poll_events(&self) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        filter_events(events)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

/// Drop events for paths inside hidden directories. Errors always pass.
pub fn filter_events(events: Vec<WorkspaceEvent>) -> Vec<WorkspaceEvent> {
    events
        .into_iter()
        .filter(|event| {
            let Some(path) = event.path() else {
                return true;
            };
            !path.components().any(|component| match component {
                Component::Normal(name) => {
                    let name = name.to_string_lossy();
                    DEFAULT_HIDDEN_PATTERNS.iter().any(|pattern| name == *pattern)
                }
                _ => false,
            })
        })
        .collect()
}
