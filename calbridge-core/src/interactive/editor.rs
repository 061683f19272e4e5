//! External editor hand-off.
//!
//! The editor is an executable found on `PATH`. It receives one JSON line on
//! stdin, `{"tag": ..., "draft": {...}}`, lets the user edit and save the
//! event into the store by its own means, and exits. Its exit is the only
//! completion signal; nothing identifies the record it created.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::{CorrelationTag, EditorCompletion, EditorDraft, ExternalEditor};
use crate::error::{CalendarError, CalendarResult};

/// Line written to the editor's stdin.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditorRequest {
    pub tag: CorrelationTag,
    pub draft: EditorDraft,
}

/// Runs an editor subprocess per interactive create and reports its exit
/// on a channel.
pub struct ProcessEditor {
    program: String,
    runtime: Handle,
    completions: UnboundedSender<EditorCompletion>,
}

impl ProcessEditor {
    pub fn new(
        program: impl Into<String>,
        runtime: Handle,
        completions: UnboundedSender<EditorCompletion>,
    ) -> Self {
        ProcessEditor {
            program: program.into(),
            runtime,
            completions,
        }
    }

    fn binary_path(&self) -> CalendarResult<PathBuf> {
        which::which(&self.program)
            .map_err(|_| CalendarError::Editor(format!("Editor '{}' not found in PATH", self.program)))
    }
}

impl ExternalEditor for ProcessEditor {
    fn launch(&self, draft: &EditorDraft, tag: &CorrelationTag) -> CalendarResult<()> {
        let request = EditorRequest {
            tag: tag.clone(),
            draft: draft.clone(),
        };
        let request_json = serde_json::to_string(&request)?;
        let binary_path = self.binary_path()?;

        // Child reaping needs the runtime even when called from a plain thread
        let _runtime = self.runtime.enter();
        let mut child = Command::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                CalendarError::Editor(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CalendarError::Editor("Editor stdin was not captured".into()))?;

        let completions = self.completions.clone();
        let tag = tag.clone();
        self.runtime.spawn(async move {
            if let Err(e) = stdin.write_all(format!("{request_json}\n").as_bytes()).await {
                warn!(%tag, error = %e, "Failed to send draft to editor");
            }
            drop(stdin);

            match child.wait().await {
                Ok(status) => debug!(%tag, code = ?status.code(), "Editor exited"),
                Err(e) => warn!(%tag, error = %e, "Failed to wait for editor"),
            }

            if completions.send(EditorCompletion { tag }).is_err() {
                debug!("Completion receiver dropped");
            }
        });

        Ok(())
    }
}
