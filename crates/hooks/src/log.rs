//! `LogNotifier` — delivers notifications to the process log.
//!
//! The default emitter for deployments where real delivery (mail, in-app
//! inbox) lives in the surrounding system and only observability is
//! wanted here.

use async_trait::async_trait;
use tracing::info;

use crate::{HookError, Notification, NotificationEmitter};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationEmitter for LogNotifier {
    async fn notify(&self, note: &Notification) -> Result<(), HookError> {
        info!(
            signer = %note.signer_id,
            workflow = %note.workflow_id,
            code = %note.public_code,
            line = note.line_number,
            kind = ?note.kind,
            "notification: {}",
            note.subject
        );
        Ok(())
    }
}
