#![forbid(unsafe_code)]

//! Error types and the best-effort helper.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing mount point | Mount node detached | `PopupError::MountPointMissing` |
//! | Missing teleport target | No element with that id | `PopupError::TeleportTargetMissing` |
//! | Open after destroy | Programmer error | `PopupError::Destroyed` |
//! | Veto | Hook or subscriber returned cancel | `Transition::Vetoed`, not an error |
//! | Focus restore / persistence | Node gone, storage full | Logged and skipped via [`best_effort`] |

use std::fmt;

use overlay_core::{DomError, NodeId};

use crate::options::PopupId;
use crate::teleport::TeleportError;

/// Configuration errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PopupError {
    #[error("mount point {0:?} is not connected to the document")]
    MountPointMissing(NodeId),
    #[error("teleport target `{0}` was not found")]
    TeleportTargetMissing(String),
    #[error("popup `{0}` has been destroyed")]
    Destroyed(PopupId),
    #[error("no popup is registered as `{0}`")]
    UnknownPopup(PopupId),
    #[error(transparent)]
    Teleport(#[from] TeleportError),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Run a best-effort step: failures are logged and turned into `None`.
///
/// Lifecycle transitions call this around focus restoration and position
/// persistence so a failure there never aborts the transition.
pub fn best_effort<T, E: fmt::Display>(operation: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(operation, error = %err, "best-effort step skipped");
            None
        }
    }
}
