#![forbid(unsafe_code)]

//! Lifecycle state machine.
//!
//! ```text
//! Idle --BeginOpen--> Opening --CommitOpen--> Open --BeginClose--> Closing --CommitClose--> Idle
//!          Opening --AbortOpen--> Idle        Closing --AbortClose--> Open
//! any (except Destroyed) --Destroy--> Destroyed
//! ```
//!
//! `Opening` and `Closing` exist while a transition awaits its interceptors;
//! they reject every request except the ones that settle the transition, so
//! a second `open()`/`close()` cannot run the hook chain twice.

use serde::{Deserialize, Serialize};

/// Where a popup is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PopupState {
    #[default]
    Idle,
    Opening,
    Open,
    Closing,
    Destroyed,
}

/// Requests accepted by [`PopupState::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    BeginOpen,
    CommitOpen,
    AbortOpen,
    BeginClose,
    CommitClose,
    AbortClose,
    Destroy,
}

impl PopupState {
    /// Total transition function. `None` means the request is rejected in
    /// this state and the caller must treat it as a no-op.
    #[must_use]
    pub fn transition(self, request: Request) -> Option<Self> {
        use PopupState::*;
        use Request::*;
        match (self, request) {
            (Destroyed, _) => None,
            (_, Destroy) => Some(Destroyed),
            (Idle, BeginOpen) => Some(Opening),
            (Opening, CommitOpen) => Some(Open),
            (Opening, AbortOpen) => Some(Idle),
            (Open, BeginClose) => Some(Closing),
            (Closing, CommitClose) => Some(Idle),
            (Closing, AbortClose) => Some(Open),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Destroyed => "destroyed",
        }
    }
}

/// Outcome of an `open()` or `close()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition ran to completion.
    Completed,
    /// A hook or subscriber cancelled; the popup is back in its prior state.
    Vetoed,
    /// The request was not applicable in the current state.
    Ignored,
}

/// Why a popup closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Programmatic,
    #[serde(rename = "esc")]
    Escape,
    Backdrop,
    CloseButton,
    Destroy,
    Timeout,
    Overflow,
}

impl CloseReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Programmatic => "programmatic",
            Self::Escape => "esc",
            Self::Backdrop => "backdrop",
            Self::CloseButton => "close_button",
            Self::Destroy => "destroy",
            Self::Timeout => "timeout",
            Self::Overflow => "overflow",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
