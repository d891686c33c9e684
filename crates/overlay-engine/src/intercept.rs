#![forbid(unsafe_code)]

//! Interceptors: the cancelable half of the lifecycle.
//!
//! A before-hook and every `beforeOpen`/`beforeClose` subscriber is an
//! interceptor. Each returns an [`Interception`], either an immediate
//! [`Verdict`] or a deferred one. [`run_chain`] evaluates interceptors left to
//! right and stops at the first `Cancel`; later interceptors are never called.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Whether a transition may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    #[default]
    Proceed,
    Cancel,
}

impl From<bool> for Verdict {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Proceed } else { Self::Cancel }
    }
}

impl From<()> for Verdict {
    fn from((): ()) -> Self {
        Self::Proceed
    }
}

/// A verdict that resolves later.
pub type DeferredVerdict = Pin<Box<dyn Future<Output = Verdict>>>;

/// Result of calling one interceptor.
pub enum Interception {
    Ready(Verdict),
    Deferred(DeferredVerdict),
}

impl Interception {
    #[must_use]
    pub fn proceed() -> Self {
        Self::Ready(Verdict::Proceed)
    }

    #[must_use]
    pub fn cancel() -> Self {
        Self::Ready(Verdict::Cancel)
    }

    /// Wrap a future whose output converts into a verdict (`bool`, `()`, `Verdict`).
    pub fn deferred<F, V>(future: F) -> Self
    where
        F: Future<Output = V> + 'static,
        V: Into<Verdict>,
    {
        Self::Deferred(Box::pin(async move { future.await.into() }))
    }

    /// Await the verdict.
    pub async fn resolve(self) -> Verdict {
        match self {
            Self::Ready(verdict) => verdict,
            Self::Deferred(future) => future.await,
        }
    }
}

impl std::fmt::Debug for Interception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(verdict) => f.debug_tuple("Ready").field(verdict).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Verdict> for Interception {
    fn from(verdict: Verdict) -> Self {
        Self::Ready(verdict)
    }
}

impl From<bool> for Interception {
    fn from(proceed: bool) -> Self {
        Self::Ready(proceed.into())
    }
}

impl From<()> for Interception {
    fn from((): ()) -> Self {
        Self::proceed()
    }
}

/// A shareable interceptor over arguments of type `A`.
pub type Interceptor<A> = Rc<dyn Fn(&A) -> Interception>;

/// Evaluate `stages` in order, short-circuiting on the first `Cancel`.
pub async fn run_chain<A: ?Sized>(stages: &[Rc<dyn Fn(&A) -> Interception>], arg: &A) -> Verdict {
    for stage in stages {
        if stage(arg).resolve().await == Verdict::Cancel {
            return Verdict::Cancel;
        }
    }
    Verdict::Proceed
}
