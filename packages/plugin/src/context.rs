//! Cancellation-capable execution context.
//!
//! Every capability operation takes a `&Context`. Cancelling it must make
//! the operation return promptly with [`Error::Cancelled`] and drop whatever
//! it was holding.

use std::future::Future;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::{Error, Result};

#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one owned by a traversal driver.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A context that is cancelled when `self` is, but can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// `Err(Error::Cancelled)` if the context has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drive `fut` until it completes or the context is cancelled,
    /// whichever comes first. On cancellation `fut` is dropped.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            out = fut => out,
        }
    }
}
