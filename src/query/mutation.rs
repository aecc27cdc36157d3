//! One-shot write operations (create, update, delete) with tracked state.

use std::future::Future;
use tokio::sync::mpsc;
use tracing::warn;

use crate::api::ErrorInfo;

/// The state of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<M> {
  /// Not started
  Idle,
  /// Request is in flight
  Pending,
  /// Last run succeeded
  Done(M),
  /// Last run failed
  Failed(ErrorInfo),
}

/// Runs a write request in the background and reports its outcome on `poll`.
///
/// The success callback runs inside the spawned task as soon as the server
/// confirms, so cache updates land even if the owning view is gone by then.
pub struct Mutation<M> {
  state: MutationState<M>,
  receiver: Option<mpsc::UnboundedReceiver<Result<M, ErrorInfo>>>,
}

impl<M> Default for Mutation<M> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<M: Send + 'static> Mutation<M> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState<M> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  /// Start the mutation. Returns false (and does nothing) while one is pending.
  pub fn run<Fut, S>(&mut self, request: Fut, on_success: S) -> bool
  where
    Fut: Future<Output = Result<M, ErrorInfo>> + Send + 'static,
    S: FnOnce(&M) + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = request.await;
      match &result {
        Ok(value) => on_success(value),
        Err(error) => warn!(error = %error, "mutation failed"),
      }
      // Receiver may have been dropped with its view
      let _ = tx.send(result);
    });
    true
  }

  /// Poll for the outcome of a pending run.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Done(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Failed(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Failed(ErrorInfo::network("request was cancelled"));
        self.receiver = None;
        true
      }
    }
  }
}

impl<M: std::fmt::Debug> std::fmt::Debug for Mutation<M> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
