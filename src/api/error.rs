//! Structured errors produced at the API client boundary.

use thiserror::Error;

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Transport failure: connect, timeout, TLS, dropped body
  Network,
  /// The session may not access the resource
  Authorization,
  /// Request parameters were rejected (locally or by the server)
  Validation,
  /// Non-2xx response or an unusable response body
  Server,
}

impl ErrorKind {
  pub fn label(&self) -> &'static str {
    match self {
      ErrorKind::Network => "network error",
      ErrorKind::Authorization => "not authorized",
      ErrorKind::Validation => "invalid request",
      ErrorKind::Server => "server error",
    }
  }
}

/// Error information stored per resource entry and shown by views.
///
/// Every failure the client can hit is normalized into this type so nothing
/// raw from the transport ever reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .kind.label())]
pub struct ErrorInfo {
  pub kind: ErrorKind,
  /// HTTP status when the server answered
  pub status: Option<u16>,
  pub message: String,
}

impl ErrorInfo {
  pub fn network(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Network,
      status: None,
      message: message.into(),
    }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Validation,
      status: None,
      message: message.into(),
    }
  }

  pub fn server(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Server,
      status: None,
      message: message.into(),
    }
  }

  /// Map an HTTP status onto the error taxonomy.
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let kind = match status {
      401 | 403 => ErrorKind::Authorization,
      400 | 422 => ErrorKind::Validation,
      _ => ErrorKind::Server,
    };
    Self {
      kind,
      status: Some(status),
      message: message.into(),
    }
  }

  /// Whether a manual retry has a reasonable chance of succeeding.
  pub fn is_retryable(&self) -> bool {
    match self.kind {
      ErrorKind::Network => true,
      ErrorKind::Server => self.status.map(|s| s >= 500).unwrap_or(true),
      ErrorKind::Authorization | ErrorKind::Validation => false,
    }
  }
}

impl From<reqwest::Error> for ErrorInfo {
  fn from(err: reqwest::Error) -> Self {
    match err.status() {
      Some(status) => ErrorInfo::from_status(status.as_u16(), err.to_string()),
      None if err.is_decode() => ErrorInfo::server(format!("invalid response body: {}", err)),
      None => ErrorInfo::network(err.to_string()),
    }
  }
}
