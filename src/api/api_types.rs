//! Serde-deserializable envelope shared by every API endpoint.
//!
//! The service answers `{ success, data?, error?, pageMeta? }`. These types
//! stay private to the client; decoding turns them into the explicit
//! `Result<Fetched<T>, ErrorInfo>` the rest of the crate works with.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ErrorInfo;
use super::types::PageMeta;

/// Successful payload plus optional list pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  pub data: T,
  pub page_meta: Option<PageMeta>,
}

impl<T> Fetched<T> {
  pub fn new(data: T) -> Self {
    Self {
      data,
      page_meta: None,
    }
  }

  pub fn with_page_meta(mut self, meta: PageMeta) -> Self {
    self.page_meta = Some(meta);
    self
  }
}

pub type FetchResult<T> = Result<Fetched<T>, ErrorInfo>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEnvelope<T> {
  #[serde(default)]
  success: bool,
  data: Option<T>,
  error: Option<ApiError>,
  page_meta: Option<PageMeta>,
}

/// The `error` field is either a bare string or `{ message, code }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiError {
  Message(String),
  Detailed {
    message: String,
    #[serde(default)]
    code: Option<String>,
  },
}

impl ApiError {
  fn into_message(self) -> String {
    match self {
      ApiError::Message(message) => message,
      ApiError::Detailed {
        message,
        code: Some(code),
      } => format!("{} ({})", message, code),
      ApiError::Detailed { message, .. } => message,
    }
  }
}

/// Only the error part of an envelope, used for non-2xx bodies.
#[derive(Debug, Deserialize)]
struct ApiErrorOnly {
  error: Option<ApiError>,
  message: Option<String>,
}

fn error_message(body: &[u8]) -> Option<String> {
  let parsed: ApiErrorOnly = serde_json::from_slice(body).ok()?;
  parsed
    .error
    .map(ApiError::into_message)
    .or(parsed.message)
}

/// Decode a response into data, requiring `data` when the call succeeded.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> FetchResult<T> {
  let (data, page_meta) = decode_envelope::<T>(status, body)?;
  let data = data.ok_or_else(|| ErrorInfo {
    status: Some(status),
    ..ErrorInfo::server("response has no data")
  })?;
  Ok(Fetched { data, page_meta })
}

/// Decode a response whose payload is irrelevant (e.g. deletes).
pub fn decode_ack(status: u16, body: &[u8]) -> Result<(), ErrorInfo> {
  // An empty 2xx body (204) is a valid acknowledgement
  if (200..300).contains(&status) && body.iter().all(u8::is_ascii_whitespace) {
    return Ok(());
  }
  decode_envelope::<serde_json::Value>(status, body).map(|_| ())
}

fn decode_envelope<T: DeserializeOwned>(
  status: u16,
  body: &[u8],
) -> Result<(Option<T>, Option<PageMeta>), ErrorInfo> {
  if !(200..300).contains(&status) {
    let message = error_message(body).unwrap_or_else(|| format!("request failed with HTTP {}", status));
    return Err(ErrorInfo::from_status(status, message));
  }

  let envelope: ApiEnvelope<T> = serde_json::from_slice(body).map_err(|e| ErrorInfo {
    status: Some(status),
    ..ErrorInfo::server(format!("invalid response body: {}", e))
  })?;

  if !envelope.success {
    let message = envelope
      .error
      .map(ApiError::into_message)
      .unwrap_or_else(|| "request was not successful".to_string());
    return Err(ErrorInfo {
      status: Some(status),
      ..ErrorInfo::server(message)
    });
  }

  Ok((envelope.data, envelope.page_meta))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ErrorKind;
  use crate::api::types::Contact;

  #[test]
  fn test_decode_list_with_page_meta() {
    let body = br#"{
      "success": true,
      "data": [{"id":"c1","name":"Ada","email":"ada@example.com","createdAt":"2024-01-01T00:00:00Z"}],
      "pageMeta": {"page": 2, "limit": 10, "total": 11}
    }"#;
    let fetched: Fetched<Vec<Contact>> = decode_response(200, body).unwrap();
    assert_eq!(fetched.data.len(), 1);
    assert_eq!(fetched.data[0].name, "Ada");
    let meta = fetched.page_meta.unwrap();
    assert_eq!((meta.page, meta.limit, meta.total), (2, 10, 11));
  }

  #[test]
  fn test_unsuccessful_envelope_is_server_error() {
    let body = br#"{"success": false, "error": {"message": "quota exceeded", "code": "Q1"}}"#;
    let err = decode_response::<Vec<Contact>>(200, body).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "quota exceeded (Q1)");
  }

  #[test]
  fn test_non_2xx_uses_body_message() {
    let body = br#"{"success": false, "error": "admin only"}"#;
    let err = decode_response::<Vec<Contact>>(403, body).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert_eq!(err.status, Some(403));
    assert_eq!(err.message, "admin only");
  }

  #[test]
  fn test_non_2xx_without_json() {
    let err = decode_response::<Vec<Contact>>(502, b"<html>bad gateway</html>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "request failed with HTTP 502");
  }

  #[test]
  fn test_garbage_body_is_server_error() {
    let err = decode_response::<Vec<Contact>>(200, b"not json").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert!(err.message.starts_with("invalid response body"));
  }

  #[test]
  fn test_missing_data() {
    let err = decode_response::<Vec<Contact>>(200, br#"{"success": true}"#).unwrap_err();
    assert_eq!(err.message, "response has no data");
  }

  #[test]
  fn test_ack() {
    assert!(decode_ack(204, b"").is_ok());
    assert!(decode_ack(200, br#"{"success": true}"#).is_ok());
    assert!(decode_ack(404, br#"{"error": "no such contact"}"#).is_err());
  }
}
