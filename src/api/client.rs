use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::api::api_types::{decode_ack, decode_response, FetchResult};
use crate::api::error::ErrorInfo;
use crate::api::types::{AuditLog, Contact, ContactDraft, QrAnalytics, User};
use crate::cache::{EntityParams, ListParams};
use crate::config::Config;

/// HTTP client for the QR management API
///
/// Every method returns a structured `ErrorInfo` on failure; transport
/// errors never escape as anything else. The client never touches the cache.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: String,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    Self::with_token(&config.api.url, token, Duration::from_secs(config.api.timeout_secs))
  }

  pub fn with_token(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API url '{}': {}", base_url, e))?;
    // Keep any path prefix when joining endpoint paths
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("qrdash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base, token })
  }

  /// Base URL of the service, used for the header
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, path: &str) -> Result<Url, ErrorInfo> {
    self
      .base
      .join(path)
      .map_err(|e| ErrorInfo::validation(format!("invalid endpoint '{}': {}", path, e)))
  }

  /// Endpoint under the base URL from raw path segments. Each segment is
  /// percent-encoded, so ids cannot add path components, a query or a fragment.
  fn segments_url(&self, segments: &[&str]) -> Result<Url, ErrorInfo> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ErrorInfo::validation(format!("API url '{}' cannot take a path", self.base)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn list_url(&self, path: &str, params: &ListParams) -> Result<Url, ErrorInfo> {
    params.validate()?;
    let mut url = self.endpoint(path)?;
    url.query_pairs_mut().extend_pairs(params.query_pairs());
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self.http.request(method, url).bearer_auth(&self.token)
  }

  /// Send a request and return the raw status and body.
  async fn send(&self, builder: RequestBuilder) -> Result<(u16, Vec<u8>), ErrorInfo> {
    let response = builder.send().await.map_err(|e| {
      warn!(error = %e, "request failed");
      ErrorInfo::from(e)
    })?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(ErrorInfo::from)?;
    debug!(status, bytes = body.len(), "response received");
    Ok((status, body.to_vec()))
  }

  async fn get<T: DeserializeOwned>(&self, url: Url) -> FetchResult<T> {
    debug!(%url, "GET");
    let (status, body) = self.send(self.request(Method::GET, url)).await?;
    decode_response(status, &body)
  }

  /// Admin audit log page
  pub async fn fetch_audit_logs(&self, params: &ListParams) -> FetchResult<Vec<AuditLog>> {
    let url = self.list_url("api/audit-logs", params)?;
    self.get(url).await
  }

  /// Contacts page
  pub async fn fetch_contacts(&self, params: &ListParams) -> FetchResult<Vec<Contact>> {
    let url = self.list_url("api/contacts", params)?;
    self.get(url).await
  }

  /// Scan analytics of one QR code
  pub async fn fetch_qr_analytics(&self, params: &EntityParams) -> FetchResult<QrAnalytics> {
    params.validate()?;
    let url = self.segments_url(&["api", "qr-codes", params.id.trim(), "analytics"])?;
    self.get(url).await
  }

  pub async fn create_contact(&self, draft: &ContactDraft) -> Result<Contact, ErrorInfo> {
    let url = self.endpoint("api/contacts")?;
    self.send_json(Method::POST, url, draft).await
  }

  pub async fn update_contact(&self, id: &str, draft: &ContactDraft) -> Result<Contact, ErrorInfo> {
    let url = self.segments_url(&["api", "contacts", id])?;
    self.send_json(Method::PUT, url, draft).await
  }

  pub async fn delete_contact(&self, id: &str) -> Result<(), ErrorInfo> {
    let url = self.segments_url(&["api", "contacts", id])?;
    debug!(%url, "DELETE");
    let (status, body) = self.send(self.request(Method::DELETE, url)).await?;
    decode_ack(status, &body)
  }

  /// Resolve the user behind the configured token.
  pub async fn current_user(&self) -> Result<User, ErrorInfo> {
    let url = self.endpoint("api/auth/me")?;
    self.get(url).await.map(|fetched| fetched.data)
  }

  async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ErrorInfo>
  where
    B: serde::Serialize,
    T: DeserializeOwned,
  {
    debug!(%url, %method, "sending");
    let payload = serde_json::to_vec(body)
      .map_err(|e| ErrorInfo::validation(format!("failed to encode request: {}", e)))?;
    let builder = self
      .request(method, url)
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(payload);
    let (status, body) = self.send(builder).await?;
    decode_response(status, &body).map(|fetched| fetched.data)
  }
}
