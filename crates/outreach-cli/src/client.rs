//! Async HTTP client wrapping the Outreach JSON API.

use std::time::Duration;

use outreach_core::{
  campaign::{CampaignPatch, CampaignWithStats, NewCampaign},
  lead::{Lead, LeadPatch, LeadStatus, LeadWithCampaign, NewLead},
  query::{ListParams, Page},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Outreach API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Session token from `/auth/sign-in`; sent as a bearer token.
  pub token:    Option<String>,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
  RequestTimeout,

  #[error("{method} {path} → {status}: {message}")]
  Api {
    method:  &'static str,
    path:    String,
    status:  StatusCode,
    message: String,
  },

  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ClientError::RequestTimeout
    } else {
      ClientError::Transport(err)
    }
  }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

// ─── Wire envelopes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignList {
  campaigns:   Vec<CampaignWithStats>,
  total_count: u64,
  has_more:    bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeadList {
  leads:       Vec<LeadWithCampaign>,
  total_count: u64,
  has_more:    bool,
}

#[derive(Deserialize)]
struct CampaignBody {
  campaign: CampaignWithStats,
}

#[derive(Deserialize)]
struct LeadBody {
  lead: Lead,
}

#[derive(Deserialize)]
struct Deleted {
  success: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the Outreach JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn send<T: DeserializeOwned>(
    &self,
    method: &'static str,
    path: &str,
    req: reqwest::RequestBuilder,
  ) -> Result<T> {
    let resp = self.auth(req).send().await?;
    let status = resp.status();
    if !status.is_success() {
      // Error bodies are `{"error": "..."}`; fall back to the raw text.
      let text = resp.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
      return Err(ClientError::Api { method, path: path.to_owned(), status, message });
    }
    Ok(resp.json().await?)
  }

  // ── Campaigns ─────────────────────────────────────────────────────────────

  /// `GET /api/campaigns`
  pub async fn list_campaigns(&self, params: &ListParams) -> Result<Page<CampaignWithStats>> {
    let list: CampaignList = self
      .send("GET", "/campaigns", self.client.get(self.url("/campaigns")).query(params))
      .await?;
    Ok(Page { items: list.campaigns, total_count: list.total_count, has_more: list.has_more })
  }

  /// `POST /api/campaigns`
  pub async fn create_campaign(&self, input: &NewCampaign) -> Result<CampaignWithStats> {
    let body: CampaignBody = self
      .send("POST", "/campaigns", self.client.post(self.url("/campaigns")).json(input))
      .await?;
    Ok(body.campaign)
  }

  /// `PATCH /api/campaigns/{id}`
  pub async fn update_campaign(&self, id: i64, patch: &CampaignPatch) -> Result<CampaignWithStats> {
    let path = format!("/campaigns/{id}");
    let body: CampaignBody = self
      .send("PATCH", &path, self.client.patch(self.url(&path)).json(patch))
      .await?;
    Ok(body.campaign)
  }

  /// `DELETE /api/campaigns/{id}`; the server deletes the campaign's leads
  /// with it.
  pub async fn delete_campaign(&self, id: i64) -> Result<bool> {
    let path = format!("/campaigns/{id}");
    let body: Deleted = self.send("DELETE", &path, self.client.delete(self.url(&path))).await?;
    Ok(body.success)
  }

  // ── Leads ─────────────────────────────────────────────────────────────────

  /// `GET /api/leads`
  pub async fn list_leads(&self, params: &ListParams) -> Result<Page<LeadWithCampaign>> {
    let list: LeadList = self
      .send("GET", "/leads", self.client.get(self.url("/leads")).query(params))
      .await?;
    Ok(Page { items: list.leads, total_count: list.total_count, has_more: list.has_more })
  }

  /// `POST /api/leads`
  pub async fn create_lead(&self, input: &NewLead) -> Result<Lead> {
    let body: LeadBody = self
      .send("POST", "/leads", self.client.post(self.url("/leads")).json(input))
      .await?;
    Ok(body.lead)
  }

  /// `PATCH /api/leads/{id}`
  pub async fn update_lead(&self, id: i64, patch: &LeadPatch) -> Result<Lead> {
    let path = format!("/leads/{id}");
    let body: LeadBody = self
      .send("PATCH", &path, self.client.patch(self.url(&path)).json(patch))
      .await?;
    Ok(body.lead)
  }

  /// `DELETE /api/leads/{id}`
  pub async fn delete_lead(&self, id: i64) -> Result<bool> {
    let path = format!("/leads/{id}");
    let body: Deleted = self.send("DELETE", &path, self.client.delete(self.url(&path))).await?;
    Ok(body.success)
  }

  /// `PATCH /api/leads/{id}/status`
  pub async fn set_lead_status(&self, id: i64, status: LeadStatus) -> Result<Lead> {
    let path = format!("/leads/{id}/status");
    let body: LeadBody = self
      .send(
        "PATCH",
        &path,
        self
          .client
          .patch(self.url(&path))
          .json(&serde_json::json!({ "status": status })),
      )
      .await?;
    Ok(body.lead)
  }
}
