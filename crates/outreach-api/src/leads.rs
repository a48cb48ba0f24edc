//! Handlers for `/leads` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/leads` | Every lead the caller owns; search also covers the campaign name |
//! | `POST`   | `/leads` | 404 if `campaignId` is absent or not owned |
//! | `GET`    | `/leads/{id}` | |
//! | `PATCH`  | `/leads/{id}` | Partial update; leaves `lastContactAt` alone |
//! | `PATCH`  | `/leads/{id}/status` | `{"status":"contacted"}`; stamps `lastContactAt` |
//! | `DELETE` | `/leads/{id}` | |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use outreach_core::{
  lead::{Lead, LeadPatch, LeadStatus, LeadWithCampaign, NewLead},
  query::{ListParams, Page},
  store::OutreachStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState, Deleted,
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath},
};

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("lead {id} not found")) }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadList {
  pub leads:       Vec<LeadWithCampaign>,
  pub total_count: u64,
  pub has_more:    bool,
}

impl LeadList {
  pub fn from_page(page: Page<LeadWithCampaign>) -> Self {
    Self { leads: page.items, total_count: page.total_count, has_more: page.has_more }
  }
}

#[derive(Debug, Serialize)]
pub struct LeadBody<T> {
  pub lead: T,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /leads`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<LeadList>, ApiError>
where
  S: OutreachStore + 'static,
{
  let query = params.resolve_leads(None)?;
  let page = state.bounded(state.store.list_leads(user.id, query)).await?;
  Ok(Json(LeadList::from_page(page)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Body of `POST /leads`. Required text fields default to empty so that a
/// missing one is reported by name rather than as a parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  #[serde(default)]
  pub name:        String,
  #[serde(default)]
  pub designation: String,
  #[serde(default)]
  pub email:       String,
  pub company:     Option<String>,
  pub campaign_id: Option<i64>,
  #[serde(default)]
  pub status:      LeadStatus,
  pub avatar_url:  Option<String>,
}

/// `POST /leads`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OutreachStore + 'static,
{
  let campaign_id = body
    .campaign_id
    .ok_or_else(|| ApiError::Validation("lead campaignId is required".to_owned()))?;
  let input = NewLead {
    name: body.name,
    designation: body.designation,
    email: body.email,
    company: body.company,
    campaign_id,
    status: body.status,
    avatar_url: body.avatar_url,
  };

  let lead = state
    .bounded(state.store.create_lead(user.id, input))
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("campaign {campaign_id} not found")))?;
  tracing::info!(lead_id = lead.id, campaign_id, "lead created");
  Ok((StatusCode::CREATED, Json(LeadBody { lead })))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /leads/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<LeadBody<LeadWithCampaign>>, ApiError>
where
  S: OutreachStore + 'static,
{
  let lead = state
    .bounded(state.store.get_lead(user.id, id))
    .await?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(LeadBody { lead }))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /leads/{id}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
  ApiJson(patch): ApiJson<LeadPatch>,
) -> Result<Json<LeadBody<Lead>>, ApiError>
where
  S: OutreachStore + 'static,
{
  let lead = state
    .bounded(state.store.update_lead(user.id, id, patch))
    .await?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(LeadBody { lead }))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: LeadStatus,
}

/// `PATCH /leads/{id}/status`
pub async fn set_status<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
  ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<LeadBody<Lead>>, ApiError>
where
  S: OutreachStore + 'static,
{
  let lead = state
    .bounded(state.store.set_lead_status(user.id, id, body.status))
    .await?
    .ok_or_else(|| not_found(id))?;
  tracing::info!(lead_id = id, status = %lead.status, "lead status changed");
  Ok(Json(LeadBody { lead }))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /leads/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Deleted>, ApiError>
where
  S: OutreachStore + 'static,
{
  if !state.bounded(state.store.delete_lead(user.id, id)).await? {
    return Err(not_found(id));
  }
  tracing::info!(lead_id = id, "lead deleted");
  Ok(Json(Deleted::OK))
}
