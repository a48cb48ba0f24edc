//! Handlers for `/campaigns` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/campaigns` | `?status&search&sortBy&sortOrder&page&limit` |
//! | `POST`   | `/campaigns` | Body: `{"name":"Q1 Outreach","status":"draft"}` |
//! | `GET`    | `/campaigns/{id}` | 404 if absent or not owned |
//! | `PATCH`  | `/campaigns/{id}` | Partial `{name?, status?}` |
//! | `DELETE` | `/campaigns/{id}` | Removes the campaign's leads too |
//! | `GET`    | `/campaigns/{id}/leads` | Lead query parameters, scoped to one campaign |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use outreach_core::{
  campaign::{CampaignPatch, CampaignWithStats, NewCampaign},
  query::ListParams,
  store::OutreachStore,
};
use serde::Serialize;

use crate::{
  ApiState, Deleted,
  auth::CurrentUser,
  error::{ApiError, ApiJson, ApiPath},
  leads::LeadList,
};

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("campaign {id} not found")) }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignList {
  pub campaigns:   Vec<CampaignWithStats>,
  pub total_count: u64,
  pub has_more:    bool,
}

#[derive(Debug, Serialize)]
pub struct CampaignBody {
  pub campaign: CampaignWithStats,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /campaigns`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<CampaignList>, ApiError>
where
  S: OutreachStore + 'static,
{
  let query = params.resolve_campaigns()?;
  let page = state.bounded(state.store.list_campaigns(user.id, query)).await?;
  Ok(Json(CampaignList {
    campaigns:   page.items,
    total_count: page.total_count,
    has_more:    page.has_more,
  }))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /campaigns`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiJson(body): ApiJson<NewCampaign>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OutreachStore + 'static,
{
  let campaign = state.bounded(state.store.create_campaign(user.id, body)).await?;
  tracing::info!(campaign_id = campaign.campaign.id, "campaign created");
  Ok((StatusCode::CREATED, Json(CampaignBody { campaign })))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /campaigns/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<CampaignBody>, ApiError>
where
  S: OutreachStore + 'static,
{
  let campaign = state
    .bounded(state.store.get_campaign(user.id, id))
    .await?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(CampaignBody { campaign }))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /campaigns/{id}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
  ApiJson(patch): ApiJson<CampaignPatch>,
) -> Result<Json<CampaignBody>, ApiError>
where
  S: OutreachStore + 'static,
{
  let campaign = state
    .bounded(state.store.update_campaign(user.id, id, patch))
    .await?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(CampaignBody { campaign }))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /campaigns/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<Deleted>, ApiError>
where
  S: OutreachStore + 'static,
{
  if !state.bounded(state.store.delete_campaign(user.id, id)).await? {
    return Err(not_found(id));
  }
  tracing::info!(campaign_id = id, "campaign deleted");
  Ok(Json(Deleted::OK))
}

// ─── Leads of one campaign ───────────────────────────────────────────────────

/// `GET /campaigns/{id}/leads`
pub async fn leads<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiPath(id): ApiPath<i64>,
  Query(params): Query<ListParams>,
) -> Result<Json<LeadList>, ApiError>
where
  S: OutreachStore + 'static,
{
  let query = params.resolve_leads(Some(id))?;

  // An empty page and a foreign campaign look alike; ask explicitly.
  if state.bounded(state.store.get_campaign(user.id.clone(), id)).await?.is_none() {
    return Err(not_found(id));
  }

  let page = state.bounded(state.store.list_leads(user.id, query)).await?;
  Ok(Json(LeadList::from_page(page)))
}
