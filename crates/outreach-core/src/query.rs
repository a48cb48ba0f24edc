//! Pagination and filter resolution.
//!
//! Raw request parameters arrive as untyped strings. [`ListParams`] turns
//! them into a bounded, typed [`CampaignQuery`] or [`LeadQuery`]; every
//! collection endpoint goes through the same resolver.
//!
//! Pagination is offset based (`offset = page * limit`). Consecutive pages
//! are only consistent if the collection does not change between fetches,
//! so `total_count` and `has_more` are advisory.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, campaign::CampaignStatus, lead::LeadStatus};

/// Page size used when the request does not give a usable one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound on any page size a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

// ─── Sort fields ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
  #[default]
  Asc,
  Desc,
}

/// Allow-list of campaign sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, AsRefStr, Display)]
pub enum CampaignSortField {
  #[strum(serialize = "name")]
  Name,
  #[strum(serialize = "status")]
  Status,
  #[strum(to_string = "leads", serialize = "totalLeads")]
  Leads,
  #[strum(serialize = "responseRate")]
  ResponseRate,
  #[default]
  #[strum(to_string = "created", serialize = "createdAt")]
  Created,
}

/// Allow-list of lead sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LeadSortField {
  #[default]
  Name,
  Campaign,
  Status,
  Activity,
}

// ─── Page request / envelope ─────────────────────────────────────────────────

/// A bounded page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: 0, limit: DEFAULT_PAGE_SIZE } }
}

impl PageRequest {
  /// Build a page window, clamping `limit` into `1..=MAX_PAGE_SIZE`.
  pub fn new(page: u32, limit: u32) -> Self {
    let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit.min(MAX_PAGE_SIZE) };
    Self { page, limit }
  }

  pub fn offset(&self) -> u64 { u64::from(self.page) * u64::from(self.limit) }

  /// `true` while rows remain beyond this page.
  pub fn has_more(&self, total_count: u64) -> bool {
    (u64::from(self.page) + 1) * u64::from(self.limit) < total_count
  }

  pub fn next(&self) -> Self { Self { page: self.page.saturating_add(1), limit: self.limit } }
}

/// A page of results plus the filtered total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items:       Vec<T>,
  /// Count of every row matching the filter, ignoring the page window.
  pub total_count: u64,
  pub has_more:    bool,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
    Self { items, total_count, has_more: request.has_more(total_count) }
  }

  pub fn empty() -> Self { Self { items: Vec::new(), total_count: 0, has_more: false } }
}

// ─── Resolved queries ────────────────────────────────────────────────────────

/// A resolved campaign collection query; always scoped to one owner by the
/// store call that executes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignQuery {
  pub status: Option<CampaignStatus>,
  /// Case-insensitive substring match on the campaign name.
  pub search: Option<String>,
  pub sort:   CampaignSortField,
  pub order:  SortOrder,
  pub page:   PageRequest,
}

/// A resolved lead collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadQuery {
  /// Restrict to one campaign. When `None`, leads of every campaign the
  /// owner holds are returned and `search` also matches the campaign name.
  pub campaign_id: Option<i64>,
  pub status:      Option<LeadStatus>,
  /// Case-insensitive substring match over name, email, company and
  /// designation.
  pub search:      Option<String>,
  pub sort:        LeadSortField,
  pub order:       SortOrder,
  pub page:        PageRequest,
}

impl LeadQuery {
  /// Whether the campaign name takes part in the search predicate.
  pub fn searches_campaign_name(&self) -> bool { self.campaign_id.is_none() }
}

// ─── Raw parameters ──────────────────────────────────────────────────────────

/// Query-string parameters exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort_by:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort_order: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit:      Option<String>,
}

impl ListParams {
  pub fn resolve_campaigns(&self) -> Result<CampaignQuery> {
    Ok(CampaignQuery {
      status: parse_status(self.status.as_deref())?,
      search: parse_search(self.search.as_deref()),
      sort:   parse_enum(self.sort_by.as_deref(), "sortBy")?,
      order:  parse_enum(self.sort_order.as_deref(), "sortOrder")?,
      page:   self.page_request(),
    })
  }

  pub fn resolve_leads(&self, campaign_id: Option<i64>) -> Result<LeadQuery> {
    Ok(LeadQuery {
      campaign_id,
      status: parse_status(self.status.as_deref())?,
      search: parse_search(self.search.as_deref()),
      sort: parse_enum(self.sort_by.as_deref(), "sortBy")?,
      order: parse_enum(self.sort_order.as_deref(), "sortOrder")?,
      page: self.page_request(),
    })
  }

  pub fn page_request(&self) -> PageRequest {
    PageRequest::new(parse_page(self.page.as_deref()), parse_limit(self.limit.as_deref()))
  }
}

/// `None`, empty and `"all"` mean no filter; anything else must name a
/// member of the closed status set.
fn parse_status<S: FromStr>(raw: Option<&str>) -> Result<Option<S>> {
  match raw.map(str::trim) {
    None | Some("") | Some("all") => Ok(None),
    Some(s) => s
      .parse()
      .map(Some)
      .map_err(|_| Error::validation(format!("unknown status: {s:?}"))),
  }
}

fn parse_enum<S: FromStr + Default>(raw: Option<&str>, param: &str) -> Result<S> {
  match raw.map(str::trim) {
    None | Some("") => Ok(S::default()),
    Some(s) => s
      .parse()
      .map_err(|_| Error::validation(format!("unsupported {param}: {s:?}"))),
  }
}

fn parse_search(raw: Option<&str>) -> Option<String> {
  raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Negative or non-numeric pages fall back to the first page.
fn parse_page(raw: Option<&str>) -> u32 {
  raw
    .and_then(|s| s.trim().parse::<i64>().ok())
    .filter(|n| *n > 0)
    .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    .unwrap_or(0)
}

/// Non-positive or non-numeric limits fall back to the default; large ones
/// are clamped by [`PageRequest::new`].
fn parse_limit(raw: Option<&str>) -> u32 {
  raw
    .and_then(|s| s.trim().parse::<i64>().ok())
    .filter(|n| *n > 0)
    .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    .unwrap_or(DEFAULT_PAGE_SIZE)
}
