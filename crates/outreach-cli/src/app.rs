//! Command handlers and table rendering.

use std::fmt::Write as _;

use futures::{FutureExt as _, future::BoxFuture};
use outreach_core::{
  campaign::{CampaignPatch, CampaignWithStats, NewCampaign},
  lead::{Lead, LeadPatch, LeadStatus, LeadWithCampaign, NewLead},
  query::{CampaignSortField, LeadSortField, Page, PageRequest, SortOrder},
  sort::{Identified, Sortable},
};

use crate::{
  cache::{CacheKey, CollectionCache, EntityKind, PageSource},
  client::ApiClient,
};

// ─── Page sources ─────────────────────────────────────────────────────────────

impl PageSource<CampaignWithStats> for ApiClient {
  fn fetch(
    &self,
    key: &CacheKey,
    page: PageRequest,
  ) -> BoxFuture<'static, anyhow::Result<Page<CampaignWithStats>>> {
    let client = self.clone();
    let params = key.params(page);
    async move { Ok::<_, anyhow::Error>(client.list_campaigns(&params).await?) }.boxed()
  }
}

impl PageSource<LeadWithCampaign> for ApiClient {
  fn fetch(
    &self,
    key: &CacheKey,
    page: PageRequest,
  ) -> BoxFuture<'static, anyhow::Result<Page<LeadWithCampaign>>> {
    let client = self.clone();
    let params = key.params(page);
    async move { Ok::<_, anyhow::Error>(client.list_leads(&params).await?) }.boxed()
  }
}

// ─── Backend ──────────────────────────────────────────────────────────────────

/// Everything [`App`] needs from the server: both collections plus the
/// mutations that make cached pages stale.
pub trait Backend: PageSource<CampaignWithStats> + PageSource<LeadWithCampaign> {
  fn create_campaign(&self, input: NewCampaign)
  -> BoxFuture<'static, anyhow::Result<CampaignWithStats>>;

  fn update_campaign(
    &self,
    id: i64,
    patch: CampaignPatch,
  ) -> BoxFuture<'static, anyhow::Result<CampaignWithStats>>;

  fn delete_campaign(&self, id: i64) -> BoxFuture<'static, anyhow::Result<bool>>;

  fn create_lead(&self, input: NewLead) -> BoxFuture<'static, anyhow::Result<Lead>>;

  fn update_lead(&self, id: i64, patch: LeadPatch) -> BoxFuture<'static, anyhow::Result<Lead>>;

  fn set_lead_status(&self, id: i64, status: LeadStatus)
  -> BoxFuture<'static, anyhow::Result<Lead>>;

  fn delete_lead(&self, id: i64) -> BoxFuture<'static, anyhow::Result<bool>>;
}

impl Backend for ApiClient {
  fn create_campaign(
    &self,
    input: NewCampaign,
  ) -> BoxFuture<'static, anyhow::Result<CampaignWithStats>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.create_campaign(&input).await?) }.boxed()
  }

  fn update_campaign(
    &self,
    id: i64,
    patch: CampaignPatch,
  ) -> BoxFuture<'static, anyhow::Result<CampaignWithStats>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.update_campaign(id, &patch).await?) }.boxed()
  }

  fn delete_campaign(&self, id: i64) -> BoxFuture<'static, anyhow::Result<bool>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.delete_campaign(id).await?) }.boxed()
  }

  fn create_lead(&self, input: NewLead) -> BoxFuture<'static, anyhow::Result<Lead>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.create_lead(&input).await?) }.boxed()
  }

  fn update_lead(&self, id: i64, patch: LeadPatch) -> BoxFuture<'static, anyhow::Result<Lead>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.update_lead(id, &patch).await?) }.boxed()
  }

  fn set_lead_status(
    &self,
    id: i64,
    status: LeadStatus,
  ) -> BoxFuture<'static, anyhow::Result<Lead>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.set_lead_status(id, status).await?) }.boxed()
  }

  fn delete_lead(&self, id: i64) -> BoxFuture<'static, anyhow::Result<bool>> {
    let client = self.clone();
    async move { Ok::<_, anyhow::Error>(client.delete_lead(id).await?) }.boxed()
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Which slice of a collection to show.
#[derive(Debug, Clone, Default)]
pub struct ListOptions<F> {
  pub status: Option<String>,
  pub search: Option<String>,
  /// Re-sort the fetched items; `None` keeps server order.
  pub sort:   Option<F>,
  pub order:  SortOrder,
  /// Stop after this many pages; `None` fetches everything.
  pub pages:  Option<u32>,
}

/// A listing plus the server's filtered total.
pub struct Listing<T> {
  pub items:       Vec<T>,
  pub total_count: u64,
}

/// Long-lived command state. Listings are served from the caches; every
/// mutation invalidates the collections whose rows it can change, so the
/// next listing refetches from page 0.
pub struct App<B = ApiClient> {
  backend:   B,
  campaigns: CollectionCache<CampaignWithStats>,
  leads:     CollectionCache<LeadWithCampaign>,
}

impl<B: Backend> App<B> {
  pub fn new(backend: B, page_size: u32) -> Self {
    Self {
      backend,
      campaigns: CollectionCache::new(page_size),
      leads: CollectionCache::new(page_size),
    }
  }

  pub async fn campaigns(
    &self,
    opts: ListOptions<CampaignSortField>,
  ) -> anyhow::Result<Listing<CampaignWithStats>> {
    load(&self.campaigns, &self.backend, EntityKind::Campaigns, opts).await
  }

  pub async fn leads(
    &self,
    opts: ListOptions<LeadSortField>,
  ) -> anyhow::Result<Listing<LeadWithCampaign>> {
    load(&self.leads, &self.backend, EntityKind::Leads, opts).await
  }

  pub async fn create_campaign(&self, input: NewCampaign) -> anyhow::Result<CampaignWithStats> {
    let campaign = self.backend.create_campaign(input).await?;
    self.campaigns.invalidate(EntityKind::Campaigns);
    Ok(campaign)
  }

  /// Lead rows carry their campaign's name, so a rename touches both.
  pub async fn update_campaign(
    &self,
    id: i64,
    patch: CampaignPatch,
  ) -> anyhow::Result<CampaignWithStats> {
    let campaign = self.backend.update_campaign(id, patch).await?;
    self.invalidate_both();
    Ok(campaign)
  }

  /// Deleting a campaign deletes its leads too.
  pub async fn delete_campaign(&self, id: i64) -> anyhow::Result<bool> {
    let deleted = self.backend.delete_campaign(id).await?;
    self.invalidate_both();
    Ok(deleted)
  }

  pub async fn create_lead(&self, input: NewLead) -> anyhow::Result<Lead> {
    let lead = self.backend.create_lead(input).await?;
    self.invalidate_both();
    Ok(lead)
  }

  pub async fn update_lead(&self, id: i64, patch: LeadPatch) -> anyhow::Result<Lead> {
    let lead = self.backend.update_lead(id, patch).await?;
    self.invalidate_both();
    Ok(lead)
  }

  pub async fn set_lead_status(&self, id: i64, status: LeadStatus) -> anyhow::Result<Lead> {
    let lead = self.backend.set_lead_status(id, status).await?;
    self.invalidate_both();
    Ok(lead)
  }

  pub async fn delete_lead(&self, id: i64) -> anyhow::Result<bool> {
    let deleted = self.backend.delete_lead(id).await?;
    self.invalidate_both();
    Ok(deleted)
  }

  /// Campaign statistics are computed from lead rows, so any lead change
  /// also stales the campaign listing.
  fn invalidate_both(&self) {
    self.leads.invalidate(EntityKind::Leads);
    self.campaigns.invalidate(EntityKind::Campaigns);
  }
}

async fn load<T, P>(
  cache: &CollectionCache<T>,
  source: &P,
  entity: EntityKind,
  opts: ListOptions<T::Field>,
) -> anyhow::Result<Listing<T>>
where
  T: Identified + Sortable + Clone + Send + Sync + 'static,
  P: PageSource<T>,
{
  cache.activate(CacheKey::new(entity, opts.status, opts.search));
  cache.load_pages(source, opts.pages).await?;

  let items = match opts.sort {
    Some(field) => cache.sorted(field, opts.order),
    None => cache.items(),
  };
  let total_count = cache.total_count().unwrap_or(items.len() as u64);
  tracing::debug!(%entity, shown = items.len(), total_count, "listing loaded");
  Ok(Listing { items, total_count })
}

// ─── Rendering ────────────────────────────────────────────────────────────────

fn table(header: &[&str], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let mut out = String::new();
  push_row(&mut out, &widths, header.iter().copied());
  for row in rows {
    push_row(&mut out, &widths, row.iter().map(String::as_str));
  }
  out
}

fn push_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
  let parts: Vec<String> = cells
    .zip(widths)
    .map(|(cell, &w)| format!("{cell:<w$}"))
    .collect();
  let _ = writeln!(out, "{}", parts.join("  ").trim_end());
}

fn footer(shown: usize, total: u64) -> String {
  if shown as u64 >= total {
    format!("{shown} shown\n")
  } else {
    format!("{shown} of {total} shown\n")
  }
}

pub fn render_campaigns(listing: &Listing<CampaignWithStats>) -> String {
  let rows: Vec<Vec<String>> = listing
    .items
    .iter()
    .map(|c| {
      vec![
        c.campaign.id.to_string(),
        c.campaign.name.clone(),
        c.campaign.status.to_string(),
        c.stats.total_leads.to_string(),
        c.stats.successful_leads.to_string(),
        format!("{:.2}%", c.stats.response_rate),
      ]
    })
    .collect();
  let mut out = table(&["ID", "NAME", "STATUS", "LEADS", "SUCCESSFUL", "RESPONSE"], &rows);
  out.push_str(&footer(listing.items.len(), listing.total_count));
  out
}

pub fn render_leads(listing: &Listing<LeadWithCampaign>) -> String {
  let rows: Vec<Vec<String>> = listing
    .items
    .iter()
    .map(|l| {
      vec![
        l.lead.id.to_string(),
        l.lead.name.clone(),
        l.lead.company.clone().unwrap_or_default(),
        l.campaign_name.clone().unwrap_or_default(),
        l.lead.status.to_string(),
        l.lead
          .last_contact_at
          .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
          .unwrap_or_else(|| "-".into()),
      ]
    })
    .collect();
  let mut out = table(&["ID", "NAME", "COMPANY", "CAMPAIGN", "STATUS", "LAST CONTACT"], &rows);
  out.push_str(&footer(listing.items.len(), listing.total_count));
  out
}
