//! The `OutreachStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `outreach-store-sqlite`).
//! Higher layers (`outreach-api`, `outreach-server`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  campaign::{CampaignPatch, CampaignWithStats, NewCampaign},
  lead::{Lead, LeadPatch, LeadStatus, LeadWithCampaign, NewLead},
  query::{CampaignQuery, LeadQuery, Page},
  user::{Credential, NewSession, NewUser, Session, User, UserPatch},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Outreach store backend.
///
/// Every campaign and lead operation takes the owner's user id. A resource
/// that exists but belongs to someone else is indistinguishable from one
/// that does not exist: reads return `None`, deletes return `false`.
///
/// Campaign statistics are derived from the lead rows on every read.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait OutreachStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Users & sessions ──────────────────────────────────────────────────

  /// Create a user together with its credential account. Fails with a
  /// conflict if the email is already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Apply a profile update. Fails with a conflict if the new email is
  /// taken; returns `None` for an unknown user.
  fn update_user(
    &self,
    id: String,
    patch: UserPatch,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up the credential account for `email` (case-insensitive).
  fn find_credential(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credential>, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Resolve a token digest to its user. Expired sessions resolve to `None`.
  fn session_user(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `true` if a session was removed.
  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Campaigns ─────────────────────────────────────────────────────────

  /// Fails with a conflict if `owner` already has a campaign of that name.
  fn create_campaign(
    &self,
    owner: String,
    input: NewCampaign,
  ) -> impl Future<Output = Result<CampaignWithStats, Self::Error>> + Send + '_;

  /// The owner's campaigns with derived statistics, filtered, sorted and
  /// paged per `query`. Campaigns without leads are included with zeroes.
  fn list_campaigns(
    &self,
    owner: String,
    query: CampaignQuery,
  ) -> impl Future<Output = Result<Page<CampaignWithStats>, Self::Error>> + Send + '_;

  fn get_campaign(
    &self,
    owner: String,
    id: i64,
  ) -> impl Future<Output = Result<Option<CampaignWithStats>, Self::Error>> + Send + '_;

  fn update_campaign(
    &self,
    owner: String,
    id: i64,
    patch: CampaignPatch,
  ) -> impl Future<Output = Result<Option<CampaignWithStats>, Self::Error>> + Send + '_;

  /// Deleting a campaign removes its leads.
  fn delete_campaign(
    &self,
    owner: String,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Leads ─────────────────────────────────────────────────────────────

  /// Returns `None` when the target campaign is absent or not owned.
  fn create_lead(
    &self,
    owner: String,
    input: NewLead,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  fn list_leads(
    &self,
    owner: String,
    query: LeadQuery,
  ) -> impl Future<Output = Result<Page<LeadWithCampaign>, Self::Error>> + Send + '_;

  fn get_lead(
    &self,
    owner: String,
    id: i64,
  ) -> impl Future<Output = Result<Option<LeadWithCampaign>, Self::Error>> + Send + '_;

  /// Moving a lead to another campaign requires the owner to hold that
  /// campaign too; otherwise the lead is reported as not found.
  fn update_lead(
    &self,
    owner: String,
    id: i64,
    patch: LeadPatch,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Change the status and stamp `last_contact_at` with the current time.
  fn set_lead_status(
    &self,
    owner: String,
    id: i64,
    status: LeadStatus,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  fn delete_lead(
    &self,
    owner: String,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
