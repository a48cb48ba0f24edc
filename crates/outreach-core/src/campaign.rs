//! Campaigns — named outreach efforts owned by one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  Error, Result,
  query::CampaignSortField,
  sort::{Identified, SortValue, Sortable},
  stats::CampaignStats,
};

/// Maximum campaign name length, in characters.
pub const MAX_CAMPAIGN_NAME_LEN: usize = 160;

/// Lifecycle of a campaign. Closed set; anything else is rejected at the
/// boundary.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  AsRefStr,
  Display,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CampaignStatus {
  #[default]
  Draft,
  Active,
  Paused,
  Completed,
}

impl CampaignStatus {
  /// Position in declaration order; used as the status sort key.
  pub fn rank(self) -> i64 { self as i64 }
}

/// A campaign row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
  pub id:         i64,
  pub name:       String,
  pub status:     CampaignStatus,
  /// Owning user.
  pub user_id:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A campaign annotated with statistics derived from its leads at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignWithStats {
  #[serde(flatten)]
  pub campaign: Campaign,
  #[serde(flatten)]
  pub stats:    CampaignStats,
}

impl Identified for Campaign {
  fn id(&self) -> i64 { self.id }
}

impl Identified for CampaignWithStats {
  fn id(&self) -> i64 { self.campaign.id }
}

impl Sortable for CampaignWithStats {
  type Field = CampaignSortField;

  fn sort_value(&self, field: CampaignSortField) -> SortValue {
    match field {
      CampaignSortField::Name => SortValue::folded(&self.campaign.name),
      CampaignSortField::Status => SortValue::Int(self.campaign.status.rank()),
      CampaignSortField::Leads => SortValue::Int(self.stats.total_leads as i64),
      CampaignSortField::ResponseRate => SortValue::Float(self.stats.response_rate),
      CampaignSortField::Created => {
        SortValue::Int(self.campaign.created_at.timestamp_micros())
      }
    }
  }
}

fn check_name(name: &str) -> Result<String> {
  let name = name.trim();
  if name.is_empty() {
    return Err(Error::validation("campaign name is required"));
  }
  if name.chars().count() > MAX_CAMPAIGN_NAME_LEN {
    return Err(Error::validation(format!(
      "campaign name exceeds {MAX_CAMPAIGN_NAME_LEN} characters"
    )));
  }
  Ok(name.to_owned())
}

/// Input to [`crate::store::OutreachStore::create_campaign`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
  pub name:   String,
  #[serde(default)]
  pub status: CampaignStatus,
}

impl NewCampaign {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), status: CampaignStatus::default() }
  }

  pub fn validate(mut self) -> Result<Self> {
    self.name = check_name(&self.name)?;
    Ok(self)
  }
}

/// A partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CampaignStatus>,
}

impl CampaignPatch {
  pub fn validate(mut self) -> Result<Self> {
    if self.name.is_none() && self.status.is_none() {
      return Err(Error::validation("no campaign fields to update"));
    }
    self.name = self.name.as_deref().map(check_name).transpose()?;
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_round_trips_through_strings() {
    assert_eq!("paused".parse::<CampaignStatus>().unwrap(), CampaignStatus::Paused);
    assert_eq!(CampaignStatus::Completed.as_ref(), "completed");
    assert!("archived".parse::<CampaignStatus>().is_err());
  }

  #[test]
  fn name_limits() {
    assert!(NewCampaign::new("   ").validate().is_err());
    assert!(NewCampaign::new("x".repeat(161)).validate().is_err());
    let ok = NewCampaign::new(format!("  {}  ", "x".repeat(160))).validate().unwrap();
    assert_eq!(ok.name.len(), 160);
  }

  #[test]
  fn empty_patch_is_rejected() {
    assert!(CampaignPatch::default().validate().is_err());
    let p = CampaignPatch { status: Some(CampaignStatus::Active), ..Default::default() };
    assert!(p.validate().is_ok());
  }

  #[test]
  fn serialises_flat_camel_case() {
    let now = Utc::now();
    let c = CampaignWithStats {
      campaign: Campaign {
        id:         5,
        name:       "Q1 Outreach".into(),
        status:     CampaignStatus::Active,
        user_id:    "u1".into(),
        created_at: now,
        updated_at: now,
      },
      stats:    CampaignStats::from_counts(4, 2),
    };
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["totalLeads"], 4);
    assert_eq!(v["successfulLeads"], 2);
    assert_eq!(v["responseRate"], 50.0);
    assert_eq!(v["userId"], "u1");
    assert_eq!(v["status"], "active");
  }
}
