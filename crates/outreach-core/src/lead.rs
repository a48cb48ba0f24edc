//! Leads — prospective contacts attached to exactly one campaign.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  Error, Result,
  query::LeadSortField,
  sort::{Identified, SortValue, Sortable},
};

/// Position of a lead in the outreach pipeline. Transitions are free-form;
/// any status may move to any other.
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
pub enum LeadStatus {
  #[default]
  Pending,
  Contacted,
  Responded,
  Converted,
}

impl LeadStatus {
  /// Statuses that count towards a campaign's response rate.
  pub const SUCCESSFUL: [LeadStatus; 2] = [LeadStatus::Responded, LeadStatus::Converted];

  pub fn is_successful(self) -> bool { Self::SUCCESSFUL.contains(&self) }

  /// Position in declaration order; used as the status sort key.
  pub fn rank(self) -> i64 { self as i64 }
}

/// A lead row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
  pub id:              i64,
  pub name:            String,
  pub designation:     String,
  pub email:           String,
  pub company:         Option<String>,
  pub status:          LeadStatus,
  /// Set to "now" by the status-change operation only.
  pub last_contact_at: Option<DateTime<Utc>>,
  pub avatar_url:      Option<String>,
  pub campaign_id:     i64,
  pub created_at:      DateTime<Utc>,
}

/// A lead joined with the name of its owning campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadWithCampaign {
  #[serde(flatten)]
  pub lead:          Lead,
  #[serde(default)]
  pub campaign_name: Option<String>,
}

impl Identified for Lead {
  fn id(&self) -> i64 { self.id }
}

impl Identified for LeadWithCampaign {
  fn id(&self) -> i64 { self.lead.id }
}

impl Sortable for LeadWithCampaign {
  type Field = LeadSortField;

  fn sort_value(&self, field: LeadSortField) -> SortValue {
    match field {
      LeadSortField::Name => SortValue::folded(&self.lead.name),
      LeadSortField::Campaign => {
        SortValue::folded(self.campaign_name.as_deref().unwrap_or_default())
      }
      LeadSortField::Status => SortValue::Int(self.lead.status.rank()),
      // Never-contacted leads sort as the epoch, before any real timestamp.
      LeadSortField::Activity => SortValue::Int(
        self
          .lead
          .last_contact_at
          .map(|t| t.timestamp_micros())
          .unwrap_or(0),
      ),
    }
  }
}

fn required(field: &str, value: &str) -> Result<String> {
  let v = value.trim();
  if v.is_empty() {
    return Err(Error::validation(format!("lead {field} is required")));
  }
  Ok(v.to_owned())
}

/// Blank optional text collapses to `None`.
fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}

/// Input to [`crate::store::OutreachStore::create_lead`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
  pub name:        String,
  pub designation: String,
  pub email:       String,
  pub company:     Option<String>,
  pub campaign_id: i64,
  pub status:      LeadStatus,
  pub avatar_url:  Option<String>,
}

impl NewLead {
  pub fn validate(self) -> Result<Self> {
    Ok(Self {
      name:        required("name", &self.name)?,
      designation: required("designation", &self.designation)?,
      email:       required("email", &self.email)?,
      company:     optional(self.company),
      campaign_id: self.campaign_id,
      status:      self.status,
      avatar_url:  optional(self.avatar_url),
    })
  }
}

/// A partial update; absent fields are left unchanged. A blank `company` or
/// `avatar_url` clears the column.
///
/// Changing `status` through a patch does not touch `last_contact_at`; use
/// the dedicated status-change operation for that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub designation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:      Option<LeadStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar_url:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub campaign_id: Option<i64>,
}

impl LeadPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.designation.is_none()
      && self.email.is_none()
      && self.company.is_none()
      && self.status.is_none()
      && self.avatar_url.is_none()
      && self.campaign_id.is_none()
  }

  pub fn validate(mut self) -> Result<Self> {
    if self.is_empty() {
      return Err(Error::validation("no lead fields to update"));
    }
    self.name = self.name.as_deref().map(|v| required("name", v)).transpose()?;
    self.designation = self
      .designation
      .as_deref()
      .map(|v| required("designation", v))
      .transpose()?;
    self.email = self.email.as_deref().map(|v| required("email", v)).transpose()?;
    self.company = self.company.map(|c| c.trim().to_owned());
    self.avatar_url = self.avatar_url.map(|a| a.trim().to_owned());
    Ok(self)
  }
}
