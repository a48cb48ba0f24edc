//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order in SQL equals time order.
//! Enums are stored as their lowercase names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use outreach_core::{
  campaign::{Campaign, CampaignWithStats},
  lead::{Lead, LeadWithCampaign},
  stats::CampaignStats,
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str =
  "u.id, u.name, u.email, u.email_verified, u.image, u.created_at, u.updated_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:             String,
  pub name:           String,
  pub email:          String,
  pub email_verified: bool,
  pub image:          Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      email:          row.get(2)?,
      email_verified: row.get(3)?,
      image:          row.get(4)?,
      created_at:     row.get(5)?,
      updated_at:     row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:             self.id,
      name:           self.name,
      email:          self.email,
      email_verified: self.email_verified,
      image:          self.image,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values of one row of the campaign aggregation query.
pub struct RawCampaign {
  pub id:               i64,
  pub name:             String,
  pub status:           String,
  pub user_id:          String,
  pub created_at:       String,
  pub updated_at:       String,
  pub total_leads:      i64,
  pub successful_leads: i64,
  pub response_rate:    f64,
}

impl RawCampaign {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      name:             row.get(1)?,
      status:           row.get(2)?,
      user_id:          row.get(3)?,
      created_at:       row.get(4)?,
      updated_at:       row.get(5)?,
      total_leads:      row.get(6)?,
      successful_leads: row.get(7)?,
      response_rate:    row.get(8)?,
    })
  }

  pub fn into_campaign(self) -> Result<CampaignWithStats> {
    Ok(CampaignWithStats {
      campaign: Campaign {
        id:         self.id,
        name:       self.name,
        status:     decode_enum("campaign status", &self.status)?,
        user_id:    self.user_id,
        created_at: decode_dt(&self.created_at)?,
        updated_at: decode_dt(&self.updated_at)?,
      },
      stats:    CampaignStats {
        total_leads:      self.total_leads.max(0) as u64,
        successful_leads: self.successful_leads.max(0) as u64,
        response_rate:    self.response_rate,
      },
    })
  }
}

/// Column list matching [`RawLead::from_row`]; `c` must be the joined
/// campaign.
pub const LEAD_COLUMNS: &str = "l.id, l.name, l.designation, l.email, l.company, l.status, \
   l.last_contact_at, l.avatar_url, l.campaign_id, l.created_at, c.name";

/// Raw values read from a `leads` row joined with its campaign.
pub struct RawLead {
  pub id:              i64,
  pub name:            String,
  pub designation:     String,
  pub email:           String,
  pub company:         Option<String>,
  pub status:          String,
  pub last_contact_at: Option<String>,
  pub avatar_url:      Option<String>,
  pub campaign_id:     i64,
  pub created_at:      String,
  pub campaign_name:   Option<String>,
}

impl RawLead {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      designation:     row.get(2)?,
      email:           row.get(3)?,
      company:         row.get(4)?,
      status:          row.get(5)?,
      last_contact_at: row.get(6)?,
      avatar_url:      row.get(7)?,
      campaign_id:     row.get(8)?,
      created_at:      row.get(9)?,
      campaign_name:   row.get(10)?,
    })
  }

  pub fn into_lead_with_campaign(self) -> Result<LeadWithCampaign> {
    let lead = Lead {
      id:              self.id,
      name:            self.name,
      designation:     self.designation,
      email:           self.email,
      company:         self.company,
      status:          decode_enum("lead status", &self.status)?,
      last_contact_at: self.last_contact_at.as_deref().map(decode_dt).transpose()?,
      avatar_url:      self.avatar_url,
      campaign_id:     self.campaign_id,
      created_at:      decode_dt(&self.created_at)?,
    };
    Ok(LeadWithCampaign { lead, campaign_name: self.campaign_name })
  }

  pub fn into_lead(self) -> Result<Lead> {
    Ok(self.into_lead_with_campaign()?.lead)
  }
}
