//! Derived campaign statistics.
//!
//! These numbers are never stored. Every read recomputes them from the lead
//! rows, so they cannot drift from the data they summarise. The SQLite
//! backend computes the same values in SQL; the functions here are the
//! reference definition used by clients and tests.

use serde::{Deserialize, Serialize};

use crate::lead::LeadStatus;

/// Lead counts and response rate for a single campaign.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
  pub total_leads:      u64,
  /// Leads whose status is `responded` or `converted`.
  pub successful_leads: u64,
  /// Percentage of successful leads, rounded to two decimal places.
  pub response_rate:    f64,
}

impl CampaignStats {
  pub fn from_counts(total_leads: u64, successful_leads: u64) -> Self {
    Self {
      total_leads,
      successful_leads,
      response_rate: response_rate(successful_leads, total_leads),
    }
  }

  /// Tally statistics from the statuses of a campaign's leads.
  pub fn from_statuses<I>(statuses: I) -> Self
  where
    I: IntoIterator<Item = LeadStatus>,
  {
    let (total, successful) = statuses
      .into_iter()
      .fold((0u64, 0u64), |(t, s), status| {
        (t + 1, s + u64::from(status.is_successful()))
      });
    Self::from_counts(total, successful)
  }
}

/// `round(successful * 100 / total, 2)`, or `0` for an empty campaign.
pub fn response_rate(successful: u64, total: u64) -> f64 {
  if total == 0 {
    return 0.0;
  }
  round2(successful as f64 * 100.0 / total as f64)
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }
