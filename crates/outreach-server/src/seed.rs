//! Demo data for a fresh install.
//!
//! Five campaigns and sixteen leads spread over every lead status, so the
//! statistics, filters and sort orders all have something to show.

use outreach_core::{
  Error,
  campaign::{CampaignStatus, NewCampaign},
  lead::{LeadStatus, NewLead},
  store::OutreachStore,
};

const CAMPAIGNS: [(&str, CampaignStatus); 5] = [
  ("LinkedIn Outreach", CampaignStatus::Active),
  ("Email Marketing", CampaignStatus::Draft),
  ("Twitter DMs", CampaignStatus::Paused),
  ("Cold Calls", CampaignStatus::Active),
  ("Webinar Invites", CampaignStatus::Active),
];

struct SeedLead {
  name:        &'static str,
  designation: &'static str,
  email:       &'static str,
  company:     &'static str,
  /// Index into [`CAMPAIGNS`].
  campaign:    usize,
  status:      LeadStatus,
}

const fn lead(
  name: &'static str,
  designation: &'static str,
  email: &'static str,
  company: &'static str,
  campaign: usize,
  status: LeadStatus,
) -> SeedLead {
  SeedLead { name, designation, email, company, campaign, status }
}

const LEADS: [SeedLead; 16] = [
  lead("Alice Johnson", "CEO", "alice@startup.com", "Startup Inc", 0, LeadStatus::Pending),
  lead("Bob Singh", "CTO", "bob@techworld.com", "TechWorld", 0, LeadStatus::Contacted),
  lead("Charlie Patel", "CFO", "charlie@financehub.com", "FinanceHub", 1, LeadStatus::Responded),
  lead("Daisy Kaur", "Design Director", "daisy@designify.com", "Designify", 2, LeadStatus::Converted),
  lead("Esha Verma", "Marketing Head", "esha@adboost.com", "AdBoost", 1, LeadStatus::Pending),
  lead("Farhan Ali", "Product Manager", "farhan@buildit.com", "BuildIt", 2, LeadStatus::Contacted),
  lead("Gaurav Mehta", "VP Sales", "gaurav@sellfast.com", "SellFast", 3, LeadStatus::Pending),
  lead("Hina Shah", "HR Manager", "hina@talenthunt.com", "TalentHunt", 4, LeadStatus::Contacted),
  lead("Ishaan Khanna", "Operations Lead", "ishaan@workify.com", "Workify", 0, LeadStatus::Responded),
  lead("Jasleen Kaur", "Data Scientist", "jasleen@aihub.com", "AI Hub", 1, LeadStatus::Converted),
  lead("Kunal Arora", "Engineering Manager", "kunal@devworks.com", "DevWorks", 2, LeadStatus::Pending),
  lead("Lavanya Rao", "Business Analyst", "lavanya@insights.com", "Insights Ltd", 3, LeadStatus::Contacted),
  lead("Mohit Yadav", "Legal Advisor", "mohit@lawify.com", "Lawify", 4, LeadStatus::Responded),
  lead("Nisha Kapoor", "UX Designer", "nisha@creativify.com", "Creativify", 0, LeadStatus::Converted),
  lead("Omar Khan", "Investor", "omar@venturex.com", "VentureX", 1, LeadStatus::Pending),
  lead("Priya Nair", "Growth Lead", "priya@scaleup.com", "ScaleUp", 3, LeadStatus::Converted),
];

/// What [`seed_demo_data`] created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
  pub campaigns: usize,
  pub leads:     usize,
}

/// Create the demo campaigns and leads for `owner`.
///
/// Runs through the ordinary store operations, so every row passes the same
/// validation as API input. Seeding twice creates a second copy.
pub async fn seed_demo_data<S: OutreachStore>(
  store: &S,
  owner: &str,
) -> Result<SeedSummary, Error> {
  if store.get_user(owner.to_owned()).await.map_err(Into::<Error>::into)?.is_none() {
    return Err(Error::NotFound(format!("user {owner} not found")));
  }

  let mut campaign_ids = Vec::with_capacity(CAMPAIGNS.len());
  for (name, status) in CAMPAIGNS {
    let campaign = store
      .create_campaign(owner.to_owned(), NewCampaign { name: name.to_owned(), status })
      .await
      .map_err(Into::<Error>::into)?;
    campaign_ids.push(campaign.campaign.id);
  }

  for seed in &LEADS {
    let input = NewLead {
      name:        seed.name.to_owned(),
      designation: seed.designation.to_owned(),
      email:       seed.email.to_owned(),
      company:     Some(seed.company.to_owned()),
      campaign_id: campaign_ids[seed.campaign],
      status:      seed.status,
      avatar_url:  None,
    };
    store
      .create_lead(owner.to_owned(), input)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or_else(|| Error::NotFound("seeded campaign vanished".into()))?;
  }

  tracing::info!(owner, campaigns = CAMPAIGNS.len(), leads = LEADS.len(), "demo data seeded");
  Ok(SeedSummary { campaigns: CAMPAIGNS.len(), leads: LEADS.len() })
}
