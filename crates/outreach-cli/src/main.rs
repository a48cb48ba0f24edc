//! `outreach` — command-line client for the Outreach campaign tracker.
//!
//! # Usage
//!
//! ```text
//! outreach --url http://localhost:3000 --token $TOKEN campaigns --status active --sort responseRate --desc
//! outreach leads --search startup --pages 2
//! outreach lead-status 42 responded
//! outreach campaign-create "Spring push" --status active
//! outreach shell
//! ```

mod app;
mod cache;
mod client;
mod shell;

use anyhow::{Context, Result};
use app::{App, Backend, ListOptions};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use outreach_core::{
  campaign::{CampaignPatch, CampaignStatus, NewCampaign},
  lead::{LeadPatch, LeadStatus, NewLead},
  query::{CampaignSortField, DEFAULT_PAGE_SIZE, LeadSortField, SortOrder},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "outreach", about = "Command-line client for the Outreach campaign tracker")]
struct Args {
  /// Path to a TOML config file (url, token, page_size).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the outreach server (default: http://127.0.0.1:3000).
  #[arg(long, env = "OUTREACH_URL")]
  url: Option<String>,

  /// Session token from sign-in.
  #[arg(long, env = "OUTREACH_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Items per page when fetching.
  #[arg(long)]
  page_size: Option<u32>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List campaigns with their lead statistics.
  Campaigns {
    /// Only campaigns with this status.
    #[arg(long)]
    status: Option<String>,
    /// Case-insensitive substring of the campaign name.
    #[arg(long)]
    search: Option<String>,
    /// name, status, totalLeads, responseRate or createdAt.
    #[arg(long)]
    sort:   Option<CampaignSortField>,
    #[arg(long)]
    desc:   bool,
    /// Stop after this many pages.
    #[arg(long)]
    pages:  Option<u32>,
  },
  /// List leads across all campaigns.
  Leads {
    #[arg(long)]
    status: Option<String>,
    /// Matches name, email, company or campaign name.
    #[arg(long)]
    search: Option<String>,
    /// name, campaign, status or activity.
    #[arg(long)]
    sort:   Option<LeadSortField>,
    #[arg(long)]
    desc:   bool,
    #[arg(long)]
    pages:  Option<u32>,
  },
  /// Move a lead through the pipeline.
  LeadStatus { id: i64, status: LeadStatus },
  /// Create a campaign.
  CampaignCreate {
    name:   String,
    #[arg(long, default_value_t)]
    status: CampaignStatus,
  },
  /// Rename a campaign or change its status.
  CampaignUpdate {
    id:     i64,
    #[arg(long)]
    name:   Option<String>,
    #[arg(long)]
    status: Option<CampaignStatus>,
  },
  /// Delete a campaign and all of its leads.
  CampaignDelete { id: i64 },
  /// Add a lead to a campaign.
  LeadCreate {
    #[arg(long)]
    campaign:    i64,
    #[arg(long)]
    name:        String,
    #[arg(long)]
    designation: String,
    #[arg(long)]
    email:       String,
    #[arg(long)]
    company:     Option<String>,
    #[arg(long, default_value_t)]
    status:      LeadStatus,
    #[arg(long)]
    avatar_url:  Option<String>,
  },
  /// Edit a lead. A blank --company or --avatar-url clears it.
  LeadUpdate {
    id:          i64,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    designation: Option<String>,
    #[arg(long)]
    email:       Option<String>,
    #[arg(long)]
    company:     Option<String>,
    #[arg(long)]
    status:      Option<LeadStatus>,
    /// Move the lead to another campaign.
    #[arg(long)]
    campaign:    Option<i64>,
    #[arg(long)]
    avatar_url:  Option<String>,
  },
  LeadDelete { id: i64 },
  /// Read commands interactively, keeping cached pages between them.
  Shell,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:       Option<String>,
  #[serde(default)]
  token:     Option<String>,
  #[serde(default)]
  page_size: Option<u32>,
}

fn order(desc: bool) -> SortOrder { if desc { SortOrder::Desc } else { SortOrder::Asc } }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so listings on stdout stay clean.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or(file_cfg.url)
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    token:    args.token.or(file_cfg.token),
  };
  let page_size = args
    .page_size
    .or(file_cfg.page_size)
    .unwrap_or(DEFAULT_PAGE_SIZE);

  let app = App::new(ApiClient::new(api_config)?, page_size);

  match args.command {
    Command::Shell => shell::run(&app).await,
    command => execute(&app, command).await,
  }
}

/// Run one command against `app` and print its result.
async fn execute<B: Backend>(app: &App<B>, command: Command) -> Result<()> {
  match command {
    Command::Campaigns { status, search, sort, desc, pages } => {
      let listing = app
        .campaigns(ListOptions { status, search, sort, order: order(desc), pages })
        .await?;
      print!("{}", app::render_campaigns(&listing));
    }
    Command::Leads { status, search, sort, desc, pages } => {
      let listing = app
        .leads(ListOptions { status, search, sort, order: order(desc), pages })
        .await?;
      print!("{}", app::render_leads(&listing));
    }
    Command::LeadStatus { id, status } => {
      let lead = app.set_lead_status(id, status).await?;
      println!("lead {} ({}) is now {}", lead.id, lead.name, lead.status);
    }
    Command::CampaignCreate { name, status } => {
      let c = app.create_campaign(NewCampaign { name, status }).await?;
      println!("created campaign {} ({})", c.campaign.id, c.campaign.name);
    }
    Command::CampaignUpdate { id, name, status } => {
      let c = app.update_campaign(id, CampaignPatch { name, status }).await?;
      println!("campaign {} ({}) is {}", c.campaign.id, c.campaign.name, c.campaign.status);
    }
    Command::CampaignDelete { id } => {
      app.delete_campaign(id).await?;
      println!("deleted campaign {id}");
    }
    Command::LeadCreate { campaign, name, designation, email, company, status, avatar_url } => {
      let lead = app
        .create_lead(NewLead {
          name,
          designation,
          email,
          company,
          campaign_id: campaign,
          status,
          avatar_url,
        })
        .await?;
      println!("created lead {} ({}) in campaign {}", lead.id, lead.name, lead.campaign_id);
    }
    Command::LeadUpdate {
      id,
      name,
      designation,
      email,
      company,
      status,
      campaign,
      avatar_url,
    } => {
      let patch = LeadPatch {
        name,
        designation,
        email,
        company,
        status,
        avatar_url,
        campaign_id: campaign,
      };
      let lead = app.update_lead(id, patch).await?;
      println!("updated lead {} ({})", lead.id, lead.name);
    }
    Command::LeadDelete { id } => {
      app.delete_lead(id).await?;
      println!("deleted lead {id}");
    }
    Command::Shell => anyhow::bail!("shell cannot be nested"),
  }

  Ok(())
}
