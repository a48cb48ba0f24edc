//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use outreach_core::{
  Error as CoreError,
  campaign::{CampaignPatch, CampaignStatus, NewCampaign},
  lead::{LeadPatch, LeadStatus, NewLead},
  query::{CampaignQuery, CampaignSortField, LeadQuery, LeadSortField, PageRequest, SortOrder},
  sort::sort_by_field,
  store::OutreachStore,
  user::{NewSession, NewUser, User, UserPatch},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> User {
  s.create_user(NewUser {
    name:          "Test User".into(),
    email:         email.into(),
    password_hash: "$argon2id$stub".into(),
  })
  .await
  .unwrap()
}

async fn campaign(s: &SqliteStore, owner: &User, name: &str) -> i64 {
  s.create_campaign(owner.id.clone(), NewCampaign::new(name))
    .await
    .unwrap()
    .campaign
    .id
}

fn lead(campaign_id: i64, name: &str, company: &str, status: LeadStatus) -> NewLead {
  NewLead {
    name: name.into(),
    designation: "Engineer".into(),
    email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
    company: Some(company.into()),
    campaign_id,
    status,
    avatar_url: None,
  }
}

fn core_err(e: Error) -> CoreError { e.into() }

// ─── Users & sessions ────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
  let s = store().await;
  user(&s, "ada@example.com").await;
  let err = s
    .create_user(NewUser {
      name:          "Other".into(),
      email:         "ADA@example.com".into(),
      password_hash: "x".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Conflict(_)));
}

#[tokio::test]
async fn credential_lookup_ignores_email_case() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let cred = s.find_credential(" Ada@Example.com ".into()).await.unwrap().unwrap();
  assert_eq!(cred.user.id, u.id);
  assert_eq!(cred.password_hash, "$argon2id$stub");
  assert!(s.find_credential("nobody@example.com".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_resolve_until_expiry_or_deletion() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  s.create_session(NewSession {
    user_id:    u.id.clone(),
    token_hash: "live".into(),
    expires_at: Utc::now() + Duration::hours(1),
    ip_address: None,
    user_agent: None,
  })
  .await
  .unwrap();
  s.create_session(NewSession {
    user_id:    u.id.clone(),
    token_hash: "stale".into(),
    expires_at: Utc::now() - Duration::hours(1),
    ip_address: None,
    user_agent: None,
  })
  .await
  .unwrap();

  assert_eq!(s.session_user("live".into()).await.unwrap().unwrap().id, u.id);
  assert!(s.session_user("stale".into()).await.unwrap().is_none());

  assert!(s.delete_session("live".into()).await.unwrap());
  assert!(s.session_user("live".into()).await.unwrap().is_none());
  assert!(!s.delete_session("live".into()).await.unwrap());
}

#[tokio::test]
async fn profile_update_patches_and_guards_email() {
  let s = store().await;
  let ada = user(&s, "ada@example.com").await;
  user(&s, "grace@example.com").await;

  let updated = s
    .update_user(ada.id.clone(), UserPatch {
      name: Some("Ada Lovelace".into()),
      image: Some("https://img.example/ada.png".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "Ada Lovelace");
  assert_eq!(updated.email, "ada@example.com");
  assert_eq!(updated.image.as_deref(), Some("https://img.example/ada.png"));

  let cleared = s
    .update_user(ada.id.clone(), UserPatch { image: Some(" ".into()), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(cleared.image, None);
  assert_eq!(cleared.name, "Ada Lovelace");

  let err = s
    .update_user(ada.id.clone(), UserPatch {
      email: Some("GRACE@example.com".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Conflict(_)));

  // Sign-in follows the new address.
  s.update_user(ada.id.clone(), UserPatch {
    email: Some("countess@example.com".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  let cred = s.find_credential("countess@example.com".into()).await.unwrap().unwrap();
  assert_eq!(cred.user.id, ada.id);

  assert!(
    s.update_user("missing".into(), UserPatch { name: Some("X".into()), ..Default::default() })
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Campaign statistics ─────────────────────────────────────────────────────

#[tokio::test]
async fn campaign_without_leads_has_zero_stats() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Empty").await;

  let c = s.get_campaign(u.id.clone(), id).await.unwrap().unwrap();
  assert_eq!(c.stats.total_leads, 0);
  assert_eq!(c.stats.successful_leads, 0);
  assert_eq!(c.stats.response_rate, 0.0);

  let page = s.list_campaigns(u.id.clone(), CampaignQuery::default()).await.unwrap();
  assert_eq!(page.total_count, 1);
  assert_eq!(page.items[0].stats.total_leads, 0);
}

#[tokio::test]
async fn mixed_statuses_give_half_response_rate() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Q3 Outreach").await;
  for (name, status) in [
    ("A", LeadStatus::Pending),
    ("B", LeadStatus::Contacted),
    ("C", LeadStatus::Responded),
    ("D", LeadStatus::Converted),
  ] {
    s.create_lead(u.id.clone(), lead(id, name, "Acme", status)).await.unwrap().unwrap();
  }

  let c = s.get_campaign(u.id.clone(), id).await.unwrap().unwrap();
  assert_eq!(c.stats.total_leads, 4);
  assert_eq!(c.stats.successful_leads, 2);
  assert_eq!(c.stats.response_rate, 50.0);
}

#[tokio::test]
async fn response_rate_rounds_to_two_decimals() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Thirds").await;
  for (name, status) in [
    ("A", LeadStatus::Responded),
    ("B", LeadStatus::Pending),
    ("C", LeadStatus::Pending),
  ] {
    s.create_lead(u.id.clone(), lead(id, name, "Acme", status)).await.unwrap().unwrap();
  }

  let c = s.get_campaign(u.id.clone(), id).await.unwrap().unwrap();
  assert_eq!(c.stats.response_rate, 33.33);
}

#[tokio::test]
async fn uniform_statuses_give_extreme_rates() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let cold = campaign(&s, &u, "Cold").await;
  let warm = campaign(&s, &u, "Warm").await;
  for name in ["A", "B", "C"] {
    s.create_lead(u.id.clone(), lead(cold, name, "Acme", LeadStatus::Pending))
      .await
      .unwrap();
    s.create_lead(u.id.clone(), lead(warm, name, "Acme", LeadStatus::Converted))
      .await
      .unwrap();
  }

  let cold = s.get_campaign(u.id.clone(), cold).await.unwrap().unwrap();
  let warm = s.get_campaign(u.id.clone(), warm).await.unwrap().unwrap();
  assert_eq!((cold.stats.total_leads, cold.stats.response_rate), (3, 0.0));
  assert_eq!((warm.stats.successful_leads, warm.stats.response_rate), (3, 100.0));
}

#[tokio::test]
async fn stats_follow_status_changes() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Live").await;
  let l = s
    .create_lead(u.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();

  s.set_lead_status(u.id.clone(), l.id, LeadStatus::Responded).await.unwrap().unwrap();
  let c = s.get_campaign(u.id.clone(), id).await.unwrap().unwrap();
  assert_eq!(c.stats.successful_leads, 1);
  assert_eq!(c.stats.response_rate, 100.0);
}

// ─── Campaign CRUD ───────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_campaign_name_is_a_conflict() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let other = user(&s, "bob@example.com").await;
  campaign(&s, &u, "Launch").await;

  let err = s
    .create_campaign(u.id.clone(), NewCampaign::new("Launch"))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Conflict(_)));

  // Names are unique per owner only.
  campaign(&s, &other, "Launch").await;
}

#[tokio::test]
async fn update_campaign_patches_given_fields() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;

  let updated = s
    .update_campaign(u.id.clone(), id, CampaignPatch {
      name:   None,
      status: Some(CampaignStatus::Active),
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.campaign.name, "Launch");
  assert_eq!(updated.campaign.status, CampaignStatus::Active);
}

#[tokio::test]
async fn deleting_a_campaign_removes_its_leads() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Doomed").await;
  let l = s
    .create_lead(u.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();

  assert!(s.delete_campaign(u.id.clone(), id).await.unwrap());
  assert!(s.get_lead(u.id.clone(), l.id).await.unwrap().is_none());
  let page = s.list_leads(u.id.clone(), LeadQuery::default()).await.unwrap();
  assert_eq!(page.total_count, 0);
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn other_users_resources_look_missing() {
  let s = store().await;
  let owner = user(&s, "ada@example.com").await;
  let intruder = user(&s, "eve@example.com").await;
  let id = campaign(&s, &owner, "Private").await;
  let l = s
    .create_lead(owner.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();

  let eve = intruder.id.clone();
  assert!(s.get_campaign(eve.clone(), id).await.unwrap().is_none());
  assert!(s.get_lead(eve.clone(), l.id).await.unwrap().is_none());
  assert!(
    s.set_lead_status(eve.clone(), l.id, LeadStatus::Converted)
      .await
      .unwrap()
      .is_none()
  );
  assert!(!s.delete_lead(eve.clone(), l.id).await.unwrap());
  assert!(!s.delete_campaign(eve.clone(), id).await.unwrap());
  assert!(
    s.create_lead(eve.clone(), lead(id, "B", "Acme", LeadStatus::Pending))
      .await
      .unwrap()
      .is_none()
  );

  let theirs = s.list_campaigns(eve.clone(), CampaignQuery::default()).await.unwrap();
  assert_eq!(theirs.total_count, 0);
  let theirs = s.list_leads(eve, LeadQuery::default()).await.unwrap();
  assert_eq!(theirs.total_count, 0);

  // The owner's data is untouched.
  let l = s.get_lead(owner.id.clone(), l.id).await.unwrap().unwrap();
  assert_eq!(l.lead.status, LeadStatus::Pending);
}

#[tokio::test]
async fn moving_a_lead_into_a_foreign_campaign_is_refused() {
  let s = store().await;
  let owner = user(&s, "ada@example.com").await;
  let other = user(&s, "bob@example.com").await;
  let mine = campaign(&s, &owner, "Mine").await;
  let theirs = campaign(&s, &other, "Theirs").await;
  let l = s
    .create_lead(owner.id.clone(), lead(mine, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();

  let moved = s
    .update_lead(owner.id.clone(), l.id, LeadPatch {
      campaign_id: Some(theirs),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(moved.is_none());
  let still = s.get_lead(owner.id.clone(), l.id).await.unwrap().unwrap();
  assert_eq!(still.lead.campaign_id, mine);
}

// ─── Leads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_status_stamps_last_contact() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  let l = s
    .create_lead(u.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();
  assert!(l.last_contact_at.is_none());

  let before = Utc::now();
  let updated = s
    .set_lead_status(u.id.clone(), l.id, LeadStatus::Contacted)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, LeadStatus::Contacted);
  assert!(updated.last_contact_at.unwrap() >= before - Duration::seconds(1));
}

#[tokio::test]
async fn blank_company_patch_clears_the_column() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  let l = s
    .create_lead(u.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();

  let updated = s
    .update_lead(u.id.clone(), l.id, LeadPatch {
      company: Some("  ".into()),
      designation: Some("CTO".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.company, None);
  assert_eq!(updated.designation, "CTO");
  assert_eq!(updated.name, "A");
}

#[tokio::test]
async fn lead_pages_cover_the_collection_exactly_once() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Big").await;
  for i in 0..45 {
    // Duplicate names exercise the id tie-break.
    let name = format!("Lead {}", i % 7);
    s.create_lead(u.id.clone(), lead(id, &name, "Acme", LeadStatus::Pending))
      .await
      .unwrap();
  }

  let mut seen = HashSet::new();
  for page in 0..3 {
    let result = s
      .list_leads(u.id.clone(), LeadQuery {
        campaign_id: Some(id),
        page: PageRequest::new(page, 20),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(result.total_count, 45);
    assert_eq!(result.has_more, page < 2);
    for item in result.items {
      assert!(seen.insert(item.lead.id), "duplicate lead {}", item.lead.id);
    }
  }
  assert_eq!(seen.len(), 45);
}

#[tokio::test]
async fn search_matches_company_case_insensitively() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  s.create_lead(u.id.clone(), lead(id, "Alice Johnson", "Startup Inc", LeadStatus::Pending))
    .await
    .unwrap();
  s.create_lead(u.id.clone(), lead(id, "Bob Singh", "TechWorld", LeadStatus::Pending))
    .await
    .unwrap();

  let page = s
    .list_leads(u.id.clone(), LeadQuery {
      search: Some("startup".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total_count, 1);
  assert_eq!(page.items[0].lead.name, "Alice Johnson");
  assert_eq!(page.items[0].campaign_name.as_deref(), Some("Launch"));
}

#[tokio::test]
async fn search_folds_non_ascii_letters() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Publishers").await;
  s.create_lead(u.id.clone(), lead(id, "Claire Martin", "Éditions Gallimard", LeadStatus::Pending))
    .await
    .unwrap();
  s.create_lead(u.id.clone(), lead(id, "Bob Singh", "TechWorld", LeadStatus::Pending))
    .await
    .unwrap();

  for needle in ["Éditions Gallimard", "ÉDITIONS", "éditions"] {
    let page = s
      .list_leads(u.id.clone(), LeadQuery { search: Some(needle.into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(page.total_count, 1, "search {needle:?}");
    assert_eq!(page.items[0].lead.name, "Claire Martin");
  }
}

#[tokio::test]
async fn name_order_matches_client_sort() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  for name in ["Émile Zola", "zoe Quinn", "Adam Smith", "émilie Roux", "Zack Hill"] {
    s.create_lead(u.id.clone(), lead(id, name, "Acme", LeadStatus::Pending))
      .await
      .unwrap();
  }

  for order in [SortOrder::Asc, SortOrder::Desc] {
    let page = s
      .list_leads(u.id.clone(), LeadQuery {
        sort: LeadSortField::Name,
        order,
        ..Default::default()
      })
      .await
      .unwrap();
    let server: Vec<String> = page.items.iter().map(|l| l.lead.name.clone()).collect();

    let mut resorted = page.items.clone();
    resorted.reverse();
    sort_by_field(&mut resorted, LeadSortField::Name, order);
    let client: Vec<String> = resorted.iter().map(|l| l.lead.name.clone()).collect();
    assert_eq!(server, client, "{order:?}");
  }
}

#[tokio::test]
async fn unscoped_search_matches_campaign_name() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let summer = campaign(&s, &u, "Summer Push").await;
  let winter = campaign(&s, &u, "Winter").await;
  s.create_lead(u.id.clone(), lead(summer, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap();
  s.create_lead(u.id.clone(), lead(winter, "B", "Acme", LeadStatus::Pending))
    .await
    .unwrap();

  let unscoped = s
    .list_leads(u.id.clone(), LeadQuery {
      search: Some("summer".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(unscoped.total_count, 1);

  let scoped = s
    .list_leads(u.id.clone(), LeadQuery {
      campaign_id: Some(summer),
      search: Some("summer".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(scoped.total_count, 0);
}

#[tokio::test]
async fn status_filter_narrows_the_count() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  for (name, status) in [
    ("A", LeadStatus::Pending),
    ("B", LeadStatus::Responded),
    ("C", LeadStatus::Responded),
  ] {
    s.create_lead(u.id.clone(), lead(id, name, "Acme", status)).await.unwrap();
  }

  let page = s
    .list_leads(u.id.clone(), LeadQuery {
      status: Some(LeadStatus::Responded),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total_count, 2);
  assert!(page.items.iter().all(|l| l.lead.status == LeadStatus::Responded));
}

#[tokio::test]
async fn activity_sort_puts_never_contacted_first() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let id = campaign(&s, &u, "Launch").await;
  let a = s
    .create_lead(u.id.clone(), lead(id, "A", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();
  let b = s
    .create_lead(u.id.clone(), lead(id, "B", "Acme", LeadStatus::Pending))
    .await
    .unwrap()
    .unwrap();
  s.set_lead_status(u.id.clone(), a.id, LeadStatus::Contacted).await.unwrap();

  let page = s
    .list_leads(u.id.clone(), LeadQuery {
      sort: LeadSortField::Activity,
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<i64> = page.items.iter().map(|l| l.lead.id).collect();
  assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn campaigns_sort_by_response_rate() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let low = campaign(&s, &u, "Low").await;
  let high = campaign(&s, &u, "High").await;
  let none = campaign(&s, &u, "None").await;
  s.create_lead(u.id.clone(), lead(low, "A", "Acme", LeadStatus::Pending)).await.unwrap();
  s.create_lead(u.id.clone(), lead(high, "B", "Acme", LeadStatus::Converted))
    .await
    .unwrap();

  let page = s
    .list_campaigns(u.id.clone(), CampaignQuery {
      sort: CampaignSortField::ResponseRate,
      order: SortOrder::Desc,
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<i64> = page.items.iter().map(|c| c.campaign.id).collect();
  // `low` and `none` tie at 0.0 and fall back to id order.
  assert_eq!(ids, vec![high, low, none]);
}

#[tokio::test]
async fn campaign_search_and_status_filter() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  campaign(&s, &u, "Spring Launch").await;
  let active = campaign(&s, &u, "Autumn Launch").await;
  campaign(&s, &u, "Newsletter").await;
  s.update_campaign(u.id.clone(), active, CampaignPatch {
    name:   None,
    status: Some(CampaignStatus::Active),
  })
  .await
  .unwrap();

  let launches = s
    .list_campaigns(u.id.clone(), CampaignQuery {
      search: Some("LAUNCH".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(launches.total_count, 2);

  let live = s
    .list_campaigns(u.id.clone(), CampaignQuery {
      status: Some(CampaignStatus::Active),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(live.total_count, 1);
  assert_eq!(live.items[0].campaign.id, active);
}
