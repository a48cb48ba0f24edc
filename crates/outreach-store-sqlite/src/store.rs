//! [`SqliteStore`] — the SQLite implementation of [`OutreachStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use outreach_core::{
  campaign::{Campaign, CampaignPatch, CampaignWithStats, NewCampaign},
  lead::{Lead, LeadPatch, LeadStatus, LeadWithCampaign, NewLead},
  query::{CampaignQuery, LeadQuery, Page},
  stats::CampaignStats,
  store::OutreachStore,
  user::{Credential, NewSession, NewUser, Session, User, UserPatch},
};

use crate::{
  encode::{encode_dt, RawCampaign, RawLead, RawUser, USER_COLUMNS},
  error::is_unique_violation,
  schema::SCHEMA,
  sql::{self, PagedQuery},
  Error, Result,
};

/// `provider_id` of email/password accounts.
const CREDENTIAL_PROVIDER: &str = "credential";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Outreach store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are serialised on the connection's thread, so the count and data
/// statements of one page observe the same table state.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        sql::register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a paged query: the filtered count, then the window of rows.
  async fn run_page<R, F>(&self, query: PagedQuery, map_row: F) -> Result<(Vec<R>, u64)>
  where
    R: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let (rows, total) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &query.count_sql,
          rusqlite::params_from_iter(query.params.iter()),
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&query.data_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(query.data_params()), |row| map_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;
    Ok((rows, total.max(0) as u64))
  }

  async fn fetch_lead(&self, owner: String, id: i64) -> Result<Option<RawLead>> {
    let sql = sql::lead_by_id_sql();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![owner, id], RawLead::from_row)
          .optional()?)
      })
      .await?;
    Ok(raw)
  }
}

// ─── OutreachStore impl ──────────────────────────────────────────────────────

impl OutreachStore for SqliteStore {
  type Error = Error;

  // ── Users & sessions ──────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let input = input.validate()?;
    let now = Utc::now();
    let user = User {
      id:             Uuid::new_v4().to_string(),
      name:           input.name,
      email:          input.email,
      email_verified: false,
      image:          None,
      created_at:     now,
      updated_at:     now,
    };

    let user_id    = user.id.clone();
    let name       = user.name.clone();
    let email      = user.email.clone();
    let account_id = Uuid::new_v4().to_string();
    let at_str     = encode_dt(now);
    let hash       = input.password_hash;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (id, name, email, email_verified, image, created_at, updated_at)
           VALUES (?1, ?2, ?3, 0, NULL, ?4, ?4)",
          rusqlite::params![user_id, name, email, at_str],
        )?;
        tx.execute(
          "INSERT INTO accounts (id, account_id, provider_id, user_id, password, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?2, ?4, ?5, ?5)",
          rusqlite::params![account_id, user_id, CREDENTIAL_PROVIDER, hash, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          Error::Core(outreach_core::Error::Conflict(format!(
            "email {:?} is already registered",
            user.email
          )))
        } else {
          e.into()
        }
      })?;

    Ok(user)
  }

  async fn get_user(&self, id: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
            rusqlite::params![id],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn update_user(&self, id: String, patch: UserPatch) -> Result<Option<User>> {
    let patch = patch.validate()?;

    let user_id = id.clone();
    let name    = patch.name.clone();
    let email   = patch.email.clone();
    let image   = patch.image.clone();
    let at_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET name           = COALESCE(?2, name),
               email_verified = CASE WHEN ?3 IS NULL OR ?3 = email
                                     THEN email_verified ELSE 0 END,
               email          = COALESCE(?3, email),
               image          = CASE WHEN ?4 IS NULL THEN image ELSE NULLIF(?4, '') END,
               updated_at     = ?5
           WHERE id = ?1",
          rusqlite::params![user_id, name, email, image, at_str],
        )?)
      })
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          Error::Core(outreach_core::Error::Conflict(format!(
            "email {:?} is already registered",
            patch.email.as_deref().unwrap_or_default()
          )))
        } else {
          e.into()
        }
      })?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_user(id).await
  }

  async fn find_credential(&self, email: String) -> Result<Option<Credential>> {
    let email = email.trim().to_lowercase();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS}, a.password
               FROM users u
               JOIN accounts a ON a.user_id = u.id AND a.provider_id = ?2
               WHERE u.email = ?1 AND a.password IS NOT NULL"
            ),
            rusqlite::params![email, CREDENTIAL_PROVIDER],
            |row| Ok((RawUser::from_row(row)?, row.get::<_, String>(7)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(user, password_hash)| {
        Ok(Credential { user: user.into_user()?, password_hash })
      })
      .transpose()
  }

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    let now = Utc::now();
    let session = Session {
      id:         Uuid::new_v4().to_string(),
      user_id:    input.user_id,
      expires_at: input.expires_at,
      created_at: now,
      ip_address: input.ip_address,
      user_agent: input.user_agent,
    };

    let id_str      = session.id.clone();
    let user_id     = session.user_id.clone();
    let token       = input.token_hash;
    let expires_str = encode_dt(session.expires_at);
    let at_str      = encode_dt(now);
    let ip          = session.ip_address.clone();
    let agent       = session.user_agent.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (id, token, user_id, expires_at, ip_address, user_agent, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, token, user_id, expires_str, ip, agent, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn session_user(&self, token_hash: String) -> Result<Option<User>> {
    let now_str = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS}
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ?1 AND s.expires_at > ?2"
            ),
            rusqlite::params![token_hash, now_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token_hash])?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Campaigns ─────────────────────────────────────────────────────────────

  async fn create_campaign(&self, owner: String, input: NewCampaign) -> Result<CampaignWithStats> {
    let input = input.validate()?;
    let now = Utc::now();

    let name       = input.name.clone();
    let status_str = input.status.as_ref().to_owned();
    let user_id    = owner.clone();
    let at_str     = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO campaigns (name, status, user_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![name, status_str, user_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          Error::Core(outreach_core::Error::Conflict(format!(
            "a campaign named {:?} already exists",
            input.name
          )))
        } else {
          e.into()
        }
      })?;

    Ok(CampaignWithStats {
      campaign: Campaign {
        id,
        name: input.name,
        status: input.status,
        user_id: owner,
        created_at: now,
        updated_at: now,
      },
      stats:    CampaignStats::default(),
    })
  }

  async fn list_campaigns(
    &self,
    owner: String,
    query: CampaignQuery,
  ) -> Result<Page<CampaignWithStats>> {
    let built = sql::campaign_page(&owner, &query);
    let (raws, total) = self.run_page(built, RawCampaign::from_row).await?;
    let items = raws
      .into_iter()
      .map(RawCampaign::into_campaign)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total, query.page))
  }

  async fn get_campaign(&self, owner: String, id: i64) -> Result<Option<CampaignWithStats>> {
    let sql = sql::campaign_by_id_sql();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![owner, id], RawCampaign::from_row)
          .optional()?)
      })
      .await?;
    raw.map(RawCampaign::into_campaign).transpose()
  }

  async fn update_campaign(
    &self,
    owner: String,
    id: i64,
    patch: CampaignPatch,
  ) -> Result<Option<CampaignWithStats>> {
    let patch = patch.validate()?;

    let user_id    = owner.clone();
    let name       = patch.name.clone();
    let status_str = patch.status.map(|s| s.as_ref().to_owned());
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE campaigns
           SET name       = COALESCE(?3, name),
               status     = COALESCE(?4, status),
               updated_at = ?5
           WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id, user_id, name, status_str, at_str],
        )?)
      })
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          Error::Core(outreach_core::Error::Conflict(format!(
            "a campaign named {:?} already exists",
            patch.name.as_deref().unwrap_or_default()
          )))
        } else {
          e.into()
        }
      })?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_campaign(owner, id).await
  }

  async fn delete_campaign(&self, owner: String, id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM campaigns WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id, owner],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Leads ─────────────────────────────────────────────────────────────────

  async fn create_lead(&self, owner: String, input: NewLead) -> Result<Option<Lead>> {
    let input = input.validate()?;
    let now = Utc::now();

    let name        = input.name.clone();
    let designation = input.designation.clone();
    let email       = input.email.clone();
    let company     = input.company.clone();
    let status_str  = input.status.as_ref().to_owned();
    let avatar_url  = input.avatar_url.clone();
    let campaign_id = input.campaign_id;
    let at_str      = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let owned = tx
          .query_row(
            "SELECT 1 FROM campaigns WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![campaign_id, owner],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !owned {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO leads (name, designation, email, company, status, last_contact_at,
                              avatar_url, campaign_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8)",
          rusqlite::params![
            name,
            designation,
            email,
            company,
            status_str,
            avatar_url,
            campaign_id,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(id.map(|id| Lead {
      id,
      name: input.name,
      designation: input.designation,
      email: input.email,
      company: input.company,
      status: input.status,
      last_contact_at: None,
      avatar_url: input.avatar_url,
      campaign_id: input.campaign_id,
      created_at: now,
    }))
  }

  async fn list_leads(&self, owner: String, query: LeadQuery) -> Result<Page<LeadWithCampaign>> {
    let built = sql::lead_page(&owner, &query);
    let (raws, total) = self.run_page(built, RawLead::from_row).await?;
    let items = raws
      .into_iter()
      .map(RawLead::into_lead_with_campaign)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total, query.page))
  }

  async fn get_lead(&self, owner: String, id: i64) -> Result<Option<LeadWithCampaign>> {
    self
      .fetch_lead(owner, id)
      .await?
      .map(RawLead::into_lead_with_campaign)
      .transpose()
  }

  async fn update_lead(&self, owner: String, id: i64, patch: LeadPatch) -> Result<Option<Lead>> {
    let patch = patch.validate()?;
    let user_id = owner.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Both the lead and any target campaign must belong to the owner.
        let owned = tx
          .query_row(
            "SELECT 1 FROM leads l JOIN campaigns c ON c.id = l.campaign_id
             WHERE l.id = ?1 AND c.user_id = ?2",
            rusqlite::params![id, user_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !owned {
          return Ok(false);
        }
        if let Some(target) = patch.campaign_id {
          let target_owned = tx
            .query_row(
              "SELECT 1 FROM campaigns WHERE id = ?1 AND user_id = ?2",
              rusqlite::params![target, user_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if !target_owned {
            return Ok(false);
          }
        }
        tx.execute(
          "UPDATE leads
           SET name        = COALESCE(?2, name),
               designation = COALESCE(?3, designation),
               email       = COALESCE(?4, email),
               company     = CASE WHEN ?5 IS NULL THEN company ELSE NULLIF(?5, '') END,
               status      = COALESCE(?6, status),
               avatar_url  = CASE WHEN ?7 IS NULL THEN avatar_url ELSE NULLIF(?7, '') END,
               campaign_id = COALESCE(?8, campaign_id)
           WHERE id = ?1",
          rusqlite::params![
            id,
            patch.name,
            patch.designation,
            patch.email,
            patch.company,
            patch.status.map(|s| s.as_ref().to_owned()),
            patch.avatar_url,
            patch.campaign_id,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !changed {
      return Ok(None);
    }
    self.fetch_lead(owner, id).await?.map(RawLead::into_lead).transpose()
  }

  async fn set_lead_status(
    &self,
    owner: String,
    id: i64,
    status: LeadStatus,
  ) -> Result<Option<Lead>> {
    let user_id    = owner.clone();
    let status_str = status.as_ref().to_owned();
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE leads SET status = ?3, last_contact_at = ?4
           WHERE id = ?1
             AND campaign_id IN (SELECT id FROM campaigns WHERE user_id = ?2)",
          rusqlite::params![id, user_id, status_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_lead(owner, id).await?.map(RawLead::into_lead).transpose()
  }

  async fn delete_lead(&self, owner: String, id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM leads
           WHERE id = ?1
             AND campaign_id IN (SELECT id FROM campaigns WHERE user_id = ?2)",
          rusqlite::params![id, owner],
        )?)
      })
      .await?;
    Ok(n > 0)
  }
}
