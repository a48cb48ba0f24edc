//! SQL builders for the campaign aggregation query and the filtered,
//! sorted, paged lead query.
//!
//! Each builder produces a data statement and a count statement that share
//! one WHERE clause and one parameter list, so `total_count` always reflects
//! exactly the rows the data statement pages through.

use outreach_core::{
  campaign::CampaignStatus,
  lead::LeadStatus,
  query::{CampaignQuery, CampaignSortField, LeadQuery, LeadSortField, SortOrder},
};
use outreach_core::sort::fold_case;
use rusqlite::{Connection, functions::FunctionFlags, types::Value};

use crate::encode::LEAD_COLUMNS;

// ─── Case folding ────────────────────────────────────────────────────────────

/// Register `fold(text)`, the SQL side of [`fold_case`]. SQLite's own
/// `lower()` and `LIKE` only fold ASCII, so every case-insensitive match or
/// ordering goes through this instead.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| fold_case(&t)))
    },
  )
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// Conjunction of SQL conditions with numbered (`?N`) bound parameters.
#[derive(Debug, Default)]
pub struct Predicate {
  clauses: Vec<String>,
  params:  Vec<Value>,
}

impl Predicate {
  /// Bind `value` and return its placeholder.
  pub fn bind(&mut self, value: impl Into<Value>) -> String {
    self.params.push(value.into());
    format!("?{}", self.params.len())
  }

  pub fn push(&mut self, clause: impl Into<String>) { self.clauses.push(clause.into()); }

  pub fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  /// Adds a case-insensitive substring match of `needle` against any of
  /// `columns`, all sharing one bound pattern.
  pub fn push_search(&mut self, needle: &str, columns: &[&str]) {
    let p = self.bind(like_pattern(needle));
    let any = columns
      .iter()
      .map(|col| format!("fold({col}) LIKE {p} ESCAPE '\\'"))
      .collect::<Vec<_>>()
      .join(" OR ");
    self.push(format!("({any})"));
  }
}

/// `%needle%`, case-folded, with LIKE metacharacters escaped.
pub fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for ch in fold_case(needle).chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

// ─── Built statements ────────────────────────────────────────────────────────

/// A paged data statement and its matching count statement.
#[derive(Debug)]
pub struct PagedQuery {
  /// Expects `params` followed by `limit` and `offset`.
  pub data_sql:  String,
  /// Expects exactly `params`.
  pub count_sql: String,
  pub params:    Vec<Value>,
  pub limit:     i64,
  pub offset:    i64,
}

impl PagedQuery {
  pub fn data_params(&self) -> Vec<Value> {
    let mut p = self.params.clone();
    p.push(Value::Integer(self.limit));
    p.push(Value::Integer(self.offset));
    p
  }
}

fn direction(order: SortOrder) -> &'static str {
  match order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  }
}

/// `CASE <column> WHEN 'a' THEN 0 ... END` in declaration order.
fn rank_expr<E>(column: &str) -> String
where
  E: strum::IntoEnumIterator + AsRef<str>,
{
  let arms: String = E::iter()
    .enumerate()
    .map(|(i, v)| format!(" WHEN '{}' THEN {i}", v.as_ref()))
    .collect();
  format!("CASE {column}{arms} END")
}

fn successful_status_list() -> String {
  LeadStatus::SUCCESSFUL
    .iter()
    .map(|s| format!("'{}'", s.as_ref()))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Campaigns ───────────────────────────────────────────────────────────────

/// SELECT list + FROM of the aggregation. Every non-aggregate column in the
/// select list appears in [`CAMPAIGN_GROUP_BY`].
fn campaign_select() -> String {
  let successful = format!(
    "COUNT(CASE WHEN l.status IN ({}) THEN 1 END)",
    successful_status_list()
  );
  format!(
    "SELECT c.id, c.name, c.status, c.user_id, c.created_at, c.updated_at,
            COUNT(l.id) AS total_leads,
            {successful} AS successful_leads,
            CASE WHEN COUNT(l.id) > 0
                 THEN ROUND({successful} * 100.0 / COUNT(l.id), 2)
                 ELSE 0.0
            END AS response_rate
     FROM campaigns c
     LEFT JOIN leads l ON l.campaign_id = c.id"
  )
}

const CAMPAIGN_GROUP_BY: &str =
  "GROUP BY c.id, c.name, c.status, c.user_id, c.created_at, c.updated_at";

/// Statistics for one owned campaign. Parameters: `?1` owner, `?2` id.
pub fn campaign_by_id_sql() -> String {
  format!(
    "{} WHERE c.user_id = ?1 AND c.id = ?2 {CAMPAIGN_GROUP_BY}",
    campaign_select()
  )
}

fn campaign_order(sort: CampaignSortField) -> String {
  match sort {
    CampaignSortField::Name => "fold(c.name)".to_owned(),
    CampaignSortField::Status => rank_expr::<CampaignStatus>("c.status"),
    CampaignSortField::Leads => "total_leads".to_owned(),
    CampaignSortField::ResponseRate => "response_rate".to_owned(),
    CampaignSortField::Created => "c.created_at".to_owned(),
  }
}

/// The owner's campaigns annotated with lead statistics.
pub fn campaign_page(owner: &str, q: &CampaignQuery) -> PagedQuery {
  let mut pred = Predicate::default();
  let o = pred.bind(owner.to_owned());
  pred.push(format!("c.user_id = {o}"));
  if let Some(status) = q.status {
    let s = pred.bind(status.as_ref().to_owned());
    pred.push(format!("c.status = {s}"));
  }
  if let Some(search) = &q.search {
    pred.push_search(search, &["c.name"]);
  }

  let where_clause = pred.where_clause();
  let n = pred.params.len();
  let data_sql = format!(
    "{select} {where_clause} {CAMPAIGN_GROUP_BY}
     ORDER BY {key} {dir}, c.id ASC
     LIMIT ?{lim} OFFSET ?{off}",
    select = campaign_select(),
    key = campaign_order(q.sort),
    dir = direction(q.order),
    lim = n + 1,
    off = n + 2,
  );
  // The predicate only touches campaign columns, so the count needs no join.
  let count_sql = format!("SELECT COUNT(*) FROM campaigns c {where_clause}");

  PagedQuery {
    data_sql,
    count_sql,
    params: pred.params,
    limit: i64::from(q.page.limit),
    offset: i64::try_from(q.page.offset()).unwrap_or(i64::MAX),
  }
}

// ─── Leads ───────────────────────────────────────────────────────────────────

const LEAD_FROM: &str = "FROM leads l JOIN campaigns c ON c.id = l.campaign_id";

/// One owned lead. Parameters: `?1` owner, `?2` lead id.
pub fn lead_by_id_sql() -> String {
  format!("SELECT {LEAD_COLUMNS} {LEAD_FROM} WHERE c.user_id = ?1 AND l.id = ?2")
}

fn lead_order(sort: LeadSortField) -> String {
  match sort {
    LeadSortField::Name => "fold(l.name)".to_owned(),
    LeadSortField::Campaign => "fold(COALESCE(c.name, ''))".to_owned(),
    LeadSortField::Status => rank_expr::<LeadStatus>("l.status"),
    // NULL sorts as the empty string, i.e. before every timestamp.
    LeadSortField::Activity => "COALESCE(l.last_contact_at, '')".to_owned(),
  }
}

/// Leads in campaigns held by `owner`, optionally scoped to one campaign.
pub fn lead_page(owner: &str, q: &LeadQuery) -> PagedQuery {
  let mut pred = Predicate::default();
  let o = pred.bind(owner.to_owned());
  pred.push(format!("c.user_id = {o}"));
  if let Some(campaign_id) = q.campaign_id {
    let c = pred.bind(campaign_id);
    pred.push(format!("l.campaign_id = {c}"));
  }
  if let Some(status) = q.status {
    let s = pred.bind(status.as_ref().to_owned());
    pred.push(format!("l.status = {s}"));
  }
  if let Some(search) = &q.search {
    let mut columns = vec!["l.name", "l.email", "COALESCE(l.company, '')", "l.designation"];
    if q.searches_campaign_name() {
      columns.push("c.name");
    }
    pred.push_search(search, &columns);
  }

  let where_clause = pred.where_clause();
  let n = pred.params.len();
  let data_sql = format!(
    "SELECT {LEAD_COLUMNS} {LEAD_FROM} {where_clause}
     ORDER BY {key} {dir}, l.id ASC
     LIMIT ?{lim} OFFSET ?{off}",
    key = lead_order(q.sort),
    dir = direction(q.order),
    lim = n + 1,
    off = n + 2,
  );
  let count_sql = format!("SELECT COUNT(*) {LEAD_FROM} {where_clause}");

  PagedQuery {
    data_sql,
    count_sql,
    params: pred.params,
    limit: i64::from(q.page.limit),
    offset: i64::try_from(q.page.offset()).unwrap_or(i64::MAX),
  }
}
