//! Resolution of the server listing query.
//!
//! A [`ServerQuery`] is a read-only view over the `servers` table. Every
//! narrowing or annotating step consumes the view and returns a new one, and
//! nothing touches the database until [`ServerQuery::fetch`] is awaited. Each step is rendered as a subquery
//! wrapping the previous one, so a filter applied after a slice narrows the
//! sliced rows rather than the whole table.

use std::num::ParseIntError;

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

use crate::database::DbPool;
use crate::middleware::auth::Identity;
use crate::models::server::ServerRow;

const BASE_VIEW: &str = "SELECT s.id, s.name, s.owner_username AS owner, c.name AS category, \
     s.icon, s.banner, s.description \
     FROM servers s JOIN categories c ON c.id = s.category_id";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Authentication credentials were not provided.")]
    AuthenticationRequired,

    #[error("Server with id {id} does not exist!")]
    NotFound { id: String },

    #[error("Server value error!")]
    ValueError,

    #[error("Invalid qty value '{value}': {source}")]
    MalformedQuantity {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Raw query string parameters of the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerListParams {
    pub category: Option<String>,
    pub by_user: Option<String>,
    pub by_serverid: Option<String>,
    pub qty: Option<String>,
    pub with_num_members: Option<String>,
}

impl ServerListParams {
    pub fn by_user(&self) -> bool {
        is_true(&self.by_user)
    }

    pub fn with_num_members(&self) -> bool {
        is_true(&self.with_num_members)
    }

    pub fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    pub fn by_serverid(&self) -> Option<&str> {
        non_empty(&self.by_serverid)
    }

    pub fn qty(&self) -> Option<&str> {
        non_empty(&self.qty)
    }
}

fn is_true(value: &Option<String>) -> bool {
    value.as_deref() == Some("true")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Category(String),
    Member(String),
    CountMembers,
    Slice(i64),
    Id(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerQuery {
    steps: Vec<Step>,
}

impl ServerQuery {
    pub fn all() -> Self {
        Self::default()
    }

    fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Servers whose category name equals `name` exactly.
    pub fn filter_category(self, name: impl Into<String>) -> Self {
        self.then(Step::Category(name.into()))
    }

    /// Servers that have `username` among their members.
    pub fn filter_member(self, username: impl Into<String>) -> Self {
        self.then(Step::Member(username.into()))
    }

    pub fn annotate_member_count(self) -> Self {
        self.then(Step::CountMembers)
    }

    /// The first `n` servers of the current view, in id order.
    pub fn slice(self, n: i64) -> Self {
        self.then(Step::Slice(n))
    }

    pub fn filter_id(self, id: i64) -> Self {
        self.then(Step::Id(id))
    }

    fn push_view(qb: &mut QueryBuilder<'_, Sqlite>, steps: &[Step]) {
        let Some((last, rest)) = steps.split_last() else {
            qb.push(BASE_VIEW);
            return;
        };

        let alias = format!("v{}", steps.len());

        match last {
            Step::CountMembers => {
                qb.push(format!(
                    "SELECT {alias}.*, (SELECT COUNT(*) FROM server_members m WHERE m.server_id = {alias}.id) AS num_members FROM ("
                ));
                Self::push_view(qb, rest);
                qb.push(format!(") AS {alias}"));
            }
            Step::Category(name) => {
                qb.push(format!("SELECT {alias}.* FROM ("));
                Self::push_view(qb, rest);
                qb.push(format!(") AS {alias} WHERE {alias}.category = "));
                qb.push_bind(name.clone());
            }
            Step::Member(username) => {
                qb.push(format!("SELECT {alias}.* FROM ("));
                Self::push_view(qb, rest);
                qb.push(format!(
                    ") AS {alias} WHERE {alias}.id IN (SELECT server_id FROM server_members WHERE username = "
                ));
                qb.push_bind(username.clone());
                qb.push(")");
            }
            Step::Slice(n) => {
                qb.push(format!("SELECT {alias}.* FROM ("));
                Self::push_view(qb, rest);
                qb.push(format!(") AS {alias} ORDER BY {alias}.id LIMIT "));
                qb.push_bind(*n);
            }
            Step::Id(id) => {
                qb.push(format!("SELECT {alias}.* FROM ("));
                Self::push_view(qb, rest);
                qb.push(format!(") AS {alias} WHERE {alias}.id = "));
                qb.push_bind(*id);
            }
        }
    }

    fn select_builder(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT * FROM (");
        Self::push_view(&mut qb, &self.steps);
        qb.push(") AS result ORDER BY result.id");
        qb
    }

    pub async fn fetch(&self, pool: &DbPool) -> Result<Vec<ServerRow>, sqlx::Error> {
        let mut qb = self.select_builder();
        tracing::debug!("Server query: {}", qb.sql());
        qb.build_query_as::<ServerRow>()
            .fetch_all(pool.as_ref())
            .await
    }

    pub async fn fetch_optional(&self, pool: &DbPool) -> Result<Option<ServerRow>, sqlx::Error> {
        let mut qb = self.select_builder();
        qb.build_query_as::<ServerRow>()
            .fetch_optional(pool.as_ref())
            .await
    }
}

/// Resolves the listing parameters into the servers to return.
///
/// Steps run in a fixed order: auth precheck, category, membership, member
/// count annotation, quantity, then the single-server lookup.
pub async fn resolve_servers(
    pool: &DbPool,
    params: &ServerListParams,
    identity: &Identity,
) -> Result<Vec<ServerRow>, QueryError> {
    let by_user = params.by_user();
    let by_serverid = params.by_serverid();

    if (by_user || by_serverid.is_some()) && !identity.is_authenticated() {
        return Err(QueryError::AuthenticationRequired);
    }

    let mut query = ServerQuery::all();

    if let Some(category) = params.category() {
        query = query.filter_category(category);
    }

    if by_user && let Some(username) = identity.user_id() {
        query = query.filter_member(username);
    }

    if params.with_num_members() {
        query = query.annotate_member_count();
    }

    if let Some(qty) = params.qty() {
        let n = qty
            .parse::<u64>()
            .map_err(|source| QueryError::MalformedQuantity {
                value: qty.to_string(),
                source,
            })?;
        query = query.slice(i64::try_from(n).unwrap_or(i64::MAX));
    }

    match by_serverid {
        Some(raw_id) => narrow_to_server(pool, query, raw_id).await,
        None => Ok(query.fetch(pool).await?),
    }
}

/// Fetches the single server `raw_id` out of the current view. The rows
/// returned are the ones checked, so an empty lookup is always NotFound.
async fn narrow_to_server(
    pool: &DbPool,
    query: ServerQuery,
    raw_id: &str,
) -> Result<Vec<ServerRow>, QueryError> {
    let id = raw_id.parse::<i64>().map_err(|e| {
        tracing::debug!("Rejecting by_serverid '{}': {}", raw_id, e);
        QueryError::ValueError
    })?;

    match query.filter_id(id).fetch(pool).await {
        Ok(rows) if rows.is_empty() => Err(QueryError::NotFound {
            id: raw_id.to_string(),
        }),
        Ok(rows) => Ok(rows),
        Err(e) => {
            tracing::debug!("Server lookup for id {} failed: {}", id, e);
            Err(QueryError::ValueError)
        }
    }
}
