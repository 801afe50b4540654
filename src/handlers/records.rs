//! REST handlers over `/api/:schema/:table[/:record]`.
//!
//! Reads are compiled queries; writes are raw statements from
//! [`crate::query::mutation`]. Every statement carries the caller's
//! `SecurityContext`, so row-level security in the database decides what is
//! visible. Bodies are the database's JSON text, unmodified.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query as UrlQuery, State},
    Extension,
};
use serde_json::{Map, Value};

use crate::error::{ApiError, ErrorTarget};
use crate::middleware::RawJson;
use crate::query::{mutation, Predicate, Query, QueryParams, Relation, SecurityContext};
use crate::server::AppState;

const NO_RECORD: &str = "No record with that id";

/// GET /api/:schema/:table - list matching rows as a JSON array
pub async fn list(
    State(state): State<AppState>,
    Extension(security): Extension<SecurityContext>,
    Path((schema, table)): Path<(String, String)>,
    UrlQuery(params): UrlQuery<Vec<(String, String)>>,
) -> Result<RawJson, ApiError> {
    let resource = Resource::new(&schema, &table, "");
    let params = QueryParams::parse(&params).map_err(|e| resource.error(e))?;

    let query = params
        .apply(Query::list(resource.relation()))
        .scoped(security)
        .cached(state.read_cache_scope());

    let json = resource.run(&state, &query).await?;
    if json.is_empty() {
        return Ok(RawJson::ok("[]"));
    }
    Ok(RawJson::ok(json))
}

/// GET /api/:schema/:table/:record - one row by id
pub async fn get(
    State(state): State<AppState>,
    Extension(security): Extension<SecurityContext>,
    Path((schema, table, record)): Path<(String, String, String)>,
    UrlQuery(params): UrlQuery<Vec<(String, String)>>,
) -> Result<RawJson, ApiError> {
    let resource = Resource::new(&schema, &table, &record);
    let params = QueryParams::parse(&params).map_err(|e| resource.error(e))?;

    let query = params
        .apply(Query::single(resource.relation()).filter(Predicate::eq("id", record.as_str())))
        .scoped(security)
        .cached(state.read_cache_scope());

    let json = resource.run(&state, &query).await?;
    if json.is_empty() {
        return Err(resource.error(ApiError::not_found(NO_RECORD)));
    }
    Ok(RawJson::ok(json))
}

/// POST /api/:schema/:table - insert one row, 201 with the stored row
pub async fn post(
    State(state): State<AppState>,
    Extension(security): Extension<SecurityContext>,
    Path((schema, table)): Path<(String, String)>,
    body: Bytes,
) -> Result<RawJson, ApiError> {
    let resource = Resource::new(&schema, &table, "");
    let values = resource.body(&body)?;

    let query = mutation::insert(&resource.relation(), &values)
        .map_err(|e| resource.error(e))?
        .scoped(security);

    let json = resource.write(&state, &query).await?;
    if json.is_empty() {
        return Ok(RawJson::created("{}"));
    }
    Ok(RawJson::created(json))
}

/// PATCH /api/:schema/:table/:record - update columns of one row
pub async fn patch(
    State(state): State<AppState>,
    Extension(security): Extension<SecurityContext>,
    Path((schema, table, record)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<RawJson, ApiError> {
    let resource = Resource::new(&schema, &table, &record);
    let values = resource.body(&body)?;

    let query = mutation::update(&resource.relation(), &record, &values)
        .map_err(|e| resource.error(e))?
        .scoped(security);

    let json = resource.write(&state, &query).await?;
    if json.is_empty() {
        return Err(resource.error(ApiError::not_found(NO_RECORD)));
    }
    Ok(RawJson::ok(json))
}

/// DELETE /api/:schema/:table/:record - 204 once the row is gone
pub async fn delete(
    State(state): State<AppState>,
    Extension(security): Extension<SecurityContext>,
    Path((schema, table, record)): Path<(String, String, String)>,
) -> Result<RawJson, ApiError> {
    let resource = Resource::new(&schema, &table, &record);

    let query = mutation::delete(&resource.relation(), &record)
        .map_err(|e| resource.error(e))?
        .scoped(security);

    let json = resource.write(&state, &query).await?;
    if json.is_empty() {
        return Err(resource.error(ApiError::not_found(NO_RECORD)));
    }
    Ok(RawJson::no_content())
}

/// Path parameters of one request, used for the relation and error bodies
struct Resource {
    target: ErrorTarget,
}

impl Resource {
    fn new(schema: &str, table: &str, record: &str) -> Self {
        Self {
            target: ErrorTarget::new(path_identifier(schema), path_identifier(table), record),
        }
    }

    fn relation(&self) -> Relation {
        Relation::new(self.target.schema.clone(), self.target.table.clone())
    }

    fn error(&self, err: impl Into<ApiError>) -> ApiError {
        err.into().for_resource(self.target.clone())
    }

    /// Request body as a JSON object; an empty body is an empty object
    fn body(&self, body: &[u8]) -> Result<Map<String, Value>, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.error(ApiError::invalid_json("Request body must be a JSON object"))),
            Err(e) => Err(self.error(ApiError::invalid_json(format!("Invalid JSON body: {}", e)))),
        }
    }

    /// Execute under a child of the shutdown token, bounded by the request
    /// timeout
    async fn run(&self, state: &AppState, query: &Query) -> Result<String, ApiError> {
        let token = state.shutdown.child_token();
        let deadline = Duration::from_secs(state.config.api.request_timeout_secs);

        let result = match tokio::time::timeout(deadline, state.store.execute(query, &token)).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => {
                token.cancel();
                Err(ApiError::request_timeout("Request timed out"))
            }
        };
        result.map_err(|e| {
            tracing::debug!(
                "{}.{} [{}] failed: {}",
                self.target.schema,
                self.target.table,
                self.target.record,
                e
            );
            self.error(e)
        })
    }

    /// Run a write, then drop cached reads of the relation it touched
    async fn write(&self, state: &AppState, query: &Query) -> Result<String, ApiError> {
        let json = self.run(state, query).await?;
        state.store.invalidate(&self.relation());
        Ok(json)
    }
}

/// URL segments use hyphens where SQL names use underscores
fn path_identifier(segment: &str) -> String {
    segment.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphens_become_underscores() {
        assert_eq!(path_identifier("order-items"), "order_items");
        let resource = Resource::new("my-shop", "order-items", "7");
        assert_eq!(resource.relation(), Relation::new("my_shop", "order_items"));
    }

    #[test]
    fn body_parsing() {
        let resource = Resource::new("s", "t", "");
        assert!(resource.body(b"").unwrap().is_empty());
        assert!(resource.body(b"  \n").unwrap().is_empty());
        assert_eq!(resource.body(br#"{"a":1}"#).unwrap()["a"], 1);

        let err = resource.body(b"[1,2]").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.target().map(|t| t.table.as_str()), Some("t"));
        assert!(resource.body(b"{oops").is_err());
    }
}
