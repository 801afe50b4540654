use serde_json::Value;

use super::error::CompileError;
use super::literal;
use super::types::{CacheScope, Cardinality, OrderBy, Predicate, Query, Relation, SortDirection};

const LIST_WRAPPER: (&str, &str) = ("WITH results AS (", ") SELECT array_to_json(array_agg(row_to_json(results))) from results;");
const SINGLE_WRAPPER: (&str, &str) = ("WITH results AS (", ") SELECT row_to_json(results) from results;");

/// Output of [`compile`]: the statement batch plus the cache key captured
/// at the query's cache scope (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub cache_key: Option<String>,
    pub cardinality: Cardinality,
}

/// Turn a query into the SQL text sent to the database.
///
/// Stages run in a fixed order: base statement, predicates, ordering and
/// limit, JSON wrapping, role prefix, user prefix. Prefixes are prepended, so
/// a fully scoped statement reads `SET my.user_id = ...; SET LOCAL ROLE ...; WITH ...`.
/// A raw override replaces everything before the role prefix.
pub fn compile(query: &Query) -> Result<CompiledQuery, CompileError> {
    let mut cache_key = None;

    let mut sql = match query.raw_override.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw.to_string(),
        None => {
            let relation = query.relation.as_ref().ok_or(CompileError::MissingRelation)?;
            let sql = base_select(relation, &query.projection)?;
            let sql = apply_predicates(sql, &query.predicates)?;
            let sql = apply_order_and_limit(sql, &query.order_by, query.limit)?;
            let sql = wrap_json(&sql, query.cardinality);
            if query.cache_scope == CacheScope::PreRoleScoping {
                cache_key = Some(sql.clone());
            }
            sql
        }
    };

    if !query.security.role.is_empty() {
        sql = set_role(&sql, &query.security.role)?;
    }
    if query.cache_scope == CacheScope::PostRoleScoping {
        cache_key = Some(sql.clone());
    }

    if !query.security.user_id.is_empty() {
        sql = set_user_id(&sql, &query.security.user_id);
    }
    if query.cache_scope == CacheScope::PostUserScoping {
        cache_key = Some(sql.clone());
    }

    tracing::debug!(target: "rowgate::sql", "{}", sql);

    Ok(CompiledQuery {
        sql,
        cache_key,
        cardinality: query.cardinality,
    })
}

/// `SELECT <projection|*> FROM <relation>`
pub fn base_select(relation: &Relation, projection: &[String]) -> Result<String, CompileError> {
    let from = literal::relation(relation)?;
    let columns = if projection.is_empty() || projection.iter().any(|c| c == "*") {
        "*".to_string()
    } else {
        projection
            .iter()
            .map(|c| literal::identifier(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(",")
    };
    Ok(format!("SELECT {} FROM {}", columns, from))
}

/// Append predicates. The first one emitted opens the WHERE clause and its
/// join is ignored. Null or blank comparisons and empty sets are skipped,
/// except that `IS` / `IS NOT` against null render as a null test.
pub fn apply_predicates(mut sql: String, predicates: &[Predicate]) -> Result<String, CompileError> {
    let mut emitted = 0;
    for predicate in predicates {
        let Some(condition) = render_predicate(predicate)? else {
            continue;
        };
        if emitted == 0 {
            sql.push_str(" WHERE ");
        } else {
            sql.push(' ');
            sql.push_str(predicate.join().to_sql());
            sql.push(' ');
        }
        sql.push_str(&condition);
        emitted += 1;
    }
    Ok(sql)
}

fn render_predicate(predicate: &Predicate) -> Result<Option<String>, CompileError> {
    match predicate {
        Predicate::Compare { key, operator, value, .. } => {
            if value.is_null() {
                return match literal::operator(operator) {
                    Ok(op) if op == "IS" || op == "IS NOT" => Ok(Some(format!("{} {} NULL", key_or_id(key)?, op))),
                    _ => Ok(None),
                };
            }
            if matches!(value, Value::String(s) if s.is_empty()) {
                return Ok(None);
            }
            let key = key_or_id(key)?;
            let operator = literal::operator(operator)?;
            let value = literal::scalar(key, value)?;
            Ok(Some(format!("{} {} {}", key, operator, value)))
        }
        Predicate::AnyOf { key, values, .. } => {
            if values.is_empty() {
                return Ok(None);
            }
            let key = key_or_id(key)?;
            Ok(Some(format!("{} = ANY(ARRAY{})", key, literal::array(key, values)?)))
        }
    }
}

fn key_or_id(key: &str) -> Result<&str, CompileError> {
    if key.is_empty() {
        Ok("id")
    } else {
        literal::identifier(key)
    }
}

pub fn apply_order_and_limit(mut sql: String, order_by: &[OrderBy], limit: Option<u64>) -> Result<String, CompileError> {
    if !order_by.is_empty() {
        let parts = order_by
            .iter()
            .map(|o| {
                let column = literal::identifier(&o.column)?;
                Ok(match o.direction {
                    SortDirection::Asc => column.to_string(),
                    SortDirection::Desc => format!("{} DESC", column),
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&parts.join(", "));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    Ok(sql)
}

/// Ask the database to serialize the result rows itself
pub fn wrap_json(sql: &str, cardinality: Cardinality) -> String {
    let (open, close) = match cardinality {
        Cardinality::List => LIST_WRAPPER,
        Cardinality::Single => SINGLE_WRAPPER,
    };
    format!("{}{}{}", open, sql, close)
}

pub fn set_role(sql: &str, role: &str) -> Result<String, CompileError> {
    Ok(format!("SET LOCAL ROLE {}; {}", literal::identifier(role)?, sql))
}

pub fn set_user_id(sql: &str, user_id: &str) -> String {
    format!("SET my.user_id = {}; {}", literal::quote(user_id), sql)
}
