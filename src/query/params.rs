use serde_json::Value;

use super::error::CompileError;
use super::types::{Join, OrderBy, Predicate, Query, SortDirection};

/// Filters, ordering and paging parsed from a URL query string.
///
/// Reserved keys are `select`, `orderby` and `limit`. Anything else is a
/// filter: `field=value`, `field[op]=value`, `field[in]=a,b`,
/// `field[is]=null` / `field[isnot]=null` and the same
/// forms prefixed with `or` (`or[field][op]=value`) to join with OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub projection: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
}

impl QueryParams {
    pub fn parse(pairs: &[(String, String)]) -> Result<Self, CompileError> {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.to_ascii_lowercase().as_str() {
                "select" => {
                    params.projection = split_list(value).map(str::to_string).collect();
                }
                "orderby" => {
                    params.order_by.extend(parse_order(value));
                }
                "limit" => {
                    let limit = value.trim().parse::<u64>().map_err(|_| CompileError::InvalidParameter {
                        key: key.clone(),
                        reason: format!("limit must be a non-negative integer, got {:?}", value),
                    })?;
                    params.limit = Some(limit);
                }
                _ => params.predicates.push(parse_filter(key, value)?),
            }
        }
        Ok(params)
    }

    /// Copy the parsed parts onto a query
    pub fn apply(self, mut query: Query) -> Query {
        if !self.projection.is_empty() {
            query.projection = self.projection;
        }
        query.predicates.extend(self.predicates);
        query.order_by.extend(self.order_by);
        if self.limit.is_some() {
            query.limit = self.limit;
        }
        query
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_order(value: &str) -> Vec<OrderBy> {
    split_list(value)
        .filter_map(|part| {
            let mut it = part.split_whitespace();
            let column = it.next()?;
            let direction = match it.next() {
                Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            Some(OrderBy { column: column.to_string(), direction })
        })
        .collect()
}

fn parse_filter(key: &str, value: &str) -> Result<Predicate, CompileError> {
    let invalid = |reason: &str| CompileError::InvalidParameter {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (join, rest) = match key.strip_prefix("or[") {
        Some(rest) => {
            let close = rest.find(']').ok_or_else(|| invalid("unterminated field"))?;
            // or[field][op] -> field[op]
            (Join::Or, format!("{}{}", &rest[..close], &rest[close + 1..]))
        }
        None => (Join::And, key.to_string()),
    };

    let (field, op) = match rest.split_once('[') {
        Some((field, tail)) => {
            let op = tail.strip_suffix(']').ok_or_else(|| invalid("unterminated operator"))?;
            (field.to_string(), op.to_ascii_lowercase())
        }
        None => (rest, "eq".to_string()),
    };

    if field.is_empty() {
        return Err(invalid("missing field name"));
    }

    let predicate = match op.as_str() {
        "in" => Predicate::any_of(field, set_values(value)),
        "is" | "isnot" => {
            let operator = if op == "is" { "IS" } else { "IS NOT" };
            let value = match value.to_ascii_lowercase().as_str() {
                "null" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(invalid("expected null, true or false")),
            };
            Predicate::compare(field, operator, value)
        }
        other => {
            let operator = match other {
                "eq" => "=",
                "ne" | "neq" => "<>",
                "gt" => ">",
                "gte" => ">=",
                "lt" => "<",
                "lte" => "<=",
                "like" => "LIKE",
                "ilike" => "ILIKE",
                _ => return Err(CompileError::UnsupportedOperator(other.to_string())),
            };
            Predicate::compare(field, operator, value)
        }
    };

    Ok(predicate.with_join(join))
}

/// Integer sets stay numeric so `int_col = ANY(ARRAY[1, 2])` type-checks;
/// anything else becomes a text set.
fn set_values(value: &str) -> Vec<Value> {
    let items: Vec<&str> = split_list(value).collect();
    let numbers: Option<Vec<i64>> = items.iter().map(|s| s.parse::<i64>().ok()).collect();
    match numbers {
        Some(numbers) => numbers.into_iter().map(Value::from).collect(),
        None => items.into_iter().map(Value::from).collect(),
    }
}
