//! INSERT / UPDATE / DELETE statements, returned as raw-override queries so
//! they still pick up role and user scoping. Each returns the affected row
//! as JSON via `RETURNING row_to_json(<table>)`.

use serde_json::{Map, Value};

use super::error::CompileError;
use super::literal;
use super::types::{Cardinality, Query, Relation};

pub fn insert(relation: &Relation, values: &Map<String, Value>) -> Result<Query, CompileError> {
    let target = literal::relation(relation)?;
    let table = &relation.table;

    let sql = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING row_to_json({})", target, table)
    } else {
        let (columns, rendered) = columns_and_values(values)?;
        format!(
            "INSERT INTO {}({}) VALUES ({}) RETURNING row_to_json({})",
            target,
            columns.join(", "),
            rendered.join(", "),
            table
        )
    };
    Ok(Query::raw(sql, Cardinality::Single))
}

pub fn update(relation: &Relation, record: &str, values: &Map<String, Value>) -> Result<Query, CompileError> {
    if values.is_empty() {
        return Err(CompileError::EmptyUpdate(record.to_string()));
    }
    let target = literal::relation(relation)?;
    let (columns, rendered) = columns_and_values(values)?;
    let assignments = columns
        .iter()
        .zip(rendered.iter())
        .map(|(c, v)| format!("{} = {}", c, v))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE id = {} RETURNING row_to_json({})",
        target,
        assignments,
        literal::quote(record),
        relation.table
    );
    Ok(Query::raw(sql, Cardinality::Single))
}

pub fn delete(relation: &Relation, record: &str) -> Result<Query, CompileError> {
    let target = literal::relation(relation)?;
    let sql = format!(
        "DELETE FROM {} WHERE id = {} RETURNING row_to_json({})",
        target,
        literal::quote(record),
        relation.table
    );
    Ok(Query::raw(sql, Cardinality::Single))
}

fn columns_and_values(values: &Map<String, Value>) -> Result<(Vec<&str>, Vec<String>), CompileError> {
    let mut columns = Vec::with_capacity(values.len());
    let mut rendered = Vec::with_capacity(values.len());
    for (column, value) in values {
        columns.push(literal::identifier(column)?);
        rendered.push(literal::column_value(value));
    }
    Ok((columns, rendered))
}
