//! Database operations, one module per aggregate

pub mod budget;
pub mod forum;
pub mod meeting;
pub mod municipality;

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite};

/// Append `(?, ?, ...)` binding every id
pub(crate) fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}

/// Bucket child rows by parent id, keeping query order inside each bucket
pub(crate) fn group_by_parent<T>(rows: Vec<T>, parent: impl Fn(&T) -> &str) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(parent(&row).to_string()).or_default().push(row);
    }
    grouped
}
