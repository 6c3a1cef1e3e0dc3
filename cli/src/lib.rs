pub mod cli_types;
pub mod seed;

use anyhow::Result;
use townhall_service::database::{migrator::get_current_version, Database};

use cli_types::TableCounts;

/// Row counts of every civic table
pub async fn table_counts(db: &Database) -> Result<TableCounts> {
    let pool = db.pool();
    let mut counts = TableCounts {
        schema_version: get_current_version(pool).await?,
        ..Default::default()
    };

    for (table, slot) in [
        ("municipalities", &mut counts.municipalities),
        ("budgets", &mut counts.budgets),
        ("budget_categories", &mut counts.budget_categories),
        ("meetings", &mut counts.meetings),
        ("agenda_items", &mut counts.agenda_items),
        ("forum_threads", &mut counts.forum_threads),
        ("comments", &mut counts.comments),
        ("thread_tags", &mut counts.thread_tags),
    ] {
        *slot = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await?;
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_empty_database() {
        let db = Database::connect_in_memory().await.unwrap();
        let counts = table_counts(&db).await.unwrap();
        assert_eq!(counts.schema_version, 1);
        assert_eq!(counts.municipalities, 0);
        assert!(counts.is_empty());
    }
}
