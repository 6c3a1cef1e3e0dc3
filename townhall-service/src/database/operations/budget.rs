use sqlx::{sqlite::SqliteExecutor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::{group_by_parent, push_id_list};
use crate::database::models::views::{
    BudgetCategoryList, BudgetCategoryView, BudgetList, BudgetSummary, BudgetView,
    BudgetWithCategories, MunicipalityRef, Pagination,
};
use crate::database::models::{BudgetCategoryRecord, BudgetRecord};
use crate::types::PageRequest;
use crate::utils::now_timestamp;

const BUDGET_WITH_TOWN_SELECT: &str =
    "SELECT b.id, b.year, b.total_budget, b.municipality_id, b.created_at, b.updated_at, \
     m.name, m.slug \
     FROM budgets b JOIN municipalities m ON m.id = b.municipality_id";

const CATEGORY_WITH_BUDGET_SELECT: &str =
    "SELECT c.id, c.name, c.amount, c.color, c.budget_id, \
     b.year AS budget_year, b.total_budget AS budget_total, \
     m.name AS municipality_name, m.slug AS municipality_slug \
     FROM budget_categories c \
     JOIN budgets b ON b.id = c.budget_id \
     JOIN municipalities m ON m.id = b.municipality_id";

/// Optional filters of `GET /api/budgets`
#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub municipality_id: Option<String>,
    pub year: Option<i64>,
}

impl BudgetFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut glue = " WHERE ";
        if let Some(id) = &self.municipality_id {
            qb.push(glue).push("b.municipality_id = ").push_bind(id.clone());
            glue = " AND ";
        }
        if let Some(year) = self.year {
            qb.push(glue).push("b.year = ").push_bind(year);
        }
    }
}

#[derive(FromRow)]
struct BudgetRow {
    #[sqlx(flatten)]
    budget: BudgetRecord,
    #[sqlx(flatten)]
    municipality: MunicipalityRef,
}

#[derive(FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    amount: f64,
    color: String,
    budget_id: String,
    budget_year: i64,
    budget_total: f64,
    municipality_name: String,
    municipality_slug: String,
}

impl CategoryRow {
    fn into_view(self) -> BudgetCategoryView {
        BudgetCategoryView {
            budget: BudgetSummary {
                id: self.budget_id.clone(),
                year: self.budget_year,
                total_budget: self.budget_total,
                municipality: MunicipalityRef {
                    name: self.municipality_name,
                    slug: self.municipality_slug,
                },
            },
            category: BudgetCategoryRecord {
                id: self.id,
                name: self.name,
                amount: self.amount,
                color: self.color,
                budget_id: self.budget_id,
            },
        }
    }
}

/// Database operations for budgets
impl BudgetRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        debug!("Inserting budget {} for municipality {}", self.year, self.municipality_id);

        sqlx::query(
            "INSERT INTO budgets (id, year, total_budget, municipality_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(self.year)
        .bind(self.total_budget)
        .bind(&self.municipality_id)
        .bind(&self.created_at)
        .bind(&self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn exists<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> sqlx::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM budgets WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    /// Budget with its categories (largest first) and owning town
    pub async fn get_view(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<BudgetView>> {
        let row: Option<BudgetRow> =
            sqlx::query_as(&format!("{} WHERE b.id = ?", BUDGET_WITH_TOWN_SELECT))
                .bind(id)
                .fetch_optional(pool)
                .await?;

        match row {
            Some(row) => Ok(Self::attach_categories(pool, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Filtered page, newest year first
    pub async fn list(
        pool: &SqlitePool,
        filter: &BudgetFilter,
        page: PageRequest,
    ) -> sqlx::Result<BudgetList> {
        let mut qb = QueryBuilder::<Sqlite>::new(BUDGET_WITH_TOWN_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY b.year DESC, b.rowid ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows: Vec<BudgetRow> = qb.build_query_as().fetch_all(pool).await?;

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM budgets b");
        filter.push_where(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        Ok(BudgetList {
            budgets: Self::attach_categories(pool, rows).await?,
            pagination: Pagination::new(total, page.limit, page.offset),
        })
    }

    pub async fn list_for_municipality(
        pool: &SqlitePool,
        municipality_id: &str,
    ) -> sqlx::Result<Vec<BudgetWithCategories>> {
        let budgets: Vec<BudgetRecord> = sqlx::query_as(
            "SELECT id, year, total_budget, municipality_id, created_at, updated_at
             FROM budgets WHERE municipality_id = ? ORDER BY year DESC, rowid ASC",
        )
        .bind(municipality_id)
        .fetch_all(pool)
        .await?;

        let ids: Vec<String> = budgets.iter().map(|b| b.id.clone()).collect();
        let mut categories = BudgetCategoryRecord::list_for_budgets(pool, &ids).await?;

        Ok(budgets
            .into_iter()
            .map(|budget| BudgetWithCategories {
                categories: categories.remove(&budget.id).unwrap_or_default(),
                budget,
            })
            .collect())
    }

    /// Partial update; returns false when no budget has this id
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        year: Option<i64>,
        total_budget: Option<f64>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE budgets SET year = COALESCE(?, year), total_budget = COALESCE(?, total_budget),
             updated_at = ? WHERE id = ?",
        )
        .bind(year)
        .bind(total_budget)
        .bind(now_timestamp())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the budget and, by cascade, its categories
    pub async fn delete(pool: &SqlitePool, id: &str) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attach_categories(pool: &SqlitePool, rows: Vec<BudgetRow>) -> sqlx::Result<Vec<BudgetView>> {
        let ids: Vec<String> = rows.iter().map(|r| r.budget.id.clone()).collect();
        let mut categories = BudgetCategoryRecord::list_for_budgets(pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| BudgetView {
                categories: categories.remove(&row.budget.id).unwrap_or_default(),
                budget: row.budget,
                municipality: row.municipality,
            })
            .collect())
    }
}

/// Database operations for budget categories
impl BudgetCategoryRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        debug!("Inserting budget category {} for budget {}", self.name, self.budget_id);

        sqlx::query(
            "INSERT INTO budget_categories (id, name, amount, color, budget_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(self.amount)
        .bind(&self.color)
        .bind(&self.budget_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn get_view(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<BudgetCategoryView>> {
        let row: Option<CategoryRow> =
            sqlx::query_as(&format!("{} WHERE c.id = ?", CATEGORY_WITH_BUDGET_SELECT))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(CategoryRow::into_view))
    }

    /// Page of categories, largest amount first, optionally for one budget
    pub async fn list(
        pool: &SqlitePool,
        budget_id: Option<&str>,
        page: PageRequest,
    ) -> sqlx::Result<BudgetCategoryList> {
        let mut qb = QueryBuilder::<Sqlite>::new(CATEGORY_WITH_BUDGET_SELECT);
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM budget_categories c");
        if let Some(budget_id) = budget_id {
            qb.push(" WHERE c.budget_id = ").push_bind(budget_id.to_string());
            count_qb.push(" WHERE c.budget_id = ").push_bind(budget_id.to_string());
        }
        qb.push(" ORDER BY c.amount DESC, c.rowid ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows: Vec<CategoryRow> = qb.build_query_as().fetch_all(pool).await?;
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        Ok(BudgetCategoryList {
            categories: rows.into_iter().map(CategoryRow::into_view).collect(),
            pagination: Pagination::new(total, page.limit, page.offset),
        })
    }

    /// Categories of several budgets keyed by budget id, largest first
    pub async fn list_for_budgets(
        pool: &SqlitePool,
        budget_ids: &[String],
    ) -> sqlx::Result<std::collections::HashMap<String, Vec<BudgetCategoryRecord>>> {
        if budget_ids.is_empty() {
            return Ok(Default::default());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, amount, color, budget_id FROM budget_categories WHERE budget_id IN ",
        );
        push_id_list(&mut qb, budget_ids);
        qb.push(" ORDER BY amount DESC, rowid ASC");

        let rows: Vec<BudgetCategoryRecord> = qb.build_query_as().fetch_all(pool).await?;
        Ok(group_by_parent(rows, |c| c.budget_id.as_str()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::models::MunicipalityRecord;
    use crate::database::operations::municipality::tests::sample_town;
    use crate::database::Database;
    use crate::utils::new_id;

    pub(crate) fn sample_budget(municipality_id: &str, year: i64, total: f64) -> BudgetRecord {
        let now = now_timestamp();
        BudgetRecord {
            id: new_id(),
            year,
            total_budget: total,
            municipality_id: municipality_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn category(budget_id: &str, name: &str, amount: f64) -> BudgetCategoryRecord {
        BudgetCategoryRecord {
            id: new_id(),
            name: name.to_string(),
            amount,
            color: "#2C6E49".to_string(),
            budget_id: budget_id.to_string(),
        }
    }

    async fn seeded() -> (Database, MunicipalityRecord, BudgetRecord) {
        let db = Database::connect_in_memory().await.unwrap();
        let town = sample_town("Somerville", "somerville-nj");
        town.insert(db.pool()).await.unwrap();
        let budget = sample_budget(&town.id, 2024, 25_000_000.0);
        budget.insert(db.pool()).await.unwrap();
        (db, town, budget)
    }

    #[tokio::test]
    async fn view_orders_categories_by_amount() {
        let (db, _town, budget) = seeded().await;
        category(&budget.id, "Education", 7_200_000.0).insert(db.pool()).await.unwrap();
        category(&budget.id, "Public Safety", 8_500_000.0).insert(db.pool()).await.unwrap();
        category(&budget.id, "Other", 1_000_000.0).insert(db.pool()).await.unwrap();

        let view = BudgetRecord::get_view(db.pool(), &budget.id).await.unwrap().unwrap();
        let names: Vec<_> = view.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Public Safety", "Education", "Other"]);
        assert_eq!(view.municipality.slug, "somerville-nj");
    }

    #[tokio::test]
    async fn list_filters_by_year_and_paginates() {
        let (db, town, _budget) = seeded().await;
        sample_budget(&town.id, 2023, 24_000_000.0).insert(db.pool()).await.unwrap();
        sample_budget(&town.id, 2022, 23_000_000.0).insert(db.pool()).await.unwrap();

        let all = BudgetRecord::list(db.pool(), &BudgetFilter::default(), PageRequest { limit: 2, offset: 0 })
            .await
            .unwrap();
        let years: Vec<_> = all.budgets.iter().map(|b| b.budget.year).collect();
        assert_eq!(years, [2024, 2023]);
        assert_eq!(all.pagination, Pagination::new(3, 2, 0));
        assert!(all.pagination.has_more);

        let filter = BudgetFilter {
            municipality_id: Some(town.id.clone()),
            year: Some(2022),
        };
        let only = BudgetRecord::list(db.pool(), &filter, PageRequest::default()).await.unwrap();
        assert_eq!(only.pagination.total, 1);
        assert_eq!(only.budgets[0].budget.year, 2022);
    }

    #[tokio::test]
    async fn update_and_cascade_delete() {
        let (db, _town, budget) = seeded().await;
        let cat = category(&budget.id, "Parks & Recreation", 2_100_000.0);
        cat.insert(db.pool()).await.unwrap();

        assert!(BudgetRecord::update(db.pool(), &budget.id, None, Some(26_000_000.0)).await.unwrap());
        let view = BudgetRecord::get_view(db.pool(), &budget.id).await.unwrap().unwrap();
        assert_eq!(view.budget.year, 2024);
        assert_eq!(view.budget.total_budget, 26_000_000.0);
        assert!(!BudgetRecord::update(db.pool(), "missing", Some(1999), None).await.unwrap());

        assert!(BudgetRecord::delete(db.pool(), &budget.id).await.unwrap());
        assert!(BudgetCategoryRecord::get_view(db.pool(), &cat.id).await.unwrap().is_none());
        assert!(!BudgetRecord::delete(db.pool(), &budget.id).await.unwrap());
    }

    #[tokio::test]
    async fn category_view_embeds_budget_and_town() {
        let (db, _town, budget) = seeded().await;
        let cat = category(&budget.id, "Infrastructure", 4_800_000.0);
        cat.insert(db.pool()).await.unwrap();

        let list = BudgetCategoryRecord::list(db.pool(), Some(&budget.id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(list.pagination.total, 1);
        let view = &list.categories[0];
        assert_eq!(view.category.name, "Infrastructure");
        assert_eq!(view.budget.year, 2024);
        assert_eq!(view.budget.municipality.name, "Somerville");
    }
}
