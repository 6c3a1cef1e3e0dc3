use sqlx::{sqlite::SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::database::models::views::{MunicipalityRef, TownDetail};
use crate::database::models::{BudgetRecord, ForumThreadRecord, MeetingRecord, MunicipalityRecord};

const MUNICIPALITY_COLUMNS: &str = "id, name, state, zip_code, population, is_serviced, \
                                    latitude, longitude, slug, created_at, updated_at";

/// Database operations for municipalities
impl MunicipalityRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        debug!("Inserting municipality {} ({})", self.name, self.slug);

        sqlx::query(
            "INSERT INTO municipalities
             (id, name, state, zip_code, population, is_serviced, latitude, longitude, slug, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.state)
        .bind(&self.zip_code)
        .bind(self.population)
        .bind(self.is_serviced)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(&self.slug)
        .bind(&self.created_at)
        .bind(&self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// All towns ordered by name
    pub async fn list_all(pool: &SqlitePool) -> sqlx::Result<Vec<MunicipalityRecord>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM municipalities ORDER BY name ASC",
            MUNICIPALITY_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> sqlx::Result<Option<MunicipalityRecord>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM municipalities WHERE slug = ?",
            MUNICIPALITY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<MunicipalityRecord>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM municipalities WHERE id = ?",
            MUNICIPALITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> sqlx::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM municipalities WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn slug_taken(pool: &SqlitePool, slug: &str) -> sqlx::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM municipalities WHERE slug = ?")
            .bind(slug)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    /// `{slug, name}` of every town, used to hint at valid slugs on a miss
    pub async fn list_refs(pool: &SqlitePool) -> sqlx::Result<Vec<MunicipalityRef>> {
        sqlx::query_as("SELECT name, slug FROM municipalities ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM municipalities")
            .fetch_one(pool)
            .await
    }

    /// Town page payload: budgets, meetings and threads with their children
    pub async fn load_detail(self, pool: &SqlitePool) -> sqlx::Result<TownDetail> {
        let budgets = BudgetRecord::list_for_municipality(pool, &self.id).await?;
        let meetings = MeetingRecord::list_for_municipality(pool, &self.id).await?;
        let threads = ForumThreadRecord::list_for_municipality(pool, &self.id).await?;
        let forum_threads = ForumThreadRecord::attach_children(pool, threads).await?;

        debug!(
            "Loaded town {}: {} budgets, {} meetings, {} threads",
            self.slug,
            budgets.len(),
            meetings.len(),
            forum_threads.len()
        );

        Ok(TownDetail {
            municipality: self,
            budgets,
            meetings,
            forum_threads,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::Database;
    use crate::utils::{new_id, now_timestamp};

    pub(crate) fn sample_town(name: &str, slug: &str) -> MunicipalityRecord {
        let now = now_timestamp();
        MunicipalityRecord {
            id: new_id(),
            name: name.to_string(),
            state: "NJ".to_string(),
            zip_code: "08876".to_string(),
            population: 12423,
            is_serviced: true,
            latitude: 40.5751,
            longitude: -74.6097,
            slug: slug.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn lists_towns_by_name() {
        let db = Database::connect_in_memory().await.unwrap();
        sample_town("Somerville", "somerville-nj").insert(db.pool()).await.unwrap();
        sample_town("Princeton", "princeton-nj").insert(db.pool()).await.unwrap();

        let towns = MunicipalityRecord::list_all(db.pool()).await.unwrap();
        let names: Vec<_> = towns.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Princeton", "Somerville"]);
        assert!(towns[0].is_serviced);
        assert_eq!(MunicipalityRecord::count(db.pool()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn slug_is_unique() {
        let db = Database::connect_in_memory().await.unwrap();
        sample_town("Princeton", "princeton-nj").insert(db.pool()).await.unwrap();
        assert!(MunicipalityRecord::slug_taken(db.pool(), "princeton-nj").await.unwrap());

        let err = sample_town("Princeton Again", "princeton-nj")
            .insert(db.pool())
            .await
            .unwrap_err();
        assert!(crate::error::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn detail_of_empty_town() {
        let db = Database::connect_in_memory().await.unwrap();
        let town = sample_town("Madison", "madison-wi");
        town.insert(db.pool()).await.unwrap();

        let found = MunicipalityRecord::get_by_slug(db.pool(), "madison-wi")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, town.id);

        let detail = found.load_detail(db.pool()).await.unwrap();
        assert!(detail.budgets.is_empty());
        assert!(detail.meetings.is_empty());
        assert!(detail.forum_threads.is_empty());
        assert!(MunicipalityRecord::get_by_slug(db.pool(), "nowhere").await.unwrap().is_none());
    }
}
