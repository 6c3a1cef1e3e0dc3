use std::collections::HashMap;

use sqlx::{sqlite::SqliteExecutor, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::{group_by_parent, push_id_list};
use crate::database::models::views::{ThreadView, VoteCounts};
use crate::database::models::{CommentRecord, ForumThreadRecord, ThreadTagRecord, VoteType};

const THREAD_COLUMNS: &str = "t.id, t.title, t.content, t.author, t.upvotes, t.downvotes, \
                              t.municipality_id, t.created_at, t.updated_at";

/// Optional filters of `GET /api/forum/threads`
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
    pub municipality_id: Option<String>,
    pub tag: Option<String>,
}

impl ThreadFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut glue = " WHERE ";
        if let Some(id) = &self.municipality_id {
            qb.push(glue).push("t.municipality_id = ").push_bind(id.clone());
            glue = " AND ";
        }
        if let Some(tag) = &self.tag {
            qb.push(glue)
                .push("EXISTS (SELECT 1 FROM thread_tags g WHERE g.thread_id = t.id AND g.name = ")
                .push_bind(tag.clone())
                .push(")");
        }
    }
}

/// Database operations for forum threads
impl ForumThreadRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        debug!("Inserting thread '{}' by {}", self.title, self.author);

        sqlx::query(
            "INSERT INTO forum_threads
             (id, title, content, author, upvotes, downvotes, municipality_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.content)
        .bind(&self.author)
        .bind(self.upvotes)
        .bind(self.downvotes)
        .bind(&self.municipality_id)
        .bind(&self.created_at)
        .bind(&self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn get<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> sqlx::Result<Option<ForumThreadRecord>> {
        sqlx::query_as(&format!("SELECT {} FROM forum_threads t WHERE t.id = ?", THREAD_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Bump `updated_at`; returns false for an unknown thread
    pub async fn touch<'e>(executor: impl SqliteExecutor<'e>, id: &str, at: &str) -> sqlx::Result<bool> {
        let result = sqlx::query("UPDATE forum_threads SET updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of threads, newest first, plus the filtered total
    pub async fn list(
        pool: &SqlitePool,
        filter: &ThreadFilter,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<(Vec<ForumThreadRecord>, i64)> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM forum_threads t", THREAD_COLUMNS));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY t.created_at DESC, t.rowid DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let threads: Vec<ForumThreadRecord> = qb.build_query_as().fetch_all(pool).await?;

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM forum_threads t");
        filter.push_where(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        Ok((threads, total))
    }

    pub async fn list_for_municipality(
        pool: &SqlitePool,
        municipality_id: &str,
    ) -> sqlx::Result<Vec<ForumThreadRecord>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM forum_threads t WHERE t.municipality_id = ?
             ORDER BY t.created_at DESC, t.rowid DESC",
            THREAD_COLUMNS
        ))
        .bind(municipality_id)
        .fetch_all(pool)
        .await
    }

    /// Load tags (creation order) and comments (oldest first) for each thread
    pub async fn attach_children(
        pool: &SqlitePool,
        threads: Vec<ForumThreadRecord>,
    ) -> sqlx::Result<Vec<ThreadView>> {
        let ids: Vec<String> = threads.iter().map(|t| t.id.clone()).collect();
        let mut tags = ThreadTagRecord::list_for_threads(pool, &ids).await?;
        let mut comments = CommentRecord::list_for_threads(pool, &ids).await?;

        Ok(threads
            .into_iter()
            .map(|thread| ThreadView {
                tags: tags.remove(&thread.id).unwrap_or_default(),
                comments: comments.remove(&thread.id).unwrap_or_default(),
                thread,
            })
            .collect())
    }

    /// Add `delta` to one counter and return both counters, `None` for an unknown thread
    pub async fn apply_vote<'e>(
        executor: impl SqliteExecutor<'e>,
        id: &str,
        vote: VoteType,
        delta: i64,
        at: &str,
    ) -> sqlx::Result<Option<VoteCounts>> {
        let column = vote.column();
        sqlx::query_as(&format!(
            "UPDATE forum_threads SET {column} = {column} + ?, updated_at = ? WHERE id = ?
             RETURNING id, upvotes, downvotes"
        ))
        .bind(delta)
        .bind(at)
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}

/// Database operations for comments
impl CommentRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, content, author, upvotes, downvotes, thread_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.content)
        .bind(&self.author)
        .bind(self.upvotes)
        .bind(self.downvotes)
        .bind(&self.thread_id)
        .bind(&self.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_for_threads(
        pool: &SqlitePool,
        thread_ids: &[String],
    ) -> sqlx::Result<HashMap<String, Vec<CommentRecord>>> {
        if thread_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, content, author, upvotes, downvotes, thread_id, created_at
             FROM comments WHERE thread_id IN ",
        );
        push_id_list(&mut qb, thread_ids);
        qb.push(" ORDER BY created_at ASC, rowid ASC");

        let rows: Vec<CommentRecord> = qb.build_query_as().fetch_all(pool).await?;
        Ok(group_by_parent(rows, |c| c.thread_id.as_str()))
    }

    /// Same as [`ForumThreadRecord::apply_vote`] for a comment
    pub async fn apply_vote<'e>(
        executor: impl SqliteExecutor<'e>,
        id: &str,
        vote: VoteType,
        delta: i64,
    ) -> sqlx::Result<Option<VoteCounts>> {
        let column = vote.column();
        sqlx::query_as(&format!(
            "UPDATE comments SET {column} = {column} + ? WHERE id = ?
             RETURNING id, upvotes, downvotes"
        ))
        .bind(delta)
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}

impl ThreadTagRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO thread_tags (id, name, thread_id) VALUES (?, ?, ?)")
            .bind(&self.id)
            .bind(&self.name)
            .bind(&self.thread_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_for_threads(
        pool: &SqlitePool,
        thread_ids: &[String],
    ) -> sqlx::Result<HashMap<String, Vec<ThreadTagRecord>>> {
        if thread_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name, thread_id FROM thread_tags WHERE thread_id IN ");
        push_id_list(&mut qb, thread_ids);
        qb.push(" ORDER BY rowid ASC");

        let rows: Vec<ThreadTagRecord> = qb.build_query_as().fetch_all(pool).await?;
        Ok(group_by_parent(rows, |t| t.thread_id.as_str()))
    }
}
