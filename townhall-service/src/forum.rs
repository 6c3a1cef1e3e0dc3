//! Forum threads, comments and vote tallies
//!
//! Counters are adjusted with a single `UPDATE ... SET n = n + ?` per vote, so
//! concurrent votes never lose increments. Votes are not deduplicated and
//! removing a vote may drive a counter below zero.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::database::models::views::{Pagination, ThreadList, ThreadView, VoteCounts};
use crate::database::models::{CommentRecord, ForumThreadRecord, MunicipalityRecord, ThreadTagRecord, VoteType};
use crate::database::operations::forum::ThreadFilter;
use crate::error::ApiError;
use crate::metrics::{self, VoteAction};
use crate::types::PageRequest;
use crate::utils::{new_id, now_timestamp};

/// Validated input for a new thread
#[derive(Debug, Clone)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub author: String,
    pub municipality_id: String,
    pub tags: Vec<String>,
}

/// What a vote is cast on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTarget {
    Thread(String),
    Comment(String),
}

impl VoteTarget {
    /// Exactly one of the two ids must be present; blank ids count as absent
    pub fn from_ids(thread_id: Option<String>, comment_id: Option<String>) -> Result<Self, ApiError> {
        let thread_id = thread_id.filter(|s| !s.trim().is_empty());
        let comment_id = comment_id.filter(|s| !s.trim().is_empty());

        match (thread_id, comment_id) {
            (Some(id), None) => Ok(VoteTarget::Thread(id)),
            (None, Some(id)) => Ok(VoteTarget::Comment(id)),
            (Some(_), Some(_)) => Err(ApiError::validation(
                "Cannot vote on both thread and comment at the same time",
            )),
            (None, None) => Err(ApiError::validation(
                "Either threadId or commentId must be provided",
            )),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            VoteTarget::Thread(_) => "thread",
            VoteTarget::Comment(_) => "comment",
        }
    }
}

/// Response body of the vote endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteOutcome {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub upvotes: i64,
    pub downvotes: i64,
}

/// Trim tag names, drop blanks and keep the first of each duplicate
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let name = tag.trim();
        if !name.is_empty() && !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Create a thread and its tags atomically; an unknown town creates nothing
pub async fn create_thread(pool: &SqlitePool, new: NewThread) -> Result<ThreadView, ApiError> {
    let mut tx = pool.begin().await?;

    if !MunicipalityRecord::exists(&mut *tx, &new.municipality_id).await? {
        return Err(ApiError::not_found("Municipality not found"));
    }

    let now = now_timestamp();
    let thread = ForumThreadRecord {
        id: new_id(),
        title: new.title,
        content: new.content,
        author: new.author,
        upvotes: 0,
        downvotes: 0,
        municipality_id: new.municipality_id,
        created_at: now.clone(),
        updated_at: now,
    };
    thread.insert(&mut *tx).await?;

    let mut tags = Vec::new();
    for name in normalize_tags(new.tags) {
        let tag = ThreadTagRecord {
            id: new_id(),
            name,
            thread_id: thread.id.clone(),
        };
        tag.insert(&mut *tx).await?;
        tags.push(tag);
    }

    tx.commit().await?;

    info!(
        "Created thread {} in municipality {} with {} tags",
        thread.id,
        thread.municipality_id,
        tags.len()
    );

    Ok(ThreadView {
        thread,
        tags,
        comments: Vec::new(),
    })
}

/// Append a comment and bump the thread's `updatedAt`
pub async fn add_comment(
    pool: &SqlitePool,
    content: String,
    author: String,
    thread_id: String,
) -> Result<CommentRecord, ApiError> {
    let mut tx = pool.begin().await?;

    let now = now_timestamp();
    if !ForumThreadRecord::touch(&mut *tx, &thread_id, &now).await? {
        return Err(ApiError::not_found("Thread not found"));
    }

    let comment = CommentRecord {
        id: new_id(),
        content,
        author,
        upvotes: 0,
        downvotes: 0,
        thread_id,
        created_at: now,
    };
    comment.insert(&mut *tx).await?;
    tx.commit().await?;

    debug!("Added comment {} to thread {}", comment.id, comment.thread_id);
    Ok(comment)
}

/// Add one vote to the target's counter
pub async fn vote(pool: &SqlitePool, target: VoteTarget, vote_type: VoteType) -> Result<VoteOutcome, ApiError> {
    let outcome = apply(pool, target, vote_type, 1).await?;
    metrics::record_vote(VoteAction::Cast, vote_type);
    Ok(outcome)
}

/// Take one vote back; counters are not clamped at zero
pub async fn remove_vote(pool: &SqlitePool, target: VoteTarget, vote_type: VoteType) -> Result<VoteOutcome, ApiError> {
    let outcome = apply(pool, target, vote_type, -1).await?;
    metrics::record_vote(VoteAction::Removed, vote_type);
    Ok(outcome)
}

async fn apply(pool: &SqlitePool, target: VoteTarget, vote_type: VoteType, delta: i64) -> Result<VoteOutcome, ApiError> {
    let kind = target.kind();
    let counts: Option<VoteCounts> = match &target {
        VoteTarget::Thread(id) => {
            ForumThreadRecord::apply_vote(pool, id, vote_type, delta, &now_timestamp()).await?
        }
        VoteTarget::Comment(id) => CommentRecord::apply_vote(pool, id, vote_type, delta).await?,
    };

    let counts = counts.ok_or_else(|| match target {
        VoteTarget::Thread(_) => ApiError::not_found("Thread not found"),
        VoteTarget::Comment(_) => ApiError::not_found("Comment not found"),
    })?;

    debug!(
        "{} {} {} by {}: up={} down={}",
        kind, counts.id, vote_type.as_str(), delta, counts.upvotes, counts.downvotes
    );

    Ok(VoteOutcome {
        kind,
        id: counts.id,
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
    })
}

/// Filtered page of threads, newest first, each with tags and comments
pub async fn list_threads(pool: &SqlitePool, filter: &ThreadFilter, page: PageRequest) -> Result<ThreadList, ApiError> {
    let (threads, total) = ForumThreadRecord::list(pool, filter, page.limit, page.offset).await?;
    let threads = ForumThreadRecord::attach_children(pool, threads).await?;

    Ok(ThreadList {
        threads,
        pagination: Pagination::new(total, page.limit, page.offset),
    })
}

/// Every thread of one town, unpaginated; an unknown town simply has none
pub async fn threads_for_municipality(pool: &SqlitePool, municipality_id: &str) -> Result<Vec<ThreadView>, ApiError> {
    let threads = ForumThreadRecord::list_for_municipality(pool, municipality_id).await?;
    Ok(ForumThreadRecord::attach_children(pool, threads).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::operations::municipality::tests::sample_town;
    use crate::database::Database;

    async fn town_db() -> (Database, String) {
        let db = Database::connect_in_memory().await.unwrap();
        let town = sample_town("Somerville", "somerville-nj");
        town.insert(db.pool()).await.unwrap();
        (db, town.id)
    }

    fn new_thread(municipality_id: &str, title: &str, tags: &[&str]) -> NewThread {
        NewThread {
            title: title.to_string(),
            content: "What does everyone think?".to_string(),
            author: "Jane Resident".to_string(),
            municipality_id: municipality_id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    async fn thread_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM forum_threads")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![" Budget ".to_string(), "".to_string(), "Budget".to_string(), "Parks".to_string()];
        assert_eq!(normalize_tags(tags), ["Budget", "Parks"]);
    }

    #[test]
    fn vote_target_requires_exactly_one_id() {
        assert_eq!(
            VoteTarget::from_ids(Some("t1".into()), None).unwrap(),
            VoteTarget::Thread("t1".into())
        );
        assert_eq!(
            VoteTarget::from_ids(None, Some("c1".into())).unwrap(),
            VoteTarget::Comment("c1".into())
        );
        assert!(VoteTarget::from_ids(Some("t1".into()), Some("c1".into())).is_err());
        assert!(VoteTarget::from_ids(None, None).is_err());
        assert!(VoteTarget::from_ids(Some("".into()), None).is_err());
    }

    #[tokio::test]
    async fn unknown_municipality_creates_nothing() {
        let (db, _) = town_db().await;
        let err = create_thread(db.pool(), new_thread("no-such-town", "Hello", &["Budget"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(thread_count(&db).await, 0);

        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM thread_tags")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tags, 0);
    }

    #[tokio::test]
    async fn upvote_touches_only_upvotes() {
        let (db, town) = town_db().await;
        let view = create_thread(db.pool(), new_thread(&town, "Road repairs", &[])).await.unwrap();
        assert_eq!((view.thread.upvotes, view.thread.downvotes), (0, 0));

        let outcome = vote(db.pool(), VoteTarget::Thread(view.thread.id.clone()), VoteType::Up)
            .await
            .unwrap();
        assert_eq!(outcome.kind, "thread");
        assert_eq!((outcome.upvotes, outcome.downvotes), (1, 0));

        let outcome = vote(db.pool(), VoteTarget::Thread(view.thread.id.clone()), VoteType::Up)
            .await
            .unwrap();
        assert_eq!((outcome.upvotes, outcome.downvotes), (2, 0));
    }

    #[tokio::test]
    async fn removing_votes_is_unclamped() {
        let (db, town) = town_db().await;
        let view = create_thread(db.pool(), new_thread(&town, "Library hours", &[])).await.unwrap();
        let comment = add_comment(db.pool(), "Open Sundays!".into(), "Sam".into(), view.thread.id.clone())
            .await
            .unwrap();

        let outcome = remove_vote(db.pool(), VoteTarget::Comment(comment.id.clone()), VoteType::Down)
            .await
            .unwrap();
        assert_eq!(outcome.kind, "comment");
        assert_eq!((outcome.upvotes, outcome.downvotes), (0, -1));
    }

    #[tokio::test]
    async fn voting_on_missing_target_is_not_found() {
        let (db, _) = town_db().await;
        let err = vote(db.pool(), VoteTarget::Thread("missing".into()), VoteType::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = remove_vote(db.pool(), VoteTarget::Comment("missing".into()), VoteType::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn tag_filter_matches_any_attached_tag() {
        let (db, town) = town_db().await;
        create_thread(db.pool(), new_thread(&town, "Budget hearing", &["Budget", "Meetings"]))
            .await
            .unwrap();
        create_thread(db.pool(), new_thread(&town, "Dog park", &["Parks"]))
            .await
            .unwrap();
        create_thread(db.pool(), new_thread(&town, "School funding", &["Education", "Budget"]))
            .await
            .unwrap();

        let filter = ThreadFilter {
            municipality_id: None,
            tag: Some("Budget".to_string()),
        };
        let list = list_threads(db.pool(), &filter, PageRequest::default()).await.unwrap();
        assert_eq!(list.pagination.total, 2);
        assert!(list
            .threads
            .iter()
            .all(|t| t.tags.iter().any(|tag| tag.name == "Budget")));
        assert_eq!(list.threads[0].thread.title, "School funding");
    }

    #[tokio::test]
    async fn last_page_has_no_more() {
        let (db, town) = town_db().await;
        for i in 0..12 {
            create_thread(db.pool(), new_thread(&town, &format!("Thread {}", i), &[]))
                .await
                .unwrap();
        }

        let filter = ThreadFilter {
            municipality_id: Some(town.clone()),
            tag: None,
        };
        let page = PageRequest { limit: 5, offset: 10 };
        let list = list_threads(db.pool(), &filter, page).await.unwrap();
        assert_eq!(list.threads.len(), 2);
        assert_eq!(list.pagination, Pagination::new(12, 5, 10));
        assert!(!list.pagination.has_more);
        // Oldest two, newest first
        assert_eq!(list.threads[0].thread.title, "Thread 1");
        assert_eq!(list.threads[1].thread.title, "Thread 0");
    }

    #[tokio::test]
    async fn huge_offset_returns_empty_page() {
        let (db, town) = town_db().await;
        create_thread(db.pool(), new_thread(&town, "Library hours", &[])).await.unwrap();

        let page = PageRequest::resolve(Some(50), Some(i64::MAX)).unwrap();
        let list = list_threads(db.pool(), &ThreadFilter::default(), page).await.unwrap();
        assert!(list.threads.is_empty());
        assert_eq!(list.pagination.total, 1);
        assert!(!list.pagination.has_more);
    }

    #[tokio::test]
    async fn comment_bumps_thread_and_requires_thread() {
        let (db, town) = town_db().await;
        let view = create_thread(db.pool(), new_thread(&town, "Snow plowing", &[])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        add_comment(db.pool(), "First!".into(), "Alex".into(), view.thread.id.clone())
            .await
            .unwrap();
        let thread = ForumThreadRecord::get(db.pool(), &view.thread.id).await.unwrap().unwrap();
        assert!(thread.updated_at > view.thread.updated_at);

        let err = add_comment(db.pool(), "Hello".into(), "Alex".into(), "missing".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let threads = threads_for_municipality(db.pool(), &town).await.unwrap();
        assert_eq!(threads[0].comments.len(), 1);
        assert!(threads_for_municipality(db.pool(), "nowhere").await.unwrap().is_empty());
    }
}
