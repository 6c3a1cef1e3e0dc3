//! API response view models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{
    AgendaItemRecord, BudgetCategoryRecord, BudgetRecord, CommentRecord, ForumThreadRecord,
    MeetingRecord, MunicipalityRecord, ThreadTagRecord,
};

/// Owning town as embedded in child resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MunicipalityRef {
    pub name: String,
    pub slug: String,
}

/// Offset pagination block shared by every list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    #[serde(flatten)]
    pub budget: BudgetRecord,
    pub categories: Vec<BudgetCategoryRecord>,
    pub municipality: MunicipalityRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetList {
    pub budgets: Vec<BudgetView>,
    pub pagination: Pagination,
}

/// Parent budget as embedded in a category
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub id: String,
    pub year: i64,
    pub total_budget: f64,
    pub municipality: MunicipalityRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetCategoryView {
    #[serde(flatten)]
    pub category: BudgetCategoryRecord,
    pub budget: BudgetSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetCategoryList {
    pub categories: Vec<BudgetCategoryView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingView {
    #[serde(flatten)]
    pub meeting: MeetingRecord,
    pub agenda_items: Vec<AgendaItemRecord>,
    pub municipality: MunicipalityRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingList {
    pub meetings: Vec<MeetingView>,
    pub pagination: Pagination,
}

/// Parent meeting as embedded in an agenda item
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSummary {
    pub id: String,
    pub title: String,
    pub date: String,
    pub committee: String,
    pub municipality: MunicipalityRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaItemView {
    #[serde(flatten)]
    pub item: AgendaItemRecord,
    pub meeting: MeetingSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemList {
    pub agenda_items: Vec<AgendaItemView>,
    pub pagination: Pagination,
}

/// Thread with its tags and comments (comments oldest first)
#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub thread: ForumThreadRecord,
    pub tags: Vec<ThreadTagRecord>,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadList {
    pub threads: Vec<ThreadView>,
    pub pagination: Pagination,
}

/// Counter state returned after a vote
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct VoteCounts {
    pub id: String,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetWithCategories {
    #[serde(flatten)]
    pub budget: BudgetRecord,
    pub categories: Vec<BudgetCategoryRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingWithAgenda {
    #[serde(flatten)]
    pub meeting: MeetingRecord,
    pub agenda_items: Vec<AgendaItemRecord>,
}

/// Everything the town page renders in one payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownDetail {
    #[serde(flatten)]
    pub municipality: MunicipalityRecord,
    pub budgets: Vec<BudgetWithCategories>,
    pub meetings: Vec<MeetingWithAgenda>,
    pub forum_threads: Vec<ThreadView>,
}
