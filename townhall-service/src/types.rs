//! Types for HTTP requests and query strings
//!
//! Required fields are modelled as `Option` so that a missing field becomes a
//! 400 with a readable message instead of an extractor rejection. Numeric
//! fields accept numbers or numeric strings, as the web client sends both.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Resolved `limit`/`offset` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn resolve(limit: Option<i64>, offset: Option<i64>) -> Result<Self, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);
        if limit < 0 || offset < 0 {
            return Err(ApiError::validation(
                "limit and offset must be non-negative integers",
            ));
        }
        Ok(Self {
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetQuery {
    pub municipality_id: Option<String>,
    pub year: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    pub budget_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingQuery {
    pub municipality_id: Option<String>,
    pub committee: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemQuery {
    pub meeting_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadQuery {
    pub municipality_id: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTownRequest {
    pub name: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub population: Option<Value>,
    /// `[latitude, longitude]`
    pub coordinates: Option<Vec<Value>>,
    pub slug: Option<String>,
    pub is_serviced: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    pub year: Option<Value>,
    pub total_budget: Option<Value>,
    pub municipality_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetRequest {
    pub year: Option<Value>,
    pub total_budget: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub amount: Option<Value>,
    pub color: Option<String>,
    pub budget_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub committee: Option<String>,
    pub status: Option<String>,
    pub municipality_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeetingRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub committee: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgendaItemRequest {
    pub content: Option<String>,
    pub order: Option<Value>,
    pub meeting_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub municipality_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub author: Option<String>,
    pub thread_id: Option<String>,
}

/// Body of `POST /api/forum/vote` and `DELETE /api/forum/vote`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub thread_id: Option<String>,
    pub comment_id: Option<String>,
    pub vote_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Accepted for client compatibility; replies are canned
    #[allow(dead_code)]
    pub system_prompt: Option<String>,
    pub municipality_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_cap() {
        assert_eq!(PageRequest::resolve(None, None).unwrap(), PageRequest::default());
        assert_eq!(
            PageRequest::resolve(Some(10_000), Some(3)).unwrap(),
            PageRequest { limit: MAX_PAGE_LIMIT, offset: 3 }
        );
        assert!(PageRequest::resolve(Some(-1), None).is_err());
        assert!(PageRequest::resolve(None, Some(-5)).is_err());
    }

    #[test]
    fn vote_request_reads_camel_case() {
        let req: VoteRequest =
            serde_json::from_str(r#"{"threadId":"t1","voteType":"up"}"#).unwrap();
        assert_eq!(req.thread_id.as_deref(), Some("t1"));
        assert_eq!(req.comment_id, None);
        assert_eq!(req.vote_type.as_deref(), Some("up"));
    }

    #[test]
    fn thread_tags_default_to_empty() {
        let req: CreateThreadRequest =
            serde_json::from_str(r#"{"title":"t","content":"c","author":"a","municipalityId":"m"}"#)
                .unwrap();
        assert!(req.tags.is_empty());
    }
}
