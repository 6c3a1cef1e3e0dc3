pub mod views;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Municipality record in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityRecord {
    pub id: String,
    pub name: String,
    pub state: String,
    pub zip_code: String,
    pub population: i64,
    pub is_serviced: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Budget record in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    pub id: String,
    pub year: i64,
    pub total_budget: f64,
    pub municipality_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Budget line item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategoryRecord {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub color: String,
    pub budget_id: String,
}

/// Meeting record in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub committee: String,
    pub status: String,
    pub municipality_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemRecord {
    pub id: String,
    pub content: String,
    #[sqlx(rename = "item_order")]
    pub order: i64,
    pub meeting_id: String,
}

/// Forum thread record; vote counters are plain tallies
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumThreadRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub municipality_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub content: String,
    pub author: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub thread_id: String,
    pub created_at: String,
}

/// Tag row owned by a single thread
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ThreadTagRecord {
    pub id: String,
    pub name: String,
    pub thread_id: String,
}

/// Lifecycle of a meeting as shown on the town page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Upcoming,
    Past,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Upcoming => "upcoming",
            MeetingStatus::Past => "past",
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upcoming" => Ok(MeetingStatus::Upcoming),
            "past" => Ok(MeetingStatus::Past),
            other => Err(format!(
                "Invalid status '{}'. Must be \"upcoming\" or \"past\"",
                other
            )),
        }
    }
}

/// Which counter a vote touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }

    /// Column holding this counter on `forum_threads` and `comments`
    pub fn column(&self) -> &'static str {
        match self {
            VoteType::Up => "upvotes",
            VoteType::Down => "downvotes",
        }
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            _ => Err("Invalid vote type. Must be \"up\" or \"down\"".to_string()),
        }
    }
}
