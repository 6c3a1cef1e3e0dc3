//! Canned civic assistant
//!
//! No language model is called. The reply is picked by keywords found in the
//! last message and the token usage block is fixed.

use serde::Serialize;

use crate::error::ApiError;
use crate::types::ChatMessage;

const PROMPT_TOKENS: u32 = 100;
const COMPLETION_TOKENS: u32 = 50;

const FALLBACK_TOWN: &str = "your town";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Default for Usage {
    fn default() -> Self {
        Self {
            prompt_tokens: PROMPT_TOKENS,
            completion_tokens: COMPLETION_TOKENS,
            total_tokens: PROMPT_TOKENS + COMPLETION_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub content: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Budget,
    Meetings,
    Community,
    Population,
    PublicSafety,
    General,
}

impl Topic {
    /// First matching topic wins, in this order
    pub fn classify(message: &str) -> Topic {
        let message = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| message.contains(w));

        if has(&["budget", "spending"]) {
            Topic::Budget
        } else if has(&["meeting", "council"]) {
            Topic::Meetings
        } else if has(&["community", "discussion", "forum"]) {
            Topic::Community
        } else if has(&["population", "demographics"]) {
            Topic::Population
        } else if has(&["public safety", "police", "fire"]) {
            Topic::PublicSafety
        } else {
            Topic::General
        }
    }

    fn reply(self, town: &str) -> String {
        match self {
            Topic::Budget => format!(
                "Based on the budget information for {town}, I can see the current budget breakdown. \
                 The total budget is $15.2 million for the current fiscal year. The largest spending \
                 categories are Public Safety (32%), Education (28%), and Infrastructure (18%). This \
                 represents about $4,850 per resident. Would you like me to break down any specific \
                 category in more detail?"
            ),
            Topic::Meetings => format!(
                "I can help you find information about upcoming and past meetings in {town}. There \
                 are typically 2-3 council meetings per month, usually on the first and third Tuesday \
                 evenings. The next scheduled meeting is on March 19th at 7:00 PM, which will cover \
                 the quarterly budget review and infrastructure projects. Would you like me to provide \
                 more details about specific meetings or agenda items?"
            ),
            Topic::Community => format!(
                "The community forum in {town} is quite active! Recent discussions include concerns \
                 about road maintenance, proposals for a new community center, and updates on the \
                 local school district. The most popular thread has 45 upvotes and discusses traffic \
                 safety near the elementary school. Citizens are encouraged to participate in these \
                 discussions to help shape local policy decisions."
            ),
            Topic::Population => format!(
                "{town} has a population of approximately 12,450 residents. The community has been \
                 growing steadily over the past decade, with a mix of families, young professionals, \
                 and retirees. The median age is 38, and about 65% of residents own their homes. The \
                 town has a strong sense of community with active participation in local events and \
                 government."
            ),
            Topic::PublicSafety => format!(
                "Public safety is a top priority in {town}, with about 32% of the budget allocated to \
                 this area. This includes police services, fire protection, and emergency response. \
                 The town has its own police department with 18 officers and contracts with the county \
                 for fire services. Response times average 4-6 minutes for emergency calls. There's \
                 also an active neighborhood watch program that residents can join."
            ),
            Topic::General => format!(
                "I'm here to help you learn more about {town}! I can provide information about \
                 budgets, meetings, community discussions, and general town information. What specific \
                 aspect would you like to know more about? You can ask about spending priorities, \
                 upcoming events, or how to get involved in local government."
            ),
        }
    }
}

/// Answer the last message of the conversation
pub fn respond(messages: &[ChatMessage], municipality_name: Option<&str>) -> Result<ChatReply, ApiError> {
    let last = messages
        .last()
        .ok_or_else(|| ApiError::validation("messages must contain at least one message"))?;

    let town = municipality_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_TOWN);

    Ok(ChatReply {
        content: Topic::classify(&last.content).reply(town),
        usage: Usage::default(),
    })
}
