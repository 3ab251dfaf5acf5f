use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChatParams {
    /// What the listener typed, e.g. "any good true crime podcasts?".
    pub message: String,
    /// Conversation to append this turn to. Omit to start a new conversation.
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchPodcastsParams {
    /// Case-insensitive substring matched against title, host and description.
    pub query: Option<String>,
    /// Genre filter such as "comedy" or "true crime". "all" or empty means no filter.
    /// When a genre is given the query is ignored.
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyMessageParams {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetPodcastParams {
    /// Catalog id as returned in `PodcastInfo.id`.
    pub podcast_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetConversationParams {
    pub conversation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PodcastInfo {
    pub id: String,
    pub title: String,
    pub host: String,
    pub genre: String,
    pub description: String,
    pub rating: f32,
    pub image_url: String,
    pub episode_count: Option<u32>,
    pub average_duration_minutes: Option<u32>,
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub intent: String,
    pub genre: Option<String>,
    pub text: String,
    /// "generated", "fallback" or "static".
    pub text_source: String,
    pub podcasts: Vec<PodcastInfo>,
    /// False when the turn could not be written to the history store.
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchPodcastsResponse {
    pub total: usize,
    pub podcasts: Vec<PodcastInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenreInfo {
    pub key: String,
    pub podcast_count: usize,
    /// False for genres the extractor recognises but the catalog has no shows for.
    pub recommendable: bool,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenreListResponse {
    pub genres: Vec<GenreInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyMessageResponse {
    pub intent: String,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationListResponse {
    pub history_available: bool,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp_ms: u64,
    pub podcasts: Vec<PodcastInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConversationDetailResponse {
    pub id: String,
    pub title: String,
    pub timestamp_ms: u64,
    pub messages: Vec<ConversationMessage>,
}
