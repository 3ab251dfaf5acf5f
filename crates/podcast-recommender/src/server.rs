/// MCP server for PodPal, the podcast recommendation assistant.
///
/// Exposes seven tools:
/// - `chat`: One conversational turn, with recommendations when asked for
/// - `search_podcasts`: Substring search or genre filter over the catalog
/// - `get_podcast`: One catalog entry by id
/// - `list_genres`: Every known genre and whether the catalog covers it
/// - `classify_message`: Intent and genres for a message, without replying
/// - `list_conversations`: Saved conversations
/// - `get_conversation`: One saved conversation in full
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::catalog::Catalog;
use crate::generator::OpenAiGenerator;
use crate::genre::{extract_genres, synonyms};
use crate::history::{ChatHistory, ChatHistoryStore, ChatMessage};
use crate::intent::classify;
use crate::model::{CatalogEntry, GenreKey};
use crate::reply::ReplyComposer;
use mcp_common::mcp_api::{
    ChatParams, ChatResponse, ClassifyMessageParams, ClassifyMessageResponse,
    ConversationDetailResponse, ConversationListResponse, ConversationMessage,
    ConversationSummary, GenreInfo, GenreListResponse, GetConversationParams, GetPodcastParams,
    PodcastInfo, SearchPodcastsParams, SearchPodcastsResponse,
};

#[derive(Clone)]
pub struct PodcastRecommenderServer {
    catalog: Arc<Catalog>,
    composer: Arc<ReplyComposer<OpenAiGenerator>>,
    history: Arc<ChatHistoryStore>,
    tool_router: ToolRouter<PodcastRecommenderServer>,
}

impl PodcastRecommenderServer {
    pub fn new(
        catalog: Arc<Catalog>,
        composer: Arc<ReplyComposer<OpenAiGenerator>>,
        history: Arc<ChatHistoryStore>,
    ) -> Self {
        Self {
            catalog,
            composer,
            history,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl PodcastRecommenderServer {
    #[tool(description = "Send one chat message to PodPal. Returns the reply text plus any recommended podcasts. Pass conversation_id from a previous reply to continue that conversation.")]
    async fn chat(
        &self,
        Parameters(params): Parameters<ChatParams>,
    ) -> Result<Json<ChatResponse>, String> {
        let message = params.message.trim().to_string();
        if message.is_empty() {
            return Err("message must not be empty".to_string());
        }
        let conversation_id = params
            .conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let reply = self.composer.respond(&message).await;
        let turn = self
            .history
            .record_turn(conversation_id, &message, &reply)
            .await;

        info!(
            intent = %reply.intent,
            genre = reply.genre.map(GenreKey::as_str),
            text_source = reply.text_source.as_str(),
            podcasts = reply.podcasts.len(),
            saved = turn.saved,
            "chat turn handled"
        );

        Ok(Json(ChatResponse {
            conversation_id: turn.conversation_id,
            intent: reply.intent.to_string(),
            genre: reply.genre.map(|g| g.to_string()),
            text: reply.text,
            text_source: reply.text_source.as_str().to_string(),
            podcasts: reply.podcasts.iter().map(to_podcast_info).collect(),
            saved: turn.saved,
        }))
    }

    #[tool(description = "Search the podcast catalog. With a genre (e.g. 'comedy', 'true crime') returns that genre's podcasts and ignores the query; 'all' or no genre searches titles, hosts and descriptions for the query. No query and no genre lists everything.")]
    async fn search_podcasts(
        &self,
        Parameters(params): Parameters<SearchPodcastsParams>,
    ) -> Result<Json<SearchPodcastsResponse>, String> {
        let query = params.query.unwrap_or_default();
        let podcasts: Vec<PodcastInfo> = self
            .catalog
            .search(&query, params.genre.as_deref())
            .into_iter()
            .map(to_podcast_info)
            .collect();

        Ok(Json(SearchPodcastsResponse {
            total: podcasts.len(),
            podcasts,
        }))
    }

    #[tool(description = "Get one podcast from the catalog by its id.")]
    async fn get_podcast(
        &self,
        Parameters(params): Parameters<GetPodcastParams>,
    ) -> Result<Json<PodcastInfo>, String> {
        let podcast_id = params.podcast_id.trim().to_string();
        if podcast_id.is_empty() {
            return Err("podcast_id must not be empty".to_string());
        }

        self.catalog
            .get(&podcast_id)
            .map(|entry| Json(to_podcast_info(entry)))
            .ok_or_else(|| format!("podcast not found: {podcast_id}"))
    }

    #[tool(description = "List every genre PodPal understands, how many catalog podcasts it has, and the words that trigger it.")]
    async fn list_genres(&self) -> Result<Json<GenreListResponse>, String> {
        let genres = GenreKey::ALL
            .into_iter()
            .map(|genre| GenreInfo {
                key: genre.to_string(),
                podcast_count: self.catalog.by_genre(genre).len(),
                recommendable: self.catalog.has_genre(genre),
                synonyms: synonyms(genre).iter().map(|s| s.to_string()).collect(),
            })
            .collect();

        Ok(Json(GenreListResponse { genres }))
    }

    #[tool(description = "Classify a message the way chat would (greeting, recommendation_request, general_question or other) and list the genres it mentions. Does not call the language model or save anything.")]
    async fn classify_message(
        &self,
        Parameters(params): Parameters<ClassifyMessageParams>,
    ) -> Result<Json<ClassifyMessageResponse>, String> {
        let message = params.message.trim();
        if message.is_empty() {
            return Err("message must not be empty".to_string());
        }

        Ok(Json(ClassifyMessageResponse {
            intent: classify(message).to_string(),
            genres: extract_genres(message)
                .into_iter()
                .map(|g| g.to_string())
                .collect(),
        }))
    }

    #[tool(description = "List saved conversations, oldest first. history_available is false when the history store is unreachable.")]
    async fn list_conversations(&self) -> Result<Json<ConversationListResponse>, String> {
        let response = match self.history.list().await {
            Some(histories) => ConversationListResponse {
                history_available: true,
                conversations: histories.iter().map(to_summary).collect(),
            },
            None => ConversationListResponse {
                history_available: false,
                conversations: Vec::new(),
            },
        };
        Ok(Json(response))
    }

    #[tool(description = "Get every message of a saved conversation by its id.")]
    async fn get_conversation(
        &self,
        Parameters(params): Parameters<GetConversationParams>,
    ) -> Result<Json<ConversationDetailResponse>, String> {
        let conversation_id = params.conversation_id.trim().to_string();
        if conversation_id.is_empty() {
            return Err("conversation_id must not be empty".to_string());
        }

        let history = self
            .history
            .get(&conversation_id)
            .await
            .ok_or_else(|| format!("conversation not found: {conversation_id}"))?;

        Ok(Json(to_detail(&history)))
    }
}

fn to_podcast_info(entry: &CatalogEntry) -> PodcastInfo {
    PodcastInfo {
        id: entry.id.clone(),
        title: entry.title.clone(),
        host: entry.host.clone(),
        genre: entry.genre.to_string(),
        description: entry.description.clone(),
        rating: entry.rating,
        image_url: entry.image_url.clone(),
        episode_count: entry.episode_count,
        average_duration_minutes: entry.average_duration_minutes,
        platform: entry.platform.clone(),
        url: entry.url.clone(),
    }
}

fn to_summary(history: &ChatHistory) -> ConversationSummary {
    ConversationSummary {
        id: history.id.clone(),
        title: history.title.clone(),
        message_count: history.messages.len(),
        timestamp_ms: history.timestamp_ms,
    }
}

fn to_message(message: &ChatMessage) -> ConversationMessage {
    ConversationMessage {
        id: message.id.clone(),
        content: message.content.clone(),
        is_user: message.is_user,
        timestamp_ms: message.timestamp_ms,
        podcasts: message.podcasts.iter().map(to_podcast_info).collect(),
    }
}

fn to_detail(history: &ChatHistory) -> ConversationDetailResponse {
    ConversationDetailResponse {
        id: history.id.clone(),
        title: history.title.clone(),
        timestamp_ms: history.timestamp_ms,
        messages: history.messages.iter().map(to_message).collect(),
    }
}

#[tool_handler]
impl ServerHandler for PodcastRecommenderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "podcast-recommender".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "PodPal podcast recommendation server. Use chat for conversational \
                 recommendations (pass conversation_id to continue a conversation), \
                 search_podcasts to query the curated catalog by keyword or genre, \
                 list_genres to see which genres have podcasts, and list_conversations / \
                 get_conversation to read saved chats."
                    .to_string(),
            ),
        }
    }
}
