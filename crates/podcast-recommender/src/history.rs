/// Persisted chat transcripts.
///
/// All conversations live in one JSON array under a single Redis key. Every write is a
/// read-modify-write of that array, serialized by an in-process mutex. When Redis is
/// missing or failing nothing is saved and callers are told so.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use mcp_common::error::CommonError;
use mcp_common::redis::RedisCache;

use crate::model::CatalogEntry;
use crate::reply::Reply;

pub const HISTORY_KEY: &str = "podpal_chat_history";

/// Opening assistant message of every saved conversation.
pub const WELCOME_MESSAGE: &str = "Hello! I'm PodPal, your AI Podcast Recommendation Assistant. \
     I can help you discover amazing podcasts based on your interests, suggest new episodes, \
     and find hidden gems in the podcast world. What kind of podcasts are you looking for today?";

const TITLE_MAX_CHARS: usize = 50;

/// Least recently updated conversations are dropped past this count.
pub const MAX_STORED_CONVERSATIONS: usize = 200;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub podcasts: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Time of the most recent turn.
    pub timestamp_ms: u64,
}

/// Result of recording one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTurn {
    pub conversation_id: String,
    pub saved: bool,
}

/// Key-value storage under the history array.
///
/// `read` must tell a missing key (`Ok(None)`) apart from a failed read.
pub trait HistoryBackend: Send + Sync {
    fn read(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, CommonError>> + Send;

    fn write(&self, key: &str, value: &str) -> impl Future<Output = bool> + Send;
}

impl HistoryBackend for RedisCache {
    async fn read(&self, key: &str) -> Result<Option<String>, CommonError> {
        self.try_get(key).await
    }

    async fn write(&self, key: &str, value: &str) -> bool {
        self.set(key, value).await
    }
}

pub struct ChatHistoryStore<B = RedisCache> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: HistoryBackend> ChatHistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Every stored conversation, oldest first. `None` when the store can't be read.
    pub async fn list(&self) -> Option<Vec<ChatHistory>> {
        self.load().await
    }

    pub async fn get(&self, conversation_id: &str) -> Option<ChatHistory> {
        self.list()
            .await?
            .into_iter()
            .find(|h| h.id == conversation_id)
    }

    /// Append one user message and its reply.
    ///
    /// Without `conversation_id` a new conversation is started with the welcome message,
    /// titled after `user_text`. An id that doesn't exist is not created; the turn is
    /// reported unsaved.
    pub async fn record_turn(
        &self,
        conversation_id: Option<&str>,
        user_text: &str,
        reply: &Reply,
    ) -> SavedTurn {
        let minted = conversation_id.is_none();
        let conversation_id = conversation_id
            .map(str::to_string)
            .unwrap_or_else(new_record_id);
        let unsaved = |conversation_id: String| SavedTurn {
            conversation_id,
            saved: false,
        };

        let _guard = self.write_lock.lock().await;

        let Some(mut histories) = self.load().await else {
            return unsaved(conversation_id);
        };

        let now = now_ms();
        let user = ChatMessage {
            id: new_record_id(),
            content: user_text.to_string(),
            is_user: true,
            timestamp_ms: now,
            podcasts: Vec::new(),
        };
        let assistant = ChatMessage {
            id: new_record_id(),
            content: reply.text.clone(),
            is_user: false,
            timestamp_ms: now,
            podcasts: reply.podcasts.clone(),
        };

        match histories.iter_mut().find(|h| h.id == conversation_id) {
            Some(history) => {
                history.messages.extend([user, assistant]);
                history.timestamp_ms = now;
            }
            None if minted => histories.push(new_history(&conversation_id, user, assistant, now)),
            None => {
                warn!(conversation_id = %conversation_id, "unknown conversation, turn not saved");
                return unsaved(conversation_id);
            }
        }
        evict_stale(&mut histories);

        let saved = match serde_json::to_string(&histories) {
            Ok(raw) => self.backend.write(HISTORY_KEY, &raw).await,
            Err(e) => {
                warn!(error = %e, "failed to serialize chat history");
                false
            }
        };
        debug!(conversation_id = %conversation_id, saved, "chat turn recorded");
        SavedTurn {
            conversation_id,
            saved,
        }
    }

    /// `None` when the read fails or the data doesn't parse. A missing key is an empty
    /// history.
    async fn load(&self) -> Option<Vec<ChatHistory>> {
        let raw = match self.backend.read(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(e) => {
                warn!(error = %e, "chat history unreadable");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(error = %e, "stored chat history is not valid JSON"))
            .ok()
    }
}

fn evict_stale(histories: &mut Vec<ChatHistory>) {
    while histories.len() > MAX_STORED_CONVERSATIONS {
        let Some(oldest) = histories
            .iter()
            .enumerate()
            .min_by_key(|(_, h)| h.timestamp_ms)
            .map(|(i, _)| i)
        else {
            break;
        };
        let dropped = histories.remove(oldest);
        debug!(conversation_id = %dropped.id, "evicted stale conversation");
    }
}

fn new_history(id: &str, user: ChatMessage, assistant: ChatMessage, now: u64) -> ChatHistory {
    let welcome = ChatMessage {
        id: new_record_id(),
        content: WELCOME_MESSAGE.to_string(),
        is_user: false,
        timestamp_ms: now,
        podcasts: Vec::new(),
    };
    ChatHistory {
        id: id.to_string(),
        title: conversation_title(&user.content),
        messages: vec![welcome, user, assistant],
        timestamp_ms: now,
    }
}

/// First 50 characters of the opening message, with "..." when it was longer.
pub fn conversation_title(first_message: &str) -> String {
    let mut chars = first_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

fn new_record_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut h = Sha256::new();
    h.update(now.as_nanos().to_le_bytes());
    h.update(std::process::id().to_le_bytes());
    h.update(counter.to_le_bytes());
    h.finalize()[..16]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
