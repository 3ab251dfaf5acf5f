/// Intent classification for a single chat message.
///
/// Rules are checked in a fixed order and the first match wins: greeting, then
/// recommendation request, then general question, then other.
use std::sync::LazyLock;

use regex::Regex;

use crate::genre::extract_genres;
use crate::model::IntentCategory;

/// Greetings longer than this are treated as ordinary sentences.
const GREETING_MAX_CHARS: usize = 20;

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:hi|hello|hey|greetings|howdy|what's up|sup|yo)\b").expect("valid regex")
});

const RECOMMENDATION_PHRASES: &[&str] = &[
    "recommend",
    "suggestion",
    "suggest",
    "what podcast",
    "good podcast",
    "great podcast",
    "best podcast",
    "podcast to listen",
    "podcast recommendation",
    "show me",
    "find me",
    "i want",
    "i need",
    "looking for",
];

const PROGRAM_WORDS: &[&str] = &["podcast", "show", "episode"];

const QUESTION_TOKENS: &[&str] = &[
    "what", "how", "why", "who", "where", "when", "can you", "could you",
];

pub fn classify(text: &str) -> IntentCategory {
    let normalized = text.trim().to_lowercase();

    if is_greeting(&normalized) {
        return IntentCategory::Greeting;
    }
    if is_recommendation_request(&normalized) {
        return IntentCategory::RecommendationRequest;
    }
    if QUESTION_TOKENS.iter().any(|t| normalized.contains(t)) {
        return IntentCategory::GeneralQuestion;
    }
    IntentCategory::Other
}

fn is_greeting(normalized: &str) -> bool {
    normalized.chars().count() < GREETING_MAX_CHARS && GREETING_RE.is_match(normalized)
}

fn is_recommendation_request(normalized: &str) -> bool {
    !extract_genres(normalized).is_empty()
        || RECOMMENDATION_PHRASES.iter().any(|p| normalized.contains(p))
        || PROGRAM_WORDS.iter().any(|w| normalized.contains(w))
}
