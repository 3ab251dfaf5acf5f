/// Turn policy: classify the message, pick catalog entries, then phrase the reply.
///
/// | intent         | genre                  | entries            | text                          |
/// |----------------|------------------------|--------------------|-------------------------------|
/// | greeting       | -                      | none               | generated, greeting fallback  |
/// | recommendation | found, in catalog      | that genre's group | generated, genre fallback     |
/// | recommendation | found, not in catalog  | default picks      | static genre list             |
/// | recommendation | none                   | none               | generated, clarify fallback   |
/// | question       | -                      | none               | generated, steering fallback  |
/// | other          | -                      | default picks      | generated, generic fallback   |
///
/// A generator error or timeout never fails the turn; the call site's fallback string is
/// used instead.
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, warn};

use crate::catalog::Catalog;
use crate::generator::{GenerateError, TextGenerator};
use crate::genre::primary_genre;
use crate::intent::classify;
use crate::model::{CatalogEntry, GenreKey, IntentCategory};

pub const APOLOGY: &str = "I apologize, but I'm having trouble processing your request right now. \
     Could you try asking in a different way or tell me what kind of podcasts you're interested in?";

const GREETING_FALLBACK: &str = "Hi there! 👋 I'm PodPal, your podcast recommendation assistant. \
     What kind of podcasts are you interested in?";

const CLARIFY_FALLBACK: &str = "I'd love to recommend some podcasts for you! Could you tell me \
     what genres or topics you're interested in? For example: true crime, comedy, business, \
     technology, health, or something else?";

const QUESTION_FALLBACK: &str = "I specialize in podcast recommendations! I can help you discover \
     new shows based on your interests. What kind of podcasts would you like to learn about today?";

const GENERIC_FALLBACK: &str = "Here are some of the most popular podcasts right now across \
     different categories. Let me know if you want more specific recommendations!";

const CLARIFY_PROMPT: &str = "The listener wants podcast recommendations but did not name a genre. \
     Ask which genres they enjoy and mention a few we cover, like true crime, comedy, business, \
     technology and health. Two sentences at most.";

const GENERIC_PROMPT: &str = "Write a one or two sentence introduction for a handful of popular \
     podcasts from different genres. Do not name any podcasts.";

/// Where the reply text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Generated,
    Fallback,
    /// Fixed text with no generator call.
    Static,
}

impl TextSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TextSource::Generated => "generated",
            TextSource::Fallback => "fallback",
            TextSource::Static => "static",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub intent: IntentCategory,
    /// First genre extracted from a recommendation request.
    pub genre: Option<GenreKey>,
    pub text: String,
    pub text_source: TextSource,
    pub podcasts: Vec<CatalogEntry>,
}

impl Reply {
    fn apology() -> Self {
        Self {
            intent: IntentCategory::Other,
            genre: None,
            text: APOLOGY.to_string(),
            text_source: TextSource::Fallback,
            podcasts: Vec::new(),
        }
    }
}

pub struct ReplyComposer<G> {
    catalog: Arc<Catalog>,
    generator: G,
    timeout: Duration,
}

impl<G: TextGenerator> ReplyComposer<G> {
    pub fn new(catalog: Arc<Catalog>, generator: G, timeout: Duration) -> Self {
        Self {
            catalog,
            generator,
            timeout,
        }
    }

    /// [`compose`](Self::compose), but a panic anywhere in the turn becomes the apology
    /// reply with no entries.
    pub async fn respond(&self, message: &str) -> Reply {
        match AssertUnwindSafe(self.compose(message)).catch_unwind().await {
            Ok(reply) => reply,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(reason = %reason, "reply composition panicked");
                Reply::apology()
            }
        }
    }

    pub async fn compose(&self, message: &str) -> Reply {
        let intent = classify(message);
        match intent {
            IntentCategory::Greeting => {
                let prompt = format!(
                    "Greet the listener in two or three short sentences and ask what kind of \
                     podcasts they like. Do not recommend anything yet. They said: \"{message}\""
                );
                let (text, text_source) = self.phrase("greeting", prompt, GREETING_FALLBACK).await;
                self.reply(intent, None, text, text_source, Vec::new())
            }
            IntentCategory::RecommendationRequest => self.recommend(message).await,
            IntentCategory::GeneralQuestion => {
                let prompt = format!(
                    "The listener asked: \"{message}\". Answer briefly and steer the conversation \
                     toward podcast recommendations. If the question has nothing to do with \
                     podcasts, politely bring it back. Three sentences at most."
                );
                let (text, text_source) = self.phrase("question", prompt, QUESTION_FALLBACK).await;
                self.reply(intent, None, text, text_source, Vec::new())
            }
            IntentCategory::Other => {
                let (text, text_source) = self
                    .phrase("other", GENERIC_PROMPT.to_string(), GENERIC_FALLBACK)
                    .await;
                self.reply(intent, None, text, text_source, self.default_picks())
            }
        }
    }

    async fn recommend(&self, message: &str) -> Reply {
        let intent = IntentCategory::RecommendationRequest;

        let Some(genre) = primary_genre(message) else {
            let (text, text_source) = self
                .phrase("clarify", CLARIFY_PROMPT.to_string(), CLARIFY_FALLBACK)
                .await;
            return self.reply(intent, None, text, text_source, Vec::new());
        };

        let entries = self.catalog.by_genre(genre);
        if entries.is_empty() {
            let available: Vec<&str> = self.catalog.genres().iter().map(|g| g.as_str()).collect();
            let text = format!(
                "I don't have specific recommendations for {genre} podcasts yet. Here are some \
                 popular podcasts from other categories instead. I can provide recommendations \
                 for these genres: {}.",
                available.join(", ")
            );
            return self.reply(intent, Some(genre), text, TextSource::Static, self.default_picks());
        }

        let prompt = format!(
            "The listener is looking for {genre} podcasts. Write an enthusiastic one or two \
             sentence introduction to a list of {genre} recommendations without naming any shows."
        );
        let fallback =
            format!("I found some great {genre} podcasts that you might enjoy! Here are my top recommendations:");
        let (text, text_source) = self.phrase("genre_intro", prompt, &fallback).await;
        self.reply(intent, Some(genre), text, text_source, entries.to_vec())
    }

    /// One bounded generator call. Any failure yields `fallback`.
    async fn phrase(&self, site: &'static str, prompt: String, fallback: &str) -> (String, TextSource) {
        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout(self.timeout)),
        };
        match outcome {
            Ok(text) if !text.trim().is_empty() => (text, TextSource::Generated),
            Ok(_) => {
                warn!(site, error = %GenerateError::EmptyCompletion, "using fallback reply");
                (fallback.to_string(), TextSource::Fallback)
            }
            Err(e) => {
                warn!(site, error = %e, "using fallback reply");
                (fallback.to_string(), TextSource::Fallback)
            }
        }
    }

    fn default_picks(&self) -> Vec<CatalogEntry> {
        self.catalog.default_picks().into_iter().cloned().collect()
    }

    fn reply(
        &self,
        intent: IntentCategory,
        genre: Option<GenreKey>,
        text: String,
        text_source: TextSource,
        podcasts: Vec<CatalogEntry>,
    ) -> Reply {
        Reply {
            intent,
            genre,
            text,
            text_source,
            podcasts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Always answers with the same text and remembers every prompt it saw.
    struct CannedGenerator {
        text: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.text.clone())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            Err(GenerateError::EmptyCompletion)
        }
    }

    struct SlowGenerator;

    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    struct PanickingGenerator;

    impl TextGenerator for PanickingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            panic!("generator exploded");
        }
    }

    fn composer<G: TextGenerator>(generator: G) -> ReplyComposer<G> {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        ReplyComposer::new(catalog, generator, Duration::from_secs(1))
    }

    fn titles(reply: &Reply) -> Vec<&str> {
        reply.podcasts.iter().map(|p| p.title.as_str()).collect()
    }

    const DEFAULT_TITLES: [&str; 3] = ["Conan O'Brien Needs A Friend", "Reply All", "Serial"];

    #[tokio::test]
    async fn greeting_has_no_entries() {
        let composer = composer(CannedGenerator::new("Hey! What do you like to listen to?"));
        let reply = composer.respond("hi").await;
        assert_eq!(reply.intent, IntentCategory::Greeting);
        assert_eq!(reply.text, "Hey! What do you like to listen to?");
        assert_eq!(reply.text_source, TextSource::Generated);
        assert!(reply.podcasts.is_empty());
        assert!(composer.generator.prompts.lock().unwrap()[0].contains("\"hi\""));
    }

    #[tokio::test]
    async fn genre_request_attaches_that_group() {
        let composer = composer(CannedGenerator::new("Get ready to laugh!"));
        let reply = composer.respond("something funny please").await;
        assert_eq!(reply.intent, IntentCategory::RecommendationRequest);
        assert_eq!(reply.genre, Some(GenreKey::Comedy));
        assert_eq!(reply.text_source, TextSource::Generated);
        assert_eq!(reply.podcasts, composer.catalog.by_genre(GenreKey::Comedy).to_vec());
        assert!(composer.generator.prompts.lock().unwrap()[0].contains("comedy podcasts"));
    }

    #[tokio::test]
    async fn genre_request_falls_back_when_generator_fails() {
        let composer = composer(FailingGenerator);
        let reply = composer.respond("I love true crime shows").await;
        assert_eq!(reply.genre, Some(GenreKey::TrueCrime));
        assert_eq!(reply.text_source, TextSource::Fallback);
        assert_eq!(
            reply.text,
            "I found some great true crime podcasts that you might enjoy! Here are my top recommendations:"
        );
        assert_eq!(reply.podcasts, composer.catalog.by_genre(GenreKey::TrueCrime).to_vec());
    }

    #[tokio::test]
    async fn uncatalogued_genre_gets_default_picks_and_genre_list() {
        let composer = composer(CannedGenerator::new("unused"));
        let reply = composer.respond("I love jazz music").await;
        assert_eq!(reply.genre, Some(GenreKey::Music));
        assert_eq!(reply.text_source, TextSource::Static);
        assert_eq!(titles(&reply), DEFAULT_TITLES);
        assert!(reply.text.starts_with("I don't have specific recommendations for music podcasts yet."));
        assert!(reply.text.contains("true crime, comedy, technology"));
        assert!(!reply.text.contains("music,"));
        assert!(composer.generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_without_genre_asks_for_one() {
        let composer = composer(FailingGenerator);
        let reply = composer.respond("recommend me something").await;
        assert_eq!(reply.intent, IntentCategory::RecommendationRequest);
        assert_eq!(reply.genre, None);
        assert_eq!(reply.text, CLARIFY_FALLBACK);
        assert!(reply.podcasts.is_empty());
    }

    #[tokio::test]
    async fn question_is_steered_back() {
        let composer = composer(FailingGenerator);
        let reply = composer.respond("who are you?").await;
        assert_eq!(reply.intent, IntentCategory::GeneralQuestion);
        assert_eq!(reply.text, QUESTION_FALLBACK);
        assert!(reply.podcasts.is_empty());
    }

    #[tokio::test]
    async fn other_gets_default_picks() {
        let composer = composer(FailingGenerator);
        let reply = composer.respond("ok thanks").await;
        assert_eq!(reply.intent, IntentCategory::Other);
        assert_eq!(reply.text, GENERIC_FALLBACK);
        assert_eq!(titles(&reply), DEFAULT_TITLES);
    }

    #[tokio::test]
    async fn greeting_fallback() {
        let reply = composer(FailingGenerator).respond("hello").await;
        assert_eq!(reply.text, GREETING_FALLBACK);
        assert_eq!(reply.text_source, TextSource::Fallback);
    }

    #[tokio::test]
    async fn blank_generation_uses_fallback() {
        let reply = composer(CannedGenerator::new("   ")).respond("hello").await;
        assert_eq!(reply.text, GREETING_FALLBACK);
        assert_eq!(reply.text_source, TextSource::Fallback);
    }

    #[tokio::test]
    async fn slow_generator_times_out_to_fallback() {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let composer = ReplyComposer::new(catalog, SlowGenerator, Duration::from_millis(20));
        let reply = composer.respond("ok thanks").await;
        assert_eq!(reply.text, GENERIC_FALLBACK);
        assert_eq!(reply.text_source, TextSource::Fallback);
        assert_eq!(titles(&reply), DEFAULT_TITLES);
    }

    #[tokio::test]
    async fn panic_becomes_apology() {
        let reply = composer(PanickingGenerator).respond("hello").await;
        assert_eq!(reply.text, APOLOGY);
        assert!(reply.podcasts.is_empty());
        assert_eq!(reply.genre, None);
    }
}
