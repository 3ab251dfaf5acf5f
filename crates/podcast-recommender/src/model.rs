use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical genre. Variant order is the extraction-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreKey {
    #[serde(rename = "true crime")]
    TrueCrime,
    Comedy,
    Business,
    Technology,
    Health,
    History,
    News,
    Science,
    Sports,
    Entertainment,
    Fiction,
    Music,
    Food,
    Education,
    Spirituality,
    Motivation,
    Suspense,
    Love,
}

impl GenreKey {
    pub const ALL: [GenreKey; 18] = [
        GenreKey::TrueCrime,
        GenreKey::Comedy,
        GenreKey::Business,
        GenreKey::Technology,
        GenreKey::Health,
        GenreKey::History,
        GenreKey::News,
        GenreKey::Science,
        GenreKey::Sports,
        GenreKey::Entertainment,
        GenreKey::Fiction,
        GenreKey::Music,
        GenreKey::Food,
        GenreKey::Education,
        GenreKey::Spirituality,
        GenreKey::Motivation,
        GenreKey::Suspense,
        GenreKey::Love,
    ];

    /// Lower-case display label, e.g. "true crime".
    pub fn as_str(self) -> &'static str {
        match self {
            GenreKey::TrueCrime => "true crime",
            GenreKey::Comedy => "comedy",
            GenreKey::Business => "business",
            GenreKey::Technology => "technology",
            GenreKey::Health => "health",
            GenreKey::History => "history",
            GenreKey::News => "news",
            GenreKey::Science => "science",
            GenreKey::Sports => "sports",
            GenreKey::Entertainment => "entertainment",
            GenreKey::Fiction => "fiction",
            GenreKey::Music => "music",
            GenreKey::Food => "food",
            GenreKey::Education => "education",
            GenreKey::Spirituality => "spirituality",
            GenreKey::Motivation => "motivation",
            GenreKey::Suspense => "suspense",
            GenreKey::Love => "love",
        }
    }
}

impl fmt::Display for GenreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown genre: {0}")]
pub struct UnknownGenre(pub String);

impl FromStr for GenreKey {
    type Err = UnknownGenre;

    /// Accepts any casing, and `-` or `_` between words ("True-Crime", "true_crime").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        GenreKey::ALL
            .into_iter()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| UnknownGenre(s.to_string()))
    }
}

/// One recommendable show from the curated catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub host: String,
    pub genre: GenreKey,
    pub description: String,
    /// 0.0 to 5.0 inclusive.
    pub rating: f32,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_duration_minutes: Option<u32>,
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Greeting,
    RecommendationRequest,
    GeneralQuestion,
    Other,
}

impl IntentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Greeting => "greeting",
            IntentCategory::RecommendationRequest => "recommendation_request",
            IntentCategory::GeneralQuestion => "general_question",
            IntentCategory::Other => "other",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_parsing_tolerates_separators_and_case() {
        assert_eq!("true crime".parse::<GenreKey>(), Ok(GenreKey::TrueCrime));
        assert_eq!("TRUE-CRIME".parse::<GenreKey>(), Ok(GenreKey::TrueCrime));
        assert_eq!(" true_crime ".parse::<GenreKey>(), Ok(GenreKey::TrueCrime));
        assert_eq!("Comedy".parse::<GenreKey>(), Ok(GenreKey::Comedy));
        assert!("jazz".parse::<GenreKey>().is_err());
        assert!("".parse::<GenreKey>().is_err());
    }

    #[test]
    fn genre_serde_uses_display_label() {
        let json = serde_json::to_string(&GenreKey::TrueCrime).unwrap();
        assert_eq!(json, "\"true crime\"");
        let back: GenreKey = serde_json::from_str("\"spirituality\"").unwrap();
        assert_eq!(back, GenreKey::Spirituality);
        for genre in GenreKey::ALL {
            let json = serde_json::to_string(&genre).unwrap();
            assert_eq!(json, format!("\"{}\"", genre.as_str()));
        }
    }
}
