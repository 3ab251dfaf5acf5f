/// Genre extraction from free-form listener text.
///
/// Matching is plain substring search over the lower-cased text, so a synonym inside a
/// longer word counts ("ai" matches "explain"). The table is also the single source of
/// genre triggers for intent classification.
use crate::model::GenreKey;

/// Genre → trigger phrases, in extraction order. A genre appears in the output of
/// [`extract_genres`] in the position it holds here.
pub const GENRE_SYNONYMS: &[(GenreKey, &[&str])] = &[
    (
        GenreKey::TrueCrime,
        &["true crime", "murder", "criminal", "crime", "mystery"],
    ),
    (
        GenreKey::Comedy,
        &["comedy", "funny", "humor", "laugh", "comedians", "jokes", "hilarious"],
    ),
    (
        GenreKey::Business,
        &[
            "business", "entrepreneur", "startup", "finance", "money", "investing", "economics",
            "work",
        ],
    ),
    (
        GenreKey::Technology,
        &[
            "tech", "technology", "digital", "software", "computer", "programming", "science",
            "ai", "artificial intelligence", "gadgets", "internet", "coding",
        ],
    ),
    (
        GenreKey::Health,
        &[
            "health", "wellness", "fitness", "mental health", "meditation", "mindfulness", "yoga",
            "nutrition", "diet", "workout", "exercise",
        ],
    ),
    (
        GenreKey::History,
        &[
            "history", "historical", "past", "ancient", "medieval", "renaissance", "war",
            "civilization", "archaeology",
        ],
    ),
    (
        GenreKey::News,
        &[
            "news", "current events", "politics", "world affairs", "journalism", "headlines",
            "global",
        ],
    ),
    (
        GenreKey::Science,
        &[
            "science", "scientific", "physics", "chemistry", "biology", "astronomy", "space",
            "research", "discovery",
        ],
    ),
    (
        GenreKey::Sports,
        &[
            "sports", "football", "basketball", "baseball", "soccer", "tennis", "golf", "athletes",
            "olympics", "nfl", "nba", "mlb",
        ],
    ),
    (
        GenreKey::Entertainment,
        &[
            "entertainment", "movies", "tv", "television", "film", "celebrity", "hollywood",
            "streaming", "shows",
        ],
    ),
    (
        GenreKey::Fiction,
        &[
            "fiction", "stories", "storytelling", "narrative", "drama", "fantasy", "sci-fi",
            "horror stories",
        ],
    ),
    (
        GenreKey::Music,
        &[
            "music", "songs", "bands", "artists", "albums", "concerts", "musicians", "vinyl",
            "indie", "rock", "hip hop", "jazz",
        ],
    ),
    (
        GenreKey::Food,
        &[
            "food", "cooking", "cuisine", "recipes", "chef", "culinary", "baking", "restaurant",
            "gastronomy", "dining",
        ],
    ),
    (
        GenreKey::Education,
        &[
            "education", "learning", "teaching", "academic", "university", "college", "school",
            "knowledge", "lectures", "lessons",
        ],
    ),
    (
        GenreKey::Spirituality,
        &[
            "spirituality", "spiritual", "religion", "faith", "philosophy", "consciousness",
            "awakening", "soul", "enlightenment", "zen", "mindful", "buddhism", "yoga",
            "meditation",
        ],
    ),
    (
        GenreKey::Motivation,
        &[
            "motivation", "motivational", "self-help", "self-improvement", "personal growth",
            "inspiration", "success", "goals", "achievement", "life coaching", "performance",
            "positive thinking",
        ],
    ),
    (
        GenreKey::Suspense,
        &[
            "suspense", "thriller", "mystery", "crime thriller", "psychological thriller",
            "horror", "supernatural", "scary", "paranormal", "investigation", "detective",
        ],
    ),
    (
        GenreKey::Love,
        &[
            "love", "romance", "relationship", "dating", "marriage", "couples", "intimacy",
            "romantic", "heartbreak", "breakup", "wedding", "partnership",
        ],
    ),
];

/// Every genre with at least one synonym in `text`, in table order.
pub fn extract_genres(text: &str) -> Vec<GenreKey> {
    let lower = text.to_lowercase();
    GENRE_SYNONYMS
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| lower.contains(s)))
        .map(|(genre, _)| *genre)
        .collect()
}

/// First genre found in `text`; the one a recommendation is built around.
pub fn primary_genre(text: &str) -> Option<GenreKey> {
    let lower = text.to_lowercase();
    GENRE_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| lower.contains(s)))
        .map(|(genre, _)| *genre)
}

pub fn synonyms(genre: GenreKey) -> &'static [&'static str] {
    GENRE_SYNONYMS
        .iter()
        .find(|(g, _)| *g == genre)
        .map(|(_, s)| *s)
        .unwrap_or(&[])
}
