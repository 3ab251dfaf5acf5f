/// The curated podcast catalog.
///
/// Loaded once at start from a versioned JSON document, validated, and then shared
/// read-only (`Arc<Catalog>`) by every request. Nothing mutates it afterwards.
use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::model::{CatalogEntry, GenreKey};

/// The catalog compiled into the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

pub const CATALOG_VERSION: u32 = 1;

const MAX_RATING: f32 = 5.0;

/// Fixed cross-genre pick used when no genre-specific list applies: the first entry of
/// each of these groups, in this order.
const DEFAULT_PICK_GENRES: [GenreKey; 3] =
    [GenreKey::Comedy, GenreKey::Technology, GenreKey::TrueCrime];

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: u32,
    genres: Vec<GenreGroup>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenreGroup {
    genre: GenreKey,
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    groups: Vec<GenreGroup>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read {}: {e}", path.display())))?;
        let catalog = Self::from_json(&content)?;
        info!(path = %path.display(), entries = catalog.len(), "catalog loaded from file");
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let doc: CatalogDocument = serde_json::from_str(content)?;
        validate(&doc)?;
        Ok(Self { groups: doc.genres })
    }

    /// Entries for `genre`, or an empty slice if the catalog has no such group.
    pub fn by_genre(&self, genre: GenreKey) -> &[CatalogEntry] {
        self.groups
            .iter()
            .find(|g| g.genre == genre)
            .map(|g| g.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Every entry, groups concatenated in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.all().find(|e| e.id == id)
    }

    /// Genres that have entries, in declaration order.
    pub fn genres(&self) -> Vec<GenreKey> {
        self.groups.iter().map(|g| g.genre).collect()
    }

    pub fn has_genre(&self, genre: GenreKey) -> bool {
        !self.by_genre(genre).is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    /// First comedy, first technology, first true-crime entry. Groups missing from a
    /// custom catalog are skipped.
    pub fn default_picks(&self) -> Vec<&CatalogEntry> {
        DEFAULT_PICK_GENRES
            .iter()
            .filter_map(|genre| self.by_genre(*genre).first())
            .collect()
    }
}

fn validate(doc: &CatalogDocument) -> Result<(), AppError> {
    if doc.version != CATALOG_VERSION {
        return Err(AppError::InvalidCatalog(format!(
            "unsupported catalog version {} (expected {CATALOG_VERSION})",
            doc.version
        )));
    }

    let mut seen_genres = HashSet::new();
    let mut seen_ids = HashSet::new();

    for group in &doc.genres {
        if !seen_genres.insert(group.genre) {
            return Err(AppError::InvalidCatalog(format!(
                "genre '{}' declared more than once",
                group.genre
            )));
        }
        if group.entries.is_empty() {
            return Err(AppError::InvalidCatalog(format!(
                "genre '{}' has no entries",
                group.genre
            )));
        }

        for entry in &group.entries {
            if entry.id.trim().is_empty() {
                return Err(AppError::InvalidCatalog(format!(
                    "entry in genre '{}' has an empty id",
                    group.genre
                )));
            }
            if !seen_ids.insert(entry.id.as_str()) {
                return Err(AppError::InvalidCatalog(format!(
                    "duplicate entry id '{}'",
                    entry.id
                )));
            }
            if entry.title.trim().is_empty() {
                return Err(AppError::InvalidCatalog(format!(
                    "entry '{}' has an empty title",
                    entry.id
                )));
            }
            if entry.genre != group.genre {
                return Err(AppError::InvalidCatalog(format!(
                    "entry '{}' has genre '{}' but is listed under '{}'",
                    entry.id, entry.genre, group.genre
                )));
            }
            if !entry.rating.is_finite() || !(0.0..=MAX_RATING).contains(&entry.rating) {
                return Err(AppError::InvalidCatalog(format!(
                    "entry '{}' has rating {} outside 0.0..={MAX_RATING}",
                    entry.id, entry.rating
                )));
            }
            if entry.average_duration_minutes == Some(0) {
                return Err(AppError::InvalidCatalog(format!(
                    "entry '{}' has a zero average duration",
                    entry.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_json(id: &str, genre: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": format!("Show {id}"),
            "host": "Someone",
            "genre": genre,
            "description": "A show.",
            "rating": 4.5,
            "image_url": "https://example.com/a.jpg",
            "episode_count": 10,
            "average_duration_minutes": 30,
            "platform": "Spotify",
            "url": "https://example.com/show"
        })
    }

    fn doc(genres: serde_json::Value) -> String {
        serde_json::json!({ "version": 1, "genres": genres }).to_string()
    }

    fn invalid_reason(json: &str) -> String {
        match Catalog::from_json(json) {
            Err(AppError::InvalidCatalog(reason)) => reason,
            other => panic!("expected InvalidCatalog, got {other:?}"),
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().expect("builtin catalog should load");
        assert_eq!(catalog.len(), 43);
        assert_eq!(catalog.genres().len(), 16);
        assert_eq!(catalog.genres()[0], GenreKey::TrueCrime);
        assert!(!catalog.has_genre(GenreKey::Music));
        assert!(!catalog.has_genre(GenreKey::Entertainment));
    }

    #[test]
    fn by_genre_returns_only_that_genre() {
        let catalog = Catalog::builtin().unwrap();
        let tech = catalog.by_genre(GenreKey::Technology);
        assert!(!tech.is_empty());
        assert!(tech.iter().all(|e| e.genre == GenreKey::Technology));
    }

    #[test]
    fn by_genre_absent_group_is_empty() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.by_genre(GenreKey::Music).is_empty());
    }

    #[test]
    fn by_genre_is_stable() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.by_genre(GenreKey::Comedy),
            catalog.by_genre(GenreKey::Comedy)
        );
    }

    #[test]
    fn default_picks_are_fixed() {
        let catalog = Catalog::builtin().unwrap();
        let picks: Vec<&str> = catalog.default_picks().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(picks, vec!["Conan O'Brien Needs A Friend", "Reply All", "Serial"]);
        let again: Vec<&str> = catalog.default_picks().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(picks, again);
    }

    #[test]
    fn default_picks_skip_missing_groups() {
        let json = doc(serde_json::json!([
            { "genre": "technology", "entries": [entry_json("t1", "technology")] }
        ]));
        let catalog = Catalog::from_json(&json).unwrap();
        let picks = catalog.default_picks();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].id, "t1");
    }

    #[test]
    fn get_by_id() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.get("4").map(|e| e.title.as_str()), Some("Darknet Diaries"));
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn rejects_wrong_version() {
        let json = serde_json::json!({ "version": 2, "genres": [] }).to_string();
        assert!(invalid_reason(&json).contains("version"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = doc(serde_json::json!([
            { "genre": "comedy", "entries": [entry_json("1", "comedy")] },
            { "genre": "news", "entries": [entry_json("1", "news")] }
        ]));
        assert!(invalid_reason(&json).contains("duplicate entry id"));
    }

    #[test]
    fn rejects_duplicate_groups() {
        let json = doc(serde_json::json!([
            { "genre": "comedy", "entries": [entry_json("1", "comedy")] },
            { "genre": "comedy", "entries": [entry_json("2", "comedy")] }
        ]));
        assert!(invalid_reason(&json).contains("more than once"));
    }

    #[test]
    fn rejects_empty_group() {
        let json = doc(serde_json::json!([{ "genre": "comedy", "entries": [] }]));
        assert!(invalid_reason(&json).contains("no entries"));
    }

    #[test]
    fn rejects_misfiled_entry() {
        let json = doc(serde_json::json!([
            { "genre": "comedy", "entries": [entry_json("1", "news")] }
        ]));
        assert!(invalid_reason(&json).contains("listed under"));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let mut entry = entry_json("1", "comedy");
        entry["rating"] = serde_json::json!(5.5);
        let json = doc(serde_json::json!([{ "genre": "comedy", "entries": [entry] }]));
        assert!(invalid_reason(&json).contains("rating"));
    }

    #[test]
    fn rejects_zero_duration() {
        let mut entry = entry_json("1", "comedy");
        entry["average_duration_minutes"] = serde_json::json!(0);
        let json = doc(serde_json::json!([{ "genre": "comedy", "entries": [entry] }]));
        assert!(invalid_reason(&json).contains("zero average duration"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut entry = entry_json("1", "comedy");
        let obj = entry.as_object_mut().unwrap();
        obj.remove("episode_count");
        obj.remove("average_duration_minutes");
        let json = doc(serde_json::json!([{ "genre": "comedy", "entries": [entry] }]));
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog.by_genre(GenreKey::Comedy)[0].episode_count, None);
    }

    #[test]
    fn unknown_genre_label_is_a_parse_error() {
        let json = doc(serde_json::json!([
            { "genre": "polka", "entries": [entry_json("1", "polka")] }
        ]));
        assert!(matches!(
            Catalog::from_json(&json),
            Err(AppError::CatalogParse(_))
        ));
    }
}
