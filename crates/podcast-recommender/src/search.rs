/// Keyword search and genre filtering over the catalog.
///
/// No ranking: results always come back in catalog declaration order.
use crate::catalog::Catalog;
use crate::model::{CatalogEntry, GenreKey};

const ALL_GENRES_SENTINEL: &str = "all";

/// How a caller-supplied genre string narrows a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreFilter {
    /// No filter: missing, blank, or "all".
    Any,
    Genre(GenreKey),
    /// A name that is not a genre. Matches nothing.
    Unknown(String),
}

impl GenreFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return GenreFilter::Any;
        };
        if raw.eq_ignore_ascii_case(ALL_GENRES_SENTINEL) {
            return GenreFilter::Any;
        }
        match raw.parse::<GenreKey>() {
            Ok(genre) => GenreFilter::Genre(genre),
            Err(_) => GenreFilter::Unknown(raw.to_string()),
        }
    }
}

impl Catalog {
    /// Filter by genre when one is given (ignoring `query`), otherwise match `query`
    /// against title, host and description, otherwise return everything.
    pub fn search(&self, query: &str, genre: Option<&str>) -> Vec<&CatalogEntry> {
        match GenreFilter::parse(genre) {
            GenreFilter::Genre(genre) => self.by_genre(genre).iter().collect(),
            GenreFilter::Unknown(_) => Vec::new(),
            GenreFilter::Any => {
                let query = query.trim().to_lowercase();
                if query.is_empty() {
                    return self.all().collect();
                }
                self.all().filter(|e| matches_query(e, &query)).collect()
            }
        }
    }
}

/// `lower_query` must already be lower-cased.
fn matches_query(entry: &CatalogEntry, lower_query: &str) -> bool {
    [&entry.title, &entry.host, &entry.description]
        .iter()
        .any(|field| field.to_lowercase().contains(lower_query))
}
