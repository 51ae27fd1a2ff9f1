//! Content resolvers: a uniform, read-only view over songs and scripture.
//!
//! Both stores are exposed as collections of sections of numbered verses so
//! the control surface can browse, search and navigate without knowing which
//! store it is talking to.

mod book_names;
mod schema;
mod scripture;
mod songs;

use anyhow::Result;

use crate::models::{CollectionKind, ContentCollection, NormalizedVerse, Testament};

pub use book_names::english_book_name;
pub use schema::{BooksTable, ScriptureSchema};
pub use scripture::ScriptureResolver;
pub use songs::SongResolver;

/// Which collections `list_collections` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFilter {
    #[default]
    All,
    Kind(CollectionKind),
    Testament(Testament),
}

impl CollectionFilter {
    pub fn matches(self, collection: &ContentCollection) -> bool {
        match self {
            CollectionFilter::All => true,
            CollectionFilter::Kind(kind) => collection.kind == kind,
            CollectionFilter::Testament(testament) => collection.testament() == Some(testament),
        }
    }
}

pub trait ContentResolver {
    /// Collections in display order. Nothing matching is an empty list.
    fn list_collections(&self, filter: CollectionFilter) -> Result<Vec<ContentCollection>>;

    /// Section numbers (chapters, song segments) of one collection, ascending.
    fn list_sections(&self, collection_id: i64) -> Result<Vec<i64>>;

    /// Verses of a section, strictly ascending by verse number.
    fn list_verses(&self, collection_id: i64, section: i64) -> Result<Vec<NormalizedVerse>>;

    fn find_verse(
        &self,
        collection_id: i64,
        section: i64,
        verse_number: i64,
    ) -> Result<Option<NormalizedVerse>>;

    /// Substring search over verse text. A blank query or a zero limit finds
    /// nothing; `%` and `_` in `text` match themselves.
    fn search(&self, text: &str, limit: usize) -> Result<Vec<NormalizedVerse>>;
}

/// Sort by verse number and keep only the first row for each number.
pub(crate) fn normalize_order(mut verses: Vec<NormalizedVerse>) -> Vec<NormalizedVerse> {
    verses.sort_by_key(|verse| verse.verse_number);
    verses.dedup_by_key(|verse| verse.verse_number);
    verses
}

pub(crate) fn is_blank_search(text: &str, limit: usize) -> bool {
    text.trim().is_empty() || limit == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisplayNames;
    use proptest::prelude::*;

    fn verse(number: i64, text: &str) -> NormalizedVerse {
        NormalizedVerse {
            collection_id: 1,
            section: 1,
            verse_number: number,
            text: text.to_string(),
        }
    }

    #[test]
    fn duplicates_keep_the_first_row() {
        let ordered = normalize_order(vec![verse(2, "b"), verse(1, "a"), verse(2, "dup")]);
        let texts: Vec<_> = ordered.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn testament_filter_skips_songs() {
        let song = ContentCollection {
            id: 1,
            names: DisplayNames::new("Amazing Grace", None),
            kind: CollectionKind::Song,
            position: 1,
        };
        let john = ContentCollection {
            id: 43,
            names: DisplayNames::new("John", None),
            kind: CollectionKind::ScriptureBook,
            position: 43,
        };
        let filter = CollectionFilter::Testament(Testament::New);
        assert!(!filter.matches(&song));
        assert!(filter.matches(&john));
        assert!(!CollectionFilter::Testament(Testament::Old).matches(&john));
        assert!(CollectionFilter::Kind(CollectionKind::Song).matches(&song));
    }

    #[test]
    fn blank_queries_are_skipped() {
        assert!(is_blank_search("   ", 10));
        assert!(is_blank_search("grace", 0));
        assert!(!is_blank_search("grace", 1));
    }

    proptest! {
        #[test]
        fn normalized_verses_are_strictly_ascending(numbers in prop::collection::vec(0i64..20, 0..40)) {
            let input: Vec<_> = numbers
                .iter()
                .enumerate()
                .map(|(idx, n)| verse(*n, &idx.to_string()))
                .collect();
            let output = normalize_order(input.clone());

            for pair in output.windows(2) {
                prop_assert!(pair[0].verse_number < pair[1].verse_number);
            }
            for kept in &output {
                let first = input.iter().find(|v| v.verse_number == kept.verse_number);
                prop_assert_eq!(first, Some(kept));
            }
        }
    }
}
