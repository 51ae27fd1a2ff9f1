use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::{is_blank_search, normalize_order, CollectionFilter, ContentResolver};
use crate::db::{fetch_all_songs, fetch_segments, like_pattern};
use crate::models::{CollectionKind, ContentCollection, DisplayNames, NormalizedVerse, Song};

/// Resolver over the presenter's own song library.
///
/// Each stored verse-segment is its own section holding a single verse whose
/// number equals the section, so a song reads as one flat, ordered sequence.
pub struct SongResolver {
    conn: Connection,
}

impl SongResolver {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Underlying presenter database, used for editing songs and templates.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Every segment of a song in presentation order.
    pub fn song_sequence(&self, song_id: i64) -> Result<Vec<NormalizedVerse>> {
        let verses = fetch_segments(&self.conn, song_id)?
            .into_iter()
            .map(|segment| NormalizedVerse {
                collection_id: segment.song_id,
                section: segment.number,
                verse_number: segment.number,
                text: segment.content,
            })
            .collect();
        Ok(normalize_order(verses))
    }
}

fn song_collection(position: usize, song: &Song) -> ContentCollection {
    let author = song.author.trim();
    ContentCollection {
        id: song.id,
        names: DisplayNames::new(
            song.title.clone(),
            (!author.is_empty()).then(|| author.to_string()),
        ),
        kind: CollectionKind::Song,
        position: position as i64 + 1,
    }
}

impl ContentResolver for SongResolver {
    fn list_collections(&self, filter: CollectionFilter) -> Result<Vec<ContentCollection>> {
        let songs = fetch_all_songs(&self.conn)?;
        Ok(songs
            .iter()
            .enumerate()
            .map(|(position, song)| song_collection(position, song))
            .filter(|collection| filter.matches(collection))
            .collect())
    }

    fn list_sections(&self, collection_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT DISTINCT verse_number FROM verses WHERE song_id = ?1 ORDER BY verse_number",
            )
            .context("failed to prepare song sections query")?;
        let sections = stmt
            .query_map([collection_id], |row| row.get(0))
            .context("failed to iterate song sections")?
            .collect::<Result<Vec<i64>, _>>()
            .context("failed to collect song sections")?;
        Ok(sections)
    }

    fn list_verses(&self, collection_id: i64, section: i64) -> Result<Vec<NormalizedVerse>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT content FROM verses
                 WHERE song_id = ?1 AND verse_number = ?2
                 ORDER BY id
                 LIMIT 1",
            )
            .context("failed to prepare song verse query")?;
        let verses = stmt
            .query_map(params![collection_id, section], |row| {
                Ok(NormalizedVerse {
                    collection_id,
                    section,
                    verse_number: section,
                    text: row.get(0)?,
                })
            })
            .context("failed to iterate song verse")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to collect song verse")?;
        Ok(verses)
    }

    fn find_verse(
        &self,
        collection_id: i64,
        section: i64,
        verse_number: i64,
    ) -> Result<Option<NormalizedVerse>> {
        if verse_number != section {
            return Ok(None);
        }
        Ok(self.list_verses(collection_id, section)?.into_iter().next())
    }

    fn search(&self, text: &str, limit: usize) -> Result<Vec<NormalizedVerse>> {
        if is_blank_search(text, limit) {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT v.song_id, v.verse_number, v.content
                 FROM verses v
                 JOIN songs s ON s.id = v.song_id
                 WHERE v.content LIKE ?1 ESCAPE '\\' OR s.title LIKE ?1 ESCAPE '\\'
                 ORDER BY s.title COLLATE NOCASE, s.id, v.verse_number, v.id
                 LIMIT ?2",
            )
            .context("failed to prepare song search")?;
        let hits = stmt
            .query_map(params![like_pattern(text), limit], |row| {
                let section: i64 = row.get(1)?;
                Ok(NormalizedVerse {
                    collection_id: row.get(0)?,
                    section,
                    verse_number: section,
                    text: row.get(2)?,
                })
            })
            .context("failed to run song search")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to collect song search results")?;
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{add_segment, create_song, memory_database, seed_defaults};
    use crate::models::Testament;

    fn seeded() -> SongResolver {
        let conn = memory_database();
        seed_defaults(&conn).unwrap();
        SongResolver::new(conn)
    }

    fn amazing_grace(resolver: &SongResolver) -> i64 {
        resolver
            .list_collections(CollectionFilter::All)
            .unwrap()
            .into_iter()
            .find(|c| c.names.primary == "Amazing Grace")
            .map(|c| c.id)
            .unwrap()
    }

    #[test]
    fn seeded_songs_are_collections() {
        let resolver = seeded();
        let songs = resolver.list_collections(CollectionFilter::All).unwrap();
        assert_eq!(songs.len(), 3);
        assert!(songs.iter().all(|s| s.kind == CollectionKind::Song));
        assert!(songs.iter().all(|s| s.testament().is_none()));

        let scripture_only = resolver
            .list_collections(CollectionFilter::Kind(CollectionKind::ScriptureBook))
            .unwrap();
        assert!(scripture_only.is_empty());
        let by_testament = resolver
            .list_collections(CollectionFilter::Testament(Testament::Old))
            .unwrap();
        assert!(by_testament.is_empty());
    }

    #[test]
    fn each_segment_is_a_section_with_one_verse() {
        let resolver = seeded();
        let id = amazing_grace(&resolver);

        assert_eq!(resolver.list_sections(id).unwrap(), vec![1, 2, 3]);
        let second = resolver.list_verses(id, 2).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].verse_number, 2);
        assert!(second[0].text.starts_with("Twas grace"));

        assert!(resolver.find_verse(id, 3, 3).unwrap().is_some());
        assert!(resolver.find_verse(id, 3, 1).unwrap().is_none());
        assert!(resolver.find_verse(id, 9, 9).unwrap().is_none());
    }

    #[test]
    fn duplicate_segment_numbers_keep_first() {
        let resolver = seeded();
        let song = create_song(resolver.conn(), "Doxology", "", "Hymn", None).unwrap();
        add_segment(resolver.conn(), song.id, 2, "verse", "second").unwrap();
        add_segment(resolver.conn(), song.id, 1, "verse", "first").unwrap();
        add_segment(resolver.conn(), song.id, 1, "verse", "shadowed").unwrap();

        let sequence = resolver.song_sequence(song.id).unwrap();
        let texts: Vec<_> = sequence.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(resolver.list_verses(song.id, 1).unwrap()[0].text, "first");
    }

    #[test]
    fn search_matches_content_and_title() {
        let resolver = seeded();
        let by_content = resolver.search("wretch like me", 10).unwrap();
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].verse_number, 1);

        let by_title = resolver.search("amazing", 10).unwrap();
        assert_eq!(by_title.len(), 3);
        assert_eq!(resolver.search("amazing", 2).unwrap().len(), 2);
        assert!(resolver.search("", 10).unwrap().is_empty());
        assert!(resolver.search("%", 10).unwrap().is_empty());
    }

    #[test]
    fn unknown_song_is_empty() {
        let resolver = seeded();
        assert!(resolver.list_sections(999).unwrap().is_empty());
        assert!(resolver.list_verses(999, 1).unwrap().is_empty());
        assert!(resolver.song_sequence(999).unwrap().is_empty());
    }
}
