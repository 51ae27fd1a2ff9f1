use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use super::book_names::english_book_name;
use super::schema::ScriptureSchema;
use super::{is_blank_search, normalize_order, CollectionFilter, ContentResolver};
use crate::db::like_pattern;
use crate::models::{CollectionKind, ContentCollection, DisplayNames, NormalizedVerse};

/// Read-only resolver over a scripture database of unknown layout.
///
/// The layout is detected once when the resolver is built. A store that
/// cannot be understood (or is absent) leaves the resolver unresolved: every
/// query then returns nothing instead of failing.
pub struct ScriptureResolver {
    conn: Option<Connection>,
    schema: Option<ScriptureSchema>,
}

impl ScriptureResolver {
    /// Open the first existing path in `candidates` read-only.
    pub fn open<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let Some(path) = candidates
            .iter()
            .map(|candidate| candidate.as_ref())
            .find(|path: &&Path| path.exists())
        else {
            tracing::warn!(
                tried = candidates.len(),
                "scripture database not found, scripture browsing disabled"
            );
            return Ok(Self::unresolved());
        };

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open scripture database {}", path.display()))?;
        tracing::info!(path = %path.display(), "opened scripture database");
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        let schema = ScriptureSchema::detect(&conn).context("failed to inspect scripture schema")?;
        match &schema {
            Some(schema) => tracing::info!(
                table = %schema.verses_table,
                books = schema.books.as_ref().map(|b| b.table.as_str()).unwrap_or("-"),
                "detected scripture schema"
            ),
            None => tracing::warn!("no usable verses table in scripture database"),
        }
        Ok(Self {
            conn: Some(conn),
            schema,
        })
    }

    /// A resolver with no store behind it.
    pub fn unresolved() -> Self {
        Self {
            conn: None,
            schema: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.schema.is_some()
    }

    pub fn schema(&self) -> Option<&ScriptureSchema> {
        self.schema.as_ref()
    }

    /// Total number of verse rows; 0 when unresolved.
    pub fn verse_count(&self) -> Result<i64> {
        let Some((conn, schema)) = self.parts() else {
            return Ok(0);
        };
        conn.prepare_cached(&schema.sql.count)
            .context("failed to prepare verse count")?
            .query_row([], |row| row.get(0))
            .context("failed to count verses")
    }

    fn parts(&self) -> Option<(&Connection, &ScriptureSchema)> {
        Some((self.conn.as_ref()?, self.schema.as_ref()?))
    }
}

fn verse_from_row(row: &Row<'_>) -> rusqlite::Result<NormalizedVerse> {
    Ok(NormalizedVerse {
        collection_id: row.get(0)?,
        section: row.get(1)?,
        verse_number: row.get(2)?,
        text: row.get(3)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<ContentCollection> {
    let position: i64 = row.get(0)?;
    let stored: Option<String> = row.get(1)?;
    let english = english_book_name(position).map(str::to_string);
    let primary = stored
        .filter(|name| !name.trim().is_empty())
        .or_else(|| english.clone())
        .unwrap_or_else(|| format!("Book {position}"));

    Ok(ContentCollection {
        id: position,
        names: DisplayNames::new(primary, english),
        kind: CollectionKind::ScriptureBook,
        position,
    })
}

impl ContentResolver for ScriptureResolver {
    fn list_collections(&self, filter: CollectionFilter) -> Result<Vec<ContentCollection>> {
        let Some((conn, schema)) = self.parts() else {
            return Ok(Vec::new());
        };
        let mut stmt = conn
            .prepare_cached(&schema.sql.collections)
            .context("failed to prepare books query")?;
        let books = stmt
            .query_map([], book_from_row)
            .context("failed to iterate books")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to collect books")?;

        Ok(books
            .into_iter()
            .filter(|book| filter.matches(book))
            .collect())
    }

    fn list_sections(&self, collection_id: i64) -> Result<Vec<i64>> {
        let Some((conn, schema)) = self.parts() else {
            return Ok(Vec::new());
        };
        let mut stmt = conn
            .prepare_cached(&schema.sql.sections)
            .context("failed to prepare chapters query")?;
        let chapters = stmt
            .query_map([collection_id], |row| row.get(0))
            .context("failed to iterate chapters")?
            .collect::<Result<Vec<i64>, _>>()
            .context("failed to collect chapters")?;
        Ok(chapters)
    }

    fn list_verses(&self, collection_id: i64, section: i64) -> Result<Vec<NormalizedVerse>> {
        let Some((conn, schema)) = self.parts() else {
            return Ok(Vec::new());
        };
        let mut stmt = conn
            .prepare_cached(&schema.sql.verses)
            .context("failed to prepare chapter verses query")?;
        let verses = stmt
            .query_map(params![collection_id, section], verse_from_row)
            .context("failed to iterate chapter verses")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to collect chapter verses")?;
        Ok(normalize_order(verses))
    }

    fn find_verse(
        &self,
        collection_id: i64,
        section: i64,
        verse_number: i64,
    ) -> Result<Option<NormalizedVerse>> {
        let Some((conn, schema)) = self.parts() else {
            return Ok(None);
        };
        conn.prepare_cached(&schema.sql.find)
            .context("failed to prepare verse lookup")?
            .query_row(params![collection_id, section, verse_number], verse_from_row)
            .optional()
            .context("failed to load verse")
    }

    fn search(&self, text: &str, limit: usize) -> Result<Vec<NormalizedVerse>> {
        if is_blank_search(text, limit) {
            return Ok(Vec::new());
        }
        let Some((conn, schema)) = self.parts() else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare_cached(&schema.sql.search)
            .context("failed to prepare scripture search")?;
        let hits = stmt
            .query_map(params![like_pattern(text), limit], verse_from_row)
            .context("failed to run scripture search")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to collect scripture search results")?;
        Ok(hits)
    }
}
