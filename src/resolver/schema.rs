use anyhow::{Context, Result};
use rusqlite::Connection;

const VERSE_TABLE_NAMES: [&str; 5] = ["verses", "t_verses", "bible_verses", "verse", "scripture"];
const BOOK_TABLE_NAMES: [&str; 5] = ["books", "t_book_key", "bible_books", "book", "bookinfo"];

/// Optional table mapping book numbers to stored names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooksTable {
    pub table: String,
    pub id_column: String,
    pub name_column: String,
}

/// Table and column names detected in a scripture store, with the SQL built
/// from them. Created once per store and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptureSchema {
    pub verses_table: String,
    pub book_column: String,
    pub chapter_column: String,
    pub verse_column: String,
    pub text_column: String,
    pub books: Option<BooksTable>,
    pub(crate) sql: SchemaSql,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SchemaSql {
    pub(crate) collections: String,
    pub(crate) sections: String,
    pub(crate) verses: String,
    pub(crate) find: String,
    pub(crate) search: String,
    pub(crate) count: String,
}

impl ScriptureSchema {
    /// Inspect `conn` and work out where verses live. `Ok(None)` means no
    /// verses table with all four columns was found.
    pub fn detect(conn: &Connection) -> Result<Option<Self>> {
        let tables = list_tables(conn)?;

        let Some(verses_table) = pick_table(&tables, &VERSE_TABLE_NAMES, "verse", None) else {
            return Ok(None);
        };
        let columns = list_columns(conn, &verses_table)?;
        let mut taken = Vec::new();

        let Some(book_column) = pick_column(&columns, &mut taken, &["b"], |c| c.contains("book"))
        else {
            return Ok(None);
        };
        let Some(chapter_column) =
            pick_column(&columns, &mut taken, &["c", "ch"], |c| c.contains("chapter"))
        else {
            return Ok(None);
        };
        let Some(text_column) = pick_column(&columns, &mut taken, &["t"], |c| {
            c.contains("text") || c.contains("content")
        }) else {
            return Ok(None);
        };
        let Some(verse_column) = pick_column(&columns, &mut taken, &["v"], |c| {
            c.contains("verse") && !c.contains("id")
        }) else {
            return Ok(None);
        };

        let books = match pick_table(&tables, &BOOK_TABLE_NAMES, "book", Some(&verses_table)) {
            Some(table) => detect_books(conn, table)?,
            None => None,
        };

        let sql = SchemaSql::build(
            &verses_table,
            &book_column,
            &chapter_column,
            &verse_column,
            &text_column,
            books.as_ref(),
        );

        Ok(Some(Self {
            verses_table,
            book_column,
            chapter_column,
            verse_column,
            text_column,
            books,
            sql,
        }))
    }
}

impl SchemaSql {
    fn build(
        table: &str,
        book: &str,
        chapter: &str,
        verse: &str,
        text: &str,
        books: Option<&BooksTable>,
    ) -> Self {
        let (t, b, c, v, x) = (
            quote(table),
            quote(book),
            quote(chapter),
            quote(verse),
            quote(text),
        );
        let collections = match books {
            Some(books) => {
                let (bt, id, name) = (
                    quote(&books.table),
                    quote(&books.id_column),
                    quote(&books.name_column),
                );
                format!("SELECT {id}, {name} FROM {bt} ORDER BY {id}")
            }
            None => format!("SELECT DISTINCT {b}, NULL FROM {t} ORDER BY {b}"),
        };
        let row = format!("{b}, {c}, {v}, COALESCE({x}, '')");

        Self {
            collections,
            sections: format!("SELECT DISTINCT {c} FROM {t} WHERE {b} = ?1 ORDER BY {c}"),
            verses: format!("SELECT {row} FROM {t} WHERE {b} = ?1 AND {c} = ?2 ORDER BY {v}"),
            find: format!(
                "SELECT {row} FROM {t} WHERE {b} = ?1 AND {c} = ?2 AND {v} = ?3 LIMIT 1"
            ),
            search: format!(
                "SELECT {row} FROM {t} WHERE {x} LIKE ?1 ESCAPE '\\' ORDER BY {b}, {c}, {v} LIMIT ?2"
            ),
            count: format!("SELECT COUNT(*) FROM {t}"),
        }
    }
}

fn detect_books(conn: &Connection, table: String) -> Result<Option<BooksTable>> {
    let columns = list_columns(conn, &table)?;
    let mut taken = Vec::new();
    let id_column = pick_column(&columns, &mut taken, &["id", "book_num"], |c| {
        c.contains("number")
    });
    let name_column = last_free_column(&columns, &taken, |c| {
        c.contains("name") || c.contains("title")
    });

    match (id_column, name_column) {
        (Some(id_column), Some(name_column)) => Ok(Some(BooksTable {
            table,
            id_column,
            name_column,
        })),
        _ => {
            tracing::debug!(table = %table, "books table lacks id or name column, ignoring it");
            Ok(None)
        }
    }
}

fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
        .context("failed to prepare table listing")?;
    let tables = stmt
        .query_map([], |row| row.get(0))
        .context("failed to list tables")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect table names")?;
    Ok(tables)
}

fn list_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote(table)))
        .with_context(|| format!("failed to inspect table {table}"))?;
    let columns = stmt
        .query_map([], |row| row.get(1))
        .with_context(|| format!("failed to list columns of {table}"))?
        .collect::<Result<Vec<String>, _>>()
        .with_context(|| format!("failed to collect columns of {table}"))?;
    Ok(columns)
}

/// Case-insensitive exact match against `exact` first, then the first table
/// whose name contains `fragment`.
fn pick_table(
    tables: &[String],
    exact: &[&str],
    fragment: &str,
    exclude: Option<&str>,
) -> Option<String> {
    let candidates = || {
        tables
            .iter()
            .filter(move |name| Some(name.as_str()) != exclude)
    };
    candidates()
        .find(|name| exact.contains(&name.to_lowercase().as_str()))
        .or_else(|| candidates().find(|name| name.to_lowercase().contains(fragment)))
        .cloned()
}

/// Same two-pass rule for columns. A column claimed by an earlier role is
/// never reused for another one.
fn pick_column(
    columns: &[String],
    taken: &mut Vec<String>,
    exact: &[&str],
    matches: impl Fn(&str) -> bool,
) -> Option<String> {
    let claimed: &[String] = taken;
    let free = || columns.iter().filter(move |name| !claimed.contains(*name));
    let picked = free()
        .find(|name| exact.contains(&name.to_lowercase().as_str()))
        .or_else(|| free().find(|name| matches(&name.to_lowercase())))
        .cloned()?;
    taken.push(picked.clone());
    Some(picked)
}

/// Last unclaimed column matching `matches`, so `long_name` wins over an
/// earlier `short_name`.
fn last_free_column(
    columns: &[String],
    taken: &[String],
    matches: impl Fn(&str) -> bool,
) -> Option<String> {
    columns
        .iter()
        .rev()
        .filter(|name| !taken.contains(*name))
        .find(|name| matches(&name.to_lowercase()))
        .cloned()
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
