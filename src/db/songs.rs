use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Song;

const SONG_COLUMNS: &str = "id, title, COALESCE(author, ''), COALESCE(category, ''), template_id";

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        category: row.get(3)?,
        template_id: row.get(4)?,
    })
}

/// Fetch every song ordered case-insensitively by title. This is the
/// top-level collection index loaded when the control surface starts.
pub fn fetch_all_songs(conn: &Connection) -> Result<Vec<Song>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SONG_COLUMNS} FROM songs ORDER BY title COLLATE NOCASE, id"
        ))
        .context("failed to prepare all songs query")?;

    let songs = stmt
        .query_map([], song_from_row)
        .context("failed to iterate songs")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect songs")?;

    Ok(songs)
}

/// Look up a single song; `None` when the id does not exist.
pub fn fetch_song(conn: &Connection, id: i64) -> Result<Option<Song>> {
    conn.query_row(
        &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
        [id],
        song_from_row,
    )
    .optional()
    .context("failed to load song")
}

/// Songs whose title or author contains `query`, using SQLite's `LIKE`
/// matching (ASCII case-insensitive).
pub fn search_songs(conn: &Connection, query: &str) -> Result<Vec<Song>> {
    let pattern = like_pattern(query);
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SONG_COLUMNS} FROM songs
             WHERE title LIKE ?1 ESCAPE '\\' OR author LIKE ?1 ESCAPE '\\'
             ORDER BY title COLLATE NOCASE, id"
        ))
        .context("failed to prepare song search")?;

    let songs = stmt
        .query_map([pattern], song_from_row)
        .context("failed to iterate song search")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect song search")?;

    Ok(songs)
}

/// Insert a new song and echo the hydrated struct back.
pub fn create_song(
    conn: &Connection,
    title: &str,
    author: &str,
    category: &str,
    template_id: Option<i64>,
) -> Result<Song> {
    conn.execute(
        "INSERT INTO songs (title, author, category, template_id) VALUES (?1, ?2, ?3, ?4)",
        params![title, author, category, template_id],
    )
    .context("failed to insert song")?;

    let id = conn.last_insert_rowid();
    Ok(Song {
        id,
        title: title.to_string(),
        author: author.to_string(),
        category: category.to_string(),
        template_id,
    })
}

/// Update all editable song fields, failing when nothing was touched.
pub fn update_song(
    conn: &Connection,
    id: i64,
    title: &str,
    author: &str,
    category: &str,
    template_id: Option<i64>,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE songs SET title = ?1, author = ?2, category = ?3, template_id = ?4 WHERE id = ?5",
            params![title, author, category, template_id, id],
        )
        .context("failed to update song")?;

    if updated == 0 {
        Err(anyhow!("Song not found"))
    } else {
        Ok(())
    }
}

/// Permanently delete a song. Its verse rows cascade.
pub fn delete_song(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM songs WHERE id = ?1", params![id])
        .context("failed to delete song")?;

    if deleted == 0 {
        Err(anyhow!("Song not found"))
    } else {
        Ok(())
    }
}

/// Wrap `query` in `%` wildcards with `\` escaping so `%` and `_` typed by
/// the operator are matched literally.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::memory_database;
    use crate::db::verses::{add_segment, fetch_segments};

    #[test]
    fn create_fetch_update_delete() {
        let conn = memory_database();
        let song = create_song(&conn, "Be Thou My Vision", "", "Hymn", None).unwrap();
        assert_eq!(song.display_title(), "Be Thou My Vision");

        update_song(&conn, song.id, "Be Thou My Vision", "Traditional", "Hymn", None).unwrap();
        let stored = fetch_song(&conn, song.id).unwrap().unwrap();
        assert_eq!(stored.display_title(), "Be Thou My Vision - Traditional");

        delete_song(&conn, song.id).unwrap();
        assert!(fetch_song(&conn, song.id).unwrap().is_none());
        assert!(delete_song(&conn, song.id).is_err());
        assert!(update_song(&conn, song.id, "x", "", "", None).is_err());
    }

    #[test]
    fn deleting_a_song_removes_its_segments() {
        let conn = memory_database();
        let song = create_song(&conn, "Doxology", "", "Hymn", None).unwrap();
        add_segment(&conn, song.id, 1, "verse", "Praise God").unwrap();
        delete_song(&conn, song.id).unwrap();
        assert!(fetch_segments(&conn, song.id).unwrap().is_empty());
    }

    #[test]
    fn search_matches_title_or_author_case_insensitively() {
        let conn = memory_database();
        create_song(&conn, "Amazing Grace", "John Newton", "Hymn", None).unwrap();
        create_song(&conn, "Oceans", "Hillsong United", "Worship", None).unwrap();

        let by_title = search_songs(&conn, "amazing").unwrap();
        assert_eq!(by_title.len(), 1);
        let by_author = search_songs(&conn, "HILLSONG").unwrap();
        assert_eq!(by_author[0].title, "Oceans");
        assert!(search_songs(&conn, "100%").unwrap().is_empty());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b%"), "%a\\_b\\%%");
        assert_eq!(like_pattern(""), "%%");
    }
}
