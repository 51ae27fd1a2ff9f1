use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::db::songs::create_song;
use crate::models::{Song, SongSegment};

/// All segments of a song in presentation order.
pub fn fetch_segments(conn: &Connection, song_id: i64) -> Result<Vec<SongSegment>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, song_id, verse_number, COALESCE(verse_type, 'verse'), content
             FROM verses
             WHERE song_id = ?1
             ORDER BY verse_number, id",
        )
        .context("failed to prepare song verses query")?;

    let segments = stmt
        .query_map([song_id], |row| {
            Ok(SongSegment {
                id: row.get(0)?,
                song_id: row.get(1)?,
                number: row.get(2)?,
                kind: row.get(3)?,
                content: row.get(4)?,
            })
        })
        .context("failed to iterate song verses")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect song verses")?;

    Ok(segments)
}

pub fn add_segment(
    conn: &Connection,
    song_id: i64,
    number: i64,
    kind: &str,
    content: &str,
) -> Result<SongSegment> {
    conn.execute(
        "INSERT INTO verses (song_id, verse_number, verse_type, content) VALUES (?1, ?2, ?3, ?4)",
        params![song_id, number, kind, content],
    )
    .context("failed to insert song verse")?;

    Ok(SongSegment {
        id: conn.last_insert_rowid(),
        song_id,
        number,
        kind: kind.to_string(),
        content: content.to_string(),
    })
}

pub fn update_segment(
    conn: &Connection,
    id: i64,
    number: i64,
    kind: &str,
    content: &str,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE verses SET verse_number = ?1, verse_type = ?2, content = ?3 WHERE id = ?4",
            params![number, kind, content, id],
        )
        .context("failed to update song verse")?;

    if updated == 0 {
        Err(anyhow!("Verse not found"))
    } else {
        Ok(())
    }
}

pub fn delete_segment(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM verses WHERE id = ?1", params![id])
        .context("failed to delete song verse")?;

    if deleted == 0 {
        Err(anyhow!("Verse not found"))
    } else {
        Ok(())
    }
}

/// Split pasted lyrics into segments on blank lines. Blank-only blocks are
/// dropped and each block is trimmed.
pub fn split_lyrics(lyrics: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lyrics.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
        .into_iter()
        .map(|block| block.trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Create a song and one `verse` segment per lyric block inside a single
/// transaction, numbering segments from 1.
pub fn create_song_with_lyrics(
    conn: &Connection,
    title: &str,
    author: &str,
    category: &str,
    template_id: Option<i64>,
    lyrics: &str,
) -> Result<Song> {
    let blocks = split_lyrics(lyrics);
    if blocks.is_empty() {
        return Err(anyhow!("Lyrics are required."));
    }

    let tx = conn
        .unchecked_transaction()
        .context("failed to start song transaction")?;
    let song = create_song(&tx, title, author, category, template_id)?;
    for (index, block) in blocks.iter().enumerate() {
        add_segment(&tx, song.id, index as i64 + 1, "verse", block)?;
    }
    tx.commit().context("failed to commit song")?;

    Ok(song)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::memory_database;

    #[test]
    fn lyrics_split_on_blank_lines() {
        let lyrics = "Line one\nLine two\n\n\n  \nLine three\n\n";
        assert_eq!(
            split_lyrics(lyrics),
            vec!["Line one\nLine two".to_string(), "Line three".to_string()]
        );
        assert!(split_lyrics("\n \n").is_empty());
    }

    #[test]
    fn song_with_lyrics_gets_numbered_segments() {
        let conn = memory_database();
        let song = create_song_with_lyrics(
            &conn,
            "Holy Holy Holy",
            "Reginald Heber",
            "Hymn",
            None,
            "Holy, holy, holy\n\nHoly, holy, holy!\nAll the saints adore Thee",
        )
        .unwrap();

        let segments = fetch_segments(&conn, song.id).unwrap();
        let numbers: Vec<i64> = segments.iter().map(|segment| segment.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(segments[1].content, "Holy, holy, holy!\nAll the saints adore Thee");
    }

    #[test]
    fn empty_lyrics_are_rejected_without_creating_a_song() {
        let conn = memory_database();
        assert!(create_song_with_lyrics(&conn, "Empty", "", "", None, "  ").is_err());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn segment_updates_and_deletes_report_missing_rows() {
        let conn = memory_database();
        let song = create_song(&conn, "Test", "", "", None).unwrap();
        let segment = add_segment(&conn, song.id, 1, "chorus", "La la").unwrap();
        assert_eq!(segment.badge(), "C");

        update_segment(&conn, segment.id, 2, "verse", "Lo lo").unwrap();
        let stored = fetch_segments(&conn, song.id).unwrap();
        assert_eq!(stored[0].number, 2);
        assert_eq!(stored[0].content, "Lo lo");

        delete_segment(&conn, segment.id).unwrap();
        assert!(delete_segment(&conn, segment.id).is_err());
        assert!(update_segment(&conn, segment.id, 1, "verse", "").is_err());
    }
}
