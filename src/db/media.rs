use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};

use crate::models::{MediaKind, MediaRecord};

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<Option<MediaRecord>> {
    let kind: String = row.get(2)?;
    let Some(kind) = MediaKind::parse(&kind) else {
        return Ok(None);
    };
    Ok(Some(MediaRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        file_path: row.get(3)?,
        thumbnail_path: row.get(4)?,
    }))
}

/// Media library entries, newest first, optionally restricted to one kind.
/// Rows with an unrecognised type are skipped.
pub fn fetch_media(conn: &Connection, kind: Option<MediaKind>) -> Result<Vec<MediaRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, type, file_path, thumbnail_path
             FROM media
             WHERE ?1 IS NULL OR type = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .context("failed to prepare media query")?;

    let media = stmt
        .query_map([kind.map(MediaKind::as_str)], media_from_row)
        .context("failed to iterate media")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect media")?;

    Ok(media.into_iter().flatten().collect())
}

pub fn add_media(
    conn: &Connection,
    name: &str,
    kind: MediaKind,
    file_path: &str,
    thumbnail_path: Option<&str>,
) -> Result<MediaRecord> {
    conn.execute(
        "INSERT INTO media (name, type, file_path, thumbnail_path) VALUES (?1, ?2, ?3, ?4)",
        params![name, kind.as_str(), file_path, thumbnail_path],
    )
    .context("failed to insert media")?;

    Ok(MediaRecord {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        kind,
        file_path: file_path.to_string(),
        thumbnail_path: thumbnail_path.map(str::to_string),
    })
}

pub fn delete_media(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM media WHERE id = ?1", params![id])
        .context("failed to delete media")?;

    if deleted == 0 {
        Err(anyhow!("Media not found"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::memory_database;

    #[test]
    fn media_filter_and_ordering() {
        let conn = memory_database();
        let first = add_media(&conn, "dawn", MediaKind::Image, "/m/dawn.png", Some("/m/dawn.png"))
            .unwrap();
        let second = add_media(&conn, "waves", MediaKind::Video, "/m/waves.mp4", None).unwrap();

        let all = fetch_media(&conn, None).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let images = fetch_media(&conn, Some(MediaKind::Image)).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "dawn");

        delete_media(&conn, first.id).unwrap();
        assert!(delete_media(&conn, first.id).is_err());
    }
}
