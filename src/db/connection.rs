use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Gradient used when a template row is inserted without an explicit
/// background.
pub const DEFAULT_GRADIENT: &str =
    "linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f3460 100%)";
/// Overlay drawn over image and video backgrounds unless a template overrides
/// it.
pub const DEFAULT_OVERLAY: &str = "rgba(0,0,0,0.3)";
/// Shadow applied to presented text unless a template overrides it.
pub const DEFAULT_TEXT_SHADOW: &str = "2px 2px 8px rgba(0,0,0,0.8)";

/// Gradient presets offered when creating a template. The first six are also
/// seeded as templates into an empty database.
pub const GRADIENT_PRESETS: &[(&str, &str)] = &[
    ("Heavenly Purple", "linear-gradient(135deg, #667eea 0%, #764ba2 100%)"),
    ("Ocean Blue", "linear-gradient(135deg, #1e3c72 0%, #2a5298 100%)"),
    ("Sunset Gold", "linear-gradient(135deg, #f093fb 0%, #f5576c 100%)"),
    ("Forest Green", "linear-gradient(135deg, #134e5e 0%, #71b280 100%)"),
    ("Royal Purple", "linear-gradient(135deg, #4a0e4e 0%, #81689d 100%)"),
    ("Night Sky", "linear-gradient(135deg, #0c0c0c 0%, #1a1a2e 50%, #16213e 100%)"),
    ("Deep Ocean", "linear-gradient(135deg, #000428 0%, #004e92 100%)"),
    ("Warm Sunset", "linear-gradient(135deg, #ff512f 0%, #f09819 100%)"),
];

/// Number of presets seeded as templates on first start.
const SEEDED_PRESETS: usize = 6;

/// Sample songs seeded into an empty database: title, author, category,
/// template position and `(kind, content)` segments.
const SAMPLE_SONGS: &[(&str, &str, &str, i64, &[(&str, &str)])] = &[
    (
        "How Great Is Our God",
        "Chris Tomlin",
        "Worship",
        1,
        &[
            ("verse", "The splendor of the King\nClothed in majesty\nLet all the earth rejoice\nAll the earth rejoice"),
            ("verse", "He wraps Himself in light\nAnd darkness tries to hide\nAnd trembles at His voice\nAnd trembles at His voice"),
            ("chorus", "How great is our God\nSing with me\nHow great is our God\nAnd all will see\nHow great, how great is our God"),
            ("verse", "Age to age He stands\nAnd time is in His hands\nBeginning and the End\nBeginning and the End"),
        ],
    ),
    (
        "Amazing Grace",
        "John Newton",
        "Hymn",
        2,
        &[
            ("verse", "Amazing grace how sweet the sound\nThat saved a wretch like me\nI once was lost but now am found\nWas blind but now I see"),
            ("verse", "Twas grace that taught my heart to fear\nAnd grace my fears relieved\nHow precious did that grace appear\nThe hour I first believed"),
            ("verse", "Through many dangers toils and snares\nI have already come\nTis grace hath brought me safe thus far\nAnd grace will lead me home"),
        ],
    ),
    (
        "10,000 Reasons",
        "Matt Redman",
        "Worship",
        3,
        &[
            ("chorus", "Bless the Lord O my soul\nO my soul\nWorship His holy name\nSing like never before\nO my soul\nI worship Your holy name"),
            ("verse", "The sun comes up\nIts a new day dawning\nIts time to sing\nYour song again"),
            ("verse", "Whatever may pass\nAnd whatever lies before me\nLet me be singing\nWhen the evening comes"),
        ],
    ),
];

/// Open (creating if needed) the presenter database at `path` and make sure
/// the schema and seed data exist.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    ensure_schema(&conn)?;
    seed_defaults(&conn)?;
    Ok(conn)
}

/// Run lazy migrations. `PRAGMA foreign_keys = ON` makes segment rows follow
/// their song on delete the same way in tests and production.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                background_type TEXT DEFAULT 'gradient',
                background_value TEXT DEFAULT '{DEFAULT_GRADIENT}',
                background_overlay TEXT DEFAULT '{DEFAULT_OVERLAY}',
                font_family TEXT DEFAULT 'Inter',
                font_size INTEGER DEFAULT 72,
                font_color TEXT DEFAULT '#ffffff',
                text_align TEXT DEFAULT 'center',
                text_shadow TEXT DEFAULT '{DEFAULT_TEXT_SHADOW}',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )"
        ),
        [],
    )
    .context("failed to create templates table")?;

    if !has_column(conn, "templates", "background_overlay")? {
        conn.execute(
            &format!(
                "ALTER TABLE templates ADD COLUMN background_overlay TEXT DEFAULT '{DEFAULT_OVERLAY}'"
            ),
            [],
        )
        .context("failed to add background_overlay column")?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT,
            category TEXT DEFAULT 'Worship',
            template_id INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE SET NULL
        )",
        [],
    )
    .context("failed to create songs table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS verses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL,
            verse_number INTEGER NOT NULL,
            verse_type TEXT DEFAULT 'verse',
            content TEXT NOT NULL,
            FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create verses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            file_path TEXT NOT NULL,
            thumbnail_path TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("failed to create media table")?;

    Ok(())
}

/// Insert the preset templates and sample songs when their tables are empty.
pub fn seed_defaults(conn: &Connection) -> Result<()> {
    let template_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))
        .context("failed to count templates")?;

    if template_count == 0 {
        let mut insert = conn
            .prepare(
                "INSERT INTO templates
                    (name, background_type, background_value, background_overlay,
                     font_family, font_size, font_color)
                 VALUES (?1, 'gradient', ?2, 'rgba(0,0,0,0)', 'Inter', 72, '#ffffff')",
            )
            .context("failed to prepare template seed")?;
        for (name, gradient) in GRADIENT_PRESETS.iter().take(SEEDED_PRESETS) {
            insert
                .execute(params![name, gradient])
                .context("failed to seed template")?;
        }
        tracing::info!(count = SEEDED_PRESETS, "seeded default templates");
    }

    let song_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
        .context("failed to count songs")?;

    if song_count == 0 {
        for (title, author, category, template_id, segments) in SAMPLE_SONGS {
            conn.execute(
                "INSERT INTO songs (title, author, category, template_id) VALUES (?1, ?2, ?3, ?4)",
                params![title, author, category, template_id],
            )
            .context("failed to seed song")?;
            let song_id = conn.last_insert_rowid();
            for (index, (kind, content)) in segments.iter().enumerate() {
                conn.execute(
                    "INSERT INTO verses (song_id, verse_number, verse_type, content)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![song_id, index as i64 + 1, kind, content],
                )
                .context("failed to seed song verse")?;
            }
        }
        tracing::info!(count = SAMPLE_SONGS.len(), "seeded sample songs");
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .context("failed to inspect table columns")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .context("failed to list table columns")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect table columns")?;
    Ok(names.iter().any(|name| name.eq_ignore_ascii_case(column)))
}

/// In-memory database with the full schema, used by unit tests across the
/// crate. Seeding is left to the caller.
#[cfg(test)]
pub(crate) fn memory_database() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    ensure_schema(&conn).expect("schema");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_runs_once() {
        let conn = memory_database();
        seed_defaults(&conn).unwrap();
        seed_defaults(&conn).unwrap();

        let templates: i64 = conn
            .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))
            .unwrap();
        let songs: i64 = conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(templates, SEEDED_PRESETS as i64);
        assert_eq!(songs, SAMPLE_SONGS.len() as i64);
    }

    #[test]
    fn schema_migration_is_repeatable() {
        let conn = memory_database();
        ensure_schema(&conn).unwrap();
        assert!(has_column(&conn, "templates", "background_overlay").unwrap());
    }

    #[test]
    fn open_database_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("presenter.sqlite");
        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM verses", [], |row| row.get(0))
            .unwrap();
        assert!(count > 0);
        assert!(path.exists());
    }
}
