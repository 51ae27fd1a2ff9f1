use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::connection::{DEFAULT_GRADIENT, DEFAULT_OVERLAY, DEFAULT_TEXT_SHADOW};
use crate::models::{BackgroundKind, Template};

const TEMPLATE_COLUMNS: &str = "id, name, background_type, background_value, background_overlay,
     font_family, font_size, font_color, text_align, text_shadow";

/// Editable template fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    pub name: String,
    pub background_kind: BackgroundKind,
    pub background_value: String,
    pub background_overlay: String,
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub text_align: String,
    pub text_shadow: String,
}

impl TemplateDraft {
    /// Draft with the same defaults the schema applies to missing columns.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            background_kind: BackgroundKind::Gradient,
            background_value: DEFAULT_GRADIENT.to_string(),
            background_overlay: DEFAULT_OVERLAY.to_string(),
            font_family: "Inter".to_string(),
            font_size: 72,
            font_color: "#ffffff".to_string(),
            text_align: "center".to_string(),
            text_shadow: DEFAULT_TEXT_SHADOW.to_string(),
        }
    }

    fn into_template(self, id: i64) -> Template {
        Template {
            id,
            name: self.name,
            background_kind: self.background_kind,
            background_value: self.background_value,
            background_overlay: self.background_overlay,
            font_family: self.font_family,
            font_size: self.font_size,
            font_color: self.font_color,
            text_align: self.text_align,
            text_shadow: self.text_shadow,
        }
    }

    /// Blank overlays fall back to the schema default.
    fn overlay(&self) -> &str {
        if self.background_overlay.trim().is_empty() {
            DEFAULT_OVERLAY
        } else {
            &self.background_overlay
        }
    }
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    let kind: Option<String> = row.get(2)?;
    let font_size: Option<i64> = row.get(6)?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        background_kind: BackgroundKind::parse(kind.as_deref().unwrap_or("gradient")),
        background_value: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| DEFAULT_GRADIENT.to_string()),
        background_overlay: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| DEFAULT_OVERLAY.to_string()),
        font_family: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| "Inter".to_string()),
        font_size: font_size
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(72),
        font_color: row
            .get::<_, Option<String>>(7)?
            .unwrap_or_else(|| "#ffffff".to_string()),
        text_align: row
            .get::<_, Option<String>>(8)?
            .unwrap_or_else(|| "center".to_string()),
        text_shadow: row
            .get::<_, Option<String>>(9)?
            .unwrap_or_else(|| DEFAULT_TEXT_SHADOW.to_string()),
    })
}

/// All templates ordered by name.
pub fn fetch_templates(conn: &Connection) -> Result<Vec<Template>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY name COLLATE NOCASE, id"
        ))
        .context("failed to prepare template query")?;

    let templates = stmt
        .query_map([], template_from_row)
        .context("failed to iterate templates")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect templates")?;

    Ok(templates)
}

pub fn fetch_template(conn: &Connection, id: i64) -> Result<Option<Template>> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"),
        [id],
        template_from_row,
    )
    .optional()
    .context("failed to load template")
}

pub fn create_template(conn: &Connection, draft: TemplateDraft) -> Result<Template> {
    if draft.name.trim().is_empty() {
        return Err(anyhow!("Template name is required."));
    }

    conn.execute(
        "INSERT INTO templates
            (name, background_type, background_value, background_overlay,
             font_family, font_size, font_color, text_align, text_shadow)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            draft.name,
            draft.background_kind.as_str(),
            draft.background_value,
            draft.overlay(),
            draft.font_family,
            draft.font_size,
            draft.font_color,
            draft.text_align,
            draft.text_shadow,
        ],
    )
    .context("failed to insert template")?;

    let id = conn.last_insert_rowid();
    let overlay = draft.overlay().to_string();
    let mut template = draft.into_template(id);
    template.background_overlay = overlay;
    Ok(template)
}

pub fn update_template(conn: &Connection, id: i64, draft: TemplateDraft) -> Result<Template> {
    let updated = conn
        .execute(
            "UPDATE templates SET name = ?1, background_type = ?2, background_value = ?3,
                background_overlay = ?4, font_family = ?5, font_size = ?6, font_color = ?7,
                text_align = ?8, text_shadow = ?9
             WHERE id = ?10",
            params![
                draft.name,
                draft.background_kind.as_str(),
                draft.background_value,
                draft.overlay(),
                draft.font_family,
                draft.font_size,
                draft.font_color,
                draft.text_align,
                draft.text_shadow,
                id,
            ],
        )
        .context("failed to update template")?;

    if updated == 0 {
        return Err(anyhow!("Template not found"));
    }

    let overlay = draft.overlay().to_string();
    let mut template = draft.into_template(id);
    template.background_overlay = overlay;
    Ok(template)
}

/// Delete a template. Songs that referenced it fall back to no template.
pub fn delete_template(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM templates WHERE id = ?1", params![id])
        .context("failed to delete template")?;

    if deleted == 0 {
        Err(anyhow!("Template not found"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{memory_database, seed_defaults};
    use crate::db::songs::{create_song, fetch_song};

    #[test]
    fn seeded_templates_are_sorted_by_name() {
        let conn = memory_database();
        seed_defaults(&conn).unwrap();
        let names: Vec<String> = fetch_templates(&conn)
            .unwrap()
            .into_iter()
            .map(|template| template.name)
            .collect();
        let mut sorted = names.clone();
        sorted.sort_by_key(|name| name.to_lowercase());
        assert_eq!(names, sorted);
        assert!(names.contains(&"Night Sky".to_string()));
    }

    #[test]
    fn blank_overlay_uses_default() {
        let conn = memory_database();
        let mut draft = TemplateDraft::named("Photo");
        draft.background_kind = BackgroundKind::Image;
        draft.background_value = "/media/photo.png".to_string();
        draft.background_overlay = "  ".to_string();

        let created = create_template(&conn, draft).unwrap();
        assert_eq!(created.background_overlay, DEFAULT_OVERLAY);

        let stored = fetch_template(&conn, created.id).unwrap().unwrap();
        assert_eq!(stored.background_kind, BackgroundKind::Image);
        assert_eq!(stored.background_overlay, DEFAULT_OVERLAY);
    }

    #[test]
    fn nameless_template_is_rejected() {
        let conn = memory_database();
        assert!(create_template(&conn, TemplateDraft::named(" ")).is_err());
    }

    #[test]
    fn deleting_a_template_detaches_songs() {
        let conn = memory_database();
        let template = create_template(&conn, TemplateDraft::named("Plain")).unwrap();
        let song = create_song(&conn, "Song", "", "", Some(template.id)).unwrap();

        delete_template(&conn, template.id).unwrap();
        assert!(fetch_template(&conn, template.id).unwrap().is_none());
        assert_eq!(fetch_song(&conn, song.id).unwrap().unwrap().template_id, None);
        assert!(update_template(&conn, template.id, TemplateDraft::named("x")).is_err());
    }
}
