use std::path::Path;
use std::sync::Arc;

use crate::assets::{EmbeddedAsset, MediaEmbedder, MediaError};
use crate::models::{BackgroundKind, Template};

/// Exactly one background mode per snapshot. Image and video variants carry
/// already-embedded data so the output surface never touches the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Gradient(String),
    Image {
        asset: EmbeddedAsset,
        overlay: String,
    },
    Video {
        asset: EmbeddedAsset,
        overlay: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => TextAlign::Left,
            "right" | "end" => TextAlign::Right,
            _ => TextAlign::Center,
        }
    }
}

/// Immutable styling bundle applied to presented text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSnapshot {
    pub template_id: i64,
    pub name: String,
    pub background: Background,
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub text_align: TextAlign,
    pub text_shadow: String,
}

impl TemplateSnapshot {
    /// Build a snapshot from a stored template, embedding image and video
    /// backgrounds through `embedder`. Fails when the background file cannot
    /// be materialized.
    pub fn resolve(
        template: &Template,
        embedder: &dyn MediaEmbedder,
    ) -> Result<Arc<Self>, MediaError> {
        let background = match template.background_kind {
            BackgroundKind::Gradient => Background::Gradient(template.background_value.clone()),
            BackgroundKind::Image => Background::Image {
                asset: embedder.embed(Path::new(&template.background_value))?,
                overlay: template.background_overlay.clone(),
            },
            BackgroundKind::Video => Background::Video {
                asset: embedder.embed(Path::new(&template.background_value))?,
                overlay: template.background_overlay.clone(),
            },
        };

        Ok(Arc::new(Self {
            template_id: template.id,
            name: template.name.clone(),
            background,
            font_family: template.font_family.clone(),
            font_size: template.font_size,
            font_color: template.font_color.clone(),
            text_align: TextAlign::parse(&template.text_align),
            text_shadow: template.text_shadow.clone(),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Present,
    Clear,
    Blackout,
}

/// The unit sent over the channel. Fields are private so a payload cannot be
/// altered after construction; snapshots are shared through `Arc` because an
/// embedded background can be large.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationPayload {
    kind: PayloadKind,
    text: Option<String>,
    template: Option<Arc<TemplateSnapshot>>,
}

impl PresentationPayload {
    pub fn present(text: impl Into<String>, template: Option<Arc<TemplateSnapshot>>) -> Self {
        Self {
            kind: PayloadKind::Present,
            text: Some(text.into()),
            template,
        }
    }

    pub fn clear() -> Self {
        Self {
            kind: PayloadKind::Clear,
            text: None,
            template: None,
        }
    }

    pub fn blackout() -> Self {
        Self {
            kind: PayloadKind::Blackout,
            text: None,
            template: None,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn template(&self) -> Option<&Arc<TemplateSnapshot>> {
        self.template.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FakeEmbedder;

    impl MediaEmbedder for FakeEmbedder {
        fn embed(&self, path: &Path) -> Result<EmbeddedAsset, MediaError> {
            if path.ends_with("missing.png") {
                return Err(MediaError::Missing(PathBuf::from(path)));
            }
            Ok(EmbeddedAsset {
                mime: "image/png".to_string(),
                data_url: "data:image/png;base64,AA==".to_string(),
            })
        }
    }

    fn template(kind: BackgroundKind, value: &str) -> Template {
        Template {
            id: 3,
            name: "Sample".to_string(),
            background_kind: kind,
            background_value: value.to_string(),
            background_overlay: "rgba(0,0,0,0.5)".to_string(),
            font_family: "Inter".to_string(),
            font_size: 64,
            font_color: "#ffeeaa".to_string(),
            text_align: "LEFT".to_string(),
            text_shadow: String::new(),
        }
    }

    #[test]
    fn gradient_snapshot_keeps_value() {
        let snapshot = TemplateSnapshot::resolve(
            &template(BackgroundKind::Gradient, "linear-gradient(#000, #fff)"),
            &FakeEmbedder,
        )
        .unwrap();
        assert_eq!(
            snapshot.background,
            Background::Gradient("linear-gradient(#000, #fff)".to_string())
        );
        assert_eq!(snapshot.text_align, TextAlign::Left);
    }

    #[test]
    fn image_snapshot_is_embedded_with_overlay() {
        let snapshot =
            TemplateSnapshot::resolve(&template(BackgroundKind::Image, "/m/a.png"), &FakeEmbedder)
                .unwrap();
        match &snapshot.background {
            Background::Image { asset, overlay } => {
                assert!(asset.data_url.starts_with("data:image/png"));
                assert_eq!(overlay, "rgba(0,0,0,0.5)");
            }
            other => panic!("unexpected background {other:?}"),
        }
    }

    #[test]
    fn unresolvable_media_fails_snapshot() {
        let result = TemplateSnapshot::resolve(
            &template(BackgroundKind::Video, "/m/missing.png"),
            &FakeEmbedder,
        );
        assert!(result.is_err());
    }

    #[test]
    fn clear_and_blackout_carry_no_text() {
        assert_eq!(PresentationPayload::clear().text(), None);
        assert_eq!(PresentationPayload::blackout().kind(), PayloadKind::Blackout);
        let present = PresentationPayload::present("Hi", None);
        assert_eq!(present.text(), Some("Hi"));
        assert!(present.template().is_none());
    }
}
