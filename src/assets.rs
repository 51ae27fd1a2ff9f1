//! Media collaborator: turns background files into embeddable data so a
//! template snapshot carries everything the output surface needs, and copies
//! imported files into the media directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rusqlite::Connection;
use thiserror::Error;

use crate::db::add_media;
use crate::models::{MediaKind, MediaRecord};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media file {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to read media file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A fully materialized binary asset: a `data:` URL plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAsset {
    pub mime: String,
    pub data_url: String,
}

/// Anything that can turn a path into an embeddable asset.
pub trait MediaEmbedder {
    fn embed(&self, path: &Path) -> Result<EmbeddedAsset, MediaError>;
}

/// Reads files from disk and base64-encodes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileEmbedder;

impl MediaEmbedder for FileEmbedder {
    fn embed(&self, path: &Path) -> Result<EmbeddedAsset, MediaError> {
        if !path.exists() {
            return Err(MediaError::Missing(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| MediaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mime = mime_for(path).to_string();
        let data_url = format!("data:{mime};base64,{}", STANDARD.encode(bytes));
        tracing::debug!(path = %path.display(), bytes = data_url.len(), "embedded media");
        Ok(EmbeddedAsset { mime, data_url })
    }
}

/// MIME type from the file extension; unknown extensions are opaque bytes.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Guess whether a file is an image or a video from its MIME type.
pub fn media_kind_for(path: &Path) -> Option<MediaKind> {
    let mime = mime_for(path);
    if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else if mime.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Copy `source` into `media_dir` under a timestamped name and record it in
/// the media library.
pub fn import_media(
    conn: &Connection,
    media_dir: &Path,
    source: &Path,
    kind: MediaKind,
) -> Result<MediaRecord> {
    fs::create_dir_all(media_dir).context("failed to create media directory")?;

    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .context("media path has no file name")?;
    let prefix = match kind {
        MediaKind::Image => "img",
        MediaKind::Video => "vid",
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let dest = media_dir.join(format!("{prefix}_{millis}_{file_name}"));

    fs::copy(source, &dest)
        .with_context(|| format!("failed to copy {} into the media library", source.display()))?;

    let name = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let dest_str = dest.to_string_lossy();
    let thumbnail = match kind {
        MediaKind::Image => Some(dest_str.as_ref()),
        MediaKind::Video => None,
    };
    let record = add_media(conn, name, kind, &dest_str, thumbnail)?;
    tracing::info!(name = %record.name, kind = kind.as_str(), "imported media");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fetch_media, memory_database};

    #[test]
    fn embeds_file_as_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.PNG");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let asset = FileEmbedder.embed(&path).unwrap();
        assert_eq!(asset.mime, "image/png");
        assert_eq!(asset.data_url, "data:image/png;base64,AQID");
    }

    #[test]
    fn missing_file_is_a_typed_error() {
        let err = FileEmbedder
            .embed(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, MediaError::Missing(_)));
    }

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(media_kind_for(Path::new("a.webm")), Some(MediaKind::Video));
        assert_eq!(media_kind_for(Path::new("a.jpeg")), Some(MediaKind::Image));
        assert_eq!(media_kind_for(Path::new("a.txt")), None);
    }

    #[test]
    fn import_copies_and_records() {
        let conn = memory_database();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sunrise.jpg");
        fs::write(&source, b"jpeg").unwrap();
        let media_dir = dir.path().join("media");

        let record = import_media(&conn, &media_dir, &source, MediaKind::Image).unwrap();
        assert_eq!(record.name, "sunrise");
        assert!(Path::new(&record.file_path).exists());
        assert!(record.file_path.contains("img_"));
        assert_eq!(fetch_media(&conn, None).unwrap().len(), 1);
    }
}
