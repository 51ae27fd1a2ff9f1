//! Domain models shared by the storage layer, the content resolvers and the
//! control surface. Storage rows (`Song`, `SongSegment`, `Template`,
//! `MediaRecord`) mirror the SQLite tables one-to-one; the normalized types
//! (`ContentCollection`, `NormalizedVerse`) are what every resolver hands back
//! regardless of how the underlying store names its tables and columns.

use std::fmt;

/// Highest canonical book position that still belongs to the Old Testament.
const LAST_OLD_TESTAMENT_POSITION: i64 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// What a collection holds: lyrics of one song or one book of scripture.
pub enum CollectionKind {
    Song,
    ScriptureBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Testament {
    Old,
    New,
}

impl Testament {
    /// Classify a scripture book by its canonical position. Positions up to 39
    /// are Old Testament, everything after is New Testament.
    pub fn from_position(position: i64) -> Self {
        if position <= LAST_OLD_TESTAMENT_POSITION {
            Testament::Old
        } else {
            Testament::New
        }
    }

    /// Short label shown in filters and list headers.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Testament::Old => "OT",
            Testament::New => "NT",
        }
    }
}

/// Primary name plus an optional alternate (e.g. the English name of a book
/// whose stored title is in another language).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNames {
    pub primary: String,
    pub secondary: Option<String>,
}

impl DisplayNames {
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A song or a scripture book: the top-level unit the operator picks from.
pub struct ContentCollection {
    pub id: i64,
    pub names: DisplayNames,
    pub kind: CollectionKind,
    /// Ordering key. For scripture this is the canonical book number.
    pub position: i64,
}

impl ContentCollection {
    /// Testament is derived from `position` every time; it is never stored.
    pub fn testament(&self) -> Option<Testament> {
        match self.kind {
            CollectionKind::ScriptureBook => Some(Testament::from_position(self.position)),
            CollectionKind::Song => None,
        }
    }
}

impl fmt::Display for ContentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.names.secondary {
            Some(secondary) if secondary != &self.names.primary => {
                write!(f, "{} ({})", self.names.primary, secondary)
            }
            _ => write!(f, "{}", self.names.primary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One presentable unit of text. `section` is the chapter for scripture and
/// the verse-segment number for songs.
pub struct NormalizedVerse {
    pub collection_id: i64,
    pub section: i64,
    pub verse_number: i64,
    pub text: String,
}

impl NormalizedVerse {
    /// `Book 3:16` style reference for scripture verses.
    pub fn reference(&self, book_name: &str) -> String {
        format!("{} {}:{}", book_name, self.section, self.verse_number)
    }
}

#[derive(Debug, Clone)]
/// Row from the `songs` table.
pub struct Song {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    /// Template applied automatically when the song is opened.
    pub template_id: Option<i64>,
}

impl Song {
    /// `Title - Author`, dropping the hyphen when no author is recorded.
    pub fn display_title(&self) -> String {
        if self.author.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.author)
        }
    }
}

#[derive(Debug, Clone)]
/// Row from the `verses` table: one verse, chorus or bridge of a song.
pub struct SongSegment {
    pub id: i64,
    pub song_id: i64,
    pub number: i64,
    pub kind: String,
    pub content: String,
}

impl SongSegment {
    /// One-letter badge used in the verse list (`V`, `C`, `B`, `I`, `O`).
    pub fn badge(&self) -> &'static str {
        match self.kind.as_str() {
            "chorus" => "C",
            "bridge" => "B",
            "intro" => "I",
            "outro" => "O",
            _ => "V",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKind {
    Gradient,
    Image,
    Video,
}

impl BackgroundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundKind::Gradient => "gradient",
            BackgroundKind::Image => "image",
            BackgroundKind::Video => "video",
        }
    }

    /// Unknown values fall back to a gradient, matching the column default.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image" => BackgroundKind::Image,
            "video" => BackgroundKind::Video,
            _ => BackgroundKind::Gradient,
        }
    }
}

#[derive(Debug, Clone)]
/// Row from the `templates` table. Image and video templates store a file
/// path in `background_value`; it is only turned into embeddable data when a
/// snapshot is built for presentation.
pub struct Template {
    pub id: i64,
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

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.background_kind.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Row from the `media` table describing an imported background file.
pub struct MediaRecord {
    pub id: i64,
    pub name: String,
    pub kind: MediaKind,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
}
