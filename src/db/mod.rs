//! Persistence module split across logical submodules. This is the storage
//! collaborator: schema creation, seeding and CRUD for songs, verse-segments,
//! templates and media records. Content resolvers only consume its reads.

mod connection;
mod media;
mod songs;
mod templates;
mod verses;

pub use connection::{
    ensure_schema, open_database, seed_defaults, DEFAULT_OVERLAY, GRADIENT_PRESETS,
};
pub use media::{add_media, delete_media, fetch_media};
pub use songs::{create_song, delete_song, fetch_all_songs, fetch_song, search_songs, update_song};
pub use templates::{
    create_template, delete_template, fetch_template, fetch_templates, update_template,
    TemplateDraft,
};
pub use verses::{
    add_segment, create_song_with_lyrics, delete_segment, fetch_segments, split_lyrics,
    update_segment,
};

pub(crate) use songs::like_pattern;

#[cfg(test)]
pub(crate) use connection::memory_database;
