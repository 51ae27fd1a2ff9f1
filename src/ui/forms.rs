use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::db::{split_lyrics, GRADIENT_PRESETS};
use crate::models::{Song, Template};

/// Form state for creating a song from pasted lyrics.
#[derive(Default, Clone)]
pub(crate) struct SongForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) lyrics: String,
    pub(crate) active: SongField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum SongField {
    #[default]
    Title,
    Author,
    Lyrics,
}

impl SongForm {
    /// Cycle focus across the three song fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            SongField::Title => SongField::Author,
            SongField::Author => SongField::Lyrics,
            SongField::Lyrics => SongField::Title,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            SongField::Title => self.title.push(ch),
            SongField::Author => self.author.push(ch),
            SongField::Lyrics => self.lyrics.push(ch),
        }
        true
    }

    /// Enter starts a new lyric line; on the single-line fields it moves on.
    pub(crate) fn newline(&mut self) {
        match self.active {
            SongField::Lyrics => self.lyrics.push('\n'),
            _ => self.toggle_field(),
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            SongField::Title => {
                self.title.pop();
            }
            SongField::Author => {
                self.author.pop();
            }
            SongField::Lyrics => {
                self.lyrics.pop();
            }
        }
    }

    /// Title, author and lyrics, trimmed. Blank lines in the lyrics separate
    /// verses.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Song title is required."));
        }
        if split_lyrics(&self.lyrics).is_empty() {
            return Err(anyhow!("Lyrics are required."));
        }
        Ok((
            title.to_string(),
            self.author.trim().to_string(),
            self.lyrics.clone(),
        ))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: SongField) -> Line<'static> {
        let value = match field {
            SongField::Title => &self.title,
            SongField::Author => &self.author,
            SongField::Lyrics => &self.lyrics,
        };
        let placeholder = match field {
            SongField::Author => "<optional>",
            _ => "<required>",
        };
        field_line(field_name, value, placeholder, self.active == field)
    }

    /// The lyrics box, one line per lyric line.
    pub(crate) fn lyric_lines(&self) -> Vec<Line<'static>> {
        let style = if self.active == SongField::Lyrics {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        if self.lyrics.is_empty() {
            return vec![Line::from(Span::styled(
                "<paste or type lyrics, blank line between verses>",
                Style::default().fg(Color::DarkGray),
            ))];
        }
        self.lyrics
            .split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect()
    }

    pub(crate) fn value_len(&self, field: SongField) -> usize {
        match field {
            SongField::Title => self.title.chars().count(),
            SongField::Author => self.author.chars().count(),
            SongField::Lyrics => self
                .lyrics
                .rsplit('\n')
                .next()
                .map(|line| line.chars().count())
                .unwrap_or_default(),
        }
    }

    pub(crate) fn lyric_line_count(&self) -> usize {
        self.lyrics.split('\n').count()
    }
}

/// Background picked in the template form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateBackground {
    Gradient(&'static str),
    Media(PathBuf),
}

#[derive(Default, Clone)]
pub(crate) struct TemplateForm {
    pub(crate) name: String,
    /// Index into the gradient presets; one past the end means a media file.
    pub(crate) background: usize,
    pub(crate) media_path: String,
    pub(crate) active: TemplateField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum TemplateField {
    #[default]
    Name,
    Background,
    MediaPath,
}

impl TemplateForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            TemplateField::Name => TemplateField::Background,
            TemplateField::Background if self.uses_media() => TemplateField::MediaPath,
            TemplateField::Background | TemplateField::MediaPath => TemplateField::Name,
        };
    }

    /// Step through the presets and the media option.
    pub(crate) fn cycle_background(&mut self, offset: isize) {
        if self.active != TemplateField::Background {
            return;
        }
        let choices = GRADIENT_PRESETS.len() as isize + 1;
        self.background = (self.background as isize + offset).rem_euclid(choices) as usize;
    }

    pub(crate) fn uses_media(&self) -> bool {
        self.background >= GRADIENT_PRESETS.len()
    }

    pub(crate) fn background_label(&self) -> &'static str {
        GRADIENT_PRESETS
            .get(self.background)
            .map(|(name, _)| *name)
            .unwrap_or("Image or video file")
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            TemplateField::Name => self.name.push(ch),
            TemplateField::MediaPath => self.media_path.push(ch),
            TemplateField::Background => return false,
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            TemplateField::Name => {
                self.name.pop();
            }
            TemplateField::MediaPath => {
                self.media_path.pop();
            }
            TemplateField::Background => {}
        }
    }

    pub(crate) fn parse_inputs(&self) -> Result<(String, TemplateBackground)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Template name is required."));
        }
        let background = match GRADIENT_PRESETS.get(self.background) {
            Some((_, gradient)) => TemplateBackground::Gradient(gradient),
            None => {
                let path = self.media_path.trim();
                if path.is_empty() {
                    return Err(anyhow!("Choose an image or video file."));
                }
                TemplateBackground::Media(PathBuf::from(path))
            }
        };
        Ok((name.to_string(), background))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: TemplateField) -> Line<'static> {
        let is_active = self.active == field;
        match field {
            TemplateField::Name => field_line(field_name, &self.name, "<required>", is_active),
            TemplateField::Background => {
                let value = format!("< {} >", self.background_label());
                field_line(field_name, &value, "", is_active)
            }
            TemplateField::MediaPath => {
                if self.uses_media() {
                    field_line(field_name, &self.media_path, "<path to file>", is_active)
                } else {
                    Line::from(Span::styled(
                        format!("{field_name}: (not used by gradients)"),
                        Style::default().fg(Color::DarkGray),
                    ))
                }
            }
        }
    }

    pub(crate) fn value_len(&self, field: TemplateField) -> usize {
        match field {
            TemplateField::Name => self.name.chars().count(),
            TemplateField::Background => self.background_label().chars().count() + 4,
            TemplateField::MediaPath => self.media_path.chars().count(),
        }
    }
}

fn field_line(field_name: &str, value: &str, placeholder: &str, is_active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}

/// State for confirming permanent song deletion.
pub(crate) struct ConfirmSongDelete {
    pub(crate) song: Song,
}

pub(crate) struct ConfirmTemplateDelete {
    pub(crate) template: Template,
}
