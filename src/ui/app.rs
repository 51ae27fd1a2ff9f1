use std::mem;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::assets::{import_media, media_kind_for, FileEmbedder};
use crate::config::Config;
use crate::control::LiveController;
use crate::db::{
    create_song_with_lyrics, create_template, delete_song, delete_template, fetch_all_songs,
    fetch_template, fetch_templates, search_songs, TemplateDraft,
};
use crate::models::{BackgroundKind, MediaKind, NormalizedVerse, Template};
use crate::presentation::render_presentation;
use crate::resolver::{CollectionFilter, ContentResolver, ScriptureResolver, SongResolver};
use crate::transport::{Delivery, LifecycleEvent};
use crate::window::{DisplayHost, OpenOutcome};

use super::forms::{
    ConfirmSongDelete, ConfirmTemplateDelete, SongField, SongForm, TemplateBackground,
    TemplateField, TemplateForm,
};
use super::helpers::{centered_rect, first_line, surface_error};
use super::screens::{
    DeckOrigin, ScriptureLevel, ScriptureScreen, SongPane, SongScreen, TemplateScreen,
};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows under the preview used for output details.
const PREVIEW_INFO_HEIGHT: u16 = 4;
/// Category recorded for songs created from the lyrics form.
const DEFAULT_CATEGORY: &str = "General";

/// Top-level tabs of the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Songs,
    Scripture,
    Templates,
}

impl Screen {
    const ALL: [Screen; 3] = [Screen::Songs, Screen::Scripture, Screen::Templates];

    fn title(self) -> &'static str {
        match self {
            Screen::Songs => "Songs",
            Screen::Scripture => "Scripture",
            Screen::Templates => "Templates",
        }
    }

    fn next(self) -> Self {
        match self {
            Screen::Songs => Screen::Scripture,
            Screen::Scripture => Screen::Templates,
            Screen::Templates => Screen::Songs,
        }
    }

    fn previous(self) -> Self {
        match self {
            Screen::Songs => Screen::Templates,
            Screen::Scripture => Screen::Songs,
            Screen::Templates => Screen::Scripture,
        }
    }
}

/// Anything other than `Normal` owns the keyboard: text entry or a modal.
enum Mode {
    Normal,
    Searching(SearchState),
    AddingSong(SongForm),
    AddingTemplate(TemplateForm),
    ConfirmSongDelete(ConfirmSongDelete),
    ConfirmTemplateDelete(ConfirmTemplateDelete),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchTarget {
    Songs,
    Scripture,
}

struct SearchState {
    target: SearchTarget,
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Control surface state: the content being browsed, the live controller
/// driving the output surface, and the current input mode.
pub struct App<H: DisplayHost> {
    songs: SongResolver,
    scripture: ScriptureResolver,
    controller: LiveController<H>,
    media_dir: PathBuf,
    search_limit: usize,
    screen: Screen,
    song_screen: SongScreen,
    scripture_screen: ScriptureScreen,
    template_screen: TemplateScreen,
    deck_origin: Option<DeckOrigin>,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<H: DisplayHost> App<H> {
    pub fn new(
        songs: SongResolver,
        scripture: ScriptureResolver,
        controller: LiveController<H>,
        config: &Config,
    ) -> Result<Self> {
        let song_list = fetch_all_songs(songs.conn())?;
        let templates = fetch_templates(songs.conn())?;
        let books = scripture.list_collections(CollectionFilter::All)?;

        Ok(Self {
            songs,
            scripture,
            controller,
            media_dir: config.media_dir.clone(),
            search_limit: config.search_limit,
            screen: Screen::Songs,
            song_screen: SongScreen::new(song_list),
            scripture_screen: ScriptureScreen::new(books),
            template_screen: TemplateScreen::new(templates),
            deck_origin: None,
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Handle one key press. Returns `true` when the operator asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
            Mode::AddingSong(form) => self.handle_add_song(code, form)?,
            Mode::AddingTemplate(form) => self.handle_add_template(code, form)?,
            Mode::ConfirmSongDelete(confirm) => self.handle_confirm_song_delete(code, confirm)?,
            Mode::ConfirmTemplateDelete(confirm) => {
                self.handle_confirm_template_delete(code, confirm)?
            }
        };

        Ok(exit)
    }

    /// Save whichever form is open.
    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        let mode = mem::replace(&mut self.mode, Mode::Normal);
        self.mode = match mode {
            Mode::AddingSong(mut form) => match self.save_new_song(&form) {
                Ok(()) => Mode::Normal,
                Err(err) => {
                    form.error = Some(self.fail(&err));
                    Mode::AddingSong(form)
                }
            },
            Mode::AddingTemplate(mut form) => match self.save_new_template(&form) {
                Ok(()) => Mode::Normal,
                Err(err) => {
                    form.error = Some(self.fail(&err));
                    Mode::AddingTemplate(form)
                }
            },
            other => other,
        };
        Ok(())
    }

    /// Pick up lifecycle events from the output surface between key presses.
    pub fn tick(&mut self) {
        for event in self.controller.pump_events() {
            if let LifecycleEvent::Destroyed(id) = event {
                if !self.controller.is_output_open() {
                    self.set_status(format!("Output surface #{id} closed."), StatusKind::Info);
                }
            }
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Tab => self.switch_screen(self.screen.next()),
            KeyCode::BackTab => self.switch_screen(self.screen.previous()),
            KeyCode::Left => self.navigate(-1),
            KeyCode::Right => self.navigate(1),
            KeyCode::Char('g') => {
                let result = self.go_live();
                self.report(result);
            }
            KeyCode::Char('c') => {
                let delivery = self.controller.clear();
                self.report_delivery(delivery, "Output cleared.");
            }
            KeyCode::Char('b') => {
                let delivery = self.controller.blackout();
                self.report_delivery(delivery, "Output blacked out.");
            }
            KeyCode::Char('o') => {
                let result = self.open_output();
                self.report(result);
            }
            KeyCode::Char('x') => {
                if self.controller.close_output() {
                    self.set_status("Output surface closed.", StatusKind::Info);
                } else {
                    self.set_status("No output surface open.", StatusKind::Info);
                }
            }
            _ => {
                return match self.screen {
                    Screen::Songs => self.handle_songs_key(code),
                    Screen::Scripture => self.handle_scripture_key(code),
                    Screen::Templates => self.handle_templates_key(code),
                };
            }
        }
        Ok(Mode::Normal)
    }

    fn handle_songs_key(&mut self, code: KeyCode) -> Result<Mode> {
        let screen = &mut self.song_screen;
        match code {
            KeyCode::Up => screen.move_selection(-1),
            KeyCode::Down => screen.move_selection(1),
            KeyCode::PageUp => screen.move_selection(-5),
            KeyCode::PageDown => screen.move_selection(5),
            KeyCode::Home => screen.select_first(),
            KeyCode::End => screen.select_last(),
            KeyCode::Esc => screen.pane = SongPane::Songs,
            KeyCode::Enter => match screen.pane {
                SongPane::Songs => {
                    let result = self.open_current_song();
                    self.report(result);
                }
                SongPane::Verses => self.select_song_verse(),
            },
            KeyCode::Char('/') => {
                screen.pane = SongPane::Songs;
                let query = screen.filter.clone().unwrap_or_default();
                self.clear_status();
                return Ok(Mode::Searching(SearchState {
                    target: SearchTarget::Songs,
                    query,
                }));
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingSong(SongForm::default()));
            }
            KeyCode::Char('-') => {
                if screen.pane != SongPane::Songs {
                    self.set_status("Press Esc to return to the song list.", StatusKind::Info);
                } else if let Some(song) = screen.current_song().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmSongDelete(ConfirmSongDelete { song }));
                } else {
                    self.set_status("No song selected to delete.", StatusKind::Error);
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_scripture_key(&mut self, code: KeyCode) -> Result<Mode> {
        let screen = &mut self.scripture_screen;
        match code {
            KeyCode::Up => screen.move_selection(-1),
            KeyCode::Down => screen.move_selection(1),
            KeyCode::PageUp => screen.move_selection(-10),
            KeyCode::PageDown => screen.move_selection(10),
            KeyCode::Home => screen.select_first(),
            KeyCode::End => screen.select_last(),
            KeyCode::Esc | KeyCode::Backspace => {
                screen.back();
            }
            KeyCode::Enter => {
                let result = self.activate_scripture();
                self.report(result);
            }
            KeyCode::Char('t') => {
                screen.cycle_testament();
                let label = screen.filter_label();
                screen.level = ScriptureLevel::Books;
                self.set_status(format!("Showing {label}."), StatusKind::Info);
            }
            KeyCode::Char('/') => {
                let query = screen.query.clone();
                self.clear_status();
                return Ok(Mode::Searching(SearchState {
                    target: SearchTarget::Scripture,
                    query,
                }));
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_templates_key(&mut self, code: KeyCode) -> Result<Mode> {
        let count = self.template_screen.templates.len();
        let cursor = &mut self.template_screen.cursor;
        match code {
            KeyCode::Up => cursor.move_by(-1, count),
            KeyCode::Down => cursor.move_by(1, count),
            KeyCode::PageUp => cursor.move_by(-5, count),
            KeyCode::PageDown => cursor.move_by(5, count),
            KeyCode::Home => cursor.select_first(),
            KeyCode::End => cursor.select_last(count),
            KeyCode::Enter => {
                if let Some(template) = self.template_screen.current_template().cloned() {
                    let result = self.apply_template(&template);
                    self.report(result);
                }
            }
            KeyCode::Char('n') => {
                self.controller.set_template(None);
                self.set_status("Using the default look.", StatusKind::Info);
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingTemplate(TemplateForm::default()));
            }
            KeyCode::Char('-') => {
                if let Some(template) = self.template_screen.current_template().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmTemplateDelete(ConfirmTemplateDelete { template }));
                }
                self.set_status("No template selected to delete.", StatusKind::Error);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                if state.target == SearchTarget::Songs {
                    self.song_screen.filter = None;
                    let result = self.refresh_songs();
                    self.report(result);
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                if state.target == SearchTarget::Scripture {
                    let result = self.run_scripture_search(&state.query);
                    self.report(result);
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Up if state.target == SearchTarget::Songs => {
                self.song_screen.move_selection(-1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Down if state.target == SearchTarget::Songs => {
                self.song_screen.move_selection(1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => state.query.push(ch),
            _ => return Ok(Mode::Searching(state)),
        }

        if state.target == SearchTarget::Songs {
            self.song_screen.filter = Some(state.query.clone());
            let result = self.refresh_songs();
            self.report(result);
        }
        Ok(Mode::Searching(state))
    }

    fn handle_add_song(&mut self, code: KeyCode, mut form: SongForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add song cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => form.newline(),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingSong(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_add_template(&mut self, code: KeyCode, mut form: TemplateForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add template cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.cycle_background(-1),
            KeyCode::Right => form.cycle_background(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_template(&form) {
                Ok(()) => keep_open = false,
                Err(err) => form.error = Some(self.fail(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingTemplate(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_song_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmSongDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_song_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.fail(&err);
                        Ok(Mode::ConfirmSongDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmSongDelete(confirm)),
        }
    }

    fn handle_confirm_template_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmTemplateDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let id = confirm.template.id;
                let result = delete_template(self.songs.conn(), id)
                    .and_then(|()| self.reload_templates(None));
                match result {
                    Ok(()) => {
                        self.set_status("Template deleted.", StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        self.fail(&err);
                        Ok(Mode::ConfirmTemplateDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmTemplateDelete(confirm)),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.clear_status();
    }

    /// Relative verse navigation; the visible list follows when it shows the
    /// loaded sequence.
    fn navigate(&mut self, delta: i64) {
        if !self.controller.navigate_verse(delta) {
            return;
        }
        let Ok(index) = usize::try_from(self.controller.selection().active_verse_index) else {
            return;
        };
        match self.deck_origin {
            Some(DeckOrigin::Song(song_id))
                if self.song_screen.open_song.as_ref().map(|song| song.id) == Some(song_id) =>
            {
                self.song_screen.verse_cursor.selected = index;
            }
            Some(DeckOrigin::Chapter { book, chapter })
                if self.scripture_screen.book.as_ref().map(|b| b.id) == Some(book)
                    && self.scripture_screen.chapter == Some(chapter) =>
            {
                self.scripture_screen.verse_cursor.selected = index;
            }
            _ => {}
        }
    }

    fn go_live(&mut self) -> Result<()> {
        if self.controller.go_live()? {
            self.set_status("Live.", StatusKind::Info);
        } else {
            self.set_status("Select a verse before going live.", StatusKind::Error);
        }
        Ok(())
    }

    fn open_output(&mut self) -> Result<()> {
        match self.controller.open_output()? {
            OpenOutcome::Created(id) => {
                self.set_status(format!("Output surface #{id} opened."), StatusKind::Info)
            }
            OpenOutcome::AlreadyOpen(id) => self.set_status(
                format!("Output surface #{id} is already open."),
                StatusKind::Info,
            ),
        }
        Ok(())
    }

    fn open_current_song(&mut self) -> Result<()> {
        let Some(song) = self.song_screen.current_song().cloned() else {
            self.set_status("No song selected.", StatusKind::Error);
            return Ok(());
        };

        let verses = self.songs.song_sequence(song.id)?;
        self.controller.load_deck(song.id, None, verses.clone());
        self.deck_origin = Some(DeckOrigin::Song(song.id));
        self.song_screen.open(song.clone(), verses);

        if let Some(template_id) = song.template_id {
            if let Some(template) = fetch_template(self.songs.conn(), template_id)? {
                self.apply_template(&template)?;
            }
        }
        self.set_status(format!("Opened {}.", song.display_title()), StatusKind::Info);
        Ok(())
    }

    fn select_song_verse(&mut self) {
        let Some(song_id) = self.song_screen.open_song.as_ref().map(|song| song.id) else {
            return;
        };
        if self.deck_origin != Some(DeckOrigin::Song(song_id)) {
            self.controller
                .load_deck(song_id, None, self.song_screen.verses.clone());
            self.deck_origin = Some(DeckOrigin::Song(song_id));
        }
        let index = self.song_screen.verse_cursor.selected;
        if self.controller.select_verse(index) {
            self.set_status(format!("Verse {} selected.", index + 1), StatusKind::Info);
        }
    }

    fn activate_scripture(&mut self) -> Result<()> {
        if !self.scripture.is_resolved() {
            self.set_status("No scripture database found.", StatusKind::Error);
            return Ok(());
        }

        match self.scripture_screen.level {
            ScriptureLevel::Books => {
                let Some(book) = self.scripture_screen.current_book().cloned() else {
                    return Ok(());
                };
                let chapters = self.scripture.list_sections(book.id)?;
                self.scripture_screen.open_book(book, chapters);
            }
            ScriptureLevel::Chapters => {
                let (Some(book), Some(chapter)) = (
                    self.scripture_screen.book.clone(),
                    self.scripture_screen.current_chapter(),
                ) else {
                    return Ok(());
                };
                let verses = self.scripture.list_verses(book.id, chapter)?;
                self.controller
                    .load_deck(book.id, Some(chapter), verses.clone());
                self.deck_origin = Some(DeckOrigin::Chapter {
                    book: book.id,
                    chapter,
                });
                self.scripture_screen.open_chapter(chapter, verses);
                self.set_status(
                    format!("{} {} loaded.", book.names.primary, chapter),
                    StatusKind::Info,
                );
            }
            ScriptureLevel::Verses => {
                let (Some(book), Some(chapter)) = (
                    self.scripture_screen.book.as_ref().map(|b| b.id),
                    self.scripture_screen.chapter,
                ) else {
                    return Ok(());
                };
                let origin = DeckOrigin::Chapter { book, chapter };
                if self.deck_origin != Some(origin) {
                    self.controller.load_deck(
                        book,
                        Some(chapter),
                        self.scripture_screen.verses.clone(),
                    );
                    self.deck_origin = Some(origin);
                }
                let index = self.scripture_screen.verse_cursor.selected;
                if let Some(verse) = self.scripture_screen.verses.get(index).cloned() {
                    self.controller.select_verse(index);
                    let reference = self.scripture_screen.reference(&verse);
                    self.set_status(format!("{reference} selected."), StatusKind::Info);
                }
            }
            ScriptureLevel::Results => {
                let Some(hit) = self.scripture_screen.current_result().cloned() else {
                    return Ok(());
                };
                let reference = self.scripture_screen.reference(&hit);
                self.controller.select_loose(hit);
                self.deck_origin = None;
                self.set_status(format!("{reference} selected."), StatusKind::Info);
            }
        }
        Ok(())
    }

    fn run_scripture_search(&mut self, query: &str) -> Result<()> {
        if !self.scripture.is_resolved() {
            self.set_status("No scripture database found.", StatusKind::Error);
            return Ok(());
        }
        let results = self.scripture.search(query, self.search_limit)?;
        let count = results.len();
        self.scripture_screen.show_results(query.trim().to_string(), results);
        self.set_status(format!("{count} matching verses."), StatusKind::Info);
        Ok(())
    }

    fn apply_template(&mut self, template: &Template) -> Result<()> {
        let snapshot = self.controller.use_template(template, &FileEmbedder)?;
        self.set_status(format!("Template {} active.", snapshot.name), StatusKind::Info);
        Ok(())
    }

    fn save_new_song(&mut self, form: &SongForm) -> Result<()> {
        let (title, author, lyrics) = form.parse_inputs()?;
        let template_id = self
            .controller
            .selection()
            .active_template
            .as_ref()
            .map(|template| template.template_id);
        let song = create_song_with_lyrics(
            self.songs.conn(),
            &title,
            &author,
            DEFAULT_CATEGORY,
            template_id,
            &lyrics,
        )?;
        tracing::info!(song_id = song.id, title = %song.title, "created song");

        self.song_screen.filter = None;
        self.refresh_songs()?;
        if let Some(index) = self.song_screen.songs.iter().position(|s| s.id == song.id) {
            self.song_screen.cursor.selected = index;
        }
        self.song_screen.pane = SongPane::Songs;
        self.set_status(format!("Song '{}' added.", song.title), StatusKind::Info);
        Ok(())
    }

    fn save_new_template(&mut self, form: &TemplateForm) -> Result<()> {
        let (name, background) = form.parse_inputs()?;
        let mut draft = TemplateDraft::named(name);
        match background {
            TemplateBackground::Gradient(gradient) => draft.background_value = gradient.to_string(),
            TemplateBackground::Media(path) => {
                let kind = media_kind_for(&path)
                    .ok_or_else(|| anyhow!("Only image and video files can be used."))?;
                let record = import_media(self.songs.conn(), &self.media_dir, &path, kind)?;
                draft.background_kind = match kind {
                    MediaKind::Image => BackgroundKind::Image,
                    MediaKind::Video => BackgroundKind::Video,
                };
                draft.background_value = record.file_path;
            }
        }

        let template = create_template(self.songs.conn(), draft)?;
        self.reload_templates(Some(template.id))?;
        self.set_status(format!("Template {} added.", template.name), StatusKind::Info);
        Ok(())
    }

    fn perform_song_delete(&mut self, confirm: &ConfirmSongDelete) -> Result<()> {
        let id = confirm.song.id;
        delete_song(self.songs.conn(), id)?;
        self.song_screen.forget(id);
        if self.deck_origin == Some(DeckOrigin::Song(id)) {
            self.deck_origin = None;
        }
        self.refresh_songs()?;
        self.set_status("Song deleted.", StatusKind::Info);
        Ok(())
    }

    fn refresh_songs(&mut self) -> Result<()> {
        let songs = match self.song_screen.filter.as_deref() {
            Some(query) if !query.trim().is_empty() => search_songs(self.songs.conn(), query)?,
            _ => fetch_all_songs(self.songs.conn())?,
        };
        self.song_screen.set_songs(songs);
        Ok(())
    }

    fn reload_templates(&mut self, focus_id: Option<i64>) -> Result<()> {
        let templates = fetch_templates(self.songs.conn())?;
        self.template_screen.set_templates(templates, focus_id);
        Ok(())
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.fail(&err);
        }
    }

    /// Log a failed action and show it in the footer.
    fn fail(&mut self, err: &anyhow::Error) -> String {
        tracing::warn!(error = ?err, "action failed");
        let message = surface_error(err);
        self.set_status(message.clone(), StatusKind::Error);
        message
    }

    fn report_delivery(&mut self, delivery: Delivery, sent: &str) {
        match delivery {
            Delivery::Queued => self.set_status(sent, StatusKind::Info),
            Delivery::Dropped => self.set_status("No output surface open.", StatusKind::Info),
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height.saturating_sub(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(footer_height),
            ])
            .split(area);

        self.draw_tab_bar(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(chunks[1]);

        match self.screen {
            Screen::Songs => self.draw_songs(frame, body[0]),
            Screen::Scripture => self.draw_scripture(frame, body[0]),
            Screen::Templates => self.draw_templates(frame, body[0]),
        }
        self.draw_preview(frame, body[1]);

        if footer_height > 0 {
            self.draw_footer(frame, chunks[2]);
        }

        match &self.mode {
            Mode::Searching(state) => self.draw_search_bar(frame, chunks[1], state),
            Mode::AddingSong(form) => self.draw_song_form(frame, area, form),
            Mode::AddingTemplate(form) => self.draw_template_form(frame, area, form),
            Mode::ConfirmSongDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Song",
                vec![
                    Line::from(format!(
                        "Delete '{}' permanently?",
                        confirm.song.display_title()
                    )),
                    Line::from("All of its verses are removed as well."),
                ],
            ),
            Mode::ConfirmTemplateDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Template",
                vec![
                    Line::from(format!("Delete template '{}'?", confirm.template.name)),
                    Line::from("Songs using it fall back to the default look."),
                ],
            ),
            Mode::Normal => {}
        }
    }

    fn draw_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(24)])
            .split(area);

        let mut spans = Vec::new();
        for screen in Screen::ALL {
            let style = if screen == self.screen {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(format!(" {} ", screen.title()), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

        let badge = if self.controller.is_live() {
            Span::styled(
                "● LIVE",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )
        } else if self.controller.is_output_open() {
            Span::styled("output open", Style::default().fg(Color::Green))
        } else {
            Span::styled("output closed", Style::default().fg(Color::DarkGray))
        };
        frame.render_widget(
            Paragraph::new(Line::from(badge)).alignment(Alignment::Right),
            chunks[1],
        );
    }

    fn draw_songs(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.song_screen;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);

        let title = match screen.filter.as_deref() {
            Some(query) if !query.trim().is_empty() => format!("Songs • filter: {query}"),
            _ => "Songs".to_string(),
        };
        let empty = if screen.filter.is_some() {
            "No songs match the current search."
        } else {
            "No songs yet. Press '+' to add one."
        };
        let items = screen
            .songs
            .iter()
            .map(|song| ListItem::new(song.display_title()))
            .collect();
        draw_list(
            frame,
            columns[0],
            title,
            items,
            screen.cursor.selected,
            screen.pane == SongPane::Songs,
            empty,
        );

        let title = screen
            .open_song
            .as_ref()
            .map(|song| song.title.clone())
            .unwrap_or_else(|| "Verses".to_string());
        let items = screen
            .verses
            .iter()
            .map(|verse| self.verse_item(verse.section.to_string(), verse))
            .collect();
        draw_list(
            frame,
            columns[1],
            title,
            items,
            screen.verse_cursor.selected,
            screen.pane == SongPane::Verses,
            "Press Enter on a song to open it.",
        );
    }

    fn draw_scripture(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.scripture_screen;
        if !self.scripture.is_resolved() {
            let message = Paragraph::new(vec![
                Line::from("No scripture database found."),
                Line::from("Add a path to scripture_paths in config.json."),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Scripture"));
            frame.render_widget(message, area);
            return;
        }

        let book_title = screen
            .book
            .as_ref()
            .map(|book| book.to_string())
            .unwrap_or_default();

        let (title, items, selected): (String, Vec<ListItem<'static>>, usize) = match screen.level
        {
            ScriptureLevel::Books => (
                format!("Scripture • {}", screen.filter_label()),
                screen
                    .books
                    .iter()
                    .map(|book| {
                        let testament = book
                            .testament()
                            .map(|testament| testament.abbreviation())
                            .unwrap_or_default();
                        ListItem::new(Line::from(vec![
                            Span::styled(
                                format!("{testament} {:>2}  ", book.position),
                                Style::default().fg(Color::DarkGray),
                            ),
                            Span::raw(book.to_string()),
                        ]))
                    })
                    .collect(),
                screen.book_cursor.selected,
            ),
            ScriptureLevel::Chapters => (
                format!("{book_title} • Chapters"),
                screen
                    .chapters
                    .iter()
                    .map(|chapter| ListItem::new(format!("Chapter {chapter}")))
                    .collect(),
                screen.chapter_cursor.selected,
            ),
            ScriptureLevel::Verses => (
                format!("{book_title} {}", screen.chapter.unwrap_or_default()),
                screen
                    .verses
                    .iter()
                    .map(|verse| self.verse_item(verse.verse_number.to_string(), verse))
                    .collect(),
                screen.verse_cursor.selected,
            ),
            ScriptureLevel::Results => (
                format!("Search • \"{}\" ({})", screen.query, screen.results.len()),
                screen
                    .results
                    .iter()
                    .map(|verse| self.verse_item(screen.reference(verse), verse))
                    .collect(),
                screen.result_cursor.selected,
            ),
        };

        draw_list(frame, area, title, items, selected, true, "Nothing to show here.");
    }

    fn draw_templates(&self, frame: &mut Frame, area: Rect) {
        let active_id = self
            .controller
            .selection()
            .active_template
            .as_ref()
            .map(|template| template.template_id);
        let items = self
            .template_screen
            .templates
            .iter()
            .map(|template| {
                let marker = if Some(template.id) == active_id {
                    Span::styled("● ", Style::default().fg(Color::Green))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![marker, Span::raw(template.to_string())]))
            })
            .collect();
        draw_list(
            frame,
            area,
            "Templates".to_string(),
            items,
            self.template_screen.cursor.selected,
            true,
            "No templates yet. Press '+' to add one.",
        );
    }

    /// One list row for a verse, marked when it is the selected verse.
    fn verse_item(&self, label: String, verse: &NormalizedVerse) -> ListItem<'static> {
        let marker = if self.controller.selected_verse() == Some(verse) {
            Span::styled("● ", Style::default().fg(Color::Red))
        } else {
            Span::raw("  ")
        };
        ListItem::new(Line::from(vec![
            marker,
            Span::styled(format!("{label}  "), Style::default().fg(Color::Cyan)),
            Span::raw(first_line(&verse.text)),
        ]))
    }

    fn draw_preview(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Preview");
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(PREVIEW_INFO_HEIGHT.min(inner.height)),
            ])
            .split(inner);

        render_presentation(frame, chunks[0], self.controller.mirror());

        let output = match self.controller.windows().output_id() {
            Some(id) => format!("Output: surface #{id}"),
            None => "Output: closed".to_string(),
        };
        let template = self
            .controller
            .selection()
            .active_template
            .as_ref()
            .map(|template| format!("Template: {}", template.name))
            .unwrap_or_else(|| "Template: default".to_string());
        let channel = self.controller.channel();
        let lines = vec![
            Line::from(output),
            Line::from(template),
            Line::from(Span::styled(
                format!("Sent {} • dropped {}", channel.queued(), channel.dropped()),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let info = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
        frame.render_widget(info, chunks[1]);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let title = match state.target {
            SearchTarget::Songs => "Filter Songs",
            SearchTarget::Scripture => "Search Scripture",
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        let cursor_y = inner.y;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.mode, self.screen) {
            (Mode::Searching(_), _) => &[("[Enter]", " Done   "), ("[Esc]", " Cancel")],
            (Mode::AddingSong(_), _) => &[
                ("[Tab]", " Next Field   "),
                ("[Ctrl+S]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (Mode::AddingTemplate(_), _) => &[
                ("[Tab]", " Next Field   "),
                ("[←→]", " Background   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (Mode::ConfirmSongDelete(_) | Mode::ConfirmTemplateDelete(_), _) => {
                &[("[Y]", " Delete   "), ("[N]", " Cancel")]
            }
            (Mode::Normal, Screen::Songs) => &[
                ("[Enter]", " Open/Select   "),
                ("[←→]", " Prev/Next   "),
                ("[g]", " Go Live   "),
                ("[c]", " Clear   "),
                ("[b]", " Black   "),
                ("[o/x]", " Output   "),
                ("[/]", " Filter   "),
                ("[+/-]", " Add/Delete   "),
                ("[Tab]", " Screen   "),
                ("[q]", " Quit"),
            ],
            (Mode::Normal, Screen::Scripture) => &[
                ("[Enter]", " Open/Select   "),
                ("[Esc]", " Back   "),
                ("[←→]", " Prev/Next   "),
                ("[g]", " Go Live   "),
                ("[c]", " Clear   "),
                ("[b]", " Black   "),
                ("[t]", " Testament   "),
                ("[/]", " Search   "),
                ("[Tab]", " Screen   "),
                ("[q]", " Quit"),
            ],
            (Mode::Normal, Screen::Templates) => &[
                ("[Enter]", " Use   "),
                ("[n]", " No Template   "),
                ("[+/-]", " Add/Delete   "),
                ("[g]", " Go Live   "),
                ("[Tab]", " Screen   "),
                ("[q]", " Quit"),
            ],
        };

        Line::from(
            hints
                .iter()
                .flat_map(|(key, label)| {
                    [
                        Span::styled(key.to_string(), key_style),
                        Span::raw(label.to_string()),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn draw_song_form(&self, frame: &mut Frame, area: Rect, form: &SongForm) {
        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Song").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Title", SongField::Title),
            form.build_line("Author", SongField::Author),
            Line::from("Lyrics:"),
        ];
        lines.extend(form.lyric_lines());
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Ctrl+S to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        let (cursor_x, cursor_y) = match form.active {
            SongField::Title => (
                inner.x + "Title: ".len() as u16 + form.value_len(SongField::Title) as u16,
                inner.y,
            ),
            SongField::Author => (
                inner.x + "Author: ".len() as u16 + form.value_len(SongField::Author) as u16,
                inner.y + 1,
            ),
            SongField::Lyrics => (
                inner.x + form.value_len(SongField::Lyrics) as u16,
                inner.y + 2 + form.lyric_line_count() as u16,
            ),
        };
        let cursor_y = cursor_y.min(inner.bottom().saturating_sub(1));
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_template_form(&self, frame: &mut Frame, area: Rect, form: &TemplateForm) {
        let popup_area = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Template").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Name", TemplateField::Name),
            form.build_line("Background", TemplateField::Background),
            form.build_line("File", TemplateField::MediaPath),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • ←→ to pick a background • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        match form.active {
            TemplateField::Name => frame.set_cursor_position((
                inner.x + "Name: ".len() as u16 + form.value_len(TemplateField::Name) as u16,
                inner.y,
            )),
            TemplateField::MediaPath => frame.set_cursor_position((
                inner.x + "File: ".len() as u16 + form.value_len(TemplateField::MediaPath) as u16,
                inner.y + 2,
            )),
            TemplateField::Background => {}
        }
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, mut lines: Vec<Line>) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

fn draw_list(
    frame: &mut Frame,
    area: Rect,
    title: String,
    items: Vec<ListItem<'static>>,
    selected: usize,
    focused: bool,
    empty_message: &str,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    if items.is_empty() {
        let message = Paragraph::new(empty_message.to_string())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(message, area);
        return;
    }

    let highlight = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight)
        .highlight_symbol("▶ ");

    let mut list_state = ListState::default();
    list_state.select(Some(selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_database, seed_defaults};
    use crate::window::HeadlessHost;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use rusqlite::Connection;
    use std::thread;
    use std::time::{Duration, Instant};

    fn build_app(scripture: ScriptureResolver) -> (tempfile::TempDir, App<HeadlessHost>) {
        let dir = tempfile::tempdir().unwrap();
        let conn = memory_database();
        seed_defaults(&conn).unwrap();
        let app = App::new(
            SongResolver::new(conn),
            scripture,
            LiveController::new(HeadlessHost::new(2), false),
            &Config::rooted_at(dir.path()),
        )
        .unwrap();
        (dir, app)
    }

    fn app() -> (tempfile::TempDir, App<HeadlessHost>) {
        build_app(ScriptureResolver::unresolved())
    }

    fn bible() -> ScriptureResolver {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE verses (book INTEGER, chapter INTEGER, verse INTEGER, text TEXT);
             INSERT INTO verses VALUES (1, 1, 1, 'In the beginning God created the heaven and the earth.');
             INSERT INTO verses VALUES (43, 3, 17, 'For God sent not his Son into the world to condemn the world.');
             INSERT INTO verses VALUES (43, 3, 16, 'For God so loved the world');",
        )
        .unwrap();
        ScriptureResolver::from_connection(conn).unwrap()
    }

    fn press(app: &mut App<HeadlessHost>, keys: &[KeyCode]) {
        for key in keys {
            app.handle_key(*key).unwrap();
        }
    }

    fn type_text(app: &mut App<HeadlessHost>, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    /// Songs are listed by title: 10,000 Reasons, Amazing Grace, ...
    fn open_amazing_grace(app: &mut App<HeadlessHost>) {
        press(app, &[KeyCode::Down, KeyCode::Enter]);
        assert_eq!(
            app.song_screen.open_song.as_ref().map(|s| s.title.as_str()),
            Some("Amazing Grace")
        );
    }

    fn verse_index(app: &App<HeadlessHost>) -> i64 {
        app.controller.selection().active_verse_index
    }

    #[test]
    fn arrows_walk_the_open_song() {
        let (_dir, mut app) = app();
        open_amazing_grace(&mut app);
        assert_eq!(app.song_screen.pane, SongPane::Verses);
        assert_eq!(verse_index(&app), -1);

        press(&mut app, &[KeyCode::Right, KeyCode::Right]);
        assert_eq!(verse_index(&app), 1);
        assert_eq!(app.song_screen.verse_cursor.selected, 1);

        press(&mut app, &[KeyCode::Left]);
        assert_eq!(verse_index(&app), 0);
        assert_eq!(app.song_screen.verse_cursor.selected, 0);
    }

    #[test]
    fn arrows_are_ignored_while_typing_a_search() {
        let (_dir, mut app) = app();
        open_amazing_grace(&mut app);
        press(&mut app, &[KeyCode::Right]);

        press(&mut app, &[KeyCode::Char('/')]);
        assert!(matches!(app.mode, Mode::Searching(_)));
        press(&mut app, &[KeyCode::Right, KeyCode::Right, KeyCode::Left]);
        assert_eq!(verse_index(&app), 0);

        press(&mut app, &[KeyCode::Esc, KeyCode::Right]);
        assert_eq!(verse_index(&app), 1);
    }

    #[test]
    fn arrows_are_ignored_while_a_dialog_is_open() {
        let (_dir, mut app) = app();
        open_amazing_grace(&mut app);
        press(&mut app, &[KeyCode::Right]);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Right]);
        assert!(matches!(app.mode, Mode::AddingSong(_)));
        assert_eq!(verse_index(&app), 0);

        press(&mut app, &[KeyCode::Esc, KeyCode::Esc, KeyCode::Char('-')]);
        assert!(matches!(app.mode, Mode::ConfirmSongDelete(_)));
        press(&mut app, &[KeyCode::Right]);
        assert_eq!(verse_index(&app), 0);
        press(&mut app, &[KeyCode::Char('n')]);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn opening_a_song_applies_its_template_and_goes_live() {
        let (_dir, mut app) = app();
        open_amazing_grace(&mut app);
        let song_template = app
            .song_screen
            .open_song
            .as_ref()
            .and_then(|song| song.template_id);
        let active = app
            .controller
            .selection()
            .active_template
            .as_ref()
            .map(|t| t.template_id);
        assert!(song_template.is_some());
        assert_eq!(active, song_template);

        press(&mut app, &[KeyCode::Char('g')]);
        assert!(!app.controller.is_live(), "nothing selected yet");

        press(&mut app, &[KeyCode::Right, KeyCode::Char('g')]);
        assert!(app.controller.is_live());
        let first = app.song_screen.verses[0].text.clone();
        assert_eq!(app.controller.mirror().text(), Some(first.as_str()));

        press(&mut app, &[KeyCode::Char('b')]);
        assert!(app.controller.mirror().is_blacked_out());
        press(&mut app, &[KeyCode::Char('c')]);
        assert_eq!(app.controller.mirror().text(), None);
    }

    #[test]
    fn song_filter_narrows_and_resets() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::Char('/')]);
        type_text(&mut app, "grace");
        assert_eq!(app.song_screen.songs.len(), 1);

        press(&mut app, &[KeyCode::Enter]);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.song_screen.filter.as_deref(), Some("grace"));

        press(&mut app, &[KeyCode::Char('/'), KeyCode::Esc]);
        assert_eq!(app.song_screen.filter, None);
        assert_eq!(app.song_screen.songs.len(), 3);
    }

    #[test]
    fn new_song_is_split_into_verses() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Be Still");
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab]);
        type_text(&mut app, "Be still my soul");
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter]);
        type_text(&mut app, "Be still my heart");
        app.handle_ctrl_s().unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        let song = app.song_screen.current_song().cloned().unwrap();
        assert_eq!(song.title, "Be Still");
        assert_eq!(app.songs.song_sequence(song.id).unwrap().len(), 2);
    }

    #[test]
    fn invalid_song_form_stays_open_with_error() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "No Lyrics");
        app.handle_ctrl_s().unwrap();

        match &app.mode {
            Mode::AddingSong(form) => {
                assert_eq!(form.error.as_deref(), Some("Lyrics are required."))
            }
            _ => panic!("form should stay open"),
        }
    }

    #[test]
    fn templates_screen_switches_the_active_template() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab]);
        assert_eq!(app.screen, Screen::Templates);

        press(&mut app, &[KeyCode::Enter]);
        let name = app
            .controller
            .selection()
            .active_template
            .as_ref()
            .map(|t| t.name.clone());
        assert_eq!(name.as_deref(), Some("Forest Green"));

        press(&mut app, &[KeyCode::Char('n')]);
        assert!(app.controller.selection().active_template.is_none());
    }

    #[test]
    fn gradient_template_can_be_added() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::BackTab, KeyCode::Char('+')]);
        type_text(&mut app, "Advent");
        press(&mut app, &[KeyCode::Tab, KeyCode::Right, KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        let template = app.template_screen.current_template().cloned().unwrap();
        assert_eq!(template.name, "Advent");
        assert_eq!(template.background_kind, BackgroundKind::Gradient);
    }

    #[test]
    fn missing_media_file_keeps_template_form_open() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::BackTab, KeyCode::Char('+')]);
        type_text(&mut app, "Photo");
        press(&mut app, &[KeyCode::Tab, KeyCode::Left, KeyCode::Tab]);
        type_text(&mut app, "/definitely/not/here.jpg");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::AddingTemplate(_)));
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
    }

    #[test]
    fn chapter_verses_navigate_and_search_hits_do_not() {
        let (_dir, mut app) = build_app(bible());
        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.scripture_screen.books.len(), 2);

        press(&mut app, &[KeyCode::Down, KeyCode::Enter, KeyCode::Enter]);
        assert_eq!(app.scripture_screen.level, ScriptureLevel::Verses);
        assert_eq!(app.controller.selection().active_section, Some(3));

        press(&mut app, &[KeyCode::Right, KeyCode::Right]);
        assert_eq!(verse_index(&app), 1);
        assert_eq!(app.scripture_screen.verse_cursor.selected, 1);
        assert_eq!(
            app.controller.selected_verse().map(|v| v.verse_number),
            Some(17)
        );

        press(&mut app, &[KeyCode::Char('/')]);
        type_text(&mut app, "God");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.scripture_screen.results.len(), 3);

        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(verse_index(&app), -1);
        assert_eq!(
            app.controller.selected_verse().map(|v| v.collection_id),
            Some(1)
        );
        press(&mut app, &[KeyCode::Right]);
        assert_eq!(verse_index(&app), -1);
    }

    #[test]
    fn testament_key_filters_books() {
        let (_dir, mut app) = build_app(bible());
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('t')]);
        assert_eq!(app.scripture_screen.filter_label(), "Old Testament");
        assert_eq!(app.scripture_screen.books.len(), 1);
        press(&mut app, &[KeyCode::Char('t')]);
        assert_eq!(app.scripture_screen.books[0].names.primary, "John");
    }

    #[test]
    fn external_close_is_reported_on_tick() {
        let (_dir, mut app) = app();
        press(&mut app, &[KeyCode::Char('o')]);
        assert!(app.controller.is_output_open());
        assert!(app.controller.windows_mut().host_mut().close_externally(1));

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.controller.is_output_open() && Instant::now() < deadline {
            app.tick();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!app.controller.is_output_open());
        let status = app.status.as_ref().map(|s| s.text.as_str());
        assert_eq!(status, Some("Output surface #1 closed."));
    }

    #[test]
    fn draw_shows_tabs_lists_and_preview() {
        let (_dir, mut app) = app();
        open_amazing_grace(&mut app);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();

        assert!(screen.contains("Scripture"));
        assert!(screen.contains("Preview"));
        assert!(screen.contains("Amazing Grace"));
        assert!(screen.contains("Output: closed"));
    }
}
