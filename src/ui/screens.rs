use crate::models::{ContentCollection, NormalizedVerse, Song, Template, Testament};
use crate::resolver::CollectionFilter;

/// Selection inside a list that may be empty.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListCursor {
    pub(crate) selected: usize,
}

impl ListCursor {
    pub(crate) fn move_by(&mut self, offset: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max = len as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, max) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    pub(crate) fn ensure_in_bounds(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

/// Where the navigable sequence held by the live controller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeckOrigin {
    Song(i64),
    Chapter { book: i64, chapter: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SongPane {
    Songs,
    Verses,
}

/// Song library on the left, the opened song's verses on the right.
pub(crate) struct SongScreen {
    pub(crate) songs: Vec<Song>,
    pub(crate) filter: Option<String>,
    pub(crate) cursor: ListCursor,
    pub(crate) open_song: Option<Song>,
    pub(crate) verses: Vec<NormalizedVerse>,
    pub(crate) verse_cursor: ListCursor,
    pub(crate) pane: SongPane,
}

impl SongScreen {
    pub(crate) fn new(songs: Vec<Song>) -> Self {
        Self {
            songs,
            filter: None,
            cursor: ListCursor::default(),
            open_song: None,
            verses: Vec::new(),
            verse_cursor: ListCursor::default(),
            pane: SongPane::Songs,
        }
    }

    pub(crate) fn set_songs(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.cursor.ensure_in_bounds(self.songs.len());
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.cursor.selected)
    }

    pub(crate) fn current_verse(&self) -> Option<&NormalizedVerse> {
        self.verses.get(self.verse_cursor.selected)
    }

    pub(crate) fn open(&mut self, song: Song, verses: Vec<NormalizedVerse>) {
        self.open_song = Some(song);
        self.verses = verses;
        self.verse_cursor = ListCursor::default();
        self.pane = SongPane::Verses;
    }

    /// Forget the opened song if it was just deleted.
    pub(crate) fn forget(&mut self, song_id: i64) {
        if self.open_song.as_ref().map(|song| song.id) == Some(song_id) {
            self.open_song = None;
            self.verses.clear();
            self.verse_cursor = ListCursor::default();
            self.pane = SongPane::Songs;
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        match self.pane {
            SongPane::Songs => self.cursor.move_by(offset, self.songs.len()),
            SongPane::Verses => self.verse_cursor.move_by(offset, self.verses.len()),
        }
    }

    pub(crate) fn select_first(&mut self) {
        match self.pane {
            SongPane::Songs => self.cursor.select_first(),
            SongPane::Verses => self.verse_cursor.select_first(),
        }
    }

    pub(crate) fn select_last(&mut self) {
        match self.pane {
            SongPane::Songs => self.cursor.select_last(self.songs.len()),
            SongPane::Verses => self.verse_cursor.select_last(self.verses.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptureLevel {
    Books,
    Chapters,
    Verses,
    Results,
}

/// Books, then chapters, then verses of one chapter. Search results replace
/// the list until the operator backs out.
pub(crate) struct ScriptureScreen {
    pub(crate) all_books: Vec<ContentCollection>,
    pub(crate) filter: CollectionFilter,
    pub(crate) books: Vec<ContentCollection>,
    pub(crate) book_cursor: ListCursor,
    pub(crate) book: Option<ContentCollection>,
    pub(crate) chapters: Vec<i64>,
    pub(crate) chapter_cursor: ListCursor,
    pub(crate) chapter: Option<i64>,
    pub(crate) verses: Vec<NormalizedVerse>,
    pub(crate) verse_cursor: ListCursor,
    pub(crate) query: String,
    pub(crate) results: Vec<NormalizedVerse>,
    pub(crate) result_cursor: ListCursor,
    pub(crate) level: ScriptureLevel,
}

impl ScriptureScreen {
    pub(crate) fn new(all_books: Vec<ContentCollection>) -> Self {
        let mut screen = Self {
            books: Vec::new(),
            all_books,
            filter: CollectionFilter::All,
            book_cursor: ListCursor::default(),
            book: None,
            chapters: Vec::new(),
            chapter_cursor: ListCursor::default(),
            chapter: None,
            verses: Vec::new(),
            verse_cursor: ListCursor::default(),
            query: String::new(),
            results: Vec::new(),
            result_cursor: ListCursor::default(),
            level: ScriptureLevel::Books,
        };
        screen.apply_filter();
        screen
    }

    fn apply_filter(&mut self) {
        let filter = self.filter;
        self.books = self
            .all_books
            .iter()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect();
        self.book_cursor.ensure_in_bounds(self.books.len());
    }

    /// All, Old Testament, New Testament, and around again.
    pub(crate) fn cycle_testament(&mut self) -> CollectionFilter {
        self.filter = match self.filter {
            CollectionFilter::All => CollectionFilter::Testament(Testament::Old),
            CollectionFilter::Testament(Testament::Old) => {
                CollectionFilter::Testament(Testament::New)
            }
            _ => CollectionFilter::All,
        };
        self.book_cursor = ListCursor::default();
        self.apply_filter();
        self.filter
    }

    pub(crate) fn filter_label(&self) -> &'static str {
        match self.filter {
            CollectionFilter::Testament(Testament::Old) => "Old Testament",
            CollectionFilter::Testament(Testament::New) => "New Testament",
            _ => "All Books",
        }
    }

    pub(crate) fn current_book(&self) -> Option<&ContentCollection> {
        self.books.get(self.book_cursor.selected)
    }

    pub(crate) fn current_chapter(&self) -> Option<i64> {
        self.chapters.get(self.chapter_cursor.selected).copied()
    }

    pub(crate) fn current_result(&self) -> Option<&NormalizedVerse> {
        self.results.get(self.result_cursor.selected)
    }

    pub(crate) fn open_book(&mut self, book: ContentCollection, chapters: Vec<i64>) {
        self.book = Some(book);
        self.chapters = chapters;
        self.chapter_cursor = ListCursor::default();
        self.level = ScriptureLevel::Chapters;
    }

    pub(crate) fn open_chapter(&mut self, chapter: i64, verses: Vec<NormalizedVerse>) {
        self.chapter = Some(chapter);
        self.verses = verses;
        self.verse_cursor = ListCursor::default();
        self.level = ScriptureLevel::Verses;
    }

    pub(crate) fn show_results(&mut self, query: String, results: Vec<NormalizedVerse>) {
        self.query = query;
        self.results = results;
        self.result_cursor = ListCursor::default();
        self.level = ScriptureLevel::Results;
    }

    /// Step back one level. Returns `false` when already at the book list.
    pub(crate) fn back(&mut self) -> bool {
        self.level = match self.level {
            ScriptureLevel::Books => return false,
            ScriptureLevel::Chapters | ScriptureLevel::Results => ScriptureLevel::Books,
            ScriptureLevel::Verses => ScriptureLevel::Chapters,
        };
        true
    }

    /// Name shown in references; search hits can come from filtered-out books.
    pub(crate) fn book_name(&self, collection_id: i64) -> String {
        self.all_books
            .iter()
            .find(|book| book.id == collection_id)
            .map(|book| book.names.primary.clone())
            .unwrap_or_else(|| format!("Book {collection_id}"))
    }

    pub(crate) fn reference(&self, verse: &NormalizedVerse) -> String {
        verse.reference(&self.book_name(verse.collection_id))
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        match self.level {
            ScriptureLevel::Books => self.book_cursor.move_by(offset, self.books.len()),
            ScriptureLevel::Chapters => self.chapter_cursor.move_by(offset, self.chapters.len()),
            ScriptureLevel::Verses => self.verse_cursor.move_by(offset, self.verses.len()),
            ScriptureLevel::Results => self.result_cursor.move_by(offset, self.results.len()),
        }
    }

    pub(crate) fn select_first(&mut self) {
        match self.level {
            ScriptureLevel::Books => self.book_cursor.select_first(),
            ScriptureLevel::Chapters => self.chapter_cursor.select_first(),
            ScriptureLevel::Verses => self.verse_cursor.select_first(),
            ScriptureLevel::Results => self.result_cursor.select_first(),
        }
    }

    pub(crate) fn select_last(&mut self) {
        match self.level {
            ScriptureLevel::Books => self.book_cursor.select_last(self.books.len()),
            ScriptureLevel::Chapters => self.chapter_cursor.select_last(self.chapters.len()),
            ScriptureLevel::Verses => self.verse_cursor.select_last(self.verses.len()),
            ScriptureLevel::Results => self.result_cursor.select_last(self.results.len()),
        }
    }
}

pub(crate) struct TemplateScreen {
    pub(crate) templates: Vec<Template>,
    pub(crate) cursor: ListCursor,
}

impl TemplateScreen {
    pub(crate) fn new(templates: Vec<Template>) -> Self {
        Self {
            templates,
            cursor: ListCursor::default(),
        }
    }

    pub(crate) fn set_templates(&mut self, templates: Vec<Template>, focus_id: Option<i64>) {
        self.templates = templates;
        if let Some(index) =
            focus_id.and_then(|id| self.templates.iter().position(|template| template.id == id))
        {
            self.cursor.selected = index;
        }
        self.cursor.ensure_in_bounds(self.templates.len());
    }

    pub(crate) fn current_template(&self) -> Option<&Template> {
        self.templates.get(self.cursor.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionKind, DisplayNames};

    fn book(position: i64, name: &str) -> ContentCollection {
        ContentCollection {
            id: position,
            names: DisplayNames::new(name, None),
            kind: CollectionKind::ScriptureBook,
            position,
        }
    }

    #[test]
    fn cursor_stays_inside_the_list() {
        let mut cursor = ListCursor::default();
        cursor.move_by(-3, 4);
        assert_eq!(cursor.selected, 0);
        cursor.move_by(10, 4);
        assert_eq!(cursor.selected, 3);
        cursor.ensure_in_bounds(2);
        assert_eq!(cursor.selected, 1);
        cursor.move_by(1, 0);
        assert_eq!(cursor.selected, 0);
    }

    #[test]
    fn testament_filter_cycles() {
        let mut screen =
            ScriptureScreen::new(vec![book(1, "Genesis"), book(19, "Psalms"), book(43, "John")]);
        assert_eq!(screen.books.len(), 3);

        screen.cycle_testament();
        assert_eq!(screen.filter_label(), "Old Testament");
        assert_eq!(screen.books.len(), 2);

        screen.cycle_testament();
        assert_eq!(screen.books.len(), 1);
        assert_eq!(screen.current_book().map(|b| b.id), Some(43));

        screen.cycle_testament();
        assert_eq!(screen.filter, CollectionFilter::All);
        assert_eq!(screen.books.len(), 3);
    }

    #[test]
    fn references_use_books_hidden_by_the_filter() {
        let mut screen = ScriptureScreen::new(vec![book(1, "Genesis"), book(43, "John")]);
        screen.cycle_testament();
        let hit = NormalizedVerse {
            collection_id: 43,
            section: 3,
            verse_number: 16,
            text: "For God so loved the world".to_string(),
        };
        assert_eq!(screen.reference(&hit), "John 3:16");
        assert_eq!(screen.book_name(70), "Book 70");
    }

    #[test]
    fn back_walks_up_the_levels() {
        let mut screen = ScriptureScreen::new(vec![book(43, "John")]);
        assert!(!screen.back());
        screen.open_book(book(43, "John"), vec![1, 3]);
        screen.open_chapter(3, Vec::new());
        assert!(screen.back());
        assert_eq!(screen.level, ScriptureLevel::Chapters);
        assert!(screen.back());
        assert_eq!(screen.level, ScriptureLevel::Books);
    }
}
