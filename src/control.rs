//! Control-surface logic: what is selected, what is live, and what gets sent
//! to the output surface in response to operator actions.

use std::sync::Arc;

use thiserror::Error;

use crate::assets::{MediaEmbedder, MediaError};
use crate::models::{NormalizedVerse, Template};
use crate::presentation::{PresentationPayload, PresentationState, TemplateSnapshot};
use crate::transport::{Channel, Delivery, LifecycleEvent};
use crate::window::{DisplayHost, OpenOutcome, WindowError, WindowManager};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("template background could not be loaded")]
    Media(#[from] MediaError),
}

/// What the operator has picked. `active_verse_index` is -1 when the
/// selection did not come from an indexed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub active_collection: Option<i64>,
    pub active_section: Option<i64>,
    pub active_verse_index: i64,
    pub active_template: Option<Arc<TemplateSnapshot>>,
    pub is_live: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            active_collection: None,
            active_section: None,
            active_verse_index: -1,
            active_template: None,
            is_live: false,
        }
    }
}

pub struct LiveController<H: DisplayHost> {
    windows: WindowManager<H>,
    channel: Channel,
    selection: SelectionState,
    deck: Vec<NormalizedVerse>,
    selected: Option<NormalizedVerse>,
    mirror: PresentationState,
    last_live: Option<PresentationPayload>,
    resend_on_reopen: bool,
}

impl<H: DisplayHost> LiveController<H> {
    pub fn new(host: H, resend_on_reopen: bool) -> Self {
        Self {
            windows: WindowManager::new(host),
            channel: Channel::new(),
            selection: SelectionState::default(),
            deck: Vec::new(),
            selected: None,
            mirror: PresentationState::new(),
            last_live: None,
            resend_on_reopen,
        }
    }

    /// Replace the navigable sequence. Nothing is selected in it yet.
    pub fn load_deck(&mut self, collection_id: i64, section: Option<i64>, verses: Vec<NormalizedVerse>) {
        self.selection.active_collection = Some(collection_id);
        self.selection.active_section = section;
        self.selection.active_verse_index = -1;
        self.deck = verses;
    }

    /// Select the deck entry at `index`; sends it when live. Returns `false`
    /// for an index outside the deck.
    pub fn select_verse(&mut self, index: usize) -> bool {
        let Some(verse) = self.deck.get(index).cloned() else {
            return false;
        };
        self.selection.active_verse_index = index as i64;
        self.selection.active_section = Some(verse.section);
        self.selected = Some(verse);
        self.update_live();
        true
    }

    /// Select a verse that is not part of an indexed sequence, such as a
    /// search hit. Relative navigation is disabled until a deck is loaded.
    pub fn select_loose(&mut self, verse: NormalizedVerse) {
        self.deck.clear();
        self.selection.active_collection = Some(verse.collection_id);
        self.selection.active_section = Some(verse.section);
        self.selection.active_verse_index = -1;
        self.selected = Some(verse);
        self.update_live();
    }

    /// Make `template` the active template; resent immediately when live.
    pub fn set_template(&mut self, template: Option<Arc<TemplateSnapshot>>) {
        self.selection.active_template = template;
        self.update_live();
    }

    /// Resolve a stored template (embedding its media) and activate it.
    pub fn use_template(
        &mut self,
        template: &Template,
        embedder: &dyn MediaEmbedder,
    ) -> Result<Arc<TemplateSnapshot>, ControlError> {
        let snapshot = TemplateSnapshot::resolve(template, embedder)?;
        self.set_template(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    /// Open the output surface if needed and present the selected verse.
    /// Returns `Ok(false)` when nothing is selected.
    pub fn go_live(&mut self) -> Result<bool, ControlError> {
        let Some(verse) = &self.selected else {
            return Ok(false);
        };
        let payload =
            PresentationPayload::present(verse.text.clone(), self.selection.active_template.clone());
        self.windows.open_output()?;
        self.selection.is_live = true;
        self.send(payload);
        Ok(true)
    }

    /// Move within the deck by `delta`. Moves that would leave the deck are
    /// ignored; from an unselected deck, `+1` picks the first entry.
    pub fn navigate_verse(&mut self, delta: i64) -> bool {
        let target = self.selection.active_verse_index + delta;
        match usize::try_from(target) {
            Ok(index) if index < self.deck.len() => self.select_verse(index),
            _ => false,
        }
    }

    pub fn clear(&mut self) -> Delivery {
        self.send(PresentationPayload::clear())
    }

    pub fn blackout(&mut self) -> Delivery {
        self.send(PresentationPayload::blackout())
    }

    /// Open the output surface without going live.
    pub fn open_output(&mut self) -> Result<OpenOutcome, ControlError> {
        let outcome = self.windows.open_output()?;
        if let OpenOutcome::Created(_) = outcome {
            self.resend_after_reopen();
        }
        Ok(outcome)
    }

    /// Close the output surface; the presentation is no longer live.
    pub fn close_output(&mut self) -> bool {
        self.selection.is_live = false;
        self.windows.close_output()
    }

    /// Drain lifecycle events from the output surface. An externally closed
    /// surface does not end the live state.
    pub fn pump_events(&mut self) -> Vec<LifecycleEvent> {
        self.windows.poll_events()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn deck(&self) -> &[NormalizedVerse] {
        &self.deck
    }

    pub fn selected_verse(&self) -> Option<&NormalizedVerse> {
        self.selected.as_ref()
    }

    /// What the control surface last sent, for the preview pane.
    pub fn mirror(&self) -> &PresentationState {
        &self.mirror
    }

    pub fn is_live(&self) -> bool {
        self.selection.is_live
    }

    pub fn is_output_open(&self) -> bool {
        self.windows.is_output_open()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn windows(&self) -> &WindowManager<H> {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowManager<H> {
        &mut self.windows
    }

    fn update_live(&mut self) {
        if !self.selection.is_live {
            return;
        }
        if let Some(verse) = &self.selected {
            let payload = PresentationPayload::present(
                verse.text.clone(),
                self.selection.active_template.clone(),
            );
            self.send(payload);
        }
    }

    fn resend_after_reopen(&mut self) {
        if !self.resend_on_reopen {
            return;
        }
        if let Some(payload) = self.last_live.clone() {
            tracing::debug!("resending last live payload to new output surface");
            self.send(payload);
        }
    }

    fn send(&mut self, payload: PresentationPayload) -> Delivery {
        self.mirror.apply(payload.clone());
        if self.selection.is_live {
            self.last_live = Some(payload.clone());
        }
        self.channel.send(self.windows.output_sender(), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::HeadlessHost;

    fn verse(number: i64, text: &str) -> NormalizedVerse {
        NormalizedVerse {
            collection_id: 7,
            section: number,
            verse_number: number,
            text: text.to_string(),
        }
    }

    fn controller() -> LiveController<HeadlessHost> {
        let mut controller = LiveController::new(HeadlessHost::new(2), false);
        controller.load_deck(
            7,
            None,
            vec![verse(1, "first"), verse(2, "second"), verse(3, "third")],
        );
        controller
    }

    #[test]
    fn go_live_without_selection_does_nothing() {
        let mut controller = controller();
        assert!(!controller.go_live().unwrap());
        assert!(!controller.is_live());
        assert!(!controller.is_output_open());
    }

    #[test]
    fn navigation_from_unselected_deck_starts_at_first() {
        let mut controller = controller();
        assert_eq!(controller.selection().active_verse_index, -1);
        assert!(!controller.navigate_verse(-1));
        assert!(controller.navigate_verse(1));
        assert_eq!(controller.selected_verse().map(|v| v.verse_number), Some(1));
    }

    #[test]
    fn navigation_is_clamped() {
        let mut controller = controller();
        assert!(controller.select_verse(2));
        assert!(!controller.navigate_verse(1));
        assert_eq!(controller.selection().active_verse_index, 2);
        assert!(controller.navigate_verse(-1));
        assert_eq!(controller.selection().active_verse_index, 1);
        assert!(!controller.select_verse(10));
    }

    #[test]
    fn loose_selection_disables_navigation() {
        let mut controller = controller();
        controller.select_loose(verse(16, "For God so loved the world"));
        assert_eq!(controller.selection().active_verse_index, -1);
        assert!(!controller.navigate_verse(1));
        assert!(controller.deck().is_empty());
    }

    #[test]
    fn selection_is_not_sent_before_going_live() {
        let mut controller = controller();
        controller.select_verse(0);
        assert_eq!(controller.channel().queued(), 0);
        assert!(controller.mirror().current_payload().is_none());
    }

    #[test]
    fn going_live_sends_and_navigation_follows() {
        let mut controller = controller();
        controller.select_verse(0);
        assert!(controller.go_live().unwrap());
        assert!(controller.is_output_open());
        controller.navigate_verse(1);
        assert_eq!(controller.mirror().text(), Some("second"));
        assert_eq!(controller.channel().queued(), 2);
    }

    #[test]
    fn clear_without_surface_is_dropped() {
        let mut controller = controller();
        assert_eq!(controller.clear(), Delivery::Dropped);
        assert_eq!(controller.blackout(), Delivery::Dropped);
    }

    #[test]
    fn close_output_ends_live() {
        let mut controller = controller();
        controller.select_verse(0);
        controller.go_live().unwrap();
        assert!(controller.close_output());
        assert!(!controller.is_live());
        assert!(!controller.is_output_open());
    }

    #[test]
    fn only_live_payloads_are_resent_on_reopen() {
        let mut controller = LiveController::new(HeadlessHost::new(2), true);
        controller.load_deck(7, None, vec![verse(1, "first"), verse(2, "second")]);

        assert_eq!(controller.blackout(), Delivery::Dropped);
        assert!(matches!(controller.open_output(), Ok(OpenOutcome::Created(_))));
        assert_eq!(controller.channel().queued(), 0);

        controller.select_verse(0);
        assert!(controller.go_live().unwrap());
        assert_eq!(controller.channel().queued(), 1);

        controller.close_output();
        assert_eq!(controller.blackout(), Delivery::Dropped);
        assert!(matches!(controller.open_output(), Ok(OpenOutcome::Created(_))));
        assert_eq!(controller.channel().queued(), 2);
        assert_eq!(controller.mirror().text(), Some("first"));
    }

    #[test]
    fn go_live_reports_missing_display() {
        let mut controller = LiveController::new(HeadlessHost::new(0), false);
        controller.load_deck(1, None, vec![verse(1, "x")]);
        controller.select_verse(0);
        assert!(matches!(
            controller.go_live(),
            Err(ControlError::Window(WindowError::NoDisplay))
        ));
        assert!(!controller.is_live());
    }
}
