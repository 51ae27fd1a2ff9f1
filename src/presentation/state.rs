use std::sync::Arc;

use super::payload::{PayloadKind, PresentationPayload, TemplateSnapshot};

/// What the output surface is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Showing(String),
    Blackout,
}

/// Presentation state of one output surface.
///
/// Text and template are tracked separately: a template stays in effect until
/// a later `present` supplies a different one, while text is replaced or
/// dropped by every transition. Leaving `Blackout` requires a fresh `present`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationState {
    phase: Phase,
    template: Option<Arc<TemplateSnapshot>>,
    current: Option<PresentationPayload>,
}

impl PresentationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present(&mut self, text: impl Into<String>, template: Option<Arc<TemplateSnapshot>>) {
        if let Some(template) = template {
            self.template = Some(template);
        }
        self.phase = Phase::Showing(text.into());
    }

    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn blackout(&mut self) {
        self.phase = Phase::Blackout;
    }

    /// Apply a received payload and keep it as the single current payload.
    pub fn apply(&mut self, payload: PresentationPayload) {
        match payload.kind() {
            PayloadKind::Present => {
                let text = payload.text().unwrap_or_default().to_string();
                self.present(text, payload.template().cloned());
            }
            PayloadKind::Clear => self.clear(),
            PayloadKind::Blackout => self.blackout(),
        }
        self.current = Some(payload);
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Text currently on screen, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.phase {
            Phase::Showing(text) => Some(text),
            Phase::Idle | Phase::Blackout => None,
        }
    }

    /// Last known template. Retained through `clear` and `blackout`.
    pub fn template(&self) -> Option<&Arc<TemplateSnapshot>> {
        self.template.as_ref()
    }

    /// Most recently applied payload.
    pub fn current_payload(&self) -> Option<&PresentationPayload> {
        self.current.as_ref()
    }

    pub fn is_blacked_out(&self) -> bool {
        self.phase == Phase::Blackout
    }
}
