//! What the output surface shows: payloads sent by the control surface, the
//! template snapshots they carry, and the Idle/Showing/Blackout state machine
//! both sides use to interpret them.

mod payload;
mod render;
mod state;

pub use payload::{Background, PayloadKind, PresentationPayload, TemplateSnapshot, TextAlign};
pub use render::{render_presentation, template_colors};
pub use state::{Phase, PresentationState};
