//! Terminal presentation for the glassbox coding agent.
//!
//! Output is append-only: every user turn, model reply and tool call is
//! printed as a titled, color-coded panel, and status lines sit between them.
//! Nothing is redrawn, so scrollback doubles as a readable log of the session.

pub mod console;
pub mod panel;
pub mod terminal;
pub mod text;
pub mod theme;

pub use console::{Console, Recorded, RecordingUi, Ui};
pub use panel::Panel;
pub use theme::Tone;
