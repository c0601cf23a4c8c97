//! Interactive bounding-box editor for person-track annotation.
//!
//! The library half holds everything with behavior worth testing:
//! coordinate transforms, the label-file codec, the attribute table,
//! hit testing, the interaction state machine, undo, and the editing
//! session. The `app` module is the thin egui shell over all of it.

pub mod app;
pub mod attributes;
pub mod geometry;
pub mod hit;
pub mod interaction;
pub mod label;
pub mod session;
pub mod undo;

pub use attributes::Attributes;
pub use geometry::{BoxCoords, DisplayRect};
pub use hit::Corner;
pub use interaction::{DialogInput, EditError, Effect, Interaction, Mode};
pub use label::BoundingBox;
pub use session::{DEFAULT_SCALE, EditorSession, SessionError};
pub use undo::{DeletedFrameSnapshot, UndoManager};
