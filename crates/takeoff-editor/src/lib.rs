pub mod autopan;
pub mod config;
pub mod edit;
pub mod engine;
pub mod events;
pub mod input;
pub mod selection;
pub mod shortcuts;
pub mod tools;

pub use autopan::{AutoPanController, AutoPanSettings};
pub use config::{ConfigError, EngineConfig};
pub use edit::{EditKind, ShapeEdit, ShapeEditor};
pub use engine::{CursorHint, Engine};
pub use events::EngineEvent;
pub use input::{InputEvent, Modifiers, PointerButton};
pub use selection::{Selection, SelectionManager};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{CalibrationState, DrawingSession, SessionKind, Tool, ToolKind};
