//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s so the WASM
//! bridge and native hosts share one binding table.
//!
//! - Single letters switch tools
//! - Escape cancels the gesture in progress
//! - Backspace/Delete peel the last vertex while drawing
//! - Space held = temporary pan

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    ToolSelect,
    ToolPaintSelect,
    ToolCreate,
    ToolLine,
    ToolPoint,
    ToolCalibrate,
    ToolSplit,
    ToolPan,

    // ── Drawing ──
    /// Finish the polygon in progress (Enter).
    Complete,
    /// Drop the last vertex (⌘Z while drawing).
    UndoVertex,
    /// Backspace/Delete: drop the last vertex while drawing, else delete
    /// the selection.
    Delete,
    Cancel,

    // ── Selection ──
    SelectAll,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    PanStart,
    PanEnd,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key-down to an action. `None` if the combo is unbound.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        if modifiers.command() {
            return match key {
                "z" | "Z" if !modifiers.shift => Some(ShortcutAction::UndoVertex),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomToFit),
                _ => None,
            };
        }

        match key {
            "Escape" => return Some(ShortcutAction::Cancel),
            "Enter" => return Some(ShortcutAction::Complete),
            "Delete" | "Backspace" => return Some(ShortcutAction::Delete),
            " " => return Some(ShortcutAction::PanStart),
            _ => {}
        }

        if modifiers.shift || modifiers.alt {
            return None;
        }

        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "b" | "B" => Some(ShortcutAction::ToolPaintSelect),
            "p" | "P" => Some(ShortcutAction::ToolCreate),
            "l" | "L" => Some(ShortcutAction::ToolLine),
            "c" | "C" => Some(ShortcutAction::ToolPoint),
            "k" | "K" => Some(ShortcutAction::ToolCalibrate),
            "x" | "X" => Some(ShortcutAction::ToolSplit),
            "h" | "H" => Some(ShortcutAction::ToolPan),
            _ => None,
        }
    }

    /// Resolve a key-up. Only releasing Space means anything.
    pub fn resolve_release(key: &str) -> Option<ShortcutAction> {
        (key == " ").then_some(ShortcutAction::PanEnd)
    }
}
