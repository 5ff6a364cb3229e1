//! Raw input events as delivered by the host.
//!
//! Pointer positions are in screen (view) space; the controller converts them
//! to canvas space by removing the pan offset.

use serde::{Deserialize, Serialize};

use crate::model::Point;
use super::hit_test::EntityRef;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerEvent {
    Down { at: Point },
    Move { at: Point },
    Up { at: Point },
    DoubleClick { at: Point },
    /// Trackpad / wheel scroll; pans the canvas.
    Scroll { delta: Point },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCommand {
    /// Delete / Backspace / Forward-delete.
    Delete,
    Undo,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Escape,
    ToggleConnectionMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "target", rename_all = "camelCase")]
pub enum KeyOutcome {
    Handled,
    /// The host should ask the user before calling `delete_selected`.
    ConfirmDelete(EntityRef),
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event_json() {
        let ev: PointerEvent = serde_json::from_str(r#"{"type":"down","at":[10,20]}"#).unwrap();
        assert_eq!(ev, PointerEvent::Down { at: Point::new(10.0, 20.0) });

        let ev: PointerEvent = serde_json::from_str(r#"{"type":"doubleClick","at":[0,0]}"#).unwrap();
        assert!(matches!(ev, PointerEvent::DoubleClick { .. }));
    }

    #[test]
    fn test_key_command_json() {
        let key: KeyCommand = serde_json::from_str("\"toggleConnectionMode\"").unwrap();
        assert_eq!(key, KeyCommand::ToggleConnectionMode);
    }
}
