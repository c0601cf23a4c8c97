//! Undo support: per-frame box-delete stacks plus the single-slot
//! whole-frame delete buffer. Both live in memory only for the session.

use std::collections::HashMap;

use crate::label::BoundingBox;

/// Raw payload of a deleted frame, enough to rebuild both files on disk.
#[derive(Clone, Debug)]
pub struct DeletedFrameSnapshot {
    pub original_index: usize,
    pub frame_name: String,
    pub image_bytes: Vec<u8>,
    /// None when the frame never had a label file.
    pub label_text: Option<String>,
}

#[derive(Default)]
pub struct UndoManager {
    deleted_boxes: HashMap<String, Vec<BoundingBox>>,
    frame_slot: Option<DeletedFrameSnapshot>,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_deleted(&mut self, frame_name: &str, bbox: BoundingBox) {
        self.deleted_boxes
            .entry(frame_name.to_string())
            .or_default()
            .push(bbox);
    }

    /// Pop the most recently deleted box for this frame, if any. The
    /// caller re-appends it to the live list.
    pub fn pop_deleted(&mut self, frame_name: &str) -> Option<BoundingBox> {
        self.deleted_boxes.get_mut(frame_name)?.pop()
    }

    /// Buffer a frame about to be deleted. A second deletion overwrites
    /// the slot; whole-frame undo is single-level by design of the tool.
    pub fn buffer_frame(&mut self, snapshot: DeletedFrameSnapshot) {
        self.frame_slot = Some(snapshot);
    }

    /// Take the buffered frame, clearing the slot.
    pub fn take_frame(&mut self) -> Option<DeletedFrameSnapshot> {
        self.frame_slot.take()
    }

    pub fn has_buffered_frame(&self) -> bool {
        self.frame_slot.is_some()
    }
}
