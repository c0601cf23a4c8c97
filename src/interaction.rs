//! Pointer/keyboard editing state machine.
//!
//! The machine owns no file IO and no widget handles: it takes pointer
//! positions in display space, mutates the frame's canonical-space box
//! list, and reports side effects (dialog requests) for the shell to act
//! on. The five modes mirror how the editor feels to use: nothing held,
//! hold-key armed, rubber-banding a new box, dragging a corner, or
//! parked behind a modal dialog.

use thiserror::Error;

use crate::attributes::Attributes;
use crate::geometry::{self, BoxCoords, DisplayRect};
use crate::hit::{self, Corner, Hit};
use crate::label::BoundingBox;
use crate::undo::UndoManager;

/// Pixel tolerance for grabbing a resize handle.
pub const CORNER_MARGIN: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    Idle,
    /// Hold-key down; the next pointer-down starts a rubber band.
    Armed,
    Drawing {
        start: (f32, f32),
        current: (f32, f32),
    },
    Resizing {
        index: usize,
        corner: Corner,
    },
    /// Modal edit dialog open on one box; canvas input is ignored.
    Dialog {
        index: usize,
    },
}

/// Side effect the shell must perform after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    OpenDialog { index: usize },
}

/// Raw dialog field contents as typed by the user.
#[derive(Clone, Debug, Default)]
pub struct DialogInput {
    pub track_id: String,
    pub color: String,
    pub action: String,
    pub gender: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("track id must be a non-negative integer")]
    NonNumericId,
    #[error("ID {0} already exists in this frame. Please choose a unique ID.")]
    DuplicateId(u32),
}

pub struct Interaction {
    mode: Mode,
    pub corner_margin: f32,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            corner_margin: CORNER_MARGIN,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dialog_index(&self) -> Option<usize> {
        match self.mode {
            Mode::Dialog { index } => Some(index),
            _ => None,
        }
    }

    /// Track the hold-key. Only toggles between Idle and Armed; a drag or
    /// dialog already in progress is unaffected.
    pub fn set_armed(&mut self, armed: bool) {
        match (self.mode, armed) {
            (Mode::Idle, true) => self.mode = Mode::Armed,
            (Mode::Armed, false) => self.mode = Mode::Idle,
            _ => {}
        }
    }

    pub fn pointer_down(
        &mut self,
        pos: (f32, f32),
        boxes: &[BoundingBox],
        scale: f32,
    ) -> Option<Effect> {
        match self.mode {
            Mode::Armed => {
                self.mode = Mode::Drawing {
                    start: pos,
                    current: pos,
                };
                None
            }
            Mode::Idle => {
                let rects: Vec<DisplayRect> = boxes
                    .iter()
                    .map(|b| geometry::to_display(b.coords, scale))
                    .collect();
                match hit::scan(pos.0, pos.1, &rects, self.corner_margin) {
                    Some(Hit::Corner { index, corner }) => {
                        self.mode = Mode::Resizing { index, corner };
                        None
                    }
                    Some(Hit::Interior { index }) => {
                        self.mode = Mode::Dialog { index };
                        Some(Effect::OpenDialog { index })
                    }
                    None => None,
                }
            }
            _ => None,
        }
    }

    pub fn pointer_drag(&mut self, pos: (f32, f32), boxes: &mut [BoundingBox], scale: f32) {
        match self.mode {
            Mode::Drawing { start, .. } => {
                self.mode = Mode::Drawing {
                    start,
                    current: pos,
                };
            }
            Mode::Resizing { index, corner } => {
                if let Some(b) = boxes.get_mut(index) {
                    let (px, py) = geometry::point_to_canonical(pos.0, pos.1, scale);
                    resize_box(&mut b.coords, corner, px, py);
                }
            }
            _ => {}
        }
    }

    pub fn pointer_up(
        &mut self,
        pos: (f32, f32),
        boxes: &mut Vec<BoundingBox>,
        scale: f32,
    ) -> Option<Effect> {
        match self.mode {
            Mode::Drawing { start, .. } => {
                let rect = DisplayRect::new(
                    start.0.min(pos.0),
                    start.1.min(pos.1),
                    (pos.0 - start.0).abs(),
                    (pos.1 - start.1).abs(),
                );
                let mut coords = geometry::to_canonical(rect, scale);
                coords.w = coords.w.max(1);
                coords.h = coords.h.max(1);
                boxes.push(BoundingBox::new(coords));
                let index = boxes.len() - 1;
                self.mode = Mode::Dialog { index };
                Some(Effect::OpenDialog { index })
            }
            Mode::Resizing { .. } => {
                self.mode = Mode::Idle;
                None
            }
            _ => None,
        }
    }

    /// Live rubber-band rectangle while drawing, for the shell to paint.
    pub fn rubber_band(&self) -> Option<DisplayRect> {
        match self.mode {
            Mode::Drawing { start, current } => Some(DisplayRect::new(
                start.0.min(current.0),
                start.1.min(current.1),
                (current.0 - start.0).abs(),
                (current.1 - start.1).abs(),
            )),
            _ => None,
        }
    }

    /// Hover affordance: is the idle pointer over any resize handle?
    pub fn hovering_corner(&self, pos: (f32, f32), boxes: &[BoundingBox], scale: f32) -> bool {
        if self.mode != Mode::Idle {
            return false;
        }
        boxes.iter().any(|b| {
            hit::is_near_corner(
                pos.0,
                pos.1,
                geometry::to_display(b.coords, scale),
                self.corner_margin,
            )
        })
    }

    /// Open the edit dialog on a box directly (info-panel click path).
    pub fn open_dialog(&mut self, index: usize) -> Option<Effect> {
        if matches!(self.mode, Mode::Idle | Mode::Armed) {
            self.mode = Mode::Dialog { index };
            Some(Effect::OpenDialog { index })
        } else {
            None
        }
    }

    /// Commit the dialog. On error the dialog stays open and the box is
    /// left exactly as it was.
    pub fn dialog_update(
        &mut self,
        boxes: &mut [BoundingBox],
        input: &DialogInput,
    ) -> Result<(), EditError> {
        let Mode::Dialog { index } = self.mode else {
            return Ok(());
        };
        let id: u32 = input
            .track_id
            .trim()
            .parse()
            .map_err(|_| EditError::NonNumericId)?;
        if boxes
            .iter()
            .enumerate()
            .any(|(i, b)| i != index && b.track_id == id)
        {
            return Err(EditError::DuplicateId(id));
        }
        let Some(b) = boxes.get_mut(index) else {
            return Ok(());
        };
        b.track_id = id;
        b.attrs = Attributes {
            color: input.color.clone(),
            action: input.action.clone(),
            gender: input.gender.clone(),
        };
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Delete the dialog's box, pushing it on the frame's undo stack.
    pub fn dialog_delete(
        &mut self,
        boxes: &mut Vec<BoundingBox>,
        undo: &mut UndoManager,
        frame_name: &str,
    ) {
        if let Mode::Dialog { index } = self.mode {
            if index < boxes.len() {
                let removed = boxes.remove(index);
                undo.push_deleted(frame_name, removed);
            }
            self.mode = Mode::Idle;
        }
    }

    /// Close the dialog and go straight into resizing its box, no fresh
    /// corner pointer-down required. Grabs the bottom-right handle.
    pub fn dialog_enter_resize(&mut self) {
        if let Mode::Dialog { index } = self.mode {
            self.mode = Mode::Resizing {
                index,
                corner: Corner::BottomRight,
            };
        }
    }

    /// Dismiss the dialog without committing anything.
    pub fn dialog_cancel(&mut self) {
        if matches!(self.mode, Mode::Dialog { .. }) {
            self.mode = Mode::Idle;
        }
    }

    /// Drop any in-progress gesture, e.g. when the frame changes under it.
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
    }
}

/// Recompute coords so the corner opposite the dragged one stays fixed,
/// with width and height clamped to at least one pixel.
fn resize_box(c: &mut BoxCoords, corner: Corner, px: i32, py: i32) {
    match corner {
        Corner::TopLeft => {
            let right = c.right();
            let bottom = c.bottom();
            let nx = px.min(right - 1);
            let ny = py.min(bottom - 1);
            c.x = nx;
            c.y = ny;
            c.w = right - nx;
            c.h = bottom - ny;
        }
        Corner::BottomRight => {
            c.w = (px - c.x).max(1);
            c.h = (py - c.y).max(1);
        }
        Corner::TopRight => {
            let bottom = c.bottom();
            let ny = py.min(bottom - 1);
            c.y = ny;
            c.h = bottom - ny;
            c.w = (px - c.x).max(1);
        }
        Corner::BottomLeft => {
            let right = c.right();
            let nx = px.min(right - 1);
            c.x = nx;
            c.w = right - nx;
            c.h = (py - c.y).max(1);
        }
    }
}
