//! Per-frame label file codec.
//!
//! One line per box: `0 <track_id> <cx> <cy> <w> <h>`, the four floats
//! normalized against the frame's canonical dimensions. The leading
//! literal `0` is the single supported semantic class (person); the
//! second field is the cross-frame track id.

use std::fs;
use std::io;
use std::path::Path;

use crate::attributes::Attributes;
use crate::geometry::BoxCoords;

/// One person instance within one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub coords: BoxCoords,
    pub track_id: u32,
    pub attrs: Attributes,
}

impl BoundingBox {
    /// Fresh box as produced by a drag-release: unassigned id, empty attributes.
    pub fn new(coords: BoxCoords) -> Self {
        Self {
            coords,
            track_id: 0,
            attrs: Attributes::default(),
        }
    }
}

/// Parse label text into boxes. Lines that do not match the format are skipped.
pub fn decode(text: &str, img_w: u32, img_h: u32) -> Vec<BoundingBox> {
    let mut boxes = Vec::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 6 {
            continue;
        }
        let Ok(track_id) = parts[1].parse::<u32>() else {
            continue;
        };
        let (Ok(cx), Ok(cy), Ok(w), Ok(h)) = (
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
            parts[4].parse::<f64>(),
            parts[5].parse::<f64>(),
        ) else {
            continue;
        };

        let abs_w = w * img_w as f64;
        let abs_h = h * img_h as f64;
        let x = cx * img_w as f64 - abs_w / 2.0;
        let y = cy * img_h as f64 - abs_h / 2.0;

        boxes.push(BoundingBox {
            coords: BoxCoords::new(x as i32, y as i32, abs_w as i32, abs_h as i32),
            track_id,
            attrs: Attributes::default(),
        });
    }
    boxes
}

/// Serialize boxes in their current in-memory order, 6-decimal precision.
pub fn encode(boxes: &[BoundingBox], img_w: u32, img_h: u32) -> String {
    let mut out = String::new();
    for b in boxes {
        let c = b.coords;
        let cx = (c.x as f64 + c.w as f64 / 2.0) / img_w as f64;
        let cy = (c.y as f64 + c.h as f64 / 2.0) / img_h as f64;
        let w = c.w as f64 / img_w as f64;
        let h = c.h as f64 / img_h as f64;
        out.push_str(&format!(
            "0 {} {:.6} {:.6} {:.6} {:.6}\n",
            b.track_id, cx, cy, w, h
        ));
    }
    out
}

/// Read a frame's label file. A missing file means the detector found no
/// person in that frame, so it yields an empty list rather than an error.
pub fn read_label_file(path: &Path, img_w: u32, img_h: u32) -> io::Result<Vec<BoundingBox>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(decode(&text, img_w, img_h)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Overwrite the frame's label file with the current box list.
pub fn write_label_file(
    path: &Path,
    boxes: &[BoundingBox],
    img_w: u32,
    img_h: u32,
) -> io::Result<()> {
    fs::write(path, encode(boxes, img_w, img_h))
}
