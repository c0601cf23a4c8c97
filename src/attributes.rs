//! Cross-frame attribute table: `(frame_id, class_id) -> color/action/gender`.
//!
//! The CSV file is the canonical store; box attribute fields are a
//! working-set cache hydrated from it on frame load and flushed back on
//! save. Saving is a full read-merge-rewrite so the table never grows
//! duplicate `(frame_id, class_id)` rows.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::label::BoundingBox;

/// Free-text attributes of one tracked person in one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub color: String,
    pub action: String,
    pub gender: String,
}

/// Key into the table. `class_id` is the track id, not a detector class label.
pub type AttributeKey = (usize, u32);

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    frame_id: usize,
    class_id: u32,
    color: String,
    action: String,
    gender: String,
}

/// Create the table file with its header row if it does not exist yet.
pub fn ensure_table(path: &Path) -> Result<(), csv::Error> {
    if path.exists() {
        return Ok(());
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(["frame_id", "class_id", "color", "action", "gender"])?;
    wtr.flush()?;
    Ok(())
}

/// Read all records in file order. A missing file reads as empty.
pub fn load_rows(path: &Path) -> Result<Vec<(AttributeKey, Attributes)>, csv::Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize::<Row>() {
        let row = result?;
        rows.push((
            (row.frame_id, row.class_id),
            Attributes {
                color: row.color,
                action: row.action,
                gender: row.gender,
            },
        ));
    }
    Ok(rows)
}

/// Attributes visible on the given frame, by track id.
///
/// A record for exactly `frame_index` wins; otherwise the track keeps the
/// last record seen for it in file order, so attributes persist across
/// frames where the track was not re-edited.
pub fn attributes_for_frame(
    rows: &[(AttributeKey, Attributes)],
    frame_index: usize,
) -> HashMap<u32, Attributes> {
    let mut exact: HashMap<u32, Attributes> = HashMap::new();
    let mut fallback: HashMap<u32, Attributes> = HashMap::new();
    for ((frame_id, track_id), attrs) in rows {
        if *frame_id == frame_index {
            exact.insert(*track_id, attrs.clone());
        } else {
            fallback.insert(*track_id, attrs.clone());
        }
    }
    for (track_id, attrs) in exact {
        fallback.insert(track_id, attrs);
    }
    fallback
}

/// Copy stored attributes onto the boxes of the current frame.
pub fn hydrate_boxes(boxes: &mut [BoundingBox], visible: &HashMap<u32, Attributes>) {
    for b in boxes {
        if let Some(attrs) = visible.get(&b.track_id) {
            b.attrs = attrs.clone();
        }
    }
}

/// Full read-merge-rewrite save.
///
/// Keeps only records whose frame is still in range (stale rows from
/// deleted frames are dropped), upserts one record per current-frame box
/// with an assigned id, and rewrites the whole table in key order. Track
/// id 0 is the unassigned sentinel and is never persisted.
pub fn save(
    path: &Path,
    frame_count: usize,
    frame_index: usize,
    boxes: &[BoundingBox],
) -> Result<(), csv::Error> {
    let mut merged: BTreeMap<AttributeKey, Attributes> = BTreeMap::new();
    for (key, attrs) in load_rows(path)? {
        if key.0 < frame_count {
            merged.insert(key, attrs);
        }
    }

    for b in boxes {
        if b.track_id == 0 {
            continue;
        }
        merged.insert((frame_index, b.track_id), b.attrs.clone());
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(["frame_id", "class_id", "color", "action", "gender"])?;
    for ((frame_id, class_id), attrs) in merged {
        wtr.serialize(Row {
            frame_id,
            class_id,
            color: attrs.color,
            action: attrs.action,
            gender: attrs.gender,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::geometry::BoxCoords;

    fn bbox(track_id: u32, color: &str, action: &str, gender: &str) -> BoundingBox {
        BoundingBox {
            coords: BoxCoords::new(0, 0, 10, 10),
            track_id,
            attrs: Attributes {
                color: color.into(),
                action: action.into(),
                gender: gender.into(),
            },
        }
    }

    #[test]
    fn ensure_table_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        ensure_table(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        assert!(first.starts_with("frame_id,class_id,color,action,gender"));
        ensure_table(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        ensure_table(&path).unwrap();
        save(&path, 5, 0, &[bbox(3, "red", "walking", "")]).unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, (0, 3));
        assert_eq!(rows[0].1.color, "red");
        assert_eq!(rows[0].1.action, "walking");
        assert_eq!(rows[0].1.gender, "");
    }

    #[test]
    fn unassigned_boxes_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        save(&path, 5, 0, &[bbox(0, "red", "walking", "male")]).unwrap();
        assert!(load_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn repeated_save_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        let boxes = vec![bbox(2, "blue", "standing", "female"), bbox(9, "red", "", "")];
        save(&path, 3, 1, &boxes).unwrap();
        let first = fs::read(&path).unwrap();
        save(&path, 3, 1, &boxes).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn save_upserts_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        save(&path, 3, 1, &[bbox(2, "blue", "standing", "")]).unwrap();
        save(&path, 3, 1, &[bbox(2, "green", "running", "")]).unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.color, "green");
    }

    #[test]
    fn save_drops_records_for_frames_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        save(&path, 5, 4, &[bbox(1, "red", "", "")]).unwrap();
        // Frame 4 was deleted; table now spans 4 frames.
        save(&path, 4, 0, &[bbox(2, "blue", "", "")]).unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, (0, 2));
    }

    #[test]
    fn exact_frame_record_beats_fallback() {
        let rows = vec![
            ((0, 7), Attributes { color: "red".into(), action: "walking".into(), gender: "".into() }),
            ((1, 7), Attributes { color: "blue".into(), action: "sitting".into(), gender: "".into() }),
        ];
        let visible = attributes_for_frame(&rows, 0);
        assert_eq!(visible[&7].color, "red");
    }

    #[test]
    fn fallback_is_last_record_in_file_order() {
        let rows = vec![
            ((0, 7), Attributes { color: "red".into(), action: "".into(), gender: "".into() }),
            ((3, 7), Attributes { color: "blue".into(), action: "".into(), gender: "".into() }),
        ];
        let visible = attributes_for_frame(&rows, 5);
        assert_eq!(visible[&7].color, "blue");
    }

    #[test]
    fn free_text_with_commas_survives_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements_0.csv");
        save(&path, 2, 0, &[bbox(1, "red, faded", "walking, fast", "")]).unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows[0].1.color, "red, faded");
        assert_eq!(rows[0].1.action, "walking, fast");
    }
}
