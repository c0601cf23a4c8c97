//! Editing session: frame sequence, directory convention, navigation
//! with autosave, and whole-frame deletion.
//!
//! The on-disk layout is the one the extraction/detection stage
//! produces: `<root>/images/<sub>` holds the numbered frame PNGs,
//! `<root>/labels_with_ids/<sub>` the per-frame label files, and
//! `<root>/elements/elements_<k>.csv` the attribute table, `<k>` being
//! the last character of the subfolder name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::glob;
use thiserror::Error;

use crate::attributes;
use crate::label::{self, BoundingBox};
use crate::undo::{DeletedFrameSnapshot, UndoManager};

/// Fixed render scale; frames from CCTV footage are larger than the screen.
pub const DEFAULT_SCALE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Images folder not found: {0}")]
    ImagesDirMissing(PathBuf),
    #[error("Labels folder not found: {0}")]
    LabelDirMissing(PathBuf),
    #[error("Elements folder not found: {0}")]
    ElementsDirMissing(PathBuf),
    #[error("failed to list frames: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("attribute table error: {0}")]
    Csv(#[from] csv::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The three locations derived from the chosen images folder.
#[derive(Clone, Debug)]
pub struct SessionPaths {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub elements_file: PathBuf,
}

/// Resolve labels and elements locations from the images folder, failing
/// with a configuration error when either derived directory is absent.
pub fn derive_paths(images_dir: &Path) -> Result<SessionPaths, SessionError> {
    if !images_dir.is_dir() {
        return Err(SessionError::ImagesDirMissing(images_dir.to_path_buf()));
    }
    let sub = images_dir
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SessionError::ImagesDirMissing(images_dir.to_path_buf()))?
        .to_string();
    let root = images_dir
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| SessionError::ImagesDirMissing(images_dir.to_path_buf()))?;

    let labels_dir = root.join("labels_with_ids").join(&sub);
    if !labels_dir.is_dir() {
        return Err(SessionError::LabelDirMissing(labels_dir));
    }

    let elements_dir = root.join("elements");
    if !elements_dir.is_dir() {
        return Err(SessionError::ElementsDirMissing(elements_dir));
    }
    let suffix = sub.chars().last().unwrap_or('0');
    let elements_file = elements_dir.join(format!("elements_{suffix}.csv"));
    attributes::ensure_table(&elements_file)?;

    Ok(SessionPaths {
        images_dir: images_dir.to_path_buf(),
        labels_dir,
        elements_file,
    })
}

pub struct EditorSession {
    paths: SessionPaths,
    frames: Vec<String>,
    current: usize,
    pub boxes: Vec<BoundingBox>,
    canonical_size: (u32, u32),
    scale: f32,
    pub undo: UndoManager,
}

impl EditorSession {
    /// Open a session on an images folder and load its first frame.
    pub fn open(images_dir: &Path, scale: f32) -> Result<Self, SessionError> {
        let paths = derive_paths(images_dir)?;
        let mut frames = Vec::new();
        let pattern = paths.images_dir.join("*.png");
        for entry in glob(&pattern.to_string_lossy())? {
            let Ok(path) = entry else { continue };
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                frames.push(name.to_string());
            }
        }
        frames.sort();
        tracing::info!(
            "opened {} with {} frames",
            paths.images_dir.display(),
            frames.len()
        );

        let mut session = Self {
            paths,
            frames,
            current: 0,
            boxes: Vec::new(),
            canonical_size: (0, 0),
            scale,
            undo: UndoManager::new(),
        };
        if !session.frames.is_empty() {
            session.load_current()?;
        }
        Ok(session)
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_frame_name(&self) -> Option<&str> {
        self.frames.get(self.current).map(String::as_str)
    }

    pub fn canonical_size(&self) -> (u32, u32) {
        self.canonical_size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn image_path(&self, frame_name: &str) -> PathBuf {
        self.paths.images_dir.join(frame_name)
    }

    pub fn label_path(&self, frame_name: &str) -> PathBuf {
        self.paths
            .labels_dir
            .join(Path::new(frame_name).with_extension("txt"))
    }

    /// Hydrate the working set for the current frame: native image size,
    /// geometric boxes from the label file, attributes from the table.
    pub fn load_current(&mut self) -> Result<(), SessionError> {
        let Some(name) = self.current_frame_name().map(str::to_string) else {
            self.boxes.clear();
            return Ok(());
        };
        let image_path = self.image_path(&name);
        self.canonical_size = image::image_dimensions(&image_path)?;
        let (w, h) = self.canonical_size;
        self.boxes = label::read_label_file(&self.label_path(&name), w, h)?;

        let rows = attributes::load_rows(&self.paths.elements_file)?;
        let visible = attributes::attributes_for_frame(&rows, self.current);
        attributes::hydrate_boxes(&mut self.boxes, &visible);
        tracing::info!("loaded frame {} ({} boxes)", name, self.boxes.len());
        Ok(())
    }

    /// Flush the current frame: overwrite its label file and merge its
    /// attributes into the table.
    pub fn save_current(&self) -> Result<(), SessionError> {
        let Some(name) = self.current_frame_name() else {
            return Ok(());
        };
        let (w, h) = self.canonical_size;
        label::write_label_file(&self.label_path(name), &self.boxes, w, h)?;
        attributes::save(
            &self.paths.elements_file,
            self.frames.len(),
            self.current,
            &self.boxes,
        )?;
        tracing::info!("saved frame {} ({} boxes)", name, self.boxes.len());
        Ok(())
    }

    /// Save, then step forward with wraparound, then load.
    pub fn next(&mut self) -> Result<(), SessionError> {
        if self.frames.is_empty() {
            return Ok(());
        }
        self.save_current()?;
        self.current = (self.current + 1) % self.frames.len();
        self.load_current()
    }

    /// Save, then step backward with wraparound, then load.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        if self.frames.is_empty() {
            return Ok(());
        }
        self.save_current()?;
        self.current = (self.current + self.frames.len() - 1) % self.frames.len();
        self.load_current()
    }

    /// Restore the most recently deleted box of the current frame.
    pub fn undo_last_box_delete(&mut self) -> bool {
        let Some(name) = self.current_frame_name().map(str::to_string) else {
            return false;
        };
        match self.undo.pop_deleted(&name) {
            Some(bbox) => {
                self.boxes.push(bbox);
                true
            }
            None => false,
        }
    }

    /// Delete the current frame's image and label files, buffering their
    /// raw bytes for a single-level undo.
    ///
    /// The two removals are independent; if one fails the in-memory list
    /// is still updated and the error is reported. The buffer is filled
    /// before anything is removed, so undo always reconstructs the full
    /// pre-delete state.
    pub fn delete_frame(&mut self) -> Result<(), SessionError> {
        let Some(name) = self.current_frame_name().map(str::to_string) else {
            return Ok(());
        };
        let image_path = self.image_path(&name);
        let label_path = self.label_path(&name);

        let image_bytes = fs::read(&image_path)?;
        let label_text = match fs::read_to_string(&label_path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.undo.buffer_frame(DeletedFrameSnapshot {
            original_index: self.current,
            frame_name: name.clone(),
            image_bytes,
            label_text: label_text.clone(),
        });

        let mut first_err: Option<SessionError> = None;
        if let Err(e) = fs::remove_file(&image_path) {
            tracing::warn!("failed to delete image {}: {e}", image_path.display());
            first_err = Some(e.into());
        }
        if label_text.is_some() {
            if let Err(e) = fs::remove_file(&label_path) {
                tracing::warn!("failed to delete label {}: {e}", label_path.display());
                first_err.get_or_insert(e.into());
            }
        }

        self.frames.remove(self.current);
        if !self.frames.is_empty() && self.current >= self.frames.len() {
            self.current = self.frames.len() - 1;
        }
        tracing::info!("deleted frame {name}, {} frames left", self.frames.len());
        if self.frames.is_empty() {
            self.boxes.clear();
        } else {
            self.load_current()?;
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rebuild the buffered frame's files, re-insert it at its original
    /// index and move there. Returns false when the slot is empty.
    ///
    /// The slot is cleared only once both files are back on disk; a
    /// failed write puts the snapshot back so the undo can be retried.
    pub fn undo_delete_frame(&mut self) -> Result<bool, SessionError> {
        let Some(snap) = self.undo.take_frame() else {
            return Ok(false);
        };
        if let Err(e) = fs::write(self.image_path(&snap.frame_name), &snap.image_bytes) {
            self.undo.buffer_frame(snap);
            return Err(e.into());
        }
        let label_written = match &snap.label_text {
            Some(text) => fs::write(self.label_path(&snap.frame_name), text),
            None => Ok(()),
        };
        if let Err(e) = label_written {
            self.undo.buffer_frame(snap);
            return Err(e.into());
        }
        let index = snap.original_index.min(self.frames.len());
        self.frames.insert(index, snap.frame_name.clone());
        self.current = index;
        tracing::info!("restored frame {} at index {index}", snap.frame_name);
        self.load_current()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::geometry::BoxCoords;

    /// Lay out `<root>/images/0000` etc. with tiny generated PNGs.
    fn fixture(frame_count: usize) -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images").join("0000");
        let labels = root.path().join("labels_with_ids").join("0000");
        let elements = root.path().join("elements");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::create_dir_all(&elements).unwrap();
        for i in 0..frame_count {
            let img = image::RgbaImage::new(160, 120);
            img.save(images.join(format!("{i:06}.png"))).unwrap();
        }
        (root, images)
    }

    #[test]
    fn missing_labels_dir_is_a_config_error() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images").join("0000");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(root.path().join("elements")).unwrap();
        let err = derive_paths(&images).unwrap_err();
        assert!(matches!(err, SessionError::LabelDirMissing(_)));
    }

    #[test]
    fn missing_elements_dir_is_a_config_error() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images").join("0000");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(root.path().join("labels_with_ids").join("0000")).unwrap();
        let err = derive_paths(&images).unwrap_err();
        assert!(matches!(err, SessionError::ElementsDirMissing(_)));
    }

    #[test]
    fn elements_file_name_uses_subfolder_suffix() {
        let (_root, images) = fixture(1);
        let paths = derive_paths(&images).unwrap();
        assert!(paths.elements_file.ends_with("elements_0.csv"));
        assert!(paths.elements_file.exists());
    }

    #[test]
    fn open_enumerates_frames_sorted() {
        let (_root, images) = fixture(3);
        let session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        assert_eq!(session.frame_count(), 3);
        assert_eq!(session.current_frame_name(), Some("000000.png"));
        assert_eq!(session.canonical_size(), (160, 120));
    }

    #[test]
    fn missing_label_file_loads_as_zero_boxes() {
        let (_root, images) = fixture(1);
        let session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        assert!(session.boxes.is_empty());
    }

    #[test]
    fn navigation_wraps_and_saves() {
        let (_root, images) = fixture(2);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        let mut b = BoundingBox::new(BoxCoords::new(20, 20, 80, 80));
        b.track_id = 3;
        b.attrs = Attributes {
            color: "red".into(),
            action: "walking".into(),
            gender: "".into(),
        };
        session.boxes.push(b);
        session.next().unwrap();
        assert_eq!(session.current_index(), 1);
        // Wraparound back to frame 0, whose just-saved box must be there.
        session.next().unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.boxes.len(), 1);
        assert_eq!(session.boxes[0].track_id, 3);
        assert_eq!(session.boxes[0].attrs.color, "red");

        session.previous().unwrap();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn attributes_follow_track_to_unedited_frames() {
        let (_root, images) = fixture(2);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        let mut b = BoundingBox::new(BoxCoords::new(20, 20, 80, 80));
        b.track_id = 3;
        b.attrs.color = "red".into();
        session.boxes.push(b);
        session.save_current().unwrap();

        // Frame 1 has a detection for the same track but no attribute row.
        let label_path = session.label_path("000001.png");
        fs::write(&label_path, "0 3 0.500000 0.500000 0.250000 0.250000\n").unwrap();
        session.next().unwrap();
        assert_eq!(session.boxes.len(), 1);
        assert_eq!(session.boxes[0].attrs.color, "red");
    }

    #[test]
    fn delete_frame_then_undo_restores_bytes() {
        let (_root, images) = fixture(5);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        // Give frame 2 a label file so both payloads are exercised.
        for _ in 0..2 {
            session.next().unwrap();
        }
        session
            .boxes
            .push(BoundingBox::new(BoxCoords::new(10, 10, 20, 20)));
        session.save_current().unwrap();

        let image_path = session.image_path("000002.png");
        let label_path = session.label_path("000002.png");
        let image_before = fs::read(&image_path).unwrap();
        let label_before = fs::read(&label_path).unwrap();

        session.delete_frame().unwrap();
        assert_eq!(session.frame_count(), 4);
        assert!(session.current_index() <= 3);
        assert!(!image_path.exists());
        assert!(!label_path.exists());

        assert!(session.undo_delete_frame().unwrap());
        assert_eq!(session.frame_count(), 5);
        assert_eq!(session.current_index(), 2);
        assert_eq!(fs::read(&image_path).unwrap(), image_before);
        assert_eq!(fs::read(&label_path).unwrap(), label_before);
        // Single-level: slot is spent.
        assert!(!session.undo_delete_frame().unwrap());
    }

    #[test]
    fn failed_undo_write_keeps_the_buffer() {
        let (_root, images) = fixture(2);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        session.delete_frame().unwrap();

        // A directory squatting on the image path makes the restore
        // write fail.
        let image_path = session.image_path("000000.png");
        fs::create_dir(&image_path).unwrap();
        assert!(session.undo_delete_frame().is_err());
        assert!(session.undo.has_buffered_frame());
        assert_eq!(session.frame_count(), 1);

        // Once the obstruction is gone the same undo goes through.
        fs::remove_dir(&image_path).unwrap();
        assert!(session.undo_delete_frame().unwrap());
        assert_eq!(session.frame_count(), 2);
        assert_eq!(session.current_frame_name(), Some("000000.png"));
    }

    #[test]
    fn delete_last_frame_clamps_index() {
        let (_root, images) = fixture(3);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        session.next().unwrap();
        session.next().unwrap();
        assert_eq!(session.current_index(), 2);
        session.delete_frame().unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.current_frame_name(), Some("000001.png"));
    }

    #[test]
    fn deleting_all_frames_empties_the_session() {
        let (_root, images) = fixture(1);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        session.delete_frame().unwrap();
        assert!(session.is_empty());
        assert!(session.boxes.is_empty());
        assert_eq!(session.current_frame_name(), None);
    }

    #[test]
    fn box_delete_undo_round_trips_through_session() {
        let (_root, images) = fixture(1);
        let mut session = EditorSession::open(&images, DEFAULT_SCALE).unwrap();
        let mut b = BoundingBox::new(BoxCoords::new(5, 5, 30, 30));
        b.track_id = 9;
        session.boxes.push(b.clone());
        let name = session.current_frame_name().unwrap().to_string();
        let removed = session.boxes.remove(0);
        session.undo.push_deleted(&name, removed);
        assert!(session.undo_last_box_delete());
        assert_eq!(session.boxes[0], b);
        assert!(!session.undo_last_box_delete());
    }
}
