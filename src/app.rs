//! egui shell: panels, canvas painting, and the modal edit dialog.
//!
//! All editing decisions live in [`crate::interaction`] and
//! [`crate::session`]; this module only translates egui events into
//! state-machine calls and paints the result.

use std::path::PathBuf;

use eframe::egui;
use egui::{Color32, Key, Pos2, Rect, Sense, Stroke, Vec2};
use image::GenericImageView;

use crate::geometry;
use crate::interaction::{DialogInput, EditError, Effect, Interaction};
use crate::session::{DEFAULT_SCALE, EditorSession};

struct DialogState {
    input: DialogInput,
    error: Option<String>,
}

enum DialogAction {
    Update,
    Delete,
    Resize,
    Cancel,
}

pub struct AppState {
    session: Option<EditorSession>,
    interaction: Interaction,
    texture: Option<egui::TextureHandle>,
    loaded_frame: Option<String>,
    dialog: Option<DialogState>,
    status: String,
    dir_input: String,
    pointer_was_down: bool,
}

impl AppState {
    pub fn new(images_dir: Option<PathBuf>) -> Self {
        let mut app = Self {
            session: None,
            interaction: Interaction::new(),
            texture: None,
            loaded_frame: None,
            dialog: None,
            status: "Select an images folder to begin.".to_owned(),
            dir_input: String::new(),
            pointer_was_down: false,
        };
        if let Some(dir) = images_dir {
            app.dir_input = dir.to_string_lossy().to_string();
            app.open_folder(&dir);
        }
        app
    }

    /// Open a session; on a configuration error the editor stays in its
    /// pre-ready state with navigation hidden.
    fn open_folder(&mut self, dir: &std::path::Path) {
        match EditorSession::open(dir, DEFAULT_SCALE) {
            Ok(session) => {
                self.status = format!("Loaded {} frames.", session.frame_count());
                self.session = Some(session);
                self.interaction.reset();
                self.dialog = None;
                self.loaded_frame = None;
                self.texture = None;
            }
            Err(e) => {
                self.session = None;
                self.status = e.to_string();
                tracing::warn!("open failed: {e}");
            }
        }
    }

    /// Decode the current frame into a texture when the frame changed.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let Some(session) = &self.session else {
            self.texture = None;
            self.loaded_frame = None;
            return;
        };
        let Some(name) = session.current_frame_name().map(str::to_string) else {
            self.texture = None;
            self.loaded_frame = None;
            return;
        };
        if self.loaded_frame.as_deref() == Some(name.as_str()) {
            return;
        }
        let path = session.image_path(&name);
        let loaded = image::io::Reader::open(&path)
            .map_err(anyhow::Error::from)
            .and_then(|r| r.decode().map_err(anyhow::Error::from));
        match loaded {
            Ok(dynimg) => {
                let (w, h) = dynimg.dimensions();
                let rgba = dynimg.to_rgba8();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [w as usize, h as usize],
                    rgba.as_raw(),
                );
                self.texture =
                    Some(ctx.load_texture(&name, color_image, egui::TextureOptions::NEAREST));
                self.loaded_frame = Some(name);
            }
            Err(e) => {
                self.texture = None;
                self.loaded_frame = None;
                self.status = format!("Failed to load {}: {e}", path.display());
            }
        }
    }

    fn open_dialog_for(&mut self, index: usize) {
        let Some(session) = &self.session else { return };
        let Some(b) = session.boxes.get(index) else { return };
        self.dialog = Some(DialogState {
            input: DialogInput {
                track_id: b.track_id.to_string(),
                color: b.attrs.color.clone(),
                action: b.attrs.action.clone(),
                gender: b.attrs.gender.clone(),
            },
            error: None,
        });
    }

    fn handle_dialog_action(&mut self, action: DialogAction) {
        let Some(session) = self.session.as_mut() else { return };
        match action {
            DialogAction::Update => {
                let Some(dialog) = self.dialog.as_mut() else { return };
                match self
                    .interaction
                    .dialog_update(&mut session.boxes, &dialog.input)
                {
                    Ok(()) => {
                        self.dialog = None;
                        self.status = "Bounding box updated.".to_owned();
                    }
                    // Non-numeric id: not committed, dialog stays open silently.
                    Err(EditError::NonNumericId) => {}
                    Err(e @ EditError::DuplicateId(_)) => {
                        dialog.error = Some(e.to_string());
                    }
                }
            }
            DialogAction::Delete => {
                let name = session
                    .current_frame_name()
                    .unwrap_or_default()
                    .to_string();
                self.interaction
                    .dialog_delete(&mut session.boxes, &mut session.undo, &name);
                self.dialog = None;
                self.status = "Bounding box deleted.".to_owned();
            }
            DialogAction::Resize => {
                self.interaction.dialog_enter_resize();
                self.dialog = None;
                self.status = "Drag to resize, release to finish.".to_owned();
            }
            DialogAction::Cancel => {
                self.interaction.dialog_cancel();
                self.dialog = None;
            }
        }
    }

    fn navigate(&mut self, forward: bool) {
        self.interaction.reset();
        self.dialog = None;
        if let Some(session) = self.session.as_mut() {
            let result = if forward {
                session.next()
            } else {
                session.previous()
            };
            match result {
                Ok(()) => self.status = "Bounding boxes and elements saved successfully.".to_owned(),
                Err(e) => self.status = e.to_string(),
            }
        }
        self.loaded_frame = None;
    }

    fn delete_current_frame(&mut self) {
        self.interaction.reset();
        self.dialog = None;
        if let Some(session) = self.session.as_mut() {
            match session.delete_frame() {
                Ok(()) if session.is_empty() => {
                    self.status = "All frames deleted.".to_owned();
                }
                Ok(()) => self.status = "Frame deleted.".to_owned(),
                Err(e) => self.status = format!("Error deleting frame: {e}"),
            }
        }
        self.loaded_frame = None;
    }

    fn undo_frame_delete(&mut self) {
        self.interaction.reset();
        self.dialog = None;
        if let Some(session) = self.session.as_mut() {
            match session.undo_delete_frame() {
                Ok(true) => self.status = "Frame restored.".to_owned(),
                Ok(false) => self.status = "No frame to undo.".to_owned(),
                Err(e) => self.status = format!("Error restoring frame: {e}"),
            }
        }
        self.loaded_frame = None;
    }
}

impl eframe::App for AppState {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_texture(ctx);

        // Hold-key arms drawing; arrow keys navigate with implicit save.
        if self.dialog.is_none() {
            let (hold, left, right) = ctx.input(|i| {
                (
                    i.key_down(Key::H),
                    i.key_pressed(Key::ArrowLeft),
                    i.key_pressed(Key::ArrowRight),
                )
            });
            self.interaction.set_armed(hold);
            if left {
                self.navigate(false);
            }
            if right {
                self.navigate(true);
            }
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.session.is_some() {
                    let mut nav: Option<bool> = None;
                    let mut delete = false;
                    let mut undo_frame = false;
                    let mut undo_box = false;
                    let mut save = false;
                    if ui.button("Previous").clicked() {
                        nav = Some(false);
                    }
                    if ui.button("Next").clicked() {
                        nav = Some(true);
                    }
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Undo").clicked() {
                        undo_box = true;
                    }
                    if ui.button("Delete Frame").clicked() {
                        delete = true;
                    }
                    if ui.button("Undo Delete Frame").clicked() {
                        undo_frame = true;
                    }
                    if let Some(session) = &self.session {
                        ui.label(format!(
                            "Frame {}/{}",
                            (session.current_index() + 1).min(session.frame_count()),
                            session.frame_count()
                        ));
                    }
                    if let Some(forward) = nav {
                        self.navigate(forward);
                    }
                    if save {
                        if let Some(session) = &self.session {
                            self.status = match session.save_current() {
                                Ok(()) => {
                                    "Bounding boxes and elements saved successfully.".to_owned()
                                }
                                Err(e) => e.to_string(),
                            };
                        }
                    }
                    if undo_box {
                        if let Some(session) = self.session.as_mut() {
                            if !session.undo_last_box_delete() {
                                self.status = "Nothing to undo.".to_owned();
                            }
                        }
                    }
                    if delete {
                        self.delete_current_frame();
                    }
                    if undo_frame {
                        self.undo_frame_delete();
                    }
                } else {
                    ui.label("Images folder:");
                    ui.text_edit_singleline(&mut self.dir_input);
                    if ui.button("Open").clicked() {
                        let dir = PathBuf::from(self.dir_input.trim());
                        self.open_folder(&dir);
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        let mut clicked_info: Option<usize> = None;
        if let Some(session) = &self.session {
            egui::SidePanel::left("info_panel").show(ctx, |ui| {
                ui.heading("Details");
                ui.label(format!(
                    "Images: {}",
                    session.paths().images_dir.display()
                ));
                ui.label(format!(
                    "Labels: {}",
                    session.paths().labels_dir.display()
                ));
                ui.label(format!(
                    "Elements: {}",
                    session.paths().elements_file.display()
                ));
                if let Some(name) = session.current_frame_name() {
                    ui.label(format!("Current image: {name}"));
                }
                ui.separator();
                ui.heading("Bounding boxes");
                for (i, b) in session.boxes.iter().enumerate() {
                    let c = b.coords;
                    let text = format!(
                        "BBox {}: ID {} ({}, {}, {}, {}) {} {} {}",
                        i + 1,
                        b.track_id,
                        c.x,
                        c.y,
                        c.w,
                        c.h,
                        b.attrs.color,
                        b.attrs.action,
                        b.attrs.gender
                    );
                    if ui.selectable_label(false, text).clicked() {
                        clicked_info = Some(i);
                    }
                }
            });
        }
        if let Some(i) = clicked_info {
            if self.dialog.is_none() {
                if let Some(Effect::OpenDialog { index }) = self.interaction.open_dialog(i) {
                    self.open_dialog_for(index);
                }
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_none() {
                ui.label("No folder loaded. Launch with: track-labeler /path/to/images/<sub>");
                return;
            }
            if self.session.as_ref().is_some_and(EditorSession::is_empty) {
                ui.label("All frames deleted.");
                return;
            }
            ui.label(
                "Hold H and drag to draw a box. Click a box to edit it, \
                 drag a corner to resize. Left/Right arrows change frame (autosaves).",
            );

            let Some(tex) = self.texture.clone() else { return };
            let pointer = ui.input(|i| i.pointer.clone());
            let down = pointer.primary_down();
            let pressed = down && !self.pointer_was_down;
            let released = self.pointer_was_down && !down;
            self.pointer_was_down = down;

            let mut pending_effect: Option<Effect> = None;
            {
                let Some(session) = self.session.as_mut() else { return };
                let scale = session.scale();
                let (w, h) = session.canonical_size();
                let image_size = Vec2::new(w as f32 * scale, h as f32 * scale);
                let image = egui::Image::new(&tex).fit_to_exact_size(image_size);
                let resp = ui.add(image.sense(Sense::click_and_drag()));
                let img_rect = resp.rect;
                let rel = |pos: Pos2| (pos.x - img_rect.left(), pos.y - img_rect.top());

                if self.dialog.is_none() {
                    if let Some(pos) = pointer.interact_pos() {
                        if pressed && img_rect.contains(pos) {
                            pending_effect =
                                self.interaction.pointer_down(rel(pos), &session.boxes, scale);
                        }
                        if down {
                            self.interaction
                                .pointer_drag(rel(pos), &mut session.boxes, scale);
                        }
                        if released {
                            pending_effect =
                                self.interaction
                                    .pointer_up(rel(pos), &mut session.boxes, scale);
                        }
                        if self.interaction.hovering_corner(rel(pos), &session.boxes, scale) {
                            ctx.output_mut(|o| {
                                o.cursor_icon = egui::CursorIcon::PointingHand;
                            });
                        }
                    }
                }

                // Paint boxes, handles and ids.
                let painter = ui.painter();
                let handle = 4.0;
                for b in &session.boxes {
                    let d = geometry::to_display(b.coords, scale);
                    let min = Pos2::new(img_rect.left() + d.x, img_rect.top() + d.y);
                    let r = Rect::from_min_size(min, Vec2::new(d.w, d.h));
                    painter.rect_stroke(r, 0.0, Stroke::new(2.0, Color32::RED));
                    for corner in [r.left_top(), r.right_top(), r.left_bottom(), r.right_bottom()]
                    {
                        painter.rect_filled(
                            Rect::from_center_size(corner, Vec2::splat(handle * 2.0)),
                            0.0,
                            Color32::from_rgb(50, 100, 220),
                        );
                    }
                    painter.text(
                        Pos2::new(r.left(), r.top() - 10.0),
                        egui::Align2::LEFT_BOTTOM,
                        format!("ID: {}", b.track_id),
                        egui::TextStyle::Body.resolve(ui.style()),
                        Color32::RED,
                    );
                }

                if let Some(band) = self.interaction.rubber_band() {
                    let min = Pos2::new(img_rect.left() + band.x, img_rect.top() + band.y);
                    let r = Rect::from_min_size(min, Vec2::new(band.w, band.h));
                    painter.rect_stroke(r, 0.0, Stroke::new(2.0, Color32::from_rgb(50, 100, 220)));
                }
            }

            if let Some(Effect::OpenDialog { index }) = pending_effect {
                self.open_dialog_for(index);
            }
        });

        // Modal edit dialog.
        let mut action: Option<DialogAction> = None;
        if let Some(dialog) = &mut self.dialog {
            let mut open = true;
            egui::Window::new("Edit Bounding Box")
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label("Class: Person");
                    ui.horizontal(|ui| {
                        ui.label("Track ID:");
                        ui.text_edit_singleline(&mut dialog.input.track_id);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Color:");
                        ui.text_edit_singleline(&mut dialog.input.color);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Action:");
                        ui.text_edit_singleline(&mut dialog.input.action);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Gender:");
                        ui.text_edit_singleline(&mut dialog.input.gender);
                    });
                    if let Some(err) = &dialog.error {
                        ui.colored_label(Color32::RED, err);
                    }
                    ui.horizontal(|ui| {
                        if ui.button("Update Values").clicked() {
                            action = Some(DialogAction::Update);
                        }
                        if ui.button("Delete BB").clicked() {
                            action = Some(DialogAction::Delete);
                        }
                        if ui.button("Edit BB").clicked() {
                            action = Some(DialogAction::Resize);
                        }
                    });
                });
            if ctx.input(|i| i.key_pressed(Key::Enter)) {
                action = Some(DialogAction::Update);
            }
            if !open {
                action = Some(DialogAction::Cancel);
            }
        }
        if let Some(action) = action {
            self.handle_dialog_action(action);
        }
    }
}
