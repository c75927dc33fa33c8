use std::path::PathBuf;
use std::time::Instant;
use eframe::egui;
use crate::core::{format_duration, format_time, AppConfig};
use crate::gui::controller::{FrameView, NoticeLevel, UiController};
use crate::gui::dialogs::RfdDialogs;
use crate::gui::timeline::{TimelineAction, TimelineWidget};

/// Seconds moved by the nudge buttons.
const NUDGE_SECONDS: f64 = 1.0;
const SKIP_SECONDS: f64 = 5.0;

pub struct TrimmothyApp {
    controller: UiController,
    dialogs: RfdDialogs,
    timeline_widget: TimelineWidget,
    preview_texture: Option<(u64, egui::TextureHandle)>,
    thumbnail_textures: Vec<Option<(u64, egui::TextureHandle)>>,
    show_about: bool,
}

impl TrimmothyApp {
    pub fn new(cc: &eframe::CreationContext<'_>, initial_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut visuals = egui::Visuals::dark();
        visuals.override_text_color = Some(egui::Color32::WHITE);
        cc.egui_ctx.set_visuals(visuals);

        let config = AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Using default settings: {}", e);
            AppConfig::default()
        });
        let mut controller = UiController::with_ffmpeg(config)?;

        if let Some(path) = initial_file {
            log::info!("Opening {} from the command line", path.display());
            if let Err(e) = controller.request_open(path) {
                log::error!("{}", e);
            }
        }

        Ok(Self {
            controller,
            dialogs: RfdDialogs,
            timeline_widget: TimelineWidget::new(),
            preview_texture: None,
            thumbnail_textures: Vec::new(),
            show_about: false,
        })
    }

    fn sync_textures(&mut self, ctx: &egui::Context) {
        match self.controller.preview_frame() {
            Some(frame) => {
                if self.preview_texture.as_ref().map(|(revision, _)| *revision) != Some(frame.revision) {
                    self.preview_texture = Some((frame.revision, upload_frame(ctx, "preview", frame)));
                }
            }
            None => self.preview_texture = None,
        }

        let slots = self.controller.thumbnails();
        self.thumbnail_textures.resize_with(slots.len(), || None);
        for (index, (slot, texture)) in slots.iter().zip(self.thumbnail_textures.iter_mut()).enumerate() {
            match &slot.frame {
                Some(frame) => {
                    if texture.as_ref().map(|(revision, _)| *revision) != Some(frame.revision) {
                        *texture = Some((frame.revision, upload_frame(ctx, &format!("thumb-{index}"), frame)));
                    }
                }
                None => *texture = None,
            }
        }
    }

    fn open_video(&mut self) {
        if let Err(e) = self.controller.open_with_dialog(&self.dialogs) {
            log::error!("Failed to open video: {}", e);
        }
    }

    fn export(&mut self) {
        match self.controller.submit_trim_job(&self.dialogs) {
            Ok(Some(id)) => log::debug!("Submitted trim job {}", id),
            Ok(None) => {}
            Err(e) => log::warn!("Export not started: {}", e),
        }
    }

    fn show_welcome(&mut self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Welcome to Trimmothy");
                if self.controller.is_loading() {
                    ui.spinner();
                    ui.label("Loading video...");
                } else {
                    ui.label("Open a video, pick a range and save it as a new file.");
                    ui.add_space(20.0);
                    if ui.button("📂 Open Video").clicked() {
                        self.open_video();
                    }
                }
            });
        });
    }

    fn show_editor(&mut self, ui: &mut egui::Ui) {
        let Some(source) = self.controller.source() else {
            return;
        };
        let file_name = source.file_name();
        let summary = source.summary();
        let duration = source.duration;

        ui.horizontal(|ui| {
            ui.heading(file_name);
            ui.separator();
            ui.label(summary);
            ui.separator();
            ui.label(format_duration(duration));
        });
        ui.separator();

        self.show_preview(ui);
        ui.separator();

        if let Some(selection) = self.controller.selection() {
            match self.timeline_widget.show(ui, &selection, self.controller.cursor()) {
                Some(TimelineAction::SetStart(t)) => {
                    let _ = self.controller.set_selection_start(t);
                }
                Some(TimelineAction::SetEnd(t)) => {
                    let _ = self.controller.set_selection_end(t);
                }
                Some(TimelineAction::Seek(t)) => self.controller.seek(t),
                None => {}
            }
        }

        self.show_thumbnail_strip(ui);
        ui.separator();
        self.show_controls(ui);
        ui.separator();
        self.show_selection_controls(ui);
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        let max_height = (ui.available_height() * 0.5).max(160.0);
        match &self.preview_texture {
            Some((_, texture)) => {
                let size = fit_size(texture.size_vec2(), ui.available_width(), max_height);
                ui.vertical_centered(|ui| {
                    ui.add(egui::Image::new(texture).fit_to_exact_size(size));
                });
            }
            None => {
                ui.allocate_ui(egui::vec2(ui.available_width(), max_height), |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.spinner();
                    });
                });
            }
        }
    }

    fn show_thumbnail_strip(&mut self, ui: &mut egui::Ui) {
        let (width, height) = (
            self.controller.config().thumbnail_width as f32,
            self.controller.config().thumbnail_height as f32,
        );
        let mut clicked = None;

        egui::ScrollArea::horizontal()
            .id_source("thumbnail_strip")
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    for (index, texture) in self.thumbnail_textures.iter().enumerate() {
                        let response = match texture {
                            Some((_, texture)) => {
                                let size = fit_size(texture.size_vec2(), width, height);
                                ui.add(egui::Image::new(texture).fit_to_exact_size(size).sense(egui::Sense::click()))
                            }
                            None => {
                                let (rect, response) = ui.allocate_exact_size(
                                    egui::vec2(width, height),
                                    egui::Sense::click(),
                                );
                                ui.painter().rect_filled(rect, egui::Rounding::same(2.0), ui.visuals().extreme_bg_color);
                                response
                            }
                        };
                        if response.clicked() {
                            clicked = Some(index);
                        }
                    }
                });
            });

        if let Some(index) = clicked {
            self.controller.select_thumbnail(index);
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("⏮ Start").clicked() {
                self.controller.seek(0.0);
            }
            if ui.button(format!("⏪ -{}s", SKIP_SECONDS)).clicked() {
                self.controller.seek(self.controller.cursor() - SKIP_SECONDS);
            }
            let play_label = if self.controller.is_playing() { "⏸ Pause" } else { "▶ Play" };
            if ui.button(play_label).clicked() {
                self.controller.toggle_playback();
            }
            if ui.button(format!("{}s ⏩", SKIP_SECONDS)).clicked() {
                self.controller.seek(self.controller.cursor() + SKIP_SECONDS);
            }
            if ui.button("▶ Preview Selection").clicked() {
                self.controller.preview_selection();
            }

            ui.separator();
            let duration = self.controller.source().map_or(0.0, |source| source.duration);
            ui.monospace(format!(
                "{} / {}",
                format_time(self.controller.cursor()),
                format_time(duration)
            ));
        });
    }

    fn show_selection_controls(&mut self, ui: &mut egui::Ui) {
        let Some(selection) = self.controller.selection() else {
            return;
        };

        egui::Grid::new("selection_grid").num_columns(4).show(ui, |ui| {
            ui.label("Start:");
            let response = ui.add(egui::TextEdit::singleline(&mut self.controller.start_text).desired_width(80.0));
            if response.lost_focus() {
                let _ = self.controller.commit_start_text();
            }
            if ui.button(format!("-{}s", NUDGE_SECONDS)).clicked() {
                let _ = self.controller.set_selection_start((selection.start() - NUDGE_SECONDS).max(0.0));
            }
            if ui.button(format!("+{}s", NUDGE_SECONDS)).clicked() {
                let _ = self.controller.set_selection_start((selection.start() + NUDGE_SECONDS).min(selection.duration()));
            }
            if ui.button("Set to playhead").clicked() {
                let _ = self.controller.set_selection_start(self.controller.cursor());
            }
            ui.end_row();

            ui.label("End:");
            let response = ui.add(egui::TextEdit::singleline(&mut self.controller.end_text).desired_width(80.0));
            if response.lost_focus() {
                let _ = self.controller.commit_end_text();
            }
            if ui.button(format!("-{}s", NUDGE_SECONDS)).clicked() {
                let _ = self.controller.set_selection_end((selection.end() - NUDGE_SECONDS).max(0.0));
            }
            if ui.button(format!("+{}s", NUDGE_SECONDS)).clicked() {
                let _ = self.controller.set_selection_end((selection.end() + NUDGE_SECONDS).min(selection.duration()));
            }
            if ui.button("Set to playhead").clicked() {
                let _ = self.controller.set_selection_end(self.controller.cursor());
            }
            ui.end_row();
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label(format!("Selected: {}", format_duration(selection.length())));
            ui.separator();
            let export = ui.add_enabled(self.controller.can_export(), egui::Button::new("✂️ Trim & Save"));
            if export.clicked() {
                self.export();
            }
        });
    }

    fn show_progress_window(&mut self, ctx: &egui::Context) {
        let Some(job) = self.controller.current_job() else {
            return;
        };
        let title = format!("Trimming {}", job.destination_name());
        let progress = job.progress as f32;
        let mut cancel = false;

        egui::Window::new("Trimming Video")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(title);
                ui.add(egui::ProgressBar::new(progress).show_percentage().desired_width(300.0));
                ui.add_space(8.0);
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });

        if cancel {
            self.controller.cancel_trim_job();
        }
    }

    fn show_notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.controller.notice() else {
            return;
        };
        let color = match notice.level {
            NoticeLevel::Info => egui::Color32::LIGHT_GREEN,
            NoticeLevel::Warning => egui::Color32::YELLOW,
            NoticeLevel::Error => egui::Color32::LIGHT_RED,
        };
        let title = notice.title.clone();
        let body = notice.body.clone();
        let mut dismissed = false;

        egui::Window::new(title)
            .id(egui::Id::new("notice_window"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.colored_label(color, body);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.controller.dismiss_notice();
        }
    }

    fn show_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About Trimmothy")
            .open(&mut self.show_about)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Trimmothy {}", env!("CARGO_PKG_VERSION")));
                ui.label("Cuts a range out of a video with FFmpeg.");
            });
    }
}

impl eframe::App for TrimmothyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.tick(Instant::now());
        self.sync_textures(ctx);

        if !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.controller.toggle_playback();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Video...").clicked() {
                        ui.close_menu();
                        self.open_video();
                    }
                    if ui
                        .add_enabled(self.controller.can_export(), egui::Button::new("Trim & Save..."))
                        .clicked()
                    {
                        ui.close_menu();
                        self.export();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Status:");
                ui.label(self.controller.status());

                if let Some(selection) = self.controller.selection() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.monospace(format!(
                            "{} - {}",
                            format_time(selection.start()),
                            format_time(selection.end())
                        ));
                    });
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.controller.source().is_some() {
                self.show_editor(ui);
            } else {
                self.show_welcome(ui);
            }
        });

        self.show_progress_window(ctx);
        self.show_notice_window(ctx);
        if self.show_about {
            self.show_about_window(ctx);
        }

        if let Some(interval) = self.controller.repaint_interval() {
            ctx.request_repaint_after(interval);
        }
    }
}

fn upload_frame(ctx: &egui::Context, name: &str, frame: &FrameView) -> egui::TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [frame.image.width() as usize, frame.image.height() as usize],
        frame.image.as_raw(),
    );
    ctx.load_texture(name, image, egui::TextureOptions::LINEAR)
}

/// Largest size with the same aspect ratio that fits the box.
fn fit_size(size: egui::Vec2, max_width: f32, max_height: f32) -> egui::Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::vec2(max_width, max_height);
    }
    let scale = (max_width / size.x).min(max_height / size.y);
    size * scale
}
