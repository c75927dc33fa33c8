use eframe::egui;
use crate::core::Selection;

/// What the user did on the timeline this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineAction {
    SetStart(f64),
    SetEnd(f64),
    Seek(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handle {
    Start,
    End,
}

pub struct TimelineWidget {
    dragging: Option<Handle>,
}

impl Default for TimelineWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineWidget {
    pub fn new() -> Self {
        Self { dragging: None }
    }

    /// Paint the track with the selection and playhead. Dragging a handle
    /// moves that bound; clicking or dragging anywhere else seeks.
    pub fn show(&mut self, ui: &mut egui::Ui, selection: &Selection, cursor: f64) -> Option<TimelineAction> {
        let duration = selection.duration();
        let available_width = (ui.available_width() - 40.0).max(100.0);
        let timeline_height = 60.0;

        let (rect, response) = ui.allocate_exact_size(
            egui::Vec2::new(available_width, timeline_height),
            egui::Sense::click_and_drag(),
        );

        let track_rect = egui::Rect::from_min_size(
            rect.min + egui::Vec2::new(10.0, 20.0),
            egui::Vec2::new(available_width - 20.0, 20.0),
        );
        let x_for = |time: f64| track_rect.min.x + ((time / duration) * track_rect.width() as f64) as f32;

        let start_x = x_for(selection.start());
        let end_x = x_for(selection.end());
        let handle_width = 8.0;
        let start_handle = egui::Rect::from_center_size(
            egui::Pos2::new(start_x, track_rect.center().y),
            egui::Vec2::new(handle_width, track_rect.height() + 10.0),
        );
        let end_handle = egui::Rect::from_center_size(
            egui::Pos2::new(end_x, track_rect.center().y),
            egui::Vec2::new(handle_width, track_rect.height() + 10.0),
        );

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();

            painter.rect_filled(rect, egui::Rounding::same(4.0), ui.visuals().extreme_bg_color);
            painter.rect_stroke(
                track_rect,
                egui::Rounding::same(2.0),
                egui::Stroke::new(1.0, ui.visuals().text_color()),
            );

            let time_per_pixel = duration / track_rect.width() as f64;
            let marker_interval = calculate_marker_interval(time_per_pixel);
            for i in 0..((duration / marker_interval) as i32 + 1) {
                let time = i as f64 * marker_interval;
                if time > duration {
                    break;
                }
                let x = x_for(time);
                painter.line_segment(
                    [egui::Pos2::new(x, track_rect.min.y), egui::Pos2::new(x, track_rect.max.y)],
                    egui::Stroke::new(0.5, ui.visuals().weak_text_color()),
                );
                painter.text(
                    egui::Pos2::new(x, track_rect.min.y - 3.0),
                    egui::Align2::CENTER_BOTTOM,
                    format_marker(time),
                    egui::FontId::monospace(10.0),
                    ui.visuals().weak_text_color(),
                );
            }

            let trim_rect = egui::Rect::from_min_max(
                egui::Pos2::new(start_x, track_rect.min.y),
                egui::Pos2::new(end_x, track_rect.max.y),
            );
            painter.rect_filled(
                trim_rect,
                egui::Rounding::same(2.0),
                ui.visuals().selection.bg_fill.gamma_multiply(0.5),
            );
            painter.rect_filled(start_handle, egui::Rounding::same(4.0), ui.visuals().selection.bg_fill);
            painter.rect_filled(end_handle, egui::Rounding::same(4.0), ui.visuals().selection.bg_fill);

            let cursor_x = x_for(cursor.clamp(0.0, duration));
            painter.line_segment(
                [egui::Pos2::new(cursor_x, rect.min.y), egui::Pos2::new(cursor_x, rect.max.y)],
                egui::Stroke::new(2.0, egui::Color32::RED),
            );
            painter.rect_filled(
                egui::Rect::from_center_size(
                    egui::Pos2::new(cursor_x, rect.min.y + 5.0),
                    egui::Vec2::new(12.0, 10.0),
                ),
                egui::Rounding::same(2.0),
                egui::Color32::RED,
            );
        }

        let pointer_time = response.interact_pointer_pos().map(|pos| {
            let relative_x = ((pos.x - track_rect.min.x) / track_rect.width()) as f64;
            (relative_x * duration).clamp(0.0, duration)
        });

        if response.drag_started() {
            self.dragging = response.interact_pointer_pos().and_then(|pos| {
                if start_handle.contains(pos) {
                    Some(Handle::Start)
                } else if end_handle.contains(pos) {
                    Some(Handle::End)
                } else {
                    None
                }
            });
        }

        let action = match (pointer_time, self.dragging) {
            (Some(time), Some(Handle::Start)) if response.dragged() => Some(TimelineAction::SetStart(time)),
            (Some(time), Some(Handle::End)) if response.dragged() => Some(TimelineAction::SetEnd(time)),
            (Some(time), None) if response.clicked() || response.dragged() => Some(TimelineAction::Seek(time)),
            _ => None,
        };

        if response.drag_stopped() {
            self.dragging = None;
        }

        action
    }
}

fn calculate_marker_interval(time_per_pixel: f64) -> f64 {
    let target_pixel_spacing = 60.0;
    let base_interval = time_per_pixel * target_pixel_spacing;

    if base_interval <= 1.0 {
        0.5
    } else if base_interval <= 5.0 {
        1.0
    } else if base_interval <= 10.0 {
        5.0
    } else if base_interval <= 30.0 {
        10.0
    } else if base_interval <= 60.0 {
        30.0
    } else if base_interval <= 300.0 {
        60.0
    } else {
        600.0
    }
}

fn format_marker(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = seconds % 60.0;
    format!("{}:{:04.1}", mins, secs)
}
