//! Radiograph input: file picking, drag and drop, preview with overlays.

use super::UiApp;
use eframe::egui;
use rfd::FileDialog;
use std::path::PathBuf;
use xray_core::{FlowState, SUPPORTED_EXTENSIONS, UploadedImage, analyze_button_label, shows_heatmap};

const SCAN_LINE_PERIOD: f64 = 2.0;

impl UiApp {
    pub(super) fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if self.flow.is_analyzing() {
            self.status = "Wait for the running analysis to finish".to_string();
            return;
        }
        let loaded = if let Some(bytes) = file.bytes {
            UploadedImage::from_bytes(file.name, bytes.to_vec())
        } else if let Some(path) = file.path {
            UploadedImage::from_path(path)
        } else {
            return;
        };
        self.select(loaded);
    }

    pub(super) fn render_input_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Radiograph Input");
            let busy = self.flow.is_analyzing();
            if ui
                .add_enabled(!busy, egui::Button::new("Choose image..."))
                .clicked()
                && let Some(path) = pick_image()
            {
                self.select(UploadedImage::from_path(path));
            }
            if self.flow.selected_image().is_some()
                && ui.add_enabled(!busy, egui::Button::new("Clear")).clicked()
            {
                match self.flow.reset() {
                    Ok(()) => self.status.clear(),
                    Err(e) => self.status = e.to_string(),
                }
            }
        });
        ui.separator();

        let button_height = 40.0;
        let avail = ui.available_size() - egui::vec2(0.0, button_height + 8.0);
        let (resp, painter) = ui.allocate_painter(avail.max(egui::vec2(64.0, 64.0)), egui::Sense::click());
        let area = resp.rect;
        painter.rect_filled(area, 6.0, egui::Color32::from_gray(18));

        let mut browse = false;
        match (self.flow.selected_image(), &self.preview) {
            (None, _) => {
                painter.rect_stroke(
                    area.shrink(8.0),
                    6.0,
                    egui::Stroke::new(1.5, egui::Color32::DARK_GRAY),
                    egui::StrokeKind::Inside,
                );
                let center = area.center();
                painter.text(
                    center - egui::vec2(0.0, 14.0),
                    egui::Align2::CENTER_CENTER,
                    "Upload X-ray Image",
                    egui::FontId::proportional(20.0),
                    egui::Color32::LIGHT_GRAY,
                );
                painter.text(
                    center + egui::vec2(0.0, 14.0),
                    egui::Align2::CENTER_CENTER,
                    "Drag & drop or click to browse (DICOM, PNG, JPG)",
                    egui::FontId::proportional(13.0),
                    egui::Color32::GRAY,
                );
                browse = resp.clicked();
            }
            (Some(image), None) => {
                painter.text(
                    area.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("{} (no preview available)", image.name()),
                    egui::FontId::proportional(15.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
            (Some(_), Some((_, tex))) => {
                let rect = fit_rect(area.shrink(8.0), tex.size_vec2());
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(tex.id(), rect, uv, egui::Color32::WHITE);
                self.paint_overlays(ui, &painter, rect);
            }
        }

        if browse && let Some(path) = pick_image() {
            self.select(UploadedImage::from_path(path));
        }

        ui.add_space(8.0);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let state = self.flow.state();
            let button = egui::Button::new(analyze_button_label(state))
                .min_size(egui::vec2(150.0, button_height));
            if ui.add_enabled(self.flow.can_analyze(), button).clicked() {
                match self.flow.analyze() {
                    Ok(()) => self.status = "Running analysis...".to_string(),
                    Err(e) => self.status = e.to_string(),
                }
            }
            if state == FlowState::Analyzing {
                ui.spinner();
            }
        });
    }

    fn paint_overlays(&self, ui: &egui::Ui, painter: &egui::Painter, rect: egui::Rect) {
        if self.flow.is_analyzing() {
            let t = ui.input(|i| i.time) % SCAN_LINE_PERIOD / SCAN_LINE_PERIOD;
            let y = rect.top() + rect.height() * t as f32;
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgba_unmultiplied(45, 212, 191, 12));
            painter.line_segment(
                [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
                egui::Stroke::new(3.0, egui::Color32::from_rgb(45, 212, 191)),
            );
        }
        if let Some(result) = self.flow.result()
            && shows_heatmap(result)
        {
            let radius = rect.width().min(rect.height()) * 0.15;
            for point in &result.heatmap_points {
                let center = egui::pos2(
                    rect.left() + rect.width() * point.x / 100.0,
                    rect.top() + rect.height() * point.y / 100.0,
                );
                let alpha = (point.intensity.clamp(0.0, 1.0) * 110.0) as u8;
                painter.circle_filled(center, radius, egui::Color32::from_rgba_unmultiplied(239, 68, 68, alpha));
            }
        }
    }
}

fn pick_image() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("X-ray", SUPPORTED_EXTENSIONS)
        .pick_file()
}

/// Largest rect with the image aspect ratio centered inside `area`.
pub(super) fn fit_rect(area: egui::Rect, image: egui::Vec2) -> egui::Rect {
    if image.x <= 0.0 || image.y <= 0.0 {
        return area;
    }
    let scale = (area.width() / image.x).min(area.height() / image.y);
    egui::Rect::from_center_size(area.center(), image * scale)
}
