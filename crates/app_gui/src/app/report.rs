//! Diagnostic report panel.

use super::UiApp;
use chrono::{DateTime, Local};
use eframe::egui;
use rfd::FileDialog;
use xray_core::{AnalysisResult, RiskLevel, Severity, export_report_csv, risk_level};

const RED: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);
const AMBER: egui::Color32 = egui::Color32::from_rgb(251, 191, 36);
const GREEN: egui::Color32 = egui::Color32::from_rgb(74, 222, 128);

impl UiApp {
    pub(super) fn render_report_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Diagnostic Report");
        ui.add_space(12.0);

        if self.flow.is_analyzing() {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.spinner();
                ui.label("Running Neural Network...");
                if let Some(elapsed) = self.flow.analyzing_for() {
                    ui.small(format!("{:.1}s elapsed", elapsed.as_secs_f32()));
                }
            });
            return;
        }

        if let Some(err) = self.flow.error() {
            ui.colored_label(RED, format!("Analysis of {} failed", err.image_name));
            ui.label(err.error.to_string());
            ui.small("Run the analysis again or choose another image.");
            return;
        }

        let Some(result) = self.flow.result().cloned() else {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.weak("Upload an X-ray image and run analysis to view detailed phenotype characterization.");
            });
            return;
        };

        render_probability(ui, &result);
        ui.add_space(16.0);
        render_classification(ui, &result);
        ui.add_space(16.0);
        render_findings(ui, &result);
        ui.add_space(16.0);
        ui.separator();
        if ui.button("Export Full Report").clicked() {
            self.export_report(&result);
        }
    }

    fn export_report(&mut self, result: &AnalysisResult) {
        let image_name = self
            .flow
            .selected_image()
            .map(|i| i.name().to_string())
            .unwrap_or_default();
        let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name(default_report_name(&image_name, Local::now()))
            .save_file()
        else {
            return;
        };
        self.status = match export_report_csv(&image_name, result, &path) {
            Ok(()) => format!("Report exported: {}", path.display()),
            Err(e) => format!("Export failed: {e:#}"),
        };
    }
}

fn render_probability(ui: &mut egui::Ui, result: &AnalysisResult) {
    let risk = risk_level(result);
    let color = match risk {
        RiskLevel::Detected => RED,
        RiskLevel::LowRisk => GREEN,
    };
    ui.horizontal(|ui| {
        ui.label("Pneumonia Probability");
        ui.colored_label(color, risk.label());
    });
    ui.label(egui::RichText::new(format!("{}%", result.probability)).size(32.0).monospace());
    ui.add(egui::ProgressBar::new(result.probability / 100.0).fill(color));
}

fn render_classification(ui: &mut egui::Ui, result: &AnalysisResult) {
    ui.strong("CLASSIFICATION");
    egui::Grid::new("classification").num_columns(2).show(ui, |ui| {
        ui.label("Phenotype");
        ui.strong(result.phenotype.as_str());
        ui.end_row();
        ui.label("Severity");
        ui.colored_label(severity_color(result.severity), result.severity.as_str());
        ui.end_row();
    });
}

fn render_findings(ui: &mut egui::Ui, result: &AnalysisResult) {
    ui.strong("AI FINDINGS");
    let (marker, color) = match risk_level(result) {
        RiskLevel::Detected => ("!", AMBER),
        RiskLevel::LowRisk => ("✓", GREEN),
    };
    for finding in &result.findings {
        ui.horizontal(|ui| {
            ui.colored_label(color, marker);
            ui.label(finding);
        });
    }
}

fn severity_color(severity: Severity) -> egui::Color32 {
    match severity {
        Severity::Critical => RED,
        Severity::Moderate => AMBER,
        Severity::Low => GREEN,
    }
}

/// `<image stem>_report_<timestamp>.csv`
fn default_report_name(image_name: &str, now: DateTime<Local>) -> String {
    let stem = image_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(image_name);
    let stem = if stem.is_empty() { "xray" } else { stem };
    format!("{stem}_report_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("chest.png", "chest_report_20250314_092605.csv")]
    #[case("study.v2.dcm", "study.v2_report_20250314_092605.csv")]
    #[case("", "xray_report_20250314_092605.csv")]
    fn report_name_uses_image_stem(#[case] image: &str, #[case] expected: &str) {
        let now = Local
            .with_ymd_and_hms(2025, 3, 14, 9, 26, 5)
            .single()
            .expect("unambiguous local time");
        assert_eq!(default_report_name(image, now), expected);
    }

    #[test]
    fn severity_colors_match_report_panel() {
        assert_eq!(severity_color(Severity::Critical), RED);
        assert_eq!(severity_color(Severity::Moderate), AMBER);
        assert_eq!(severity_color(Severity::Low), GREEN);
    }
}
