//! Settings panel: active backend, configuration source and versions.

use super::UiApp;
use eframe::egui;
use xray_core::Backend;
use xray_core::config::BACKEND_URL_ENV;

impl UiApp {
    /// Renders backend details and the health check.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        let inference = &self.config.inference;
        egui::Grid::new("backend-settings")
            .num_columns(2)
            .spacing([16.0, 6.0])
            .show(ui, |ui| {
                ui.label("Inference backend");
                ui.label(self.service.name());
                ui.end_row();
                match inference.backend {
                    Backend::Mock => {
                        ui.label("Simulated delay");
                        ui.label(format!("{} ms", inference.mock_delay_ms));
                        ui.end_row();
                        ui.label("Seed");
                        ui.label(
                            inference
                                .seed
                                .map(|s| s.to_string())
                                .unwrap_or_else(|| "random".to_string()),
                        );
                        ui.end_row();
                    }
                    Backend::Http => {
                        ui.label("Base URL");
                        ui.monospace(&inference.base_url);
                        ui.end_row();
                        ui.label("Timeout");
                        ui.label(format!("{} ms", inference.timeout_ms));
                        ui.end_row();
                    }
                }
                ui.label("Config file");
                ui.monospace(
                    self.config_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".to_string()),
                );
                ui.end_row();
            });
        ui.small(format!(
            "Set {BACKEND_URL_ENV} to point the app at a running analysis backend."
        ));

        ui.add_space(12.0);
        ui.separator();
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(self.backend_label());
            let checking = self.health_rx.is_some();
            if ui
                .add_enabled(!checking, egui::Button::new("Check now"))
                .clicked()
            {
                self.start_health_check();
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        ui.label(format!("Core version: {}", xray_core::VERSION));
    }
}
