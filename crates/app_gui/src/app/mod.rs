//! Main window: radiograph input on the left, diagnostic report on the right.

mod input;
mod report;
mod settings;

use eframe::{App, Frame, egui};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use xray_core::{AnalysisFlow, AppConfig, InferenceService, UploadedImage};

/// Repaint cadence while an analysis is running.
const BUSY_REPAINT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Analysis,
    Settings,
}

pub struct UiApp {
    flow: AnalysisFlow,
    service: Arc<dyn InferenceService>,
    config: AppConfig,
    config_path: Option<PathBuf>,
    panel: Panel,
    status: String,
    preview: Option<(u64, egui::TextureHandle)>,
    backend_healthy: Option<bool>,
    health_rx: Option<Receiver<bool>>,
    app_version: &'static str,
}

impl UiApp {
    pub fn new(
        service: Arc<dyn InferenceService>,
        config: AppConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            flow: AnalysisFlow::new(Arc::clone(&service)),
            service,
            config,
            config_path,
            panel: Panel::Analysis,
            status: String::new(),
            preview: None,
            backend_healthy: None,
            health_rx: None,
            app_version: env!("XRAY_APP_VERSION"),
        };
        app.start_health_check();
        app
    }

    /// Probe the backend off the UI thread; the HTTP client may block.
    fn start_health_check(&mut self) {
        if self.health_rx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(&self.service);
        let spawned = thread::Builder::new()
            .name("health-check".to_string())
            .spawn(move || {
                let _ = tx.send(service.health());
            });
        match spawned {
            Ok(_) => {
                self.backend_healthy = None;
                self.health_rx = Some(rx);
            }
            Err(e) => tracing::warn!("could not start health check: {e}"),
        }
    }

    fn poll_health(&mut self) {
        let Some(rx) = &self.health_rx else {
            return;
        };
        if let Ok(healthy) = rx.try_recv() {
            tracing::info!("{} backend healthy: {healthy}", self.service.name());
            self.backend_healthy = Some(healthy);
            self.health_rx = None;
        }
    }

    fn select(&mut self, loaded: Result<UploadedImage, xray_core::ImageError>) {
        match loaded {
            Ok(image) => {
                self.status = format!("Loaded {}", image.name());
                self.flow.select_image(image);
            }
            Err(e) => {
                tracing::warn!("{e}");
                self.status = format!("Could not load image: {e}");
            }
        }
    }

    /// Keep the preview texture in step with the selected image.
    fn sync_preview(&mut self, ctx: &egui::Context) {
        let Some(image) = self.flow.selected_image() else {
            self.preview = None;
            return;
        };
        if self.preview.as_ref().is_some_and(|(id, _)| *id == image.id()) {
            return;
        }
        self.preview = image.preview().map(|rgba| {
            let (w, h) = rgba.dimensions();
            let color = egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], rgba.as_raw());
            let tex = ctx.load_texture(
                format!("preview:{}", image.id()),
                color,
                egui::TextureOptions::LINEAR,
            );
            (image.id(), tex)
        });
    }

    fn backend_label(&self) -> String {
        let health = match self.backend_healthy {
            Some(true) => "online",
            Some(false) => "offline",
            None => "checking...",
        };
        format!("Backend: {} ({health})", self.service.name())
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if self.flow.poll() {
            self.status = match (self.flow.result(), self.flow.error()) {
                (Some(result), _) => format!("Analysis complete: {}", result.phenotype),
                (None, Some(err)) => format!("Analysis failed: {}", err.error),
                (None, None) => String::new(),
            };
        }
        self.poll_health();
        self.handle_dropped_files(ctx);
        self.sync_preview(ctx);
        if self.flow.is_analyzing() || self.health_rx.is_some() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.panel, Panel::Analysis, "Analysis");
                ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
                ui.separator();
                ui.label(self.backend_label());
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        match self.panel {
            Panel::Analysis => {
                egui::SidePanel::right("report")
                    .resizable(true)
                    .default_width(340.0)
                    .show(ctx, |ui| self.render_report_panel(ui));
                egui::CentralPanel::default().show(ctx, |ui| self.render_input_panel(ui));
            }
            Panel::Settings => {
                egui::CentralPanel::default().show(ctx, |ui| self.render_settings_panel(ui));
            }
        }
    }
}
