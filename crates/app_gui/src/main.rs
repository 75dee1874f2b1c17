mod app;

use anyhow::Result;
use directories_next::ProjectDirs;
use eframe::NativeOptions;
use std::path::PathBuf;
use xray_core::AppConfig;
use xray_core::config::BACKEND_URL_ENV;

use app::UiApp;

fn main() {
    tracing_subscriber::fmt::init();
    let app = match build_app() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start application: {e:#}");
            std::process::exit(1);
        }
    };
    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "X-ray Analysis (mock)",
        options,
        Box::new(|_cc| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(app))),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}

fn build_app() -> Result<UiApp> {
    let config_path = config_path();
    let config = match &config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_backend_url(std::env::var(BACKEND_URL_ENV).ok());
    let service = config.build_service()?;
    Ok(UiApp::new(service, config, config_path))
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "exodia", "XrayAnalysis").map(|dirs| dirs.config_dir().join("config.toml"))
}
