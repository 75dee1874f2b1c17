//! Core of the X-ray analysis screen: the upload/analyze/report flow and the
//! inference services it can run against.

pub mod config;
pub mod flow;
pub mod http;
pub mod inference;
pub mod mock;
pub mod model;
pub mod report;
pub mod upload;

/// Version of the analysis core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{AppConfig, Backend, ConfigError, InferenceConfig};
pub use flow::{AnalysisError, AnalysisFlow, FlowError, FlowState};
pub use http::HttpInference;
pub use inference::{InferenceError, InferenceService};
pub use mock::{MockInference, generate_result};
pub use model::{AnalysisResult, HeatmapPoint, Phenotype, Severity};
pub use report::{RiskLevel, analyze_button_label, export_report_csv, risk_level, shows_heatmap};
pub use upload::{ImageError, ImageFormat, SUPPORTED_EXTENSIONS, UploadedImage};
