use anyhow::{Context, Result};
use std::path::Path;

use crate::flow::FlowState;
use crate::model::AnalysisResult;

/// Probability (percent) above which the report flags pneumonia.
pub const DETECTION_THRESHOLD: f32 = 50.0;
/// Probability (percent) above which the heatmap overlay is drawn.
pub const HEATMAP_THRESHOLD: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Detected,
    LowRisk,
}

impl RiskLevel {
    pub fn from_probability(probability: f32) -> Self {
        if probability > DETECTION_THRESHOLD {
            RiskLevel::Detected
        } else {
            RiskLevel::LowRisk
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Detected => "DETECTED",
            RiskLevel::LowRisk => "LOW RISK",
        }
    }
}

pub fn risk_level(result: &AnalysisResult) -> RiskLevel {
    RiskLevel::from_probability(result.probability)
}

pub fn shows_heatmap(result: &AnalysisResult) -> bool {
    result.probability > HEATMAP_THRESHOLD
}

/// Caption of the analyze button for the given state.
pub fn analyze_button_label(state: FlowState) -> &'static str {
    match state {
        FlowState::Analyzing => "Processing...",
        FlowState::Complete => "Analysis Complete",
        FlowState::Empty | FlowState::Ready | FlowState::Failed => "Analyze Scan",
    }
}

/// Export one report to CSV with headers:
/// image,probability,risk,phenotype,severity,findings
pub fn export_report_csv(
    image_name: &str,
    result: &AnalysisResult,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create report file {}", path.display()))?;
    wtr.write_record(["image", "probability", "risk", "phenotype", "severity", "findings"])?;
    wtr.write_record([
        image_name,
        format!("{}", result.probability).as_str(),
        risk_level(result).label(),
        result.phenotype.as_str(),
        result.severity.as_str(),
        result.findings.join("; ").as_str(),
    ])?;
    wtr.flush()?;
    tracing::info!("report for {image_name} written to {}", path.display());
    Ok(())
}
