use serde::{Deserialize, Serialize};
use std::fmt;

use crate::inference::InferenceError;

/// Hypothesized pneumonia subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phenotype {
    Bacterial,
    Viral,
    Normal,
    Fungal,
}

impl Phenotype {
    /// Wire spelling, also used as the display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Phenotype::Bacterial => "Bacterial",
            Phenotype::Viral => "Viral",
            Phenotype::Normal => "Normal",
            Phenotype::Fungal => "Fungal",
        }
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational severity grade shown next to the phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    Critical,
}

impl Severity {
    /// Wire spelling, also used as the display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overlay point in percent of the image extent. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    /// Horizontal position, percent of image width.
    pub x: f32,
    /// Vertical position, percent of image height.
    pub y: f32,
    /// Overlay strength in (0,1].
    pub intensity: f32,
}

/// Output of one inference call, as exchanged with the analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Pneumonia probability in percent, 0..=100.
    pub probability: f32,
    /// `Normal` only for healthy scans.
    pub phenotype: Phenotype,
    pub severity: Severity,
    /// Free-text observations, in display order.
    pub findings: Vec<String>,
    /// Overlay points; older backends send them as `heatmap_regions`.
    #[serde(alias = "heatmap_regions", default)]
    pub heatmap_points: Vec<HeatmapPoint>,
}

impl AnalysisResult {
    /// Checks the numeric ranges a backend response must respect.
    pub fn validate(&self) -> Result<(), InferenceError> {
        if !self.probability.is_finite() || !(0.0..=100.0).contains(&self.probability) {
            return Err(InferenceError::InvalidResult(format!(
                "probability {} outside 0..=100",
                self.probability
            )));
        }
        for (idx, point) in self.heatmap_points.iter().enumerate() {
            if !(point.intensity > 0.0 && point.intensity <= 1.0) {
                return Err(InferenceError::InvalidResult(format!(
                    "heatmap point {idx} has intensity {} outside (0,1]",
                    point.intensity
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use approx::assert_relative_eq;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            probability: 87.0,
            phenotype: Phenotype::Viral,
            severity: Severity::Moderate,
            findings: vec!["Interstitial markings present".into()],
            heatmap_points: vec![HeatmapPoint {
                x: 42.5,
                y: 61.0,
                intensity: 0.8,
            }],
        }
    }

    #[test]
    fn serializes_with_camel_case_wire_names() -> Result<()> {
        let json = serde_json::to_value(sample())?;
        assert_eq!(json["phenotype"], "Viral");
        assert_eq!(json["severity"], "Moderate");
        assert!(json.get("heatmapPoints").is_some());
        assert!(json.get("heatmap_points").is_none());
        Ok(())
    }

    #[test]
    fn accepts_python_heatmap_regions_alias() -> Result<()> {
        let body = r#"{
            "probability": 64,
            "phenotype": "Fungal",
            "severity": "Critical",
            "findings": ["Fungal pneumonia phenotype identified via clustering"],
            "heatmap_regions": [{"x": 20, "y": 77, "intensity": 0.9}]
        }"#;
        let result: AnalysisResult = serde_json::from_str(body)?;
        assert_relative_eq!(result.probability, 64.0);
        assert_eq!(result.phenotype, Phenotype::Fungal);
        assert_eq!(result.heatmap_points.len(), 1);
        assert_relative_eq!(result.heatmap_points[0].intensity, 0.9);
        Ok(())
    }

    #[test]
    fn missing_heatmap_decodes_as_empty() -> Result<()> {
        let body = r#"{"probability": 4, "phenotype": "Normal", "severity": "Low", "findings": []}"#;
        let result: AnalysisResult = serde_json::from_str(body)?;
        assert!(result.heatmap_points.is_empty());
        result.validate()?;
        Ok(())
    }

    #[test]
    fn rejects_unknown_phenotype() {
        let body = r#"{"probability": 4, "phenotype": "Asthma", "severity": "Low", "findings": []}"#;
        assert!(serde_json::from_str::<AnalysisResult>(body).is_err());
    }

    #[test]
    fn validate_flags_out_of_range_values() {
        let mut bad = sample();
        bad.probability = 101.0;
        assert!(matches!(bad.validate(), Err(InferenceError::InvalidResult(_))));

        let mut bad = sample();
        bad.probability = f32::NAN;
        assert!(bad.validate().is_err());

        let mut bad = sample();
        bad.heatmap_points[0].intensity = 0.0;
        assert!(bad.validate().is_err());

        assert!(sample().validate().is_ok());
    }
}
