use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::inference::{InferenceError, InferenceService};
use crate::model::{AnalysisResult, HeatmapPoint, Phenotype, Severity};
use crate::upload::UploadedImage;

/// Artificial latency of the reference mock.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(2500);

/// Share of runs classified healthy.
const HEALTHY_CUTOFF: f64 = 0.3;

const SICK_PHENOTYPES: [Phenotype; 3] = [Phenotype::Bacterial, Phenotype::Viral, Phenotype::Fungal];
const SEVERITIES: [Severity; 3] = [Severity::Low, Severity::Moderate, Severity::Critical];

pub const HEALTHY_FINDINGS: [&str; 3] = [
    "Clear lung fields",
    "Normal cardiac silhouette",
    "No active disease process identified",
];
pub const DISEASE_FINDINGS: [&str; 3] = [
    "Opacity in lower right lobe",
    "Interstitial markings present",
    "Pleural effusion suspected",
];

/// Stand-in backend that fabricates a plausible report after a fixed delay.
pub struct MockInference {
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl MockInference {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible sequence of results.
    pub fn with_seed(delay: Duration, seed: u64) -> Self {
        Self {
            delay,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

impl InferenceService for MockInference {
    fn analyze(&self, image: &UploadedImage) -> Result<AnalysisResult, InferenceError> {
        tracing::debug!("mock analysis of {} ({:?} delay)", image.name(), self.delay);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(generate_result(&mut *rng))
    }

    fn health(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Draws one result. Each `u` below is a fresh uniform sample in [0,1),
/// taken in the order written here.
pub fn generate_result<R: Rng + ?Sized>(rng: &mut R) -> AnalysisResult {
    let is_sick = rng.random::<f64>() > HEALTHY_CUTOFF;

    let (probability, phenotype, severity, findings) = if is_sick {
        let probability = 75 + scaled_index(rng, 24);
        let phenotype = SICK_PHENOTYPES[scaled_index(rng, SICK_PHENOTYPES.len())];
        let severity = SEVERITIES[scaled_index(rng, SEVERITIES.len())];
        (probability, phenotype, severity, DISEASE_FINDINGS)
    } else {
        let probability = 2 + scaled_index(rng, 10);
        (probability, Phenotype::Normal, Severity::Low, HEALTHY_FINDINGS)
    };

    let heatmap_points = vec![
        HeatmapPoint {
            x: (30.0 + rng.random::<f64>() * 40.0) as f32,
            y: (30.0 + rng.random::<f64>() * 40.0) as f32,
            intensity: 0.8,
        },
        HeatmapPoint {
            x: (40.0 + rng.random::<f64>() * 20.0) as f32,
            y: (50.0 + rng.random::<f64>() * 20.0) as f32,
            intensity: 0.6,
        },
    ];

    AnalysisResult {
        probability: probability as f32,
        phenotype,
        severity,
        findings: findings.iter().map(|s| s.to_string()).collect(),
        heatmap_points,
    }
}

/// floor(u * n) for one uniform draw `u`.
fn scaled_index<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    let idx = (rng.random::<f64>() * n as f64).floor() as usize;
    idx.min(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::RngCore;
    use rstest::rstest;

    /// Replays fixed uniform samples through `random::<f64>()`.
    struct ScriptedRng {
        samples: Vec<f64>,
        pos: usize,
    }

    impl ScriptedRng {
        fn new(samples: &[f64]) -> Self {
            Self {
                samples: samples.to_vec(),
                pos: 0,
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let v = self.samples.get(self.pos).copied().unwrap_or(0.0);
            self.pos += 1;
            ((v * (1u64 << 53) as f64) as u64) << 11
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }

    #[test]
    fn healthy_branch_follows_reference_formula() {
        let mut rng = ScriptedRng::new(&[0.25, 0.95, 0.0, 0.5, 0.5, 0.5]);
        let result = generate_result(&mut rng);
        assert_relative_eq!(result.probability, 11.0);
        assert_eq!(result.phenotype, Phenotype::Normal);
        assert_eq!(result.severity, Severity::Low);
        assert_eq!(result.findings, HEALTHY_FINDINGS);
        assert_relative_eq!(result.heatmap_points[0].x, 30.0);
        assert_relative_eq!(result.heatmap_points[0].y, 50.0);
        assert_relative_eq!(result.heatmap_points[1].x, 50.0);
        assert_relative_eq!(result.heatmap_points[1].y, 60.0);
    }

    #[test]
    fn sick_branch_follows_reference_formula() {
        let mut rng = ScriptedRng::new(&[0.75, 0.999, 0.5, 0.999, 0.0, 0.0, 0.0, 0.0]);
        let result = generate_result(&mut rng);
        assert_relative_eq!(result.probability, 98.0);
        assert_eq!(result.phenotype, Phenotype::Viral);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.findings, DISEASE_FINDINGS);
        assert_relative_eq!(result.heatmap_points[1].x, 40.0);
        assert_relative_eq!(result.heatmap_points[1].y, 50.0);
    }

    #[test]
    fn lowest_draws_give_lowest_sick_values() {
        let mut rng = ScriptedRng::new(&[0.5, 0.0, 0.0, 0.0]);
        let result = generate_result(&mut rng);
        assert_relative_eq!(result.probability, 75.0);
        assert_eq!(result.phenotype, Phenotype::Bacterial);
        assert_eq!(result.severity, Severity::Low);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(42)]
    #[case(2024)]
    fn generated_results_respect_invariants(#[case] seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..500 {
            let r = generate_result(&mut rng);
            assert!((0.0..=100.0).contains(&r.probability));
            assert_eq!(r.findings.len(), 3);
            assert_eq!(r.heatmap_points.len(), 2);
            for p in &r.heatmap_points {
                assert!(p.intensity > 0.0 && p.intensity <= 1.0);
                assert!((30.0..=70.0).contains(&p.x));
                assert!((30.0..=70.0).contains(&p.y));
            }
            if r.phenotype == Phenotype::Normal {
                assert_eq!(r.severity, Severity::Low);
                assert!((2.0..=11.0).contains(&r.probability));
                assert_eq!(r.findings, HEALTHY_FINDINGS);
            } else {
                assert!((75.0..=98.0).contains(&r.probability));
                assert_eq!(r.findings, DISEASE_FINDINGS);
            }
            assert!(r.validate().is_ok());
        }
    }

    #[test]
    fn both_branches_occur() {
        let mut rng = StdRng::seed_from_u64(99);
        let results: Vec<_> = (0..200).map(|_| generate_result(&mut rng)).collect();
        assert!(results.iter().any(|r| r.phenotype == Phenotype::Normal));
        assert!(results.iter().any(|r| r.phenotype != Phenotype::Normal));
    }

    #[test]
    fn seeded_mocks_repeat_their_sequence() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes("a.dcm", vec![1; 8])?;
        let a = MockInference::with_seed(Duration::ZERO, 5);
        let b = MockInference::with_seed(Duration::ZERO, 5);
        for _ in 0..5 {
            assert_eq!(a.analyze(&image)?, b.analyze(&image)?);
        }
        assert!(a.health());
        Ok(())
    }
}
