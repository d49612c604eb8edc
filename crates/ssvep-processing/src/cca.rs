//! Canonical correlation detector
//!
//! For each target frequency a reference matrix of harmonic sine/cosine
//! pairs is built and the canonical correlations between it and the
//! multi-channel window are computed. Covariances get a small ridge term
//! before Cholesky whitening; any degenerate factorization scores 0.0 for
//! that target rather than failing the cycle.

use crate::detector::{DetectionOutcome, DetectorConfig, FrequencyDetector};
use nalgebra::DMatrix;
use ssvep_core::{SsvepError, SsvepResult, Window};
use tracing::debug;

pub struct CcaDetector {
    config: DetectorConfig,
}

impl CcaDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

/// Reference matrix for one stimulus frequency: `samples` rows, one
/// sin/cos column pair per harmonic.
pub fn harmonic_reference(freq: f32, sampling_rate: f32, samples: usize, harmonics: usize) -> DMatrix<f32> {
    let mut reference = DMatrix::zeros(samples, 2 * harmonics);
    for h in 0..harmonics {
        let omega = 2.0 * std::f32::consts::PI * freq * (h + 1) as f32 / sampling_rate;
        for i in 0..samples {
            let phase = omega * i as f32;
            reference[(i, 2 * h)] = phase.sin();
            reference[(i, 2 * h + 1)] = phase.cos();
        }
    }
    reference
}

/// Subtract the column means in place.
fn center_columns(m: &mut DMatrix<f32>) {
    let rows = m.nrows() as f32;
    for mut column in m.column_iter_mut() {
        let mean = column.sum() / rows;
        column.add_scalar_mut(-mean);
    }
}

/// Canonical correlations between column-centered `x` and `y`, descending.
///
/// Returns `None` when a covariance factorization is not positive definite
/// even after ridge regularization.
pub fn canonical_correlations(x: &DMatrix<f32>, y: &DMatrix<f32>, ridge: f32) -> Option<Vec<f32>> {
    let n = x.nrows() as f32;
    if x.nrows() != y.nrows() || x.nrows() < 2 {
        return None;
    }

    let mut cxx = x.transpose() * x / n;
    let mut cyy = y.transpose() * y / n;
    let cxy = x.transpose() * y / n;
    for i in 0..cxx.nrows() {
        cxx[(i, i)] += ridge;
    }
    for i in 0..cyy.nrows() {
        cyy[(i, i)] += ridge;
    }

    let lx = nalgebra::Cholesky::new(cxx)?.l();
    let ly = nalgebra::Cholesky::new(cyy)?.l();

    // Whiten both sides: K = Lx^-1 Cxy Ly^-T, correlations are its
    // singular values.
    let a = lx.solve_lower_triangular(&cxy)?;
    let kt = ly.solve_lower_triangular(&a.transpose())?;

    let svd = nalgebra::SVD::try_new(kt, false, false, f32::EPSILON, 0)?;
    let mut values: Vec<f32> = svd
        .singular_values
        .iter()
        .map(|&s| s.clamp(0.0, 1.0))
        .collect();
    values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    Some(values)
}

impl FrequencyDetector for CcaDetector {
    fn score(&mut self, window: &Window, targets: &[f32]) -> SsvepResult<DetectionOutcome> {
        let samples = window.samples_per_channel();
        let channels = window.channel_count();
        let required = 2 * self.config.cca_harmonics.max(1);
        if samples <= required {
            return Err(SsvepError::InsufficientData {
                available: samples,
                required: required + 1,
            });
        }

        let mut x = DMatrix::zeros(samples, channels);
        for (c, series) in window.all_channels().iter().enumerate() {
            for (i, &v) in series.iter().enumerate() {
                x[(i, c)] = v;
            }
        }
        center_columns(&mut x);

        let components = self.config.cca_components.max(1);
        let scores = targets
            .iter()
            .map(|&freq| {
                let mut y = harmonic_reference(
                    freq,
                    window.sampling_rate(),
                    samples,
                    self.config.cca_harmonics.max(1),
                );
                center_columns(&mut y);
                match canonical_correlations(&x, &y, self.config.ridge) {
                    Some(values) => values.iter().take(components).sum(),
                    None => {
                        debug!(freq, "degenerate covariance, target scored zero");
                        0.0
                    }
                }
            })
            .collect();

        Ok(DetectionOutcome::from_scores(scores))
    }

    fn name(&self) -> &str {
        "cca"
    }
}
