//! Threshold-average power — the record's headline metrics.
//!
//! For each configured current threshold, find the sample whose current is
//! closest to the threshold and average output power over the window centered
//! there. Ties between equidistant samples prefer the later sample, which
//! reflects settled state. Computed only over a frozen, completed sample set;
//! never partial.

use crate::record::{TelemetrySample, ThresholdPower, DEFAULT_CURRENT_THRESHOLDS};

/// Configuration for threshold-average power extraction.
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    /// Current thresholds in amps.
    pub thresholds: Vec<f64>,
    /// Samples averaged on each side of the closest sample.
    pub window: usize,
    /// Maximum relative distance from a threshold for its metric to count as
    /// having data. A threshold with no sample within `threshold ×
    /// tolerance_frac` amps reports `None`.
    pub tolerance_frac: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_CURRENT_THRESHOLDS.to_vec(),
            // ±25 samples = a 0.5 s window at the 100 Hz reference rate.
            window: 25,
            tolerance_frac: 0.2,
        }
    }
}

/// Compute per-threshold average output power over a completed sample set.
pub fn threshold_power(samples: &[TelemetrySample], config: &ThresholdConfig) -> Vec<ThresholdPower> {
    config
        .thresholds
        .iter()
        .map(|&threshold| metric_for(samples, threshold, config))
        .collect()
}

fn metric_for(samples: &[TelemetrySample], threshold: f64, config: &ThresholdConfig) -> ThresholdPower {
    let mut best: Option<(usize, f64)> = None;
    for (i, sample) in samples.iter().enumerate() {
        let dist = (sample.current - threshold).abs();
        // <= so the later of two equidistant samples wins.
        match best {
            Some((_, best_dist)) if dist > best_dist => {}
            _ => best = Some((i, dist)),
        }
    }

    match best {
        Some((i, dist)) if dist <= threshold * config.tolerance_frac => {
            let lo = i.saturating_sub(config.window);
            let hi = (i + config.window + 1).min(samples.len());
            let window = &samples[lo..hi];
            let avg = window.iter().map(|s| s.output_power).sum::<f64>() / window.len() as f64;
            ThresholdPower {
                threshold_amps: threshold,
                avg_output_power: Some(avg),
                sample_count: window.len(),
            }
        }
        _ => ThresholdPower {
            threshold_amps: threshold,
            avg_output_power: None,
            sample_count: 0,
        },
    }
}
