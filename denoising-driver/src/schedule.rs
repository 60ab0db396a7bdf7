//! Discrete noise schedules, ported exactly from the original
//! diffusion model's `NoiseScheduler._compute_betas`.

use core_config::NoiseScheduleKind;

pub const DEFAULT_BETA_START: f64 = 0.0001;
pub const DEFAULT_BETA_END: f64 = 0.02;

/// Precomputed beta/alpha values for a fixed-cardinality sampling
/// schedule. Cumulative products are computed once and reused across
/// every span in a request.
#[derive(Debug, Clone)]
pub struct NoiseSchedule {
    pub betas: Vec<f64>,
    pub alphas_cumprod: Vec<f64>,
}

impl NoiseSchedule {
    pub fn new(num_steps: u32, kind: NoiseScheduleKind) -> Self {
        Self::with_bounds(num_steps, kind, DEFAULT_BETA_START, DEFAULT_BETA_END)
    }

    pub fn with_bounds(num_steps: u32, kind: NoiseScheduleKind, beta_start: f64, beta_end: f64) -> Self {
        let betas = compute_betas(num_steps, kind, beta_start, beta_end);
        let mut alphas_cumprod = Vec::with_capacity(betas.len());
        let mut running = 1.0;
        for beta in &betas {
            running *= 1.0 - beta;
            alphas_cumprod.push(running);
        }
        Self { betas, alphas_cumprod }
    }

    pub fn num_steps(&self) -> usize {
        self.betas.len()
    }

    pub fn beta(&self, t: usize) -> f64 {
        self.betas[t]
    }

    pub fn alpha_cumprod(&self, t: usize) -> f64 {
        self.alphas_cumprod[t]
    }
}

fn compute_betas(num_steps: u32, kind: NoiseScheduleKind, beta_start: f64, beta_end: f64) -> Vec<f64> {
    let n = num_steps as usize;
    if n == 0 {
        return Vec::new();
    }

    match kind {
        NoiseScheduleKind::Linear => {
            if n == 1 {
                return vec![beta_start];
            }
            let step = (beta_end - beta_start) / (n - 1) as f64;
            (0..n).map(|i| beta_start + step * i as f64).collect()
        }
        NoiseScheduleKind::Cosine => {
            // Nichol & Dhariwal cosine schedule, anchored at 0.008/1.008,
            // capped at 0.999 to avoid a singularity at the final step.
            let alpha_bar: Vec<f64> = (0..=n)
                .map(|i| {
                    let s = i as f64 / n as f64;
                    ((s + 0.008) / 1.008 * std::f64::consts::FRAC_PI_2).cos().powi(2)
                })
                .collect();
            (0..n)
                .map(|i| (1.0 - alpha_bar[i + 1] / alpha_bar[i]).min(0.999))
                .collect()
        }
        NoiseScheduleKind::Sqrt => (0..n)
            .map(|i| (i as f64 / n as f64).sqrt() * (beta_end - beta_start) + beta_start)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_schedule_spans_start_to_end() {
        let s = NoiseSchedule::new(4, NoiseScheduleKind::Linear);
        assert_eq!(s.num_steps(), 4);
        assert!((s.beta(0) - DEFAULT_BETA_START).abs() < 1e-12);
        assert!((s.beta(3) - DEFAULT_BETA_END).abs() < 1e-12);
    }

    #[test]
    fn cosine_schedule_betas_are_capped() {
        let s = NoiseSchedule::new(100, NoiseScheduleKind::Cosine);
        assert!(s.betas.iter().all(|b| *b <= 0.999));
    }

    #[test]
    fn sqrt_schedule_starts_at_beta_start() {
        let s = NoiseSchedule::new(8, NoiseScheduleKind::Sqrt);
        assert!((s.beta(0) - DEFAULT_BETA_START).abs() < 1e-12);
    }

    #[test]
    fn alphas_cumprod_is_monotonically_decreasing() {
        let s = NoiseSchedule::new(8, NoiseScheduleKind::Cosine);
        for w in s.alphas_cumprod.windows(2) {
            assert!(w[1] <= w[0]);
        }
    }
}
