use std::f64::consts::PI;

use burn::{config::Config, lr_scheduler::LrScheduler, tensor::backend::Backend, LearningRate};

/// Cosine anneal from `start` to `end` as `pct` goes from 0.0 to 1.0.
///
/// Values of `pct` outside [0, 1] are not clamped and extrapolate along the
/// same cosine arc.
pub fn annealing_cos(start: f64, end: f64, pct: f64) -> f64 {
    let cos_out = (PI * pct).cos() + 1.0;
    end + (start - end) / 2.0 * cos_out
}

// Resolution of the reference timeline the factor is derived on. The value
// and the `-1` step offsets below reproduce the reference one-cycle schedule
// exactly; changing them changes the numeric result.
const REFERENCE_STEPS: i64 = 1000;

/// Learning-rate factor to apply at `swa_epoch_start`, relative to the peak
/// learning rate of a one-cycle schedule with the given `warmup_pct`.
///
/// Both fractions are expected in (0, 1). A `warmup_pct` that rounds to the
/// end of the reference timeline makes the annealing segment empty and the
/// division below produce a non-finite result.
pub fn swa_lr_factor(
    warmup_pct: f64,
    swa_epoch_start: f64,
    div_factor: f64,
    final_div_factor: f64,
) -> f64 {
    let start_step = (REFERENCE_STEPS as f64 * warmup_pct) as i64 - 1;
    let end_step = REFERENCE_STEPS - 1;
    let step_num = (REFERENCE_STEPS as f64 * swa_epoch_start) as i64 - 1;
    let pct = (step_num - start_step) as f64 / (end_step - start_step) as f64;

    annealing_cos(1.0, 1.0 / (div_factor * final_div_factor), pct)
}

/// Stochastic weight averaging settings for a one-cycle run.
#[derive(Config, Debug)]
pub struct SwaConfig {
    /// Fraction of training at which weight averaging starts.
    #[config(default = 0.75)]
    pub epoch_start: f64,
    /// Peak-LR to initial-LR ratio of the underlying one-cycle schedule.
    #[config(default = 25.0)]
    pub div_factor: f64,
    /// Peak-LR to final-LR ratio of the underlying one-cycle schedule.
    #[config(default = 1e4)]
    pub final_div_factor: f64,
}

impl SwaConfig {
    /// Multiplier on the peak learning rate at the SWA start point.
    pub fn lr_factor(&self, warmup_pct: f64) -> f64 {
        swa_lr_factor(
            warmup_pct,
            self.epoch_start,
            self.div_factor,
            self.final_div_factor,
        )
    }

    /// Constant learning rate to hold during the SWA phase.
    pub fn swa_lr(&self, max_lr: f64, warmup_pct: f64) -> f64 {
        max_lr * self.lr_factor(warmup_pct)
    }
}

/// One-cycle learning-rate schedule with a constant SWA tail.
///
/// Rises from `max_lr / div_factor` to `max_lr` over the warmup fraction,
/// anneals down towards `max_lr / (div_factor * final_div_factor)`, and from
/// the SWA start step onwards holds the SWA learning rate.
#[derive(Config, Debug)]
pub struct OneCycleSwaSchedulerConfig {
    /// Peak learning rate.
    pub max_lr: f64,
    /// Total number of optimizer steps in the run.
    pub total_steps: usize,
    /// Fraction of the run spent in the rising phase.
    #[config(default = 0.075)]
    pub warmup_pct: f64,
    pub swa: SwaConfig,
}

impl OneCycleSwaSchedulerConfig {
    pub fn init(&self) -> OneCycleSwaScheduler {
        assert!(self.total_steps > 0, "total_steps must be positive");
        assert!(
            self.warmup_pct > 0.0 && self.warmup_pct < 1.0,
            "warmup_pct must be in (0, 1)"
        );

        let warmup_steps = (self.total_steps as f64 * self.warmup_pct) as usize;
        let swa_start_step = (self.total_steps as f64 * self.swa.epoch_start) as usize;
        let initial_lr = self.max_lr / self.swa.div_factor;

        OneCycleSwaScheduler {
            step: 0,
            total_steps: self.total_steps,
            warmup_steps: warmup_steps.max(1),
            swa_start_step,
            initial_lr,
            max_lr: self.max_lr,
            min_lr: initial_lr / self.swa.final_div_factor,
            swa_lr: self.swa.swa_lr(self.max_lr, self.warmup_pct),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OneCycleSwaScheduler {
    step: usize,
    total_steps: usize,
    warmup_steps: usize,
    swa_start_step: usize,
    initial_lr: f64,
    max_lr: f64,
    min_lr: f64,
    swa_lr: f64,
}

impl OneCycleSwaScheduler {
    /// Learning rate at a given optimizer step.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step >= self.swa_start_step {
            return self.swa_lr;
        }
        if step < self.warmup_steps {
            let pct = step as f64 / self.warmup_steps as f64;
            return annealing_cos(self.initial_lr, self.max_lr, pct);
        }
        let anneal_steps = (self.total_steps - self.warmup_steps).max(1);
        let pct = (step - self.warmup_steps) as f64 / anneal_steps as f64;

        annealing_cos(self.max_lr, self.min_lr, pct)
    }
}

impl<B: Backend> LrScheduler<B> for OneCycleSwaScheduler {
    type Record = usize;

    fn step(&mut self) -> LearningRate {
        let lr = self.lr_at(self.step);
        self.step += 1;
        lr
    }

    fn to_record(&self) -> Self::Record {
        self.step
    }

    fn load_record(mut self, record: Self::Record) -> Self {
        self.step = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    #[test]
    fn annealing_cos_endpoints() {
        assert!((annealing_cos(3.0, -2.0, 0.0) - 3.0).abs() < 1e-12);
        assert!((annealing_cos(3.0, -2.0, 1.0) - (-2.0)).abs() < 1e-12);
        assert!((annealing_cos(0.1, 0.7, 0.0) - 0.1).abs() < 1e-12);
        assert!((annealing_cos(0.1, 0.7, 1.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn annealing_cos_midpoint() {
        assert!((annealing_cos(1.0, 0.0, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn factor_is_one_at_warmup_end() {
        for warmup_pct in [0.05, 0.1, 0.25, 0.5] {
            let factor = swa_lr_factor(warmup_pct, warmup_pct, 25.0, 1e4);
            assert!((factor - 1.0).abs() < 1e-12, "warmup_pct {warmup_pct}");
        }
    }

    #[test]
    fn factor_approaches_final_lr_ratio() {
        let floor = 1.0 / (25.0 * 1e4);
        let factor = swa_lr_factor(0.1, 0.999, 25.0, 1e4);
        assert!(factor >= floor);
        assert!(factor < 1e-5);
    }

    #[test]
    fn factor_is_monotone_in_swa_start() {
        let warmup_pct = 0.1;
        let mut previous = f64::INFINITY;
        for i in 0..17 {
            let swa_start = 0.15 + 0.05 * i as f64;
            let factor = swa_lr_factor(warmup_pct, swa_start, 25.0, 1e4);
            assert!(factor <= previous, "swa_start {swa_start}");
            previous = factor;
        }
    }

    #[test]
    fn factor_matches_reference_derivation() {
        // warmup ends at step 249, SWA starts at step 749, timeline ends at 999.
        let expected_pct = (749 - 249) as f64 / (999 - 249) as f64;
        let expected = annealing_cos(1.0, 1.0 / (25.0 * 1e4), expected_pct);
        let factor = swa_lr_factor(0.25, 0.75, 25.0, 1e4);
        assert!((factor - expected).abs() < 1e-15);
    }

    #[test]
    fn swa_config_defaults() {
        let config = SwaConfig::new();
        assert_eq!(config.epoch_start, 0.75);
        assert_eq!(config.div_factor, 25.0);
        assert_eq!(config.final_div_factor, 1e4);

        let swa_lr = config.swa_lr(7e-4, 0.075);
        assert!(swa_lr > 0.0 && swa_lr < 7e-4);
    }

    #[test]
    fn scheduler_phases() {
        let scheduler = OneCycleSwaSchedulerConfig::new(1e-3, 1000, SwaConfig::new())
            .with_warmup_pct(0.1)
            .init();

        // Warmup starts at max_lr / div_factor and peaks at max_lr.
        assert!((scheduler.lr_at(0) - 1e-3 / 25.0).abs() < 1e-12);
        assert!((scheduler.lr_at(100) - 1e-3).abs() < 1e-9);
        // Annealing decreases after the peak.
        assert!(scheduler.lr_at(400) < scheduler.lr_at(200));
        // SWA tail is constant.
        let swa_lr = scheduler.lr_at(750);
        assert_eq!(scheduler.lr_at(900), swa_lr);
        assert_eq!(scheduler.lr_at(999), swa_lr);
        assert!(swa_lr < scheduler.lr_at(749));
    }

    #[test]
    fn scheduler_swa_tail_matches_factor() {
        let config = OneCycleSwaSchedulerConfig::new(1e-3, 1000, SwaConfig::new());
        let scheduler = config.init();
        let expected = 1e-3 * swa_lr_factor(0.075, 0.75, 25.0, 1e4);
        assert!((scheduler.lr_at(800) - expected).abs() < 1e-15);
    }

    #[test]
    fn scheduler_steps_and_records() {
        let mut scheduler = OneCycleSwaSchedulerConfig::new(1e-3, 100, SwaConfig::new())
            .with_warmup_pct(0.1)
            .init();

        let first = LrScheduler::<NdArray>::step(&mut scheduler);
        let second = LrScheduler::<NdArray>::step(&mut scheduler);
        assert!((first - 1e-3 / 25.0).abs() < 1e-12);
        assert!(second > first);

        let record = LrScheduler::<NdArray>::to_record(&scheduler);
        assert_eq!(record, 2);
        let restored = OneCycleSwaSchedulerConfig::new(1e-3, 100, SwaConfig::new())
            .with_warmup_pct(0.1)
            .init();
        let restored = LrScheduler::<NdArray>::load_record(restored, record);
        assert_eq!(restored.step, 2);
    }
}
