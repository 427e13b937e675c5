use crate::error::{Error, Result};
use itertools::{Itertools, MinMaxResult};
use std::time::Duration;

/// Aggregate statistics of a set of round trip time samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    min: f64,
    max: f64,
    mean: f64,
    mean_deviation: f64,
}

impl Statistics {
    /// Compute the statistics of `samples`.
    ///
    /// The mean deviation is the mean of the absolute differences between
    /// each sample and the mean.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyInput` if `samples` is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Result<Self> {
        let (min, max) = match samples.iter().copied().minmax() {
            MinMaxResult::NoElements => return Err(Error::EmptyInput),
            MinMaxResult::OneElement(sample) => (sample, sample),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let len = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / len;
        let mean_deviation = samples.iter().map(|s| (s - mean).abs()).sum::<f64>() / len;
        Ok(Self {
            min,
            max,
            mean,
            mean_deviation,
        })
    }

    /// Compute the statistics of `samples` in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyInput` if `samples` is empty.
    pub fn from_durations(samples: &[Duration]) -> Result<Self> {
        let samples = samples
            .iter()
            .map(|d| d.as_secs_f64() * 1000_f64)
            .collect::<Vec<_>>();
        Self::from_samples(&samples)
    }

    /// The smallest sample.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// The largest sample.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub const fn mean_deviation(&self) -> f64 {
        self.mean_deviation
    }
}

/// The final tally of a ping measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingSummary {
    /// The number of probes sent.
    pub transmitted: usize,
    /// The number of probes which elicited a reply, from the target or not.
    pub received: usize,
    /// The number of probes which timed out.
    pub losses: usize,
    /// The round trip time statistics, if any probe was answered by the target.
    pub rtt: Option<Statistics>,
}

impl PingSummary {
    /// The % of probes that are lost.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn loss_pct(&self) -> f64 {
        if self.transmitted > 0 {
            self.losses as f64 / self.transmitted as f64 * 100_f64
        } else {
            0_f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const EPSILON: f64 = 0.01;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < EPSILON,
            "expected {expected}, actual {actual}"
        );
    }

    #[test_case(&[10.0, 20.0, 30.0], 10.0, 30.0, 20.0, 6.67)]
    #[test_case(&[5.0], 5.0, 5.0, 5.0, 0.0)]
    #[test_case(&[30.0, 10.0], 10.0, 30.0, 20.0, 10.0)]
    #[test_case(&[1.5, 1.5, 1.5, 1.5], 1.5, 1.5, 1.5, 0.0)]
    fn test_from_samples(samples: &[f64], min: f64, max: f64, mean: f64, mdev: f64) {
        let stats = Statistics::from_samples(samples).unwrap();
        assert_close(min, stats.min());
        assert_close(max, stats.max());
        assert_close(mean, stats.mean());
        assert_close(mdev, stats.mean_deviation());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            Statistics::from_samples(&[]),
            Err(Error::EmptyInput)
        ));
        assert!(matches!(
            Statistics::from_durations(&[]),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_from_durations() -> anyhow::Result<()> {
        let samples = [
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_micros(30_000),
        ];
        let stats = Statistics::from_durations(&samples)?;
        assert_close(10.0, stats.min());
        assert_close(30.0, stats.max());
        assert_close(20.0, stats.mean());
        assert_close(6.67, stats.mean_deviation());
        Ok(())
    }

    #[test_case(0, 0, 0.0)]
    #[test_case(4, 0, 0.0)]
    #[test_case(4, 1, 25.0)]
    #[test_case(3, 3, 100.0)]
    fn test_loss_pct(transmitted: usize, losses: usize, expected: f64) {
        let summary = PingSummary {
            transmitted,
            received: transmitted - losses,
            losses,
            rtt: None,
        };
        assert_close(expected, summary.loss_pct());
    }
}
