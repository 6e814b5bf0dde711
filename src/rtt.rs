// RTT statistics consumed by the core. The core only depends on the
// `RttStats` trait; `SampledRttStats` is a minimal concrete implementation
// so a caller isn't forced to write its own smoothing before it can
// exercise a controller.

use crate::time::{Duration, Timepoint};

/// Matches common QUIC practice for the RTT assumed before any sample has
/// been taken.
const INITIAL_RTT: Duration = Duration::from_millis(333);

/// Statistics about the round-trip time of a path, as seen by the sender.
pub trait RttStats {
    /// The most recent RTT sample.
    fn latest_rtt(&self) -> Duration;

    /// The smoothed RTT as it stood before the most recent update.
    fn previous_srtt(&self) -> Duration;

    /// The exponentially smoothed RTT.
    fn smoothed_rtt(&self) -> Duration;

    /// `smoothed_rtt()` once a sample exists, otherwise a fixed initial RTT.
    fn smoothed_or_initial_rtt(&self) -> Duration;

    /// The minimum RTT observed over the life of the path.
    fn min_rtt(&self) -> Duration;
}

/// A plain EWMA-based `RttStats`, matching the classic
/// `srtt = srtt * 7/8 + sample/8` update.
#[derive(Debug, Clone, Copy)]
pub struct SampledRttStats {
    latest_rtt: Duration,
    previous_srtt: Duration,
    smoothed_rtt: Duration,
    min_rtt: Duration,
    has_sample: bool,
}

impl Default for SampledRttStats {
    fn default() -> Self {
        SampledRttStats {
            latest_rtt: Duration::zero(),
            previous_srtt: Duration::zero(),
            smoothed_rtt: Duration::zero(),
            min_rtt: Duration::infinite(),
            has_sample: false,
        }
    }
}

impl SampledRttStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in a new RTT sample taken at `_now` (kept for symmetry with
    /// callers that log the sample time; the smoothing itself is
    /// time-independent).
    pub fn update(&mut self, sample: Duration, _now: Timepoint) {
        if !self.has_sample {
            self.latest_rtt = sample;
            self.previous_srtt = sample;
            self.smoothed_rtt = sample;
            self.min_rtt = sample;
            self.has_sample = true;
            log::trace!("rtt: first sample {:?}", sample);
            return;
        }

        self.previous_srtt = self.smoothed_rtt;
        self.latest_rtt = sample;
        self.min_rtt = self.min_rtt.min(sample);
        self.smoothed_rtt = self.smoothed_rtt.checked_mul_ratio(7, 8)
            + sample.checked_mul_ratio(1, 8);
        log::trace!(
            "rtt: sample {:?}, srtt {:?}, min_rtt {:?}",
            sample,
            self.smoothed_rtt,
            self.min_rtt
        );
    }

    pub fn reset(&mut self) {
        *self = SampledRttStats::default();
    }
}

impl RttStats for SampledRttStats {
    fn latest_rtt(&self) -> Duration {
        self.latest_rtt
    }

    fn previous_srtt(&self) -> Duration {
        self.previous_srtt
    }

    fn smoothed_rtt(&self) -> Duration {
        self.smoothed_rtt
    }

    fn smoothed_or_initial_rtt(&self) -> Duration {
        if self.has_sample {
            self.smoothed_rtt
        } else {
            INITIAL_RTT
        }
    }

    fn min_rtt(&self) -> Duration {
        self.min_rtt
    }
}
