//! Calibration lifecycle: the device collects a baseline for 48 hours, then
//! the baseline is stored once and the device counts as calibrated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::baseline::{self, BaselineRecord, BaselineStore};
use crate::sensors::{self, GasSensor, Indicator, Shared};

/// How long the gas sensor needs to settle on a baseline
pub const WARMUP: Duration = Duration::from_millis(172_800_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CollectingBaseline,
    Calibrated,
}

/// Latch flipped once by the calibration timer and read by everyone else.
#[derive(Debug, Default)]
pub struct CalibrationState {
    calibrated: AtomicBool,
}

impl CalibrationState {
    pub fn phase(&self) -> Phase {
        if self.calibrated.load(Ordering::Acquire) {
            Phase::Calibrated
        } else {
            Phase::CollectingBaseline
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.phase() == Phase::Calibrated
    }

    /// Returns false if it was already latched
    fn latch(&self) -> bool {
        !self.calibrated.swap(true, Ordering::AcqRel)
    }
}

/// One shot timer finishing calibration. Firing it a second time does
/// nothing.
pub struct CalibrationTimer<G, I> {
    armed: AtomicBool,
    state: Arc<CalibrationState>,
    gas: Shared<G>,
    indicator: Shared<I>,
    store: BaselineStore,
}

impl<G, I> CalibrationTimer<G, I>
where
    G: GasSensor,
    I: Indicator,
{
    pub fn new(
        state: Arc<CalibrationState>,
        gas: Shared<G>,
        indicator: Shared<I>,
        store: BaselineStore,
    ) -> Self {
        Self {
            armed: AtomicBool::new(true),
            state,
            gas,
            indicator,
            store,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Marks the device calibrated, lights the indicator and snapshots the
    /// gas sensor's baseline to disk. Only the first call does anything,
    /// later calls return `None`.
    ///
    /// A failed save is logged and not retried.
    pub fn fire(&self) -> Option<Result<BaselineRecord, baseline::Error>> {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return None;
        }

        if self.state.latch() {
            info!("baseline collection finished, device is calibrated");
        }

        if let Err(e) = sensors::lock(&self.indicator).set(true) {
            warn!("Could not switch on indicator: {e}");
        }

        let res = self.store.save(&mut *sensors::lock(&self.gas));
        match &res {
            Ok(record) => info!(
                "stored calibration baseline: co2eq {}, tvoc {}",
                record.co2eq_baseline, record.tvoc_baseline
            ),
            Err(e) => error!(
                "Could not store calibration baseline, it will not be \
                restored after a reboot: {e}"
            ),
        }
        Some(res)
    }
}

impl<G, I> CalibrationTimer<G, I>
where
    G: GasSensor + Send + 'static,
    I: Indicator + Send + 'static,
{
    /// Fires the timer once `after` has elapsed. Dropping the returned
    /// handle cancels the countdown.
    pub fn start(self: Arc<Self>, after: Duration) -> TimerHandle {
        info!("calibration timer started, fires in {after:?}");
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            self.fire();
        });
        TimerHandle(task)
    }
}

#[derive(Debug)]
pub struct TimerHandle(JoinHandle<()>);

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_flips_once() {
        let state = CalibrationState::default();
        assert_eq!(state.phase(), Phase::CollectingBaseline);
        assert!(state.latch());
        assert!(!state.latch());
        assert!(state.is_calibrated());
    }

    #[test]
    fn warmup_is_two_days() {
        assert_eq!(WARMUP, Duration::from_secs(48 * 60 * 60));
    }
}
