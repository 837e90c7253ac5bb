use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::WrapErr;
use color_eyre::{Result, Section};
use tracing::{error, info};

use crate::baseline::BaselineStore;
use crate::calibration::{CalibrationState, CalibrationTimer, WARMUP};
use crate::queue::{Persistence, QueueStore};
use crate::sampler::Sampler;
use crate::schedule::repeat;
use crate::sensors::{self, GasSensor, Indicator, Shared, Thermometer};

#[derive(Debug, Clone)]
pub struct Config {
    /// Holds the baseline and queue files
    pub data_dir: PathBuf,
    pub interval: Duration,
    pub warmup: Duration,
    pub persistence: Persistence,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            interval: Duration::from_secs(3),
            warmup: WARMUP,
            persistence: Persistence::default(),
        }
    }
}

/// Restores calibration, arms the calibration timer and samples until a
/// sensor fails or `shutdown` completes. The queue is saved before
/// returning.
pub async fn run<T, G, I>(
    config: &Config,
    mut thermometer: T,
    gas: Shared<G>,
    indicator: Shared<I>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    T: Thermometer,
    G: GasSensor + Send + 'static,
    I: Indicator + Send + 'static,
{
    thermometer
        .measure()
        .wrap_err("Could not take initial temperature and humidity measurement")?;
    let baselines = BaselineStore::new(&config.data_dir);
    let restored = {
        let mut gas = sensors::lock(&gas);
        gas.set_humidity_compensation(thermometer.humidity(), thermometer.temperature())
            .wrap_err("Could not set gas sensor humidity compensation")?;
        baselines
            .load(&mut *gas)
            .wrap_err("Could not restore baseline")
            .with_note(|| format!("path: {}", baselines.path().display()))?
    };
    if restored.is_none() {
        info!("no stored baseline, collecting one over {:?}", config.warmup);
    }

    let calibration = Arc::new(CalibrationState::default());
    let timer = CalibrationTimer::new(
        calibration.clone(),
        gas.clone(),
        indicator.clone(),
        baselines,
    );
    let _timer = Arc::new(timer).start(config.warmup);

    let queue = QueueStore::new(&config.data_dir);
    let mut sampler = Sampler::new(
        thermometer,
        gas,
        indicator,
        calibration,
        queue.clone(),
        config.persistence,
    )
    .resume()
    .wrap_err("Could not load queued samples")
    .with_note(|| format!("path: {}", queue.path().display()))?;

    let res = tokio::select! {
        res = repeat(config.interval, &mut sampler) => match res {
            Ok(never) => match never {},
            Err(report) => Err(report),
        },
        () = shutdown => {
            info!("shutting down");
            Ok(())
        }
    };

    let saved = sampler
        .persist()
        .inspect_err(|report| error!("Queue not saved on exit: {report:?}"));
    res?;
    saved
}
