use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use color_eyre::{Result, Section};
use tracing::{debug, info, warn};

use crate::calibration::CalibrationState;
use crate::queue::{self, Persistence, QueueStore, SampleQueue, SampleRecord};
use crate::schedule::Task;
use crate::sensors::{self, GasSensor, Indicator, Shared, Thermometer};

/// Reads both sensors and queues the result.
pub struct Sampler<T, G, I> {
    thermometer: T,
    gas: Shared<G>,
    indicator: Shared<I>,
    calibration: Arc<CalibrationState>,
    queue: SampleQueue,
    store: QueueStore,
    persistence: Persistence,
}

impl<T, G, I> Sampler<T, G, I>
where
    T: Thermometer,
    G: GasSensor,
    I: Indicator,
{
    pub fn new(
        thermometer: T,
        gas: Shared<G>,
        indicator: Shared<I>,
        calibration: Arc<CalibrationState>,
        store: QueueStore,
        persistence: Persistence,
    ) -> Self {
        Self {
            thermometer,
            gas,
            indicator,
            calibration,
            queue: SampleQueue::default(),
            store,
            persistence,
        }
    }

    /// Continue from the samples left on disk
    pub fn resume(mut self) -> Result<Self, queue::Error> {
        self.queue = self.store.read()?.into();
        info!("resuming with {} queued samples", self.queue.len());
        Ok(self)
    }

    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }

    /// Sensor errors are returned as is, there is no point sampling
    /// further with a broken sensor.
    pub fn collect_sample(&mut self) -> Result<SampleRecord> {
        debug!("collecting a sample");
        if !self.calibration.is_calibrated() {
            self.pulse_indicator();
        }

        self.thermometer
            .measure()
            .wrap_err("Could not measure temperature and humidity")?;
        let temperature = self.thermometer.temperature();
        let humidity = self.thermometer.humidity();

        let air = sensors::lock(&self.gas)
            .measure_air_quality()
            .wrap_err("Could not measure air quality")?;

        let sample = SampleRecord {
            tvoc: air.tvoc,
            co2: air.co2eq,
            temperature,
            humidity,
        };
        self.queue.push(sample);
        debug!("{sample:?}");

        if self.persistence == Persistence::EverySample {
            self.persist()?;
        }
        Ok(sample)
    }

    pub fn persist(&self) -> Result<()> {
        self.store
            .write(self.queue.as_slice())
            .wrap_err("Could not save sample queue")
            .with_note(|| format!("samples in queue: {}", self.queue.len()))
    }

    /// Cosmetic, shows samples are being taken while the baseline is
    /// still being collected. Ends with the light off.
    fn pulse_indicator(&self) {
        let mut indicator = sensors::lock(&self.indicator);
        for on in [false, true, false] {
            if let Err(e) = indicator.set(on) {
                warn!("Could not pulse indicator: {e}");
                return;
            }
        }
    }
}

impl<T, G, I> Task for Sampler<T, G, I>
where
    T: Thermometer,
    G: GasSensor,
    I: Indicator,
{
    type Error = color_eyre::Report;

    async fn run(&mut self) -> Result<()> {
        self.collect_sample().map(drop)
    }
}
