//! Stand-ins for the hardware. Readings are scripted, once the script runs
//! out the last reading repeats.

use std::collections::VecDeque;

use super::{AirQuality, Baseline, GasSensor, Indicator, Thermometer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Simulated measurement failure on measurement {0}")]
    Measurement(usize),
}

#[derive(Debug)]
pub struct SimThermometer {
    script: VecDeque<(f32, f32)>,
    last: (f32, f32),
    measurements: usize,
    fail_at: Option<usize>,
}

impl SimThermometer {
    /// Readings are `(temperature, humidity)`
    pub fn new(script: impl IntoIterator<Item = (f32, f32)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: (f32::NAN, f32::NAN),
            measurements: 0,
            fail_at: None,
        }
    }

    pub fn steady(temperature: f32, humidity: f32) -> Self {
        Self::new([(temperature, humidity)])
    }

    /// Make measurement `n` (counting from zero) fail
    pub fn fail_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }
}

impl Thermometer for SimThermometer {
    type Error = Error;

    fn measure(&mut self) -> Result<(), Self::Error> {
        let n = self.measurements;
        self.measurements += 1;
        if self.fail_at == Some(n) {
            return Err(Error::Measurement(n));
        }
        if let Some(reading) = self.script.pop_front() {
            self.last = reading;
        }
        Ok(())
    }

    fn temperature(&self) -> f32 {
        self.last.0
    }

    fn humidity(&self) -> f32 {
        self.last.1
    }
}

#[derive(Debug)]
pub struct SimGasSensor {
    script: VecDeque<AirQuality>,
    last: AirQuality,
    baseline: Baseline,
    applied: Vec<Baseline>,
    compensation: Option<(f32, f32)>,
}

impl SimGasSensor {
    /// Readings are `(co2eq, tvoc)`
    pub fn new(script: impl IntoIterator<Item = (u16, u16)>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(co2eq, tvoc)| AirQuality { co2eq, tvoc })
                .collect(),
            last: AirQuality {
                co2eq: 400,
                tvoc: 0,
            },
            baseline: Baseline { co2eq: 0, tvoc: 0 },
            applied: Vec::new(),
            compensation: None,
        }
    }

    /// Coefficients the sensor reports, stands in for the on chip
    /// algorithm settling during warm up.
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn drift_baseline_to(&mut self, baseline: Baseline) {
        self.baseline = baseline;
    }

    /// Every baseline restored through `set_baseline`, oldest first
    pub fn applied_baselines(&self) -> &[Baseline] {
        &self.applied
    }

    /// Last `(humidity, temperature)` passed to `set_humidity_compensation`
    pub fn humidity_compensation(&self) -> Option<(f32, f32)> {
        self.compensation
    }
}

impl GasSensor for SimGasSensor {
    type Error = Error;

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), Self::Error> {
        self.baseline = baseline;
        self.applied.push(baseline);
        Ok(())
    }

    fn set_humidity_compensation(
        &mut self,
        humidity: f32,
        temperature: f32,
    ) -> Result<(), Self::Error> {
        self.compensation = Some((humidity, temperature));
        Ok(())
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, Self::Error> {
        if let Some(reading) = self.script.pop_front() {
            self.last = reading;
        }
        Ok(self.last)
    }

    fn baseline(&mut self) -> Result<Baseline, Self::Error> {
        Ok(self.baseline)
    }
}

#[derive(Debug, Default)]
pub struct SimIndicator {
    history: Vec<bool>,
}

impl SimIndicator {
    /// Every state written, oldest first
    pub fn history(&self) -> &[bool] {
        &self.history
    }

    pub fn is_on(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }
}

impl Indicator for SimIndicator {
    type Error = Error;

    fn set(&mut self, on: bool) -> Result<(), Self::Error> {
        self.history.push(on);
        Ok(())
    }
}
