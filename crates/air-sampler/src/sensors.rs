use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod bme280;
mod led;
pub mod sgp30;
pub mod simulated;

pub use self::bme280::Bme280;
pub use led::Led;
pub use sgp30::Sgp30;

/// Sensor-internal compensation coefficients of the gas sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub co2eq: u16,
    pub tvoc: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality {
    /// ppm
    pub co2eq: u16,
    /// ppb
    pub tvoc: u16,
}

/// Temperature and relative humidity sensor. `measure` triggers an
/// acquisition, the getters return the last acquired values.
pub trait Thermometer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn measure(&mut self) -> Result<(), Self::Error>;
    /// °C
    fn temperature(&self) -> f32;
    /// % RH
    fn humidity(&self) -> f32;
}

pub trait GasSensor {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), Self::Error>;
    /// `humidity` in % RH, `temperature` in °C
    fn set_humidity_compensation(
        &mut self,
        humidity: f32,
        temperature: f32,
    ) -> Result<(), Self::Error>;
    fn measure_air_quality(&mut self) -> Result<AirQuality, Self::Error>;
    /// Reads the coefficients the sensor is currently using.
    fn baseline(&mut self) -> Result<Baseline, Self::Error>;
}

/// A single binary light.
pub trait Indicator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// Drivers used from both the sampler and the calibration timer.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(driver: T) -> Shared<T> {
    Arc::new(Mutex::new(driver))
}

/// A panic while holding the lock leaves the driver itself intact, the
/// next bus transaction starts fresh.
pub(crate) fn lock<T>(driver: &Shared<T>) -> MutexGuard<'_, T> {
    driver.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not open i2c bus {path}: {reason}")]
    OpenBus { path: String, reason: String },
    #[error("Bme280 error: {0}")]
    Bme280(String),
    #[error("Could not open gpio line {line} on {chip}: {reason}")]
    OpenGpio {
        chip: String,
        line: u32,
        reason: String,
    },
    #[error("Could not drive gpio line: {0}")]
    Gpio(String),
}
