use ::bme280::i2c::BME280;
use linux_embedded_hal::{Delay, I2cdev};
use tracing::error;

use super::{Error, Thermometer};

pub struct Bme280 {
    driver: BME280<I2cdev>,
    temperature: f32,
    humidity: f32,
}

impl Bme280 {
    pub fn open(bus: &str) -> Result<Self, Error> {
        let i2c_bus = I2cdev::new(bus)
            .inspect_err(|e| error!("Could not open i2c bus: {e}"))
            .map_err(|e| Error::OpenBus {
                path: bus.to_owned(),
                reason: e.to_string(),
            })?;

        let mut driver = BME280::new_primary(i2c_bus);
        driver
            .init(&mut Delay)
            .inspect_err(|e| error!("Could not init bme280 sensor: {e:?}"))
            .map_err(|e| Error::Bme280(format!("{e:?}")))?;
        Ok(Self {
            driver,
            temperature: f32::NAN,
            humidity: f32::NAN,
        })
    }
}

impl Thermometer for Bme280 {
    type Error = Error;

    fn measure(&mut self) -> Result<(), Self::Error> {
        let measurements = self
            .driver
            .measure(&mut Delay)
            .map_err(|e| Error::Bme280(format!("{e:?}")))?;
        self.temperature = measurements.temperature;
        self.humidity = measurements.humidity;
        Ok(())
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn humidity(&self) -> f32 {
        self.humidity
    }
}
