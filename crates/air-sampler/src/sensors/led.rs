use embedded_hal::digital::{OutputPin, PinState};
use gpiocdev_embedded_hal::OutputPin as GpioOutput;

use super::{Error, Indicator};

/// Status light on a gpio line, starts off.
pub struct Led(GpioOutput);

impl Led {
    pub fn open(chip: &str, line: u32) -> Result<Self, Error> {
        GpioOutput::new(chip, line, PinState::Low)
            .map(Self)
            .map_err(|e| Error::OpenGpio {
                chip: chip.to_owned(),
                line,
                reason: format!("{e:?}"),
            })
    }
}

impl Indicator for Led {
    type Error = Error;

    fn set(&mut self, on: bool) -> Result<(), Self::Error> {
        self.0
            .set_state(PinState::from(on))
            .map_err(|e| Error::Gpio(format!("{e:?}")))
    }
}
