//! Driver for the Sensirion SGP30 gas sensor.
//!
//! Every word the sensor sends or receives is followed by a crc byte. The
//! sensor runs its own baseline compensation algorithm which needs
//! `init` to be called once and then `measure_air_quality` about once a
//! second to stay accurate.

use crc_all::Crc;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tracing::debug;

use super::{AirQuality, Baseline, GasSensor};

const ADDRESS: u8 = 0x58;

#[repr(u16)]
#[derive(Clone, Copy, Debug)]
enum Command {
    InitAirQuality = 0x2003,
    MeasureAirQuality = 0x2008,
    GetBaseline = 0x2015,
    SetBaseline = 0x201e,
    SetHumidity = 0x2061,
    GetFeatureSet = 0x202f,
}

impl Command {
    fn raw(self) -> u16 {
        self as u16
    }

    /// Maximum time the sensor needs before the result can be read
    fn duration_ms(self) -> u32 {
        match self {
            Command::InitAirQuality => 10,
            Command::MeasureAirQuality => 12,
            Command::GetBaseline => 10,
            Command::SetBaseline => 10,
            Command::SetHumidity => 10,
            Command::GetFeatureSet => 10,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error<E: core::fmt::Debug> {
    #[error("I2c bus error: {0:?}")]
    Bus(E),
    #[error("Checksum mismatch in sensor response")]
    Crc,
}

pub struct Sgp30<I, D> {
    i2c: I,
    delay: D,
    crc: SensirionCrc,
}

impl<I, D> Sgp30<I, D>
where
    I: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            crc: SensirionCrc::default(),
        }
    }

    /// Starts the on chip compensation algorithm. This resets the baseline,
    /// restore a stored one afterwards.
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        self.write_words(Command::InitAirQuality, &[])?;
        let [product, _] = self.read_words(Command::GetFeatureSet)?;
        debug!("sgp30 initialized, feature set: {product:#06x}");
        Ok(())
    }

    fn write_words(
        &mut self,
        command: Command,
        words: &[u16],
    ) -> Result<(), Error<I::Error>> {
        let mut buffer = [0u8; 2 + 2 * 3];
        buffer[..2].copy_from_slice(&command.raw().to_be_bytes());
        let mut len = 2;
        for word in words {
            let bytes = word.to_be_bytes();
            buffer[len..len + 2].copy_from_slice(&bytes);
            buffer[len + 2] = self.crc.calculate(&bytes);
            len += 3;
        }

        self.i2c
            .write(ADDRESS, &buffer[..len])
            .map_err(Error::Bus)?;
        self.delay.delay_ms(command.duration_ms());
        Ok(())
    }

    /// Commands replying with a single word leave the second one zero.
    fn read_words(&mut self, command: Command) -> Result<[u16; 2], Error<I::Error>> {
        self.i2c
            .write(ADDRESS, &command.raw().to_be_bytes())
            .map_err(Error::Bus)?;
        self.delay.delay_ms(command.duration_ms());

        let n_words = match command {
            Command::GetFeatureSet => 1,
            _ => 2,
        };
        let mut buffer = [0u8; 6];
        self.i2c
            .read(ADDRESS, &mut buffer[..n_words * 3])
            .map_err(Error::Bus)?;

        let mut words = [0u16; 2];
        for (word, chunk) in words.iter_mut().zip(buffer[..n_words * 3].chunks_exact(3)) {
            if self.crc.calculate(&chunk[..2]) != chunk[2] {
                return Err(Error::Crc);
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(words)
    }
}

impl<I, D> GasSensor for Sgp30<I, D>
where
    I: I2c,
    I::Error: Send + Sync + 'static,
    D: DelayNs,
{
    type Error = Error<I::Error>;

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), Self::Error> {
        // the sensor expects tvoc first, the reverse of how it reports them
        self.write_words(Command::SetBaseline, &[baseline.tvoc, baseline.co2eq])
    }

    fn set_humidity_compensation(
        &mut self,
        humidity: f32,
        temperature: f32,
    ) -> Result<(), Self::Error> {
        let absolute = absolute_humidity(humidity, temperature);
        debug!("compensating for absolute humidity: {absolute} g/m³");
        self.write_words(Command::SetHumidity, &[fixed_point_8_8(absolute)])
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, Self::Error> {
        let [co2eq, tvoc] = self.read_words(Command::MeasureAirQuality)?;
        Ok(AirQuality { co2eq, tvoc })
    }

    fn baseline(&mut self) -> Result<Baseline, Self::Error> {
        let [co2eq, tvoc] = self.read_words(Command::GetBaseline)?;
        Ok(Baseline { co2eq, tvoc })
    }
}

/// Absolute humidity in g/m³ from relative humidity (%) and temperature (°C)
/// using the Magnus formula.
fn absolute_humidity(relative: f32, temperature: f32) -> f32 {
    let saturation = 6.112 * ((17.62 * temperature) / (243.12 + temperature)).exp();
    216.7 * ((relative / 100.0) * saturation / (273.15 + temperature))
}

/// The float to int cast saturates, a value of zero turns compensation off
fn fixed_point_8_8(value: f32) -> u16 {
    (value * 256.0) as u16
}

struct SensirionCrc {
    inner: Crc<u8>,
}

impl SensirionCrc {
    fn calculate(&mut self, input: &[u8]) -> u8 {
        self.inner.init();
        self.inner.update(input);
        self.inner.finish()
    }
}

impl Default for SensirionCrc {
    fn default() -> Self {
        Self {
            inner: Crc::<u8>::new(0x31, 8, 0xff, 0x00, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    use super::*;

    /// Records writes and answers reads from a script
    #[derive(Default)]
    struct FakeBus {
        written: Vec<Vec<u8>>,
        replies: Vec<Vec<u8>>,
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, ADDRESS);
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.written.push(bytes.to_vec()),
                    Operation::Read(buffer) => {
                        let reply = self.replies.remove(0);
                        buffer.copy_from_slice(&reply[..buffer.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _: u32) {}
    }

    fn with_crc(words: &[u16]) -> Vec<u8> {
        let mut crc = SensirionCrc::default();
        words
            .iter()
            .flat_map(|w| {
                let bytes = w.to_be_bytes();
                [bytes[0], bytes[1], crc.calculate(&bytes)]
            })
            .collect()
    }

    #[test]
    fn set_baseline_sends_tvoc_first() {
        let mut sensor = Sgp30::new(FakeBus::default(), NoDelay);
        sensor
            .set_baseline(Baseline {
                co2eq: 0x8973,
                tvoc: 0x8aae,
            })
            .unwrap();

        let mut expected = vec![0x20, 0x1e];
        expected.extend(with_crc(&[0x8aae, 0x8973]));
        assert_eq!(sensor.i2c.written, vec![expected]);
    }

    #[test]
    fn measure_reads_co2eq_then_tvoc() {
        let bus = FakeBus {
            replies: vec![with_crc(&[400, 20])],
            ..FakeBus::default()
        };
        let mut sensor = Sgp30::new(bus, NoDelay);
        let reading = sensor.measure_air_quality().unwrap();
        assert_eq!(reading, AirQuality { co2eq: 400, tvoc: 20 });
        assert_eq!(sensor.i2c.written, vec![vec![0x20, 0x08]]);
    }

    #[test]
    fn corrupt_reply_is_rejected() {
        let mut reply = with_crc(&[0x8973, 0x8aae]);
        reply[5] ^= 0xff;
        let bus = FakeBus {
            replies: vec![reply],
            ..FakeBus::default()
        };
        let mut sensor = Sgp30::new(bus, NoDelay);
        assert!(matches!(sensor.baseline(), Err(Error::Crc)));
    }

    #[test]
    fn crc() {
        let mut crc = SensirionCrc::default();
        assert_eq!(0x92, crc.calculate(&[0xbe, 0xef]));
    }

    #[test]
    fn absolute_humidity_of_a_living_room() {
        let absolute = absolute_humidity(45.0, 21.5);
        assert!((8.3..8.6).contains(&absolute), "got: {absolute}");
    }

    #[test]
    fn fixed_point_saturates() {
        assert_eq!(fixed_point_8_8(0.0), 0);
        assert_eq!(fixed_point_8_8(1.5), 0x0180);
        assert_eq!(fixed_point_8_8(300.0), u16::MAX);
    }
}
