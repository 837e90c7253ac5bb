//! Persists the gas sensor's baseline so a reboot does not need another
//! 48 hour warm up.
//!
//! On disk this is a json object:
//! ```json
//! {
//!     "co2eq_baseline": 35187,
//!     "co2eq_baseline_unit": "ppm",
//!     "tvoc_baseline": 35502,
//!     "tvoc_baseline_unit": "ppb"
//! }
//! ```
//! A missing file or an empty object (`{}`) means the device was never
//! calibrated.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::atomic;
use crate::sensors::{Baseline, GasSensor};

pub const FILE_NAME: &str = "baselines.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Co2eqUnit {
    #[serde(rename = "ppm")]
    Ppm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TvocUnit {
    #[serde(rename = "ppb")]
    Ppb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub co2eq_baseline: u16,
    pub co2eq_baseline_unit: Co2eqUnit,
    pub tvoc_baseline: u16,
    pub tvoc_baseline_unit: TvocUnit,
}

impl From<Baseline> for BaselineRecord {
    fn from(Baseline { co2eq, tvoc }: Baseline) -> Self {
        Self {
            co2eq_baseline: co2eq,
            co2eq_baseline_unit: Co2eqUnit::Ppm,
            tvoc_baseline: tvoc,
            tvoc_baseline_unit: TvocUnit::Ppb,
        }
    }
}

impl BaselineRecord {
    pub fn baseline(&self) -> Baseline {
        Baseline {
            co2eq: self.co2eq_baseline,
            tvoc: self.tvoc_baseline,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not read baseline file at {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Could not write baseline file at {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Baseline file at {} is malformed", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Could not serialize baseline")]
    Encode(#[source] serde_json::Error),
    #[error("Gas sensor failed to {action} its baseline")]
    Sensor {
        action: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores a stored baseline into the sensor. Returns `None` if the
    /// device was never calibrated, the sensor is then left untouched.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load<G: GasSensor>(&self, sensor: &mut G) -> Result<Option<BaselineRecord>, Error> {
        let Some(record) = self.read()? else {
            return Ok(None);
        };

        sensor
            .set_baseline(record.baseline())
            .map_err(|e| Error::Sensor {
                action: "restore",
                source: Box::new(e),
            })?;
        info!(
            "restored baseline: co2eq {}, tvoc {}",
            record.co2eq_baseline, record.tvoc_baseline
        );
        Ok(Some(record))
    }

    /// Reads the stored record without applying it
    pub fn read(&self) -> Result<Option<BaselineRecord>, Error> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("No baseline stored, device is uncalibrated");
                return Ok(None);
            }
            Err(source) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!("Baseline file is empty, device is uncalibrated");
            return Ok(None);
        }

        let decode_err = |source| Error::Decode {
            path: self.path.clone(),
            source,
        };
        let doc: Map<String, Value> = serde_json::from_slice(&bytes).map_err(decode_err)?;
        if doc.is_empty() {
            warn!("Baseline file holds no baseline, device is uncalibrated");
            return Ok(None);
        }

        serde_json::from_value(Value::Object(doc))
            .map(Some)
            .map_err(decode_err)
    }

    /// Snapshots the coefficients the sensor is using right now to disk.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save<G: GasSensor>(&self, sensor: &mut G) -> Result<BaselineRecord, Error> {
        let baseline = sensor.baseline().map_err(|e| Error::Sensor {
            action: "report",
            source: Box::new(e),
        })?;
        let record = BaselineRecord::from(baseline);
        self.write(&record)?;
        Ok(record)
    }

    pub fn write(&self, record: &BaselineRecord) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(record).map_err(Error::Encode)?;
        atomic::replace(&self.path, &bytes).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(
            "baseline written: co2eq {}, tvoc {}",
            record.co2eq_baseline, record.tvoc_baseline
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use temp_dir::TempDir;

    use super::*;

    #[test]
    fn wire_format() {
        let record = BaselineRecord::from(Baseline {
            co2eq: 35187,
            tvoc: 35502,
        });
        let json: Value = serde_json::to_value(record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "co2eq_baseline": 35187,
                "co2eq_baseline_unit": "ppm",
                "tvoc_baseline": 35502,
                "tvoc_baseline_unit": "ppb",
            })
        );
    }

    #[test]
    fn wrong_unit_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = BaselineStore::new(dir.path());
        std::fs::write(
            store.path(),
            r#"{"co2eq_baseline": 1, "co2eq_baseline_unit": "ppb",
                "tvoc_baseline": 2, "tvoc_baseline_unit": "ppb"}"#,
        )
        .unwrap();
        assert!(matches!(store.read(), Err(Error::Decode { .. })));
    }

    #[test]
    fn zero_length_file_is_uncalibrated() {
        let dir = TempDir::new().unwrap();
        let store = BaselineStore::new(dir.path());
        std::fs::write(store.path(), "").unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}
