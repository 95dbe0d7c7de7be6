use crate::error::{Error, Result};
use crate::metrics::{Analysis, DEFAULT_VELOCITY_FACTOR, REFERENCE_IMPEDANCE};
use crate::session::{Aa30, DEFAULT_BAUD};

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const APP_NAME: &str = "reaa30";

// stored as TOML by confy; command-line flags override it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: Option<String>, // None: first USB serial port
    pub baud_rate: u32,
    pub timeout_ms: u64, // per response line
    pub retries: usize, // extra attempts per point
    pub points: usize, // for manual ranges, bands carry their own
    pub velocity_factor: f64,
    pub reference_impedance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            baud_rate: DEFAULT_BAUD,
            timeout_ms: 5000,
            retries: 1,
            points: 100,
            velocity_factor: DEFAULT_VELOCITY_FACTOR,
            reference_impedance: REFERENCE_IMPEDANCE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config: Config = confy::load(APP_NAME, "config")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        Ok(confy::store(APP_NAME, "config", self)?)
    }

    pub fn path() -> Result<std::path::PathBuf> {
        Ok(confy::get_configuration_file_path(APP_NAME, "config")?)
    }

    pub fn validate(&self) -> Result<()> {
        Analysis::new(self.velocity_factor, self.reference_impedance)?;
        if self.points == 0 {
            return Err(Error::InvalidRequest("points must be positive".to_owned()));
        }
        if self.baud_rate == 0 || self.timeout_ms == 0 {
            return Err(Error::InvalidRequest(format!(
                "bad serial settings: {} baud, {} ms timeout", self.baud_rate, self.timeout_ms,
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn analyzer(&self) -> Aa30 {
        Aa30::new()
            .port(self.port.clone())
            .baud(self.baud_rate)
            .timeout(self.timeout())
    }
}
