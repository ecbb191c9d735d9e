use std::fs;
use std::path::Path;

use serde::Deserialize;

use plum8::{Quirks, SchedulerConfig};

use crate::Result;

/// Host settings read from a TOML file
///
/// ```toml
/// cycles_per_tick = 20
/// sample_rate = 44100
///
/// [quirks]
/// vsync_draw = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub cycles_per_tick: usize,
    pub sample_rate: u32,
    pub quirks: Quirks,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cycles_per_tick: SchedulerConfig::default().cycles_per_tick,
            sample_rate: 44_100,
            quirks: Quirks::default(),
        }
    }
}

impl HostConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            cycles_per_tick: self.cycles_per_tick,
            ..SchedulerConfig::default()
        }
    }
}
