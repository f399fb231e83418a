use serde::{Deserialize, Serialize};

use crate::{
    cache::{Cache, CacheError},
    sim::Counters,
};

/// Cache geometry, given on the command line or as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub set_bits: u32,
    pub lines_per_set: usize,
    pub block_bits: u32,
}

impl Config {
    pub fn to_cache(&self) -> Result<Cache, CacheError> {
        Cache::new(self.set_bits, self.lines_per_set, self.block_bits)
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    #[serde(flatten)]
    pub counters: Counters,
    pub miss_rate: f64,
    pub config: Config,
}

impl Summary {
    pub fn new(config: Config, counters: Counters) -> Self {
        Summary {
            counters,
            miss_rate: counters.miss_rate(),
            config,
        }
    }
}
