use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

// Knobs for the decode fan-out; everything else about decoding is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub worker_threads: usize,
    pub parallel_features: bool,
    pub parallel_layers: bool,
    pub skip_failed_layers: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            worker_threads: num_cpus::get(),
            parallel_features: true,
            parallel_layers: true,
            skip_failed_layers: true,
        }
    }
}

impl DecoderConfig {
    /// Config that decodes everything on the calling thread.
    pub fn sequential() -> Self {
        DecoderConfig {
            worker_threads: 1,
            parallel_features: false,
            parallel_layers: false,
            ..Default::default()
        }
    }

    pub fn from_json(input: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn threads(&self) -> usize {
        self.worker_threads.max(1)
    }

    // `role` only labels the worker threads ("feature", "layer").
    pub(crate) fn build_pool(&self, role: &'static str) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads())
            .thread_name(move |i| format!("vtdecode-{}-{}", role, i))
            .build()
            .map_err(|e| DecodeError::ThreadPool(e.to_string()))
    }
}
