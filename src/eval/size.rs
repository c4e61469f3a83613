//! Model storage footprint

use crate::nn::Model;
use serde::{Deserialize, Serialize};
use std::fmt;

const BITS_PER_KIB: f64 = 8.0 * 1024.0;
const BITS_PER_MIB: f64 = 8.0 * 1024.0 * 1024.0;

/// Parameter count and the storage it needs at a fixed element width.
///
/// BatchNorm running statistics are buffers, not parameters, and are not
/// counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSize {
    pub parameters: usize,
    pub bits_per_element: u32,
}

impl ModelSize {
    pub fn of(model: &Model, bits_per_element: u32) -> Self {
        Self {
            parameters: model.parameter_count(),
            bits_per_element,
        }
    }

    pub fn bits(&self) -> u64 {
        self.parameters as u64 * u64::from(self.bits_per_element)
    }

    pub fn bytes(&self) -> f64 {
        self.bits() as f64 / 8.0
    }

    pub fn kib(&self) -> f64 {
        self.bits() as f64 / BITS_PER_KIB
    }

    pub fn mib(&self) -> f64 {
        self.bits() as f64 / BITS_PER_MIB
    }

    /// How many times smaller `self` is than `dense`
    pub fn compression_from(&self, dense: &ModelSize) -> f64 {
        if self.bits() == 0 {
            return 0.0;
        }
        dense.bits() as f64 / self.bits() as f64
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} params, {:.2} MiB at {} bits",
            self.parameters,
            self.mib(),
            self.bits_per_element
        )
    }
}
