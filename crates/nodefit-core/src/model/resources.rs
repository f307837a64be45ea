//! Resource quantities and percentile-indexed usage values

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A two-dimensional resource quantity: CPU in millicores, memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantity {
    pub cpu_millis: i64,
    pub memory_bytes: i64,
}

impl ResourceQuantity {
    pub fn new(cpu_millis: i64, memory_bytes: i64) -> Self {
        Self {
            cpu_millis,
            memory_bytes,
        }
    }

    /// True if this quantity fits within the given capacity on both dimensions.
    pub fn fits_in(&self, capacity: ResourceQuantity) -> bool {
        self.cpu_millis <= capacity.cpu_millis && self.memory_bytes <= capacity.memory_bytes
    }

    pub fn is_zero(&self) -> bool {
        self.cpu_millis == 0 && self.memory_bytes == 0
    }
}

impl Add for ResourceQuantity {
    type Output = ResourceQuantity;

    fn add(self, other: ResourceQuantity) -> ResourceQuantity {
        ResourceQuantity {
            cpu_millis: self.cpu_millis + other.cpu_millis,
            memory_bytes: self.memory_bytes + other.memory_bytes,
        }
    }
}

impl Sub for ResourceQuantity {
    type Output = ResourceQuantity;

    fn sub(self, other: ResourceQuantity) -> ResourceQuantity {
        ResourceQuantity {
            cpu_millis: self.cpu_millis - other.cpu_millis,
            memory_bytes: self.memory_bytes - other.memory_bytes,
        }
    }
}

/// Observed usage of a scalar series at the 50th, 95th, and 99th percentiles
/// plus the observed maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileValues {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl PercentileValues {
    /// Returns the value at the smallest stored percentile ≥ `pct`,
    /// falling back to the observed maximum above 0.99.
    pub fn at_percentile(&self, pct: f64) -> f64 {
        if pct <= 0.50 {
            self.p50
        } else if pct <= 0.95 {
            self.p95
        } else if pct <= 0.99 {
            self.p99
        } else {
            self.max
        }
    }
}
