//! Resource accounting for a single probe.

use crate::sandbox::fault::Fault;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Limits applied to every probe. Loaded from the `[probe]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    pub timeout_ms: u64,
    pub max_steps: u64,
    pub max_call_depth: usize,
    pub max_collection_len: usize,
    pub max_int_bits: u64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            max_steps: 1_000_000,
            max_call_depth: 64,
            max_collection_len: 1_000_000,
            max_int_bits: 4096,
        }
    }
}

/// How often the wall clock is consulted, in steps.
const CLOCK_INTERVAL: u64 = 256;

/// Running counters for one probe.
#[derive(Debug)]
pub struct Budget {
    limits: SandboxLimits,
    deadline: Instant,
    steps: u64,
    depth: usize,
}

impl Budget {
    pub fn start(limits: SandboxLimits) -> Self {
        Self {
            limits,
            deadline: Instant::now() + Duration::from_millis(limits.timeout_ms),
            steps: 0,
            depth: 0,
        }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Charge one evaluation step.
    pub fn tick(&mut self) -> Result<(), Fault> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Fault::StepLimit(self.limits.max_steps));
        }
        if self.steps % CLOCK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(Fault::Timeout(self.limits.timeout_ms));
        }
        Ok(())
    }

    pub fn enter_call(&mut self) -> Result<(), Fault> {
        if self.depth >= self.limits.max_call_depth {
            return Err(Fault::DepthLimit(self.limits.max_call_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn check_len(&self, len: usize) -> Result<(), Fault> {
        if len > self.limits.max_collection_len {
            return Err(Fault::MemoryLimit(self.limits.max_collection_len));
        }
        Ok(())
    }

    /// Reject an operation whose result would need more than `bits` bits.
    pub fn check_bits(&self, bits: u64) -> Result<(), Fault> {
        if bits > self.limits.max_int_bits {
            return Err(Fault::IntegerLimit(self.limits.max_int_bits));
        }
        Ok(())
    }

    pub fn check_int(&self, value: &BigInt) -> Result<(), Fault> {
        self.check_bits(value.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit() {
        let mut budget = Budget::start(SandboxLimits {
            max_steps: 3,
            ..SandboxLimits::default()
        });
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert_eq!(budget.tick(), Err(Fault::StepLimit(3)));
    }

    #[test]
    fn test_deadline_checked_on_interval() {
        let mut budget = Budget::start(SandboxLimits {
            timeout_ms: 0,
            ..SandboxLimits::default()
        });
        let mut outcome = Ok(());
        for _ in 0..CLOCK_INTERVAL {
            outcome = budget.tick();
            if outcome.is_err() {
                break;
            }
        }
        assert_eq!(outcome, Err(Fault::Timeout(0)));
    }

    #[test]
    fn test_call_depth_is_restored() {
        let mut budget = Budget::start(SandboxLimits {
            max_call_depth: 1,
            ..SandboxLimits::default()
        });
        budget.enter_call().unwrap();
        assert_eq!(budget.enter_call(), Err(Fault::DepthLimit(1)));
        budget.exit_call();
        assert!(budget.enter_call().is_ok());
    }

    #[test]
    fn test_integer_width() {
        let budget = Budget::start(SandboxLimits {
            max_int_bits: 8,
            ..SandboxLimits::default()
        });
        assert!(budget.check_int(&BigInt::from(255)).is_ok());
        assert_eq!(
            budget.check_int(&BigInt::from(256)),
            Err(Fault::IntegerLimit(8))
        );
    }
}
