use thiserror::Error;

/// Why a probe produced no value.
///
/// `Exception` is a Python-level exception that escaped the probed function.
/// Every other variant is a sandbox limit and cannot be caught by the probed
/// code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("{kind}: {message}")]
    Exception { kind: String, message: String },

    #[error("probe exceeded its {0} ms deadline")]
    Timeout(u64),

    #[error("probe exceeded {0} evaluation steps")]
    StepLimit(u64),

    #[error("maximum call depth of {0} exceeded")]
    DepthLimit(usize),

    #[error("collection grew past {0} elements")]
    MemoryLimit(usize),

    #[error("integer result wider than {0} bits")]
    IntegerLimit(u64),

    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

impl Fault {
    pub fn exception(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Fault::Exception {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// True when a resource limit, not the probed code, ended the probe.
    pub fn is_limit(&self) -> bool {
        !matches!(self, Fault::Exception { .. } | Fault::Unsupported(_))
    }
}
