//! Extracts a catalog of integer-pure Python functions from a source corpus.
//!
//! A function is integer-pure when every parameter and its return value are
//! integers, either by annotation or as observed by probing it with random
//! integer arguments in a restricted interpreter.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod errors;
pub mod io;
pub mod pipeline;
pub mod python;
pub mod sandbox;

pub use crate::analysis::{
    FunctionDeclaration, IntegerSignatureClassifier, ReturnTypeTable, SignatureState, Strictness,
};
pub use crate::config::CatalogConfig;
pub use crate::errors::{Error, Result};
pub use crate::pipeline::{
    Acceptance, CatalogEntry, FunctionCatalog, Pipeline, PipelineReport, PipelineStats,
};
pub use crate::sandbox::{Fault, Sandbox, SandboxLimits};
