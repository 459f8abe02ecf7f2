//! Per-function analysis: declaration extraction, return-type resolution,
//! call-site enumeration, sample substitution and classification.

pub mod call_sites;
pub mod classifier;
pub mod declarations;
pub mod return_types;
pub mod samples;
pub mod substitution;

pub use call_sites::{CallSite, CallSiteAnalyzer};
pub use classifier::{
    check_call_graph, IntegerSignatureClassifier, ProbeCall, ProbeEvaluator, ProbeObservation,
    RejectReason, SignatureState, Strictness, Veto, VetoReason,
};
pub use declarations::{collect_declarations, declarations_from_source, FunctionDeclaration};
pub use return_types::{ReturnTypeTable, TypeTag};
pub use substitution::{SampleValueSubstitutor, Substitution};
