//! Integer-signature classification.
//!
//! A declaration is first checked against the call-graph gate, then walked
//! through the annotation checks. When annotations cannot decide, or when a
//! statically accepted body had calls substituted, the function is probed:
//! called once with random integers in the sandbox.

use crate::analysis::call_sites::CallSite;
use crate::analysis::substitution::Substitution;
use crate::python::ast::{FunctionDef, ParamKind, Span};
use crate::sandbox::fault::Fault;
use crate::sandbox::rng::ProbeRng;
use num_bigint::BigInt;
use std::fmt;

/// Whether parameters must carry annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    #[default]
    Strict,
    Relaxed,
}

impl Strictness {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Strictness::Strict
        } else {
            Strictness::Relaxed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingParameterType { param: String },
    NonIntegerParameter { param: String, annotation: String },
    NonIntegerReturn { annotation: String },
    NonIntegerResult { type_name: String },
    ProbeFault(Fault),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingParameterType { param } => {
                write!(f, "parameter `{}` has no annotation", param)
            }
            RejectReason::NonIntegerParameter { param, annotation } => {
                write!(f, "parameter `{}` is annotated `{}`", param, annotation)
            }
            RejectReason::NonIntegerReturn { annotation } => {
                write!(f, "return annotation is `{}`", annotation)
            }
            RejectReason::NonIntegerResult { type_name } => {
                write!(f, "probe returned a `{}`", type_name)
            }
            RejectReason::ProbeFault(fault) => write!(f, "probe fault: {}", fault),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Rejected(RejectReason),
    StaticallyAccepted,
    DynamicallyAccepted,
    PendingDynamicProbe,
}

impl SignatureState {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            SignatureState::StaticallyAccepted | SignatureState::DynamicallyAccepted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VetoReason {
    UnknownReturnType,
    NoSampleValue { type_name: String },
    InsideOpaqueSource,
}

/// Exclusion caused by a call the pipeline cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    pub callee: String,
    pub reason: VetoReason,
    pub span: Span,
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match &self.reason {
            VetoReason::UnknownReturnType => "return type unknown".to_string(),
            VetoReason::NoSampleValue { type_name } => {
                format!("no sample value for `{}`", type_name)
            }
            VetoReason::InsideOpaqueSource => "call cannot be rewritten".to_string(),
        };
        write!(f, "call to `{}` at line {}: {}", self.callee, self.span.line, why)
    }
}

/// First call site that vetoes the function, if any. Built-ins never veto.
pub fn check_call_graph(sites: &[CallSite<'_>]) -> Result<(), Veto> {
    for site in sites.iter().filter(|s| !s.builtin) {
        let reason = match site.return_type.known_name() {
            None => Some(VetoReason::UnknownReturnType),
            Some(type_name) if !site.has_sample() => Some(VetoReason::NoSampleValue {
                type_name: type_name.to_string(),
            }),
            Some(_) if !site.rewritable => Some(VetoReason::InsideOpaqueSource),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            return Err(Veto {
                callee: site.callee.clone(),
                reason,
                span: site.span,
            });
        }
    }
    Ok(())
}

/// The literal call a probe evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCall {
    pub function: String,
    pub positional: Vec<BigInt>,
    pub keywords: Vec<(String, BigInt)>,
}

impl ProbeCall {
    pub fn arg_count(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    /// Python source of the call, e.g. `f(3, 17, k=4)`.
    pub fn source(&self) -> String {
        let args: Vec<String> = self
            .positional
            .iter()
            .map(|v| v.to_string())
            .chain(self.keywords.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect();
        format!("{}({})", self.function, args.join(", "))
    }
}

/// What a successful probe returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeObservation {
    pub type_name: String,
    pub repr: String,
}

/// Executes a probe call against a function definition.
pub trait ProbeEvaluator {
    fn probe(&mut self, def: &FunctionDef, call: &ProbeCall) -> Result<ProbeObservation, Fault>;
}

impl<E: ProbeEvaluator + ?Sized> ProbeEvaluator for &mut E {
    fn probe(&mut self, def: &FunctionDef, call: &ProbeCall) -> Result<ProbeObservation, Fault> {
        (**self).probe(def, call)
    }
}

pub struct IntegerSignatureClassifier<E> {
    strictness: Strictness,
    evaluator: E,
    rng: ProbeRng,
    arg_range: (i64, i64),
    probes_run: usize,
}

impl<E: ProbeEvaluator> IntegerSignatureClassifier<E> {
    pub fn new(strictness: Strictness, evaluator: E, rng: ProbeRng) -> Self {
        Self {
            strictness,
            evaluator,
            rng,
            arg_range: (0, 100),
            probes_run: 0,
        }
    }

    /// Bounds for synthesized arguments. Swapped if given in reverse.
    pub fn with_arg_range(mut self, min: i64, max: i64) -> Self {
        self.arg_range = (min.min(max), min.max(max));
        self
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn probes_run(&self) -> usize {
        self.probes_run
    }

    /// Annotation checks only. Never runs a probe.
    pub fn static_state(&self, def: &FunctionDef) -> SignatureState {
        let strict = self.strictness == Strictness::Strict;

        if strict {
            if let Some(param) = def.params.iter().find(|p| p.annotation.is_none()) {
                return SignatureState::Rejected(RejectReason::MissingParameterType {
                    param: param.name.clone(),
                });
            }
            for param in &def.params {
                if let Some(annotation) = param.annotation.as_ref().filter(|a| !a.names("int")) {
                    return SignatureState::Rejected(RejectReason::NonIntegerParameter {
                        param: param.name.clone(),
                        annotation: annotation.text.clone(),
                    });
                }
            }
        }

        let Some(returns) = &def.returns else {
            return SignatureState::PendingDynamicProbe;
        };

        if !returns.names("int") {
            return SignatureState::Rejected(RejectReason::NonIntegerReturn {
                annotation: returns.text.clone(),
            });
        }

        SignatureState::StaticallyAccepted
    }

    /// Drive a (possibly substituted) declaration to a terminal state.
    pub fn classify(&mut self, substitution: &Substitution) -> SignatureState {
        let def = &substitution.declaration.def;
        match self.static_state(def) {
            SignatureState::PendingDynamicProbe => self.probe(def),
            SignatureState::StaticallyAccepted if substitution.replaced > 0 => {
                match self.probe(def) {
                    SignatureState::DynamicallyAccepted => SignatureState::StaticallyAccepted,
                    rejected => rejected,
                }
            }
            terminal => terminal,
        }
    }

    /// One random integer per declared parameter; `*args` gets one extra
    /// positional value and `**kwargs` one keyword named after it.
    pub fn synthesize_call(&mut self, def: &FunctionDef) -> ProbeCall {
        let (min, max) = self.arg_range;
        let mut call = ProbeCall {
            function: def.name.clone(),
            positional: Vec::new(),
            keywords: Vec::new(),
        };
        for param in &def.params {
            let value = BigInt::from(self.rng.range_inclusive(min, max));
            match param.kind {
                ParamKind::PositionalOnly | ParamKind::Positional | ParamKind::VarArgs => {
                    call.positional.push(value)
                }
                ParamKind::KeywordOnly | ParamKind::KwArgs => {
                    call.keywords.push((param.name.clone(), value))
                }
            }
        }
        call
    }

    fn probe(&mut self, def: &FunctionDef) -> SignatureState {
        let call = self.synthesize_call(def);
        self.probes_run += 1;
        log::debug!("probing {}", call.source());

        match self.evaluator.probe(def, &call) {
            Ok(observed) if observed.type_name == "int" => {
                log::debug!("{} returned {}", call.source(), observed.repr);
                SignatureState::DynamicallyAccepted
            }
            Ok(observed) => SignatureState::Rejected(RejectReason::NonIntegerResult {
                type_name: observed.type_name,
            }),
            Err(fault) => SignatureState::Rejected(RejectReason::ProbeFault(fault)),
        }
    }
}
