//! Error types for compiling and instantiating endpoints.
//!
//! # Design
//! Two kinds are terminal for the operation that raised them.
//! `MalformedDescriptor` comes from the validator at compile time and lists
//! every problem found, never just the first. `BindingError` comes from the
//! instantiator at call time and names the slot that could not be filled.
//! `CallError` is what the call binding surfaces, wrapping both plus the
//! failures of the transport and decoding collaborators.

use std::fmt;

use crate::descriptor::ParameterRole;

/// Category of a descriptor-level problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemReason {
    InvalidPathTemplate,
    DuplicatePlaceholder,
    UnboundPlaceholder,
    OrphanPathBinding,
    DuplicateBinding,
    ReturnShapeMismatch,
    InvalidVerb,
    InvalidHeader,
    InvalidCookie,
    MissingName,
    UnsupportedRepeat,
    MisplacedOption,
    ConflictingUrl,
    InvalidFragment,
    /// Field bindings without a form-encoded endpoint, or the reverse.
    InvalidForm,
    /// A warning promoted to an error by `DiagnosticLevel::Deny`.
    DeniedWarning,
    /// A compiler invariant did not hold; never produced by validated input.
    Internal,
}

impl fmt::Display for ProblemReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProblemReason::InvalidPathTemplate => "invalid path template",
            ProblemReason::DuplicatePlaceholder => "duplicate placeholder",
            ProblemReason::UnboundPlaceholder => "unbound placeholder",
            ProblemReason::OrphanPathBinding => "orphan path binding",
            ProblemReason::DuplicateBinding => "duplicate binding",
            ProblemReason::ReturnShapeMismatch => "return shape mismatch",
            ProblemReason::InvalidVerb => "invalid verb",
            ProblemReason::InvalidHeader => "invalid header",
            ProblemReason::InvalidCookie => "invalid cookie",
            ProblemReason::MissingName => "missing name",
            ProblemReason::UnsupportedRepeat => "unsupported repeat policy",
            ProblemReason::MisplacedOption => "misplaced option",
            ProblemReason::ConflictingUrl => "conflicting url",
            ProblemReason::InvalidFragment => "invalid fragment",
            ProblemReason::InvalidForm => "invalid form",
            ProblemReason::DeniedWarning => "denied warning",
            ProblemReason::Internal => "internal compiler error",
        };
        f.write_str(text)
    }
}

/// One problem found in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {detail}")]
pub struct DescriptorProblem {
    pub reason: ProblemReason,
    pub detail: String,
}

impl DescriptorProblem {
    pub fn new(reason: ProblemReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// A descriptor failed validation. Carries every problem at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed endpoint `{endpoint}`: {}", join_problems(.problems))]
pub struct MalformedDescriptor {
    pub endpoint: String,
    pub problems: Vec<DescriptorProblem>,
}

impl MalformedDescriptor {
    pub fn has(&self, reason: ProblemReason) -> bool {
        self.problems.iter().any(|p| p.reason == reason)
    }

    pub fn reasons(&self) -> impl Iterator<Item = ProblemReason> + '_ {
        self.problems.iter().map(|p| p.reason)
    }
}

fn join_problems(problems: &[DescriptorProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Identifies a template slot in binding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLabel {
    pub role: ParameterRole,
    pub name: String,
    pub index: usize,
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{} (argument {})", self.role, self.index)
        } else {
            write!(f, "{} `{}` (argument {})", self.role, self.name, self.index)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BindingReason {
    #[error("argument is missing")]
    Missing,
    #[error("argument is null but the slot is required")]
    Null,
    #[error("a list was supplied but the slot takes a single value")]
    UnexpectedList,
    #[error("a map was supplied where a scalar is expected")]
    UnexpectedMap,
    #[error("expected a map of names to values")]
    ExpectedMap,
    #[error("nested lists and maps are not supported")]
    NestedCollection,
    #[error("a map key is not a valid header name")]
    InvalidHeaderName,
}

/// Arguments could not satisfy a slot's contract. Nothing is partially built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot bind {slot}: {reason}")]
pub struct BindingError {
    pub slot: SlotLabel,
    pub reason: BindingReason,
}

/// The transport collaborator failed to produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The decoding collaborator could not turn the body into the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decoding failed: {message}")]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything that can fail an endpoint call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Malformed(#[from] MalformedDescriptor),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
