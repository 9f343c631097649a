//! Compiles declarative HTTP endpoint descriptors into request templates.
//!
//! # Overview
//! An endpoint is described as data (`EndpointDescriptor`): verb, path
//! template, static headers and cookies, and parameter bindings. `compile`
//! validates and merges that declaration into an immutable
//! `RequestTemplate`; `instantiate` fills the template with call arguments
//! and produces a `RequestDescription` ready for a transport.
//!
//! # Design
//! - The core never performs I/O. Sending requests and decoding responses
//!   belong to the `Transport` and `ResponseDecoder` collaborators.
//! - Compilation reports every problem found at once (`MalformedDescriptor`);
//!   instantiation either builds a complete request or fails with a
//!   `BindingError` naming the slot.
//! - Templates are `Send + Sync` and shared through `Arc`; `Endpoint`
//!   compiles its template at most once, on first use.
//!
//! ```
//! use reqplan_core::{args, compile, instantiate, EndpointDescriptor, HttpVerb, ParameterBinding};
//!
//! let descriptor = EndpointDescriptor::new(HttpVerb::Get, "repos/{owner}/{repo}")
//!     .header("Accept", "application/json")
//!     .param(ParameterBinding::path("owner", 0))
//!     .param(ParameterBinding::path("repo", 1));
//! let template = compile(&descriptor).unwrap();
//! let request = instantiate(&template, &args!["kingg22", "ktorgen"]).unwrap();
//! assert_eq!(request.path, "repos/kingg22/ktorgen");
//! ```

pub mod config;
pub mod descriptor;
pub mod encoding;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod instantiate;
pub mod merge;
pub mod template;
pub mod validate;
pub mod value;

pub use config::{CompileOptions, DiagnosticLevel};
pub use descriptor::{
    CookieAttributes, EndpointDescriptor, HttpVerb, ParameterBinding, ParameterRole, PathSegment,
    PathTemplate, RepeatPolicy, ReturnShape, StaticCookie, StaticFragment, StaticHeader,
};
pub use encoding::{ComponentEncoder, PercentEncoder, Position};
pub use endpoint::Endpoint;
pub use error::{
    BindingError, BindingReason, CallError, DecodeError, DescriptorProblem, MalformedDescriptor,
    ProblemReason, SlotLabel, TransportError,
};
pub use http::{HttpResponse, JsonDecoder, RequestDescription, ResponseDecoder, Transport};
pub use instantiate::{instantiate, instantiate_with};
pub use template::{compile, compile_with, RequestTemplate};
pub use validate::{validate, ValidatedEndpoint, Warning, WarningKind};
pub use value::ArgValue;
