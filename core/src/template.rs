//! Compiles a descriptor into an immutable request template.
//!
//! # Design
//! `compile` is the only way to obtain a `RequestTemplate`: it validates,
//! resolves the header and cookie channels, then lowers everything into
//! plans of literal nodes and slot references. Slots are numbered by the
//! binding's position in the descriptor, so a slot id indexes both
//! `RequestTemplate::slots` and `EndpointDescriptor::parameters`.
//!
//! Cookie attribute suffixes are rendered here, once. Only the cookie value
//! can change between calls.

use crate::config::{CompileOptions, DiagnosticLevel};
use crate::descriptor::{
    CookieAttributes, EndpointDescriptor, HttpVerb, ParameterBinding, ParameterRole, PathSegment,
    RepeatPolicy, ReturnShape,
};
use crate::encoding::http_date;
use crate::error::{DescriptorProblem, MalformedDescriptor, ProblemReason, SlotLabel};
use crate::merge::{self, CookieValueSource, MergedCookie, MergedHeader};
use crate::validate::{validate, Warning};

/// Position of a binding in the descriptor's parameter list.
pub type SlotId = usize;

/// A substitution point filled from one call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Argument index the value is read from.
    pub index: usize,
    pub role: ParameterRole,
    pub name: String,
    pub encoded: bool,
    pub repeat: RepeatPolicy,
}

impl Slot {
    pub fn label(&self) -> SlotLabel {
        SlotLabel {
            role: self.role,
            name: self.name.clone(),
            index: self.index,
        }
    }
}

impl From<&ParameterBinding> for Slot {
    fn from(binding: &ParameterBinding) -> Self {
        Self {
            index: binding.index,
            role: binding.role,
            name: binding.name.clone(),
            encoded: binding.encoded,
            repeat: binding.repeat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    Literal(String),
    Slot(SlotId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPlan {
    Segments(Vec<PathNode>),
    /// The whole URL comes from the argument.
    Url(SlotId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Pair { name: String, slot: SlotId },
    Name { slot: SlotId },
    Map { slot: SlotId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderNode {
    Literal { name: String, value: String },
    Slot { name: String, slot: SlotId },
    Map { slot: SlotId },
}

/// One entry of a form-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldNode {
    Pair { name: String, slot: SlotId },
    Map { slot: SlotId },
}

/// A request attribute handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub slot: SlotId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieValue {
    Literal(String),
    Slot {
        slot: SlotId,
        fallback: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNode {
    pub name: String,
    pub value: CookieValue,
    /// Rendered attribute suffix, each attribute prefixed by `; `.
    pub attributes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Literal { value: String, encoded: bool },
    Slot(SlotId),
}

/// The compiled, immutable construction plan for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    endpoint: String,
    verb: HttpVerb,
    path: PathPlan,
    static_query: Vec<(String, Option<String>)>,
    query: Vec<QueryNode>,
    headers: Vec<HeaderNode>,
    cookies: Vec<CookieNode>,
    fragment: Option<FragmentNode>,
    form_encoded: bool,
    fields: Vec<FieldNode>,
    tags: Vec<TagNode>,
    slots: Vec<Slot>,
    returns: ReturnShape,
    element_type: Option<String>,
    warnings: Vec<Warning>,
}

impl RequestTemplate {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn verb(&self) -> &HttpVerb {
        &self.verb
    }

    pub fn path(&self) -> &PathPlan {
        &self.path
    }

    /// Literal pairs from the path template's `?` suffix.
    pub fn static_query(&self) -> &[(String, Option<String>)] {
        &self.static_query
    }

    pub fn query(&self) -> &[QueryNode] {
        &self.query
    }

    pub fn headers(&self) -> &[HeaderNode] {
        &self.headers
    }

    pub fn cookies(&self) -> &[CookieNode] {
        &self.cookies
    }

    pub fn fragment(&self) -> Option<&FragmentNode> {
        self.fragment.as_ref()
    }

    pub fn is_form_encoded(&self) -> bool {
        self.form_encoded
    }

    /// Body fields in parameter order; empty unless form-encoded.
    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    pub fn tags(&self) -> &[TagNode] {
        &self.tags
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Slots that read the given argument index.
    pub fn slots_for_argument(&self, index: usize) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| slot.index == index)
    }

    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        self.slots.iter().map(|s| s.index + 1).max().unwrap_or(0)
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    /// Warnings reported while compiling; empty under `DiagnosticLevel::Off`.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Compile with default options.
pub fn compile(descriptor: &EndpointDescriptor) -> Result<RequestTemplate, MalformedDescriptor> {
    compile_with(descriptor, &CompileOptions::default())
}

pub fn compile_with(
    descriptor: &EndpointDescriptor,
    options: &CompileOptions,
) -> Result<RequestTemplate, MalformedDescriptor> {
    let endpoint = descriptor.display_name();
    let validated = validate(descriptor, options)?;

    if options.diagnostics == DiagnosticLevel::Warn {
        for warning in validated.warnings() {
            tracing::warn!(endpoint = %endpoint, kind = %warning.kind, "{}", warning.detail);
        }
    }

    let headers = merge::resolve_headers(descriptor);
    let cookies = merge::resolve_cookies(descriptor);
    let (path, warnings) = validated.into_parts();

    let mut internal = Vec::new();
    let slots: Vec<Slot> = descriptor.parameters.iter().map(Slot::from).collect();

    let path_plan = match descriptor
        .parameters
        .iter()
        .position(|p| p.role == ParameterRole::Url)
    {
        Some(slot) => PathPlan::Url(slot),
        None => {
            let mut nodes = Vec::with_capacity(path.segments().len());
            for segment in path.segments() {
                match segment {
                    PathSegment::Literal(text) => nodes.push(PathNode::Literal(text.clone())),
                    PathSegment::Placeholder(name) => match find_path_slot(descriptor, name) {
                        Some(slot) => nodes.push(PathNode::Slot(slot)),
                        None => internal.push(DescriptorProblem::new(
                            ProblemReason::Internal,
                            format!("placeholder `{name}` survived validation without a binding"),
                        )),
                    },
                }
            }
            PathPlan::Segments(nodes)
        }
    };

    let query = descriptor
        .parameters
        .iter()
        .enumerate()
        .filter_map(|(slot, binding)| match binding.role {
            ParameterRole::Query => Some(QueryNode::Pair {
                name: binding.name.clone(),
                slot,
            }),
            ParameterRole::QueryName => Some(QueryNode::Name { slot }),
            ParameterRole::QueryMap => Some(QueryNode::Map { slot }),
            _ => None,
        })
        .collect();

    let mut fields = Vec::new();
    let mut tags = Vec::new();
    for (slot, binding) in descriptor.parameters.iter().enumerate() {
        match binding.role {
            ParameterRole::Field => fields.push(FieldNode::Pair {
                name: binding.name.clone(),
                slot,
            }),
            ParameterRole::FieldMap => fields.push(FieldNode::Map { slot }),
            ParameterRole::Tag => tags.push(TagNode {
                name: binding.name.clone(),
                slot,
            }),
            _ => {}
        }
    }

    let headers: Vec<HeaderNode> = headers.into_iter().map(lower_header).collect();

    let mut cookie_nodes = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        match lower_cookie(cookie) {
            Ok(node) => cookie_nodes.push(node),
            Err(problem) => internal.push(problem),
        }
    }

    let fragment = match &descriptor.fragment {
        Some(fragment) => Some(FragmentNode::Literal {
            value: fragment.value.clone(),
            encoded: fragment.encoded,
        }),
        None => descriptor
            .parameters
            .iter()
            .position(|p| p.role == ParameterRole::Fragment)
            .map(FragmentNode::Slot),
    };

    if !internal.is_empty() {
        return Err(MalformedDescriptor {
            endpoint,
            problems: internal,
        });
    }

    tracing::debug!(
        endpoint = %endpoint,
        slots = slots.len(),
        headers = headers.len(),
        cookies = cookie_nodes.len(),
        fields = fields.len(),
        warnings = warnings.len(),
        "compiled request template"
    );

    Ok(RequestTemplate {
        endpoint,
        verb: descriptor.verb.clone(),
        path: path_plan,
        static_query: path.static_query().to_vec(),
        query,
        headers,
        cookies: cookie_nodes,
        fragment,
        form_encoded: descriptor.form_encoded,
        fields,
        tags,
        slots,
        returns: descriptor.returns,
        element_type: descriptor.element_type.clone(),
        warnings,
    })
}

fn find_path_slot(descriptor: &EndpointDescriptor, name: &str) -> Option<SlotId> {
    descriptor
        .parameters
        .iter()
        .position(|p| p.role == ParameterRole::Path && p.name == name)
}

fn lower_header(header: MergedHeader) -> HeaderNode {
    match header {
        MergedHeader::Static { name, value } => HeaderNode::Literal { name, value },
        MergedHeader::Bound { name, parameter } => HeaderNode::Slot {
            name,
            slot: parameter,
        },
        MergedHeader::Map { parameter } => HeaderNode::Map { slot: parameter },
    }
}

fn lower_cookie(cookie: MergedCookie) -> Result<CookieNode, DescriptorProblem> {
    let attributes = render_attributes(&cookie.name, &cookie.attributes)?;
    let value = match cookie.value {
        CookieValueSource::Static(value) => CookieValue::Literal(value),
        CookieValueSource::Bound {
            parameter,
            fallback,
        } => CookieValue::Slot {
            slot: parameter,
            fallback,
        },
    };
    Ok(CookieNode {
        name: cookie.name,
        value,
        attributes,
    })
}

/// Max-Age, Expires, Domain, Path, Secure, HttpOnly, then extensions in
/// declaration order.
fn render_attributes(cookie: &str, attributes: &CookieAttributes) -> Result<String, DescriptorProblem> {
    let mut out = String::new();
    if let Some(max_age) = attributes.max_age {
        out.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(millis) = attributes.expires_timestamp {
        let date = http_date(millis).ok_or_else(|| {
            DescriptorProblem::new(
                ProblemReason::Internal,
                format!("expiry {millis} of cookie `{cookie}` survived validation"),
            )
        })?;
        out.push_str("; Expires=");
        out.push_str(&date);
    }
    if let Some(domain) = attributes.domain.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str("; Domain=");
        out.push_str(domain);
    }
    if let Some(path) = attributes.path.as_deref().filter(|p| !p.trim().is_empty()) {
        out.push_str("; Path=");
        out.push_str(path);
    }
    if attributes.secure == Some(true) {
        out.push_str("; Secure");
    }
    if attributes.http_only == Some(true) {
        out.push_str("; HttpOnly");
    }
    for (name, value) in &attributes.extensions {
        out.push_str("; ");
        out.push_str(name);
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            out.push('=');
            out.push_str(value);
        }
    }
    Ok(out)
}
