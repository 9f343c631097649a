//! Typed in-memory representation of one endpoint declaration.
//!
//! # Design
//! A front-end collaborator produces one `EndpointDescriptor` per declared
//! method, either by deserializing JSON or through the chained constructors
//! below. Nothing here inspects source syntax; the descriptor is plain data
//! that the validator checks and the compiler reads. Records are never
//! mutated once validation has run. Later stages only read and reorder them.
//!
//! Cookie attributes are modelled as independently present/absent fields so
//! that a later declaration which says nothing about `secure` can't be
//! mistaken for an explicit `secure = false`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP method of an endpoint. Anything outside the standard set is kept
/// verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Custom(String),
}

impl HttpVerb {
    /// Method names are case-sensitive, so `get` is a custom verb.
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => HttpVerb::Get,
            "POST" => HttpVerb::Post,
            "PUT" => HttpVerb::Put,
            "PATCH" => HttpVerb::Patch,
            "DELETE" => HttpVerb::Delete,
            "HEAD" => HttpVerb::Head,
            "OPTIONS" => HttpVerb::Options,
            other => HttpVerb::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Custom(method) => method,
        }
    }
}

impl From<String> for HttpVerb {
    fn from(method: String) -> Self {
        HttpVerb::parse(&method)
    }
}

impl From<HttpVerb> for String {
    fn from(verb: HttpVerb) -> Self {
        verb.as_str().to_string()
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    Placeholder(String),
}

/// Syntax problems found while parsing a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSyntaxError {
    UnclosedPlaceholder { at: usize },
    StrayClosingBrace { at: usize },
    EmptyPlaceholder { at: usize },
    PlaceholderInQuery { query: String },
}

impl fmt::Display for TemplateSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSyntaxError::UnclosedPlaceholder { at } => {
                write!(f, "`{{` at offset {at} is never closed")
            }
            TemplateSyntaxError::StrayClosingBrace { at } => {
                write!(f, "`}}` at offset {at} has no matching `{{`")
            }
            TemplateSyntaxError::EmptyPlaceholder { at } => {
                write!(f, "placeholder at offset {at} has no name")
            }
            TemplateSyntaxError::PlaceholderInQuery { query } => {
                write!(f, "placeholders are only allowed before `?`, found one in `{query}`")
            }
        }
    }
}

/// A path template such as `repos/{owner}/{repo}?per_page=100`, split into
/// literal runs and named placeholders plus an optional literal query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTemplate {
    segments: Vec<PathSegment>,
    query: Vec<(String, Option<String>)>,
}

impl PathTemplate {
    /// Parse a raw template, collecting every syntax problem rather than
    /// stopping at the first one.
    pub fn parse(raw: &str) -> Result<Self, Vec<TemplateSyntaxError>> {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        let mut errors = Vec::new();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = path;
        let mut offset = 0;

        while let Some(i) = rest.find(['{', '}']) {
            if rest.as_bytes()[i] == b'}' {
                errors.push(TemplateSyntaxError::StrayClosingBrace { at: offset + i });
                literal.push_str(&rest[..=i]);
                rest = &rest[i + 1..];
                offset += i + 1;
                continue;
            }

            literal.push_str(&rest[..i]);
            let after = &rest[i + 1..];
            match after.find(['{', '}']) {
                Some(j) if after.as_bytes()[j] == b'}' => {
                    let name = after[..j].trim();
                    if name.is_empty() {
                        errors.push(TemplateSyntaxError::EmptyPlaceholder { at: offset + i });
                    } else {
                        if !literal.is_empty() {
                            segments.push(PathSegment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(PathSegment::Placeholder(name.to_string()));
                    }
                    rest = &after[j + 1..];
                    offset += i + j + 2;
                }
                _ => {
                    errors.push(TemplateSyntaxError::UnclosedPlaceholder { at: offset + i });
                    literal.push('{');
                    rest = after;
                    offset += i + 1;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(PathSegment::Literal(literal));
        }

        let mut pairs = Vec::new();
        if let Some(query) = query {
            if query.contains(['{', '}']) {
                errors.push(TemplateSyntaxError::PlaceholderInQuery {
                    query: query.to_string(),
                });
            }
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((name, value)) => pairs.push((name.to_string(), Some(value.to_string()))),
                    None => pairs.push((pair.to_string(), None)),
                }
            }
        }

        if errors.is_empty() {
            Ok(Self {
                segments,
                query: pairs,
            })
        } else {
            Err(errors)
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Placeholder names in template order, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            PathSegment::Placeholder(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }

    /// Literal `name=value` pairs that followed `?` in the template.
    pub fn static_query(&self) -> &[(String, Option<String>)] {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.query.is_empty()
    }
}

/// What the caller receives once the response is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// No body is decoded.
    Unit,
    /// Exactly one decoded value.
    #[default]
    Single,
    /// A lazy sequence of values.
    Stream,
    /// A lazy sequence whose items are themselves containers of values.
    StreamOfContainers,
}

/// The position a call argument occupies in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    /// Replaces a `{name}` placeholder in the path template.
    Path,
    /// `name=value` query pair.
    Query,
    /// Valueless query key taken from the argument.
    QueryName,
    /// Map argument expanded into query pairs.
    QueryMap,
    /// Header whose value comes from the argument.
    Header,
    /// Map argument expanded into headers.
    HeaderMap,
    /// Cookie whose value comes from the argument.
    Cookie,
    /// Argument replaces the whole request URL.
    Url,
    /// Argument becomes the URL fragment.
    Fragment,
    /// `name=value` pair in a form-encoded body.
    Field,
    /// Map argument expanded into form fields.
    FieldMap,
    /// Request attribute for the transport; never sent on the wire.
    Tag,
}

impl ParameterRole {
    /// Roles whose binding must carry a declared name.
    pub fn is_named(self) -> bool {
        matches!(
            self,
            ParameterRole::Path
                | ParameterRole::Query
                | ParameterRole::Header
                | ParameterRole::Cookie
                | ParameterRole::Field
                | ParameterRole::Tag
        )
    }

    /// Roles that may expand a list argument into several emissions.
    pub fn allows_repeat(self) -> bool {
        matches!(
            self,
            ParameterRole::Query
                | ParameterRole::QueryName
                | ParameterRole::Header
                | ParameterRole::Field
        )
    }

    /// Roles whose argument may be null, in which case nothing is emitted.
    pub fn is_optional(self) -> bool {
        !matches!(self, ParameterRole::Path | ParameterRole::Url)
    }

    /// Roles that contribute to a form-encoded body.
    pub fn is_form(self) -> bool {
        matches!(self, ParameterRole::Field | ParameterRole::FieldMap)
    }
}

impl fmt::Display for ParameterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParameterRole::Path => "path",
            ParameterRole::Query => "query",
            ParameterRole::QueryName => "query name",
            ParameterRole::QueryMap => "query map",
            ParameterRole::Header => "header",
            ParameterRole::HeaderMap => "header map",
            ParameterRole::Cookie => "cookie",
            ParameterRole::Url => "url",
            ParameterRole::Fragment => "fragment",
            ParameterRole::Field => "field",
            ParameterRole::FieldMap => "field map",
            ParameterRole::Tag => "tag",
        };
        f.write_str(label)
    }
}

/// Whether a list argument is accepted and expanded element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    #[default]
    Single,
    Repeat,
}

/// Binds one call argument (by index) to a position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub role: ParameterRole,
    #[serde(default)]
    pub name: String,
    pub index: usize,
    /// The argument is already encoded for its position and is inserted verbatim.
    #[serde(default)]
    pub encoded: bool,
    #[serde(default)]
    pub repeat: RepeatPolicy,
    /// On a header binding, drop static headers of the same name.
    #[serde(default)]
    pub overrides: bool,
    /// On a cookie binding, attributes declared next to the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<CookieAttributes>,
}

impl ParameterBinding {
    pub fn new(role: ParameterRole, name: impl Into<String>, index: usize) -> Self {
        Self {
            role,
            name: name.into(),
            index,
            encoded: false,
            repeat: RepeatPolicy::Single,
            overrides: false,
            attributes: None,
        }
    }

    pub fn path(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Path, name, index)
    }

    pub fn query(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Query, name, index)
    }

    pub fn query_name(index: usize) -> Self {
        Self::new(ParameterRole::QueryName, "", index)
    }

    pub fn query_map(index: usize) -> Self {
        Self::new(ParameterRole::QueryMap, "", index)
    }

    pub fn header(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Header, name, index)
    }

    pub fn header_map(index: usize) -> Self {
        Self::new(ParameterRole::HeaderMap, "", index)
    }

    pub fn cookie(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Cookie, name, index)
    }

    pub fn url(index: usize) -> Self {
        Self::new(ParameterRole::Url, "", index)
    }

    pub fn fragment(index: usize) -> Self {
        Self::new(ParameterRole::Fragment, "", index)
    }

    pub fn field(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Field, name, index)
    }

    pub fn field_map(index: usize) -> Self {
        Self::new(ParameterRole::FieldMap, "", index)
    }

    pub fn tag(name: impl Into<String>, index: usize) -> Self {
        Self::new(ParameterRole::Tag, name, index)
    }

    pub fn encoded(mut self) -> Self {
        self.encoded = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = RepeatPolicy::Repeat;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.overrides = true;
        self
    }

    pub fn with_attributes(mut self, attributes: CookieAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticHeader {
    pub name: String,
    pub value: String,
    /// Declaration order; ties keep list order.
    #[serde(default)]
    pub order: usize,
}

/// Cookie attributes where every field is either present or absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieAttributes {
    /// Seconds to live.
    pub max_age: Option<i64>,
    /// Absolute expiry, epoch milliseconds.
    pub expires_timestamp: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    /// Extension attributes such as `SameSite`; a `None` value is a bare flag.
    pub extensions: Vec<(String, Option<String>)>,
}

impl CookieAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_expires_timestamp(mut self, millis: i64) -> Self {
        self.expires_timestamp = Some(millis);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.extensions.push((name.into(), value.map(str::to_string)));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every attribute `later` declares on top of `self`, leaving the
    /// ones it doesn't mention alone. Extensions merge by name
    /// (case-insensitive): the first declaration keeps its position, the
    /// latest one supplies the value.
    pub fn overlay(&mut self, later: &CookieAttributes) {
        if later.max_age.is_some() {
            self.max_age = later.max_age;
        }
        if later.expires_timestamp.is_some() {
            self.expires_timestamp = later.expires_timestamp;
        }
        if later.domain.is_some() {
            self.domain.clone_from(&later.domain);
        }
        if later.path.is_some() {
            self.path.clone_from(&later.path);
        }
        if later.secure.is_some() {
            self.secure = later.secure;
        }
        if later.http_only.is_some() {
            self.http_only = later.http_only;
        }
        for (name, value) in &later.extensions {
            match self.extensions.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.1.clone_from(value),
                None => self.extensions.push((name.clone(), value.clone())),
            }
        }
    }

    /// Value of an extension attribute, matched case-insensitively.
    pub fn extension(&self, name: &str) -> Option<Option<&str>> {
        self.extensions
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub attributes: CookieAttributes,
    #[serde(default)]
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFragment {
    pub value: String,
    #[serde(default)]
    pub encoded: bool,
}

/// The raw, unvalidated declaration of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    #[serde(default)]
    pub name: String,
    pub verb: HttpVerb,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub returns: ReturnShape,
    /// Declared element type, required for `StreamOfContainers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// The body is `application/x-www-form-urlencoded`, built from field bindings.
    #[serde(default)]
    pub form_encoded: bool,
    #[serde(default)]
    pub headers: Vec<StaticHeader>,
    #[serde(default)]
    pub cookies: Vec<StaticCookie>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<StaticFragment>,
    #[serde(default)]
    pub parameters: Vec<ParameterBinding>,
}

impl EndpointDescriptor {
    pub fn new(verb: HttpVerb, path: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            verb,
            path: path.into(),
            returns: ReturnShape::Single,
            element_type: None,
            form_encoded: false,
            headers: Vec::new(),
            cookies: Vec::new(),
            fragment: None,
            parameters: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn returning(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }

    pub fn element_type(mut self, type_name: impl Into<String>) -> Self {
        self.element_type = Some(type_name.into());
        self
    }

    pub fn form_encoded(mut self) -> Self {
        self.form_encoded = true;
        self
    }

    /// Append a static header; declaration order follows call order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let order = self.headers.len();
        self.headers.push(StaticHeader {
            name: name.into(),
            value: value.into(),
            order,
        });
        self
    }

    /// Append a static cookie; declaration order follows call order.
    pub fn cookie(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        attributes: CookieAttributes,
    ) -> Self {
        let order = self.cookies.len();
        self.cookies.push(StaticCookie {
            name: name.into(),
            value: value.into(),
            attributes,
            order,
        });
        self
    }

    pub fn fragment(mut self, value: impl Into<String>, encoded: bool) -> Self {
        self.fragment = Some(StaticFragment {
            value: value.into(),
            encoded,
        });
        self
    }

    pub fn param(mut self, binding: ParameterBinding) -> Self {
        self.parameters.push(binding);
        self
    }

    /// Name used in diagnostics: the declared name, else `VERB path`.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("{} {}", self.verb, self.path)
        } else {
            self.name.clone()
        }
    }
}
