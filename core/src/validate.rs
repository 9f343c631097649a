//! Structural checks on a raw descriptor.
//!
//! # Design
//! Every check runs independently and pushes onto one report, so a caller
//! sees every problem at once. Validation is a pure function of the
//! descriptor and the options; nothing is logged here. Warnings describe
//! legal but suspicious declarations and are surfaced by the compiler.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{CompileOptions, DiagnosticLevel};
use crate::descriptor::{
    CookieAttributes, EndpointDescriptor, HttpVerb, ParameterRole, PathTemplate, RepeatPolicy,
    ReturnShape,
};
use crate::encoding::{has_line_break, http_date, is_cookie_octets, is_field_value, is_token};
use crate::error::{DescriptorProblem, MalformedDescriptor, ProblemReason};
use crate::merge;

/// Headers that must not be sent more than once.
const SINGLETON_HEADERS: &[&str] = &["Content-Type", "Content-Length", "Host"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A static header and a header binding share a name; both are sent.
    HeaderAccumulates,
    RepeatedSingletonHeader,
    SameSiteNoneWithoutSecure,
    MaxAgeAndExpires,
    /// A `Cookie` header declared through the header channel.
    CookieAsHeader,
    /// A form body on a verb other than POST, PUT or PATCH.
    FormOnBodylessVerb,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WarningKind::HeaderAccumulates => "header accumulates",
            WarningKind::RepeatedSingletonHeader => "repeated singleton header",
            WarningKind::SameSiteNoneWithoutSecure => "SameSite=None without Secure",
            WarningKind::MaxAgeAndExpires => "both Max-Age and Expires",
            WarningKind::CookieAsHeader => "cookie declared as header",
            WarningKind::FormOnBodylessVerb => "form body on bodyless verb",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub detail: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// A descriptor that passed every check, with its parsed path template.
#[derive(Debug, Clone)]
pub struct ValidatedEndpoint<'a> {
    descriptor: &'a EndpointDescriptor,
    path: PathTemplate,
    warnings: Vec<Warning>,
}

impl<'a> ValidatedEndpoint<'a> {
    pub fn descriptor(&self) -> &'a EndpointDescriptor {
        self.descriptor
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (PathTemplate, Vec<Warning>) {
        (self.path, self.warnings)
    }
}

#[derive(Default)]
struct Report {
    problems: Vec<DescriptorProblem>,
    warnings: Vec<Warning>,
}

impl Report {
    fn problem(&mut self, reason: ProblemReason, detail: impl Into<String>) {
        self.problems.push(DescriptorProblem::new(reason, detail));
    }

    fn warn(&mut self, kind: WarningKind, detail: impl Into<String>) {
        self.warnings.push(Warning {
            kind,
            detail: detail.into(),
        });
    }
}

/// Check a descriptor. Either every check passes or all problems are
/// returned together.
pub fn validate<'a>(
    descriptor: &'a EndpointDescriptor,
    options: &CompileOptions,
) -> Result<ValidatedEndpoint<'a>, MalformedDescriptor> {
    let mut report = Report::default();

    check_verb(descriptor, &mut report);
    let path = check_path(descriptor, &mut report);
    check_bindings(descriptor, &mut report);
    check_return_shape(descriptor, &mut report);
    check_headers(descriptor, &mut report);
    check_cookies(descriptor, &mut report);
    check_url(descriptor, &mut report);
    check_fragment(descriptor, &mut report);
    check_form(descriptor, &mut report);

    match options.diagnostics {
        DiagnosticLevel::Off => report.warnings.clear(),
        DiagnosticLevel::Warn => {}
        DiagnosticLevel::Deny => {
            for warning in report.warnings.drain(..) {
                report
                    .problems
                    .push(DescriptorProblem::new(ProblemReason::DeniedWarning, warning.to_string()));
            }
        }
    }

    match path {
        Some(path) if report.problems.is_empty() => Ok(ValidatedEndpoint {
            descriptor,
            path,
            warnings: report.warnings,
        }),
        _ => Err(MalformedDescriptor {
            endpoint: descriptor.display_name(),
            problems: report.problems,
        }),
    }
}

fn check_verb(descriptor: &EndpointDescriptor, report: &mut Report) {
    if let HttpVerb::Custom(method) = &descriptor.verb {
        if !is_token(method) {
            report.problem(
                ProblemReason::InvalidVerb,
                format!("`{method}` is not a valid HTTP method"),
            );
        }
    }
}

/// Parse the template and match placeholders against Path bindings.
/// Returns `None` when the template itself is unusable.
fn check_path(descriptor: &EndpointDescriptor, report: &mut Report) -> Option<PathTemplate> {
    let template = match PathTemplate::parse(&descriptor.path) {
        Ok(template) => template,
        Err(errors) => {
            for error in errors {
                report.problem(ProblemReason::InvalidPathTemplate, error.to_string());
            }
            return None;
        }
    };

    let mut seen = HashSet::new();
    for name in template.placeholders() {
        if !seen.insert(name) {
            report.problem(
                ProblemReason::DuplicatePlaceholder,
                format!("`{{{name}}}` appears more than once in `{}`", descriptor.path),
            );
        }
    }

    let bound: HashSet<&str> = descriptor
        .parameters
        .iter()
        .filter(|p| p.role == ParameterRole::Path)
        .map(|p| p.name.as_str())
        .collect();

    let mut reported = HashSet::new();
    for name in template.placeholders() {
        if !bound.contains(name) && reported.insert(name) {
            report.problem(
                ProblemReason::UnboundPlaceholder,
                format!("`{{{name}}}` has no path binding"),
            );
        }
    }

    for binding in &descriptor.parameters {
        if binding.role == ParameterRole::Path
            && !binding.name.trim().is_empty()
            && !seen.contains(binding.name.as_str())
        {
            report.problem(
                ProblemReason::OrphanPathBinding,
                format!(
                    "path binding `{}` (argument {}) matches no placeholder in `{}`",
                    binding.name, binding.index, descriptor.path
                ),
            );
        }
    }

    Some(template)
}

fn check_bindings(descriptor: &EndpointDescriptor, report: &mut Report) {
    // (role, normalised name) -> first argument index
    let mut seen: HashMap<(ParameterRole, String), usize> = HashMap::new();

    for binding in &descriptor.parameters {
        let role = binding.role;
        if role.is_named() && binding.name.trim().is_empty() {
            report.problem(
                ProblemReason::MissingName,
                format!("{role} binding for argument {} has no name", binding.index),
            );
            continue;
        }

        if binding.repeat == RepeatPolicy::Repeat && !role.allows_repeat() {
            report.problem(
                ProblemReason::UnsupportedRepeat,
                format!("{role} binding for argument {} cannot repeat", binding.index),
            );
        }
        if binding.overrides && role != ParameterRole::Header {
            report.problem(
                ProblemReason::MisplacedOption,
                format!("`overrides` on {role} binding for argument {}", binding.index),
            );
        }
        if binding.attributes.is_some() && role != ParameterRole::Cookie {
            report.problem(
                ProblemReason::MisplacedOption,
                format!("cookie attributes on {role} binding for argument {}", binding.index),
            );
        }

        match role {
            ParameterRole::Header if !is_token(&binding.name) => report.problem(
                ProblemReason::InvalidHeader,
                format!("header name `{}` is not a token", binding.name),
            ),
            ParameterRole::Header if binding.name.eq_ignore_ascii_case("Cookie") => report.warn(
                WarningKind::CookieAsHeader,
                format!("argument {} is bound to a `Cookie` header", binding.index),
            ),
            ParameterRole::Cookie => {
                if !is_token(&binding.name) {
                    report.problem(
                        ProblemReason::InvalidCookie,
                        format!("cookie name `{}` is not a token", binding.name),
                    );
                }
                if let Some(attributes) = &binding.attributes {
                    check_cookie_attributes(&binding.name, attributes, report);
                }
            }
            _ => {}
        }

        let key = match role {
            ParameterRole::Header => binding.name.to_ascii_lowercase(),
            ParameterRole::Path
            | ParameterRole::Query
            | ParameterRole::Cookie
            | ParameterRole::Field
            | ParameterRole::Tag => binding.name.clone(),
            _ => continue,
        };
        if let Some(first) = seen.get(&(role, key.clone())) {
            report.problem(
                ProblemReason::DuplicateBinding,
                format!(
                    "{role} `{}` is bound by both argument {first} and argument {}",
                    binding.name, binding.index
                ),
            );
        } else {
            seen.insert((role, key), binding.index);
        }
    }
}

fn check_return_shape(descriptor: &EndpointDescriptor, report: &mut Report) {
    if descriptor.returns == ReturnShape::StreamOfContainers
        && descriptor
            .element_type
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
    {
        report.problem(
            ProblemReason::ReturnShapeMismatch,
            "a stream of containers needs a declared element type",
        );
    }
    if descriptor.verb == HttpVerb::Head && descriptor.returns != ReturnShape::Unit {
        report.problem(
            ProblemReason::ReturnShapeMismatch,
            "HEAD responses have no body, so the endpoint must return unit",
        );
    }
}

fn check_headers(descriptor: &EndpointDescriptor, report: &mut Report) {
    let mut singleton_counts: HashMap<String, usize> = HashMap::new();

    for header in &descriptor.headers {
        if !is_token(&header.name) {
            report.problem(
                ProblemReason::InvalidHeader,
                format!("header name `{}` is not a token", header.name),
            );
        }
        if !is_field_value(&header.value) {
            report.problem(
                ProblemReason::InvalidHeader,
                format!("value of header `{}` contains a control character", header.name),
            );
        }
        if header.name.eq_ignore_ascii_case("Cookie") {
            report.warn(
                WarningKind::CookieAsHeader,
                "static `Cookie` header; declare cookies through the cookie channel",
            );
        }
        if let Some(singleton) = SINGLETON_HEADERS
            .iter()
            .find(|s| s.eq_ignore_ascii_case(&header.name))
        {
            let count = singleton_counts.entry(singleton.to_string()).or_default();
            *count += 1;
            if *count == 2 {
                report.warn(
                    WarningKind::RepeatedSingletonHeader,
                    format!("`{singleton}` is declared more than once"),
                );
            }
        }
    }

    for binding in descriptor
        .parameters
        .iter()
        .filter(|p| p.role == ParameterRole::Header && !p.overrides)
    {
        if descriptor
            .headers
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case(&binding.name))
        {
            report.warn(
                WarningKind::HeaderAccumulates,
                format!(
                    "`{}` is declared statically and bound to argument {}; both values are sent",
                    binding.name, binding.index
                ),
            );
        }
    }
}

fn check_cookies(descriptor: &EndpointDescriptor, report: &mut Report) {
    for cookie in &descriptor.cookies {
        if !is_token(&cookie.name) {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("cookie name `{}` is not a token", cookie.name),
            );
        }
        if !is_cookie_octets(&cookie.value) {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("value of cookie `{}` has characters outside cookie-octet", cookie.name),
            );
        }
        check_cookie_attributes(&cookie.name, &cookie.attributes, report);
    }

    for merged in merge::resolve_cookies(descriptor) {
        let attributes = &merged.attributes;
        let same_site_none = attributes
            .extension("SameSite")
            .flatten()
            .is_some_and(|v| v.eq_ignore_ascii_case("None"));
        if same_site_none && attributes.secure != Some(true) {
            report.warn(
                WarningKind::SameSiteNoneWithoutSecure,
                format!("cookie `{}` sets SameSite=None but is not Secure", merged.name),
            );
        }
        if attributes.max_age.is_some() && attributes.expires_timestamp.is_some() {
            report.warn(
                WarningKind::MaxAgeAndExpires,
                format!(
                    "cookie `{}` sets both; absolute-time transports honour Expires",
                    merged.name
                ),
            );
        }
    }
}

fn check_cookie_attributes(cookie: &str, attributes: &CookieAttributes, report: &mut Report) {
    let unsafe_text = |s: &str| s.contains(';') || has_line_break(s);

    for (label, value) in [("Domain", &attributes.domain), ("Path", &attributes.path)] {
        if value.as_deref().is_some_and(unsafe_text) {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("{label} of cookie `{cookie}` contains `;` or a line break"),
            );
        }
    }

    if let Some(millis) = attributes.expires_timestamp {
        if http_date(millis).is_none() {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("expiry {millis} of cookie `{cookie}` is out of range"),
            );
        }
    }

    for (name, value) in &attributes.extensions {
        if !is_token(name) {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("extension `{name}` of cookie `{cookie}` is not a token"),
            );
        }
        if value.as_deref().is_some_and(unsafe_text) {
            report.problem(
                ProblemReason::InvalidCookie,
                format!("extension `{name}` of cookie `{cookie}` contains `;` or a line break"),
            );
        }
    }
}

fn check_url(descriptor: &EndpointDescriptor, report: &mut Report) {
    let urls: Vec<usize> = descriptor
        .parameters
        .iter()
        .filter(|p| p.role == ParameterRole::Url)
        .map(|p| p.index)
        .collect();
    if urls.is_empty() {
        return;
    }
    if urls.len() > 1 {
        report.problem(
            ProblemReason::ConflictingUrl,
            format!("arguments {urls:?} are all bound as the request url"),
        );
    }
    if !descriptor.path.trim().is_empty() {
        report.problem(
            ProblemReason::ConflictingUrl,
            format!("a url binding replaces the path template `{}`", descriptor.path),
        );
    }
    if descriptor
        .parameters
        .iter()
        .any(|p| p.role == ParameterRole::Path)
    {
        report.problem(
            ProblemReason::ConflictingUrl,
            "path bindings cannot be combined with a url binding",
        );
    }
}

fn check_fragment(descriptor: &EndpointDescriptor, report: &mut Report) {
    if let Some(fragment) = &descriptor.fragment {
        if fragment.value.trim().is_empty() {
            report.problem(ProblemReason::InvalidFragment, "static fragment is blank");
        }
    }
    let sources = usize::from(descriptor.fragment.is_some())
        + descriptor
            .parameters
            .iter()
            .filter(|p| p.role == ParameterRole::Fragment)
            .count();
    if sources > 1 {
        report.problem(
            ProblemReason::InvalidFragment,
            format!("{sources} fragment sources declared, at most one is allowed"),
        );
    }
}

fn check_form(descriptor: &EndpointDescriptor, report: &mut Report) {
    let fields = descriptor
        .parameters
        .iter()
        .filter(|p| p.role.is_form())
        .count();
    if !descriptor.form_encoded {
        if fields > 0 {
            report.problem(
                ProblemReason::InvalidForm,
                format!("{fields} field bindings declared on an endpoint that is not form-encoded"),
            );
        }
        return;
    }
    if fields == 0 {
        report.problem(
            ProblemReason::InvalidForm,
            "a form-encoded endpoint needs at least one field binding",
        );
    }
    if !matches!(
        descriptor.verb,
        HttpVerb::Post | HttpVerb::Put | HttpVerb::Patch
    ) {
        report.warn(
            WarningKind::FormOnBodylessVerb,
            format!("{} requests usually carry no body", descriptor.verb),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParameterBinding;

    fn check(descriptor: &EndpointDescriptor) -> Result<ValidatedEndpoint<'_>, MalformedDescriptor> {
        validate(descriptor, &CompileOptions::default())
    }

    #[test]
    fn placeholders_with_bindings_pass() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "repos/{owner}/{repo}")
            .param(ParameterBinding::path("owner", 0))
            .param(ParameterBinding::path("repo", 1));
        let validated = check(&descriptor).unwrap();
        assert!(validated.warnings().is_empty());
        assert_eq!(validated.path().placeholders().count(), 2);
    }

    #[test]
    fn unbound_placeholder_is_rejected() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "users/{id}").named("getUser");
        let err = check(&descriptor).unwrap_err();
        assert_eq!(err.endpoint, "getUser");
        assert_eq!(err.reasons().collect::<Vec<_>>(), vec![ProblemReason::UnboundPlaceholder]);
    }

    #[test]
    fn orphan_path_binding_is_rejected() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "users")
            .param(ParameterBinding::path("id", 0));
        let err = check(&descriptor).unwrap_err();
        assert!(err.has(ProblemReason::OrphanPathBinding));
    }

    #[test]
    fn all_problems_are_reported_together() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "users/{id}")
            .returning(ReturnShape::StreamOfContainers)
            .header("Bad Name", "x")
            .param(ParameterBinding::query("q", 0))
            .param(ParameterBinding::query("q", 1))
            .param(ParameterBinding::path("other", 2));
        let err = check(&descriptor).unwrap_err();
        for reason in [
            ProblemReason::UnboundPlaceholder,
            ProblemReason::OrphanPathBinding,
            ProblemReason::DuplicateBinding,
            ProblemReason::ReturnShapeMismatch,
            ProblemReason::InvalidHeader,
        ] {
            assert!(err.has(reason), "missing {reason}: {err}");
        }
    }

    #[test]
    fn duplicate_placeholder_is_rejected() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "{id}/{id}")
            .param(ParameterBinding::path("id", 0));
        let err = check(&descriptor).unwrap_err();
        assert!(err.has(ProblemReason::DuplicatePlaceholder));
    }

    #[test]
    fn syntax_errors_skip_placeholder_matching() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "users/{id")
            .param(ParameterBinding::path("id", 0));
        let err = check(&descriptor).unwrap_err();
        assert_eq!(err.reasons().collect::<Vec<_>>(), vec![ProblemReason::InvalidPathTemplate]);
    }

    #[test]
    fn header_duplicates_compare_case_insensitively() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .param(ParameterBinding::header("X-Token", 0))
            .param(ParameterBinding::header("x-token", 1));
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::DuplicateBinding));
    }

    #[test]
    fn same_name_in_different_roles_is_fine() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .param(ParameterBinding::query("session", 0))
            .param(ParameterBinding::cookie("session", 1));
        assert!(check(&descriptor).is_ok());
    }

    #[test]
    fn duplicate_cookie_bindings_are_rejected() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .param(ParameterBinding::cookie("session", 0))
            .param(ParameterBinding::cookie("session", 1));
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::DuplicateBinding));
    }

    #[test]
    fn stream_of_containers_needs_element_type() {
        let bare = EndpointDescriptor::new(HttpVerb::Get, "pages").returning(ReturnShape::StreamOfContainers);
        assert!(check(&bare).unwrap_err().has(ProblemReason::ReturnShapeMismatch));

        let typed = bare.clone().element_type("Page");
        assert!(check(&typed).is_ok());
    }

    #[test]
    fn head_must_return_unit() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Head, "ping");
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::ReturnShapeMismatch));
        assert!(check(&descriptor.returning(ReturnShape::Unit)).is_ok());
    }

    #[test]
    fn custom_verb_must_be_token() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Custom("BAD VERB".to_string()), "x");
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::InvalidVerb));
        let purge = EndpointDescriptor::new(HttpVerb::Custom("PURGE".to_string()), "x");
        assert!(check(&purge).is_ok());
    }

    #[test]
    fn option_placement_is_checked() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "{id}")
            .param(ParameterBinding::path("id", 0).repeated())
            .param(ParameterBinding::query("q", 1).overriding())
            .param(ParameterBinding::header("h", 2).with_attributes(CookieAttributes::new()))
            .param(ParameterBinding::new(ParameterRole::Query, " ", 3));
        let err = check(&descriptor).unwrap_err();
        assert!(err.has(ProblemReason::UnsupportedRepeat));
        assert!(err.has(ProblemReason::MisplacedOption));
        assert!(err.has(ProblemReason::MissingName));
    }

    #[test]
    fn cookie_grammar_is_checked() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .cookie("bad name", "v", CookieAttributes::new())
            .cookie("ok", "has space", CookieAttributes::new())
            .cookie(
                "ext",
                "v",
                CookieAttributes::new()
                    .with_extension("Same Site", Some("Lax"))
                    .with_domain("a;b")
                    .with_expires_timestamp(i64::MAX),
            );
        let err = check(&descriptor).unwrap_err();
        assert_eq!(
            err.reasons().filter(|r| *r == ProblemReason::InvalidCookie).count(),
            5,
            "{err}"
        );
    }

    #[test]
    fn header_value_with_line_break_is_rejected() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x").header("X-Evil", "a\r\nInjected: 1");
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::InvalidHeader));
    }

    #[test]
    fn header_value_with_other_controls_is_rejected() {
        let nul = EndpointDescriptor::new(HttpVerb::Get, "x").header("X-Nul", "a\0b");
        assert!(check(&nul).unwrap_err().has(ProblemReason::InvalidHeader));

        let tab = EndpointDescriptor::new(HttpVerb::Get, "x").header("X-Tab", "a\tb");
        assert!(check(&tab).is_ok());
    }

    #[test]
    fn two_path_bindings_for_one_placeholder_are_duplicates() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "users/{id}")
            .param(ParameterBinding::path("id", 0))
            .param(ParameterBinding::path("id", 1));
        let err = check(&descriptor).unwrap_err();
        assert_eq!(err.reasons().collect::<Vec<_>>(), vec![ProblemReason::DuplicateBinding]);
    }

    #[test]
    fn fields_need_form_encoding() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Post, "login")
            .param(ParameterBinding::field("user", 0));
        let err = check(&descriptor).unwrap_err();
        assert_eq!(err.reasons().collect::<Vec<_>>(), vec![ProblemReason::InvalidForm]);

        assert!(check(&descriptor.form_encoded()).is_ok());
    }

    #[test]
    fn form_encoding_needs_a_field() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Post, "login").form_encoded();
        assert!(check(&descriptor).unwrap_err().has(ProblemReason::InvalidForm));

        let with_map = descriptor.param(ParameterBinding::field_map(0));
        assert!(check(&with_map).is_ok());
    }

    #[test]
    fn form_on_get_warns() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "search")
            .form_encoded()
            .param(ParameterBinding::field("q", 0));
        let validated = check(&descriptor).unwrap();
        let kinds: Vec<_> = validated.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::FormOnBodylessVerb]);
    }

    #[test]
    fn field_and_tag_names_are_required_and_unique() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Post, "x")
            .form_encoded()
            .param(ParameterBinding::field("a", 0))
            .param(ParameterBinding::field("a", 1))
            .param(ParameterBinding::tag("", 2));
        let err = check(&descriptor).unwrap_err();
        assert!(err.has(ProblemReason::DuplicateBinding));
        assert!(err.has(ProblemReason::MissingName));
    }

    #[test]
    fn url_binding_conflicts() {
        let alone = EndpointDescriptor::new(HttpVerb::Get, "").param(ParameterBinding::url(0));
        assert!(check(&alone).is_ok());

        let with_path = EndpointDescriptor::new(HttpVerb::Get, "users").param(ParameterBinding::url(0));
        assert!(check(&with_path).unwrap_err().has(ProblemReason::ConflictingUrl));

        let twice = EndpointDescriptor::new(HttpVerb::Get, "")
            .param(ParameterBinding::url(0))
            .param(ParameterBinding::url(1));
        assert!(check(&twice).unwrap_err().has(ProblemReason::ConflictingUrl));
    }

    #[test]
    fn fragment_sources_are_limited() {
        let blank = EndpointDescriptor::new(HttpVerb::Get, "x").fragment("  ", false);
        assert!(check(&blank).unwrap_err().has(ProblemReason::InvalidFragment));

        let both = EndpointDescriptor::new(HttpVerb::Get, "x")
            .fragment("top", false)
            .param(ParameterBinding::fragment(0));
        assert!(check(&both).unwrap_err().has(ProblemReason::InvalidFragment));
    }

    #[test]
    fn warnings_do_not_fail_by_default() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .header("Accept", "application/json")
            .param(ParameterBinding::header("accept", 0))
            .cookie(
                "track",
                "1",
                CookieAttributes::new()
                    .with_extension("SameSite", Some("None"))
                    .with_max_age(10)
                    .with_expires_timestamp(0),
            );
        let validated = check(&descriptor).unwrap();
        let kinds: Vec<_> = validated.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::HeaderAccumulates,
                WarningKind::SameSiteNoneWithoutSecure,
                WarningKind::MaxAgeAndExpires,
            ]
        );
    }

    #[test]
    fn overriding_binding_does_not_warn() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .header("Authorization", "anonymous")
            .param(ParameterBinding::header("Authorization", 0).overriding());
        assert!(check(&descriptor).unwrap().warnings().is_empty());
    }

    #[test]
    fn secure_from_earlier_declaration_silences_same_site_warning() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x")
            .cookie("s", "1", CookieAttributes::new().with_secure(true))
            .cookie("s", "2", CookieAttributes::new().with_extension("SameSite", Some("None")));
        assert!(check(&descriptor).unwrap().warnings().is_empty());
    }

    #[test]
    fn repeated_singleton_header_warns_once() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Post, "x")
            .header("Content-Type", "application/json")
            .header("content-type", "text/plain")
            .header("Content-Type", "text/html");
        let validated = check(&descriptor).unwrap();
        assert_eq!(validated.warnings().len(), 1);
        assert_eq!(validated.warnings()[0].kind, WarningKind::RepeatedSingletonHeader);
    }

    #[test]
    fn deny_promotes_warnings() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x").header("Cookie", "a=1");
        let options = CompileOptions::new().with_diagnostics(DiagnosticLevel::Deny);
        let err = validate(&descriptor, &options).unwrap_err();
        assert_eq!(err.reasons().collect::<Vec<_>>(), vec![ProblemReason::DeniedWarning]);
    }

    #[test]
    fn off_discards_warnings() {
        let descriptor = EndpointDescriptor::new(HttpVerb::Get, "x").header("Cookie", "a=1");
        let options = CompileOptions::new().with_diagnostics(DiagnosticLevel::Off);
        assert!(validate(&descriptor, &options).unwrap().warnings().is_empty());
    }
}
