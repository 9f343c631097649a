//! Precedence rules for the header and cookie channels.
//!
//! # Design
//! Both resolvers are pure functions over a descriptor and return owned,
//! canonically ordered lists. Bound entries refer to their binding by its
//! position in `EndpointDescriptor::parameters`, which is also the slot id
//! the compiler assigns.
//!
//! Headers accumulate: a bound header never replaces a static one unless
//! the binding carries the override directive. Cookies fold: every
//! declaration naming the same cookie collapses into one emitted cookie,
//! with attributes merged field by field in precedence order.
//!
//! A form-encoded endpoint gets a trailing `Content-Type` header unless one
//! is already declared, statically or through a binding.

use crate::descriptor::{CookieAttributes, EndpointDescriptor, ParameterRole};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One entry of the header plan, before slots are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedHeader {
    Static { name: String, value: String },
    Bound { name: String, parameter: usize },
    /// A header map binding; names come from the argument.
    Map { parameter: usize },
}

pub fn resolve_headers(descriptor: &EndpointDescriptor) -> Vec<MergedHeader> {
    let overridden: Vec<&str> = descriptor
        .parameters
        .iter()
        .filter(|p| p.role == ParameterRole::Header && p.overrides)
        .map(|p| p.name.as_str())
        .collect();

    let mut statics: Vec<_> = descriptor
        .headers
        .iter()
        .filter(|h| !overridden.iter().any(|name| name.eq_ignore_ascii_case(&h.name)))
        .collect();
    // stable: equal order keeps list order
    statics.sort_by_key(|h| h.order);

    let mut merged: Vec<MergedHeader> = statics
        .into_iter()
        .map(|h| MergedHeader::Static {
            name: h.name.clone(),
            value: h.value.clone(),
        })
        .collect();

    for (parameter, binding) in descriptor.parameters.iter().enumerate() {
        match binding.role {
            ParameterRole::Header => merged.push(MergedHeader::Bound {
                name: binding.name.clone(),
                parameter,
            }),
            ParameterRole::HeaderMap => merged.push(MergedHeader::Map { parameter }),
            _ => {}
        }
    }

    let declares_content_type = merged.iter().any(|h| match h {
        MergedHeader::Static { name, .. } | MergedHeader::Bound { name, .. } => {
            name.eq_ignore_ascii_case("Content-Type")
        }
        MergedHeader::Map { .. } => false,
    });
    if descriptor.form_encoded && !declares_content_type {
        merged.push(MergedHeader::Static {
            name: "Content-Type".to_string(),
            value: FORM_CONTENT_TYPE.to_string(),
        });
    }
    merged
}

/// Where the emitted value of a merged cookie comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieValueSource {
    Static(String),
    /// The call argument wins; `fallback` is the last static value, used
    /// when the argument is null.
    Bound {
        parameter: usize,
        fallback: Option<String>,
    },
}

/// All declarations of one cookie name, folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCookie {
    pub name: String,
    pub value: CookieValueSource,
    pub attributes: CookieAttributes,
}

struct Contribution<'a> {
    /// (origin, declared order, list position); statics have origin 0.
    key: (u8, usize, usize),
    name: &'a str,
    value: Contributed<'a>,
    attributes: Option<&'a CookieAttributes>,
}

enum Contributed<'a> {
    Literal(&'a str),
    Parameter(usize),
}

pub fn resolve_cookies(descriptor: &EndpointDescriptor) -> Vec<MergedCookie> {
    let statics = descriptor
        .cookies
        .iter()
        .enumerate()
        .map(|(position, cookie)| Contribution {
            key: (0, cookie.order, position),
            name: &cookie.name,
            value: Contributed::Literal(&cookie.value),
            attributes: Some(&cookie.attributes),
        });
    let bound = descriptor
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.role == ParameterRole::Cookie)
        .map(|(position, binding)| Contribution {
            key: (1, position, position),
            name: &binding.name,
            value: Contributed::Parameter(position),
            attributes: binding.attributes.as_ref(),
        });

    let mut contributions: Vec<Contribution<'_>> = statics.chain(bound).collect();
    contributions.sort_by_key(|c| c.key);

    let mut groups: Vec<Group<'_>> = Vec::new();
    for contribution in contributions {
        let index = match groups.iter().position(|g| g.name == contribution.name) {
            Some(index) => index,
            None => {
                groups.push(Group::new(contribution.name));
                groups.len() - 1
            }
        };
        groups[index].absorb(contribution);
    }

    groups.into_iter().filter_map(Group::finish).collect()
}

struct Group<'a> {
    name: &'a str,
    last_static: Option<&'a str>,
    parameter: Option<usize>,
    attributes: CookieAttributes,
}

impl<'a> Group<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            last_static: None,
            parameter: None,
            attributes: CookieAttributes::default(),
        }
    }

    fn absorb(&mut self, contribution: Contribution<'a>) {
        match contribution.value {
            Contributed::Literal(value) => self.last_static = Some(value),
            Contributed::Parameter(parameter) => self.parameter = Some(parameter),
        }
        if let Some(attributes) = contribution.attributes {
            self.attributes.overlay(attributes);
        }
    }

    fn finish(self) -> Option<MergedCookie> {
        let value = match (self.parameter, self.last_static) {
            (Some(parameter), fallback) => CookieValueSource::Bound {
                parameter,
                fallback: fallback.map(str::to_string),
            },
            (None, Some(value)) => CookieValueSource::Static(value.to_string()),
            (None, None) => return None,
        };
        Some(MergedCookie {
            name: self.name.to_string(),
            value,
            attributes: self.attributes,
        })
    }
}
