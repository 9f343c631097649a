//! Fills a template's slots with call arguments.
//!
//! # Design
//! Instantiation is pure and total over well-shaped arguments: it reads the
//! template, never mutates it, and either returns a complete request or the
//! first slot that could not be bound. The encoding *rule* is picked here
//! from the slot's role; the alphabet comes from the `ComponentEncoder`.

use crate::descriptor::RepeatPolicy;
use crate::encoding::{is_token, ComponentEncoder, PercentEncoder, Position};
use crate::error::{BindingError, BindingReason};
use crate::http::RequestDescription;
use crate::template::{
    CookieValue, FieldNode, FragmentNode, HeaderNode, PathNode, PathPlan, QueryNode, RequestTemplate,
    Slot, SlotId,
};
use crate::value::ArgValue;

/// Instantiate with the default percent-encoding.
pub fn instantiate(
    template: &RequestTemplate,
    args: &[ArgValue],
) -> Result<RequestDescription, BindingError> {
    instantiate_with(template, args, &PercentEncoder)
}

pub fn instantiate_with(
    template: &RequestTemplate,
    args: &[ArgValue],
    encoder: &dyn ComponentEncoder,
) -> Result<RequestDescription, BindingError> {
    let binder = Binder {
        template,
        args,
        encoder,
    };

    let path = binder.path()?;

    let mut query = template.static_query().to_vec();
    for node in template.query() {
        binder.query(node, &mut query)?;
    }

    let mut headers = Vec::new();
    for node in template.headers() {
        binder.header(node, &mut headers)?;
    }

    let mut cookies = Vec::new();
    for node in template.cookies() {
        let value = match &node.value {
            CookieValue::Literal(value) => Some(value.clone()),
            CookieValue::Slot { slot, fallback } => {
                let slot = binder.slot(*slot);
                match binder.scalar(slot)? {
                    Some(raw) => Some(binder.encode(slot, Position::CookieValue, &raw)),
                    None => fallback.clone(),
                }
            }
        };
        if let Some(value) = value {
            cookies.push(format!("{}={}{}", node.name, value, node.attributes));
        }
    }

    let fragment = match template.fragment() {
        None => None,
        Some(FragmentNode::Literal { value, encoded }) => Some(if *encoded {
            value.clone()
        } else {
            encoder.encode(Position::Fragment, value)
        }),
        Some(FragmentNode::Slot(id)) => {
            let slot = binder.slot(*id);
            binder
                .scalar(slot)?
                .map(|raw| binder.encode(slot, Position::Fragment, &raw))
        }
    };

    let form = if template.is_form_encoded() {
        let mut fields = Vec::new();
        for node in template.fields() {
            binder.field(node, &mut fields)?;
        }
        Some(fields)
    } else {
        None
    };

    let mut tags = Vec::new();
    for node in template.tags() {
        let slot = binder.slot(node.slot);
        if let Some(value) = binder.scalar(slot)? {
            tags.push((node.name.clone(), value));
        }
    }

    let request = RequestDescription {
        verb: template.verb().clone(),
        path,
        query,
        fragment,
        headers,
        cookies,
        form,
        tags,
    };
    tracing::trace!(endpoint = template.endpoint(), target = %request.target(), "instantiated request");
    Ok(request)
}

struct Binder<'a> {
    template: &'a RequestTemplate,
    args: &'a [ArgValue],
    encoder: &'a dyn ComponentEncoder,
}

impl<'a> Binder<'a> {
    fn slot(&self, id: SlotId) -> &'a Slot {
        // every node id was assigned from this template's slot table
        &self.template.slots()[id]
    }

    fn fail(slot: &Slot, reason: BindingReason) -> BindingError {
        BindingError {
            slot: slot.label(),
            reason,
        }
    }

    fn arg(&self, slot: &Slot) -> Result<&'a ArgValue, BindingError> {
        self.args
            .get(slot.index)
            .ok_or_else(|| Self::fail(slot, BindingReason::Missing))
    }

    fn encode(&self, slot: &Slot, position: Position, raw: &str) -> String {
        if slot.encoded {
            raw.to_string()
        } else {
            self.encoder.encode(position, raw)
        }
    }

    /// A single scalar. `None` means the argument is null on an optional role.
    fn scalar(&self, slot: &Slot) -> Result<Option<String>, BindingError> {
        match self.arg(slot)? {
            ArgValue::Null if slot.role.is_optional() => Ok(None),
            ArgValue::Null => Err(Self::fail(slot, BindingReason::Null)),
            ArgValue::List(_) => Err(Self::fail(slot, BindingReason::UnexpectedList)),
            ArgValue::Map(_) => Err(Self::fail(slot, BindingReason::UnexpectedMap)),
            scalar => Ok(scalar.canonical()),
        }
    }

    /// Zero or more scalars; a list only under the repeat policy.
    fn values(&self, slot: &Slot) -> Result<Vec<String>, BindingError> {
        match self.arg(slot)? {
            ArgValue::List(items) if slot.repeat == RepeatPolicy::Repeat => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ArgValue::Null => {}
                        ArgValue::List(_) | ArgValue::Map(_) => {
                            return Err(Self::fail(slot, BindingReason::NestedCollection))
                        }
                        scalar => values.extend(scalar.canonical()),
                    }
                }
                Ok(values)
            }
            _ => Ok(self.scalar(slot)?.into_iter().collect()),
        }
    }

    /// Name/value entries of a map argument; null means no entries.
    fn entries(&self, slot: &Slot) -> Result<Vec<(String, String)>, BindingError> {
        match self.arg(slot)? {
            ArgValue::Null => Ok(Vec::new()),
            ArgValue::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (name, value) in entries {
                    match value {
                        ArgValue::Null => {}
                        ArgValue::List(_) | ArgValue::Map(_) => {
                            return Err(Self::fail(slot, BindingReason::NestedCollection))
                        }
                        scalar => out.extend(scalar.canonical().map(|v| (name.clone(), v))),
                    }
                }
                Ok(out)
            }
            _ => Err(Self::fail(slot, BindingReason::ExpectedMap)),
        }
    }

    fn path(&self) -> Result<String, BindingError> {
        match self.template.path() {
            PathPlan::Url(id) => {
                let slot = self.slot(*id);
                // Url is a required role, so `None` cannot come back here.
                Ok(self.scalar(slot)?.unwrap_or_default())
            }
            PathPlan::Segments(nodes) => {
                let mut path = String::new();
                for node in nodes {
                    match node {
                        PathNode::Literal(text) => path.push_str(text),
                        PathNode::Slot(id) => {
                            let slot = self.slot(*id);
                            let raw = self.scalar(slot)?.unwrap_or_default();
                            path.push_str(&self.encode(slot, Position::PathSegment, &raw));
                        }
                    }
                }
                Ok(path)
            }
        }
    }

    fn query(
        &self,
        node: &QueryNode,
        out: &mut Vec<(String, Option<String>)>,
    ) -> Result<(), BindingError> {
        match node {
            QueryNode::Pair { name, slot } => {
                let slot = self.slot(*slot);
                let name = self.encode(slot, Position::QueryComponent, name);
                for value in self.values(slot)? {
                    out.push((name.clone(), Some(self.encode(slot, Position::QueryComponent, &value))));
                }
            }
            QueryNode::Name { slot } => {
                let slot = self.slot(*slot);
                for value in self.values(slot)? {
                    out.push((self.encode(slot, Position::QueryComponent, &value), None));
                }
            }
            QueryNode::Map { slot } => {
                let slot = self.slot(*slot);
                for (name, value) in self.entries(slot)? {
                    out.push((
                        self.encode(slot, Position::QueryComponent, &name),
                        Some(self.encode(slot, Position::QueryComponent, &value)),
                    ));
                }
            }
        }
        Ok(())
    }

    fn header(&self, node: &HeaderNode, out: &mut Vec<(String, String)>) -> Result<(), BindingError> {
        match node {
            HeaderNode::Literal { name, value } => out.push((name.clone(), value.clone())),
            HeaderNode::Slot { name, slot } => {
                let slot = self.slot(*slot);
                for value in self.values(slot)? {
                    out.push((name.clone(), self.encode(slot, Position::HeaderValue, &value)));
                }
            }
            HeaderNode::Map { slot } => {
                let slot = self.slot(*slot);
                let entries = self.entries(slot)?;
                if entries.iter().any(|(name, _)| !is_token(name)) {
                    return Err(Self::fail(slot, BindingReason::InvalidHeaderName));
                }
                for (name, value) in entries {
                    out.push((name, self.encode(slot, Position::HeaderValue, &value)));
                }
            }
        }
        Ok(())
    }

    fn field(&self, node: &FieldNode, out: &mut Vec<(String, String)>) -> Result<(), BindingError> {
        match node {
            FieldNode::Pair { name, slot } => {
                let slot = self.slot(*slot);
                let name = self.encode(slot, Position::FormComponent, name);
                for value in self.values(slot)? {
                    out.push((name.clone(), self.encode(slot, Position::FormComponent, &value)));
                }
            }
            FieldNode::Map { slot } => {
                let slot = self.slot(*slot);
                for (name, value) in self.entries(slot)? {
                    out.push((
                        self.encode(slot, Position::FormComponent, &name),
                        self.encode(slot, Position::FormComponent, &value),
                    ));
                }
            }
        }
        Ok(())
    }
}
