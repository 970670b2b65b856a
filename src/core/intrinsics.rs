//! SC-004: CloudFormation intrinsic function resolution.
//!
//! Implements [`Resolver`] for `Ref`, `Fn::Sub`, `Fn::Join`, `Fn::GetAtt`,
//! `Fn::Split`, `Fn::Select`, `Fn::ImportValue` and `Fn::If`. Values that can
//! only be known in a real account (attributes, imports, pseudo-parameters)
//! get deterministic local placeholders.
//!
//! A malformed call is left as-is and recorded as a warning; it never aborts
//! the document.

use super::conditions::ConditionState;
use super::node::{Mapping, Node};
use super::walker::{resolve_all, Context, Resolver};
use super::warnings::Warnings;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// Flat parameter name -> value map.
pub type Parameters = BTreeMap<String, String>;

const PSEUDO_PREFIX: &str = "AWS::";

/// `${Name}` tokens. Dotted `${Res.Attr}` forms are not matched.
static SUB_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_:]+)\}").expect("valid pattern"));

/// Resolves intrinsic calls against a parameter set and named conditions.
#[derive(Debug, Default)]
pub struct IntrinsicResolver {
    pub(crate) parameters: Parameters,
    pub(crate) conditions: ConditionState,
    pub(crate) warnings: Warnings,
}

impl IntrinsicResolver {
    pub fn new(parameters: Parameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    /// Attach the raw `Conditions` section.
    pub fn with_conditions(mut self, raw: Mapping) -> Self {
        self.conditions = ConditionState::new(raw);
        self
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Warnings {
        std::mem::take(&mut self.warnings)
    }

    /// Resolve a whole tree from depth zero.
    pub fn resolve(&mut self, node: &Node) -> Node {
        resolve_all(&Context::new(), node, self)
    }

    /// Resolve an operand nested inside the call being handled at `ctx`.
    pub(crate) fn resolve_value(&mut self, ctx: &Context, node: &Node) -> Node {
        resolve_all(&ctx.descend(), node, self)
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message);
    }

    fn resolve_ref(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        let target = self.resolve_value(ctx, operand);
        let Some(name) = target.as_str() else {
            self.warn(format!("Ref: expected a name, got {}", describe(&target)));
            return None;
        };
        Some(Node::String(
            lookup(&self.parameters, name).unwrap_or_else(|| name.to_string()),
        ))
    }

    fn resolve_if(&mut self, operand: &Node) -> Option<Node> {
        match operand.as_seq() {
            Some([condition, when_true, when_false]) => {
                let name = condition.as_string();
                if self.condition_result(&name) {
                    Some(when_true.clone())
                } else {
                    Some(when_false.clone())
                }
            }
            _ => {
                self.warn("Fn::If: arguments must be [condition, true_val, false_val]");
                None
            }
        }
    }

    fn resolve_sub(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        match operand {
            Node::String(template) => Some(Node::String(substitute(&self.parameters, template))),
            Node::Sequence(args) => match args.as_slice() {
                [Node::String(template), Node::Mapping(vars)] => {
                    if template.is_empty() {
                        self.warn("Fn::Sub: template string is empty");
                        return None;
                    }
                    let mut scoped = self.parameters.clone();
                    for (name, value) in vars {
                        let value = self.resolve_value(ctx, value).as_string();
                        scoped.insert(name.clone(), value);
                    }
                    Some(Node::String(substitute(&scoped, template)))
                }
                [_, Node::Mapping(_)] => {
                    self.warn("Fn::Sub: template must be a string");
                    None
                }
                _ => {
                    self.warn("Fn::Sub: arguments must be [template, {variables}]");
                    None
                }
            },
            other => {
                self.warn(format!("Fn::Sub: unsupported operand {}", describe(other)));
                None
            }
        }
    }

    fn resolve_join(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        let Some([separator, elements]) = operand.as_seq() else {
            self.warn("Fn::Join: arguments must be [sep, [elements]]");
            return None;
        };
        let separator = self.resolve_value(ctx, separator).as_string();
        let elements = self.resolve_value(ctx, elements);
        let Some(elements) = elements.as_seq() else {
            self.warn("Fn::Join: arguments must be [sep, [elements]]");
            return None;
        };
        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            parts.push(self.resolve_value(ctx, element).as_string());
        }
        Some(Node::String(parts.join(&separator)))
    }

    fn resolve_get_att(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        let (resource, attribute) = match operand {
            Node::String(path) => match path.split('.').collect::<Vec<_>>().as_slice() {
                [resource, attribute] if !resource.is_empty() && !attribute.is_empty() => {
                    (resource.to_string(), attribute.to_string())
                }
                _ => {
                    self.warn(format!("Fn::GetAtt: malformed string {:?}", path));
                    return None;
                }
            },
            Node::Sequence(parts) => match parts.as_slice() {
                [resource, attribute] => (
                    self.resolve_value(ctx, resource).as_string(),
                    self.resolve_value(ctx, attribute).as_string(),
                ),
                _ => {
                    self.warn("Fn::GetAtt: array must have 2 elements");
                    return None;
                }
            },
            other => {
                self.warn(format!("Fn::GetAtt: unsupported operand {}", describe(other)));
                return None;
            }
        };
        Some(Node::String(get_att_placeholder(&resource, &attribute)))
    }

    fn resolve_split(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        let Some([delimiter, source]) = operand.as_seq() else {
            self.warn("Fn::Split: arguments must be [delimiter, source]");
            return None;
        };
        let delimiter = self.resolve_value(ctx, delimiter).as_string();
        if delimiter.is_empty() {
            self.warn("Fn::Split: delimiter must not be empty");
            return None;
        }
        let source = self.resolve_value(ctx, source).as_string();
        Some(Node::Sequence(
            source.split(delimiter.as_str()).map(Node::from).collect(),
        ))
    }

    fn resolve_select(&mut self, ctx: &Context, operand: &Node) -> Option<Node> {
        let Some([index, list]) = operand.as_seq() else {
            self.warn("Fn::Select: arguments must be [index, [elements]]");
            return None;
        };
        let index = self.resolve_value(ctx, index);
        let list = self.resolve_value(ctx, list);
        let Some(list) = list.as_seq() else {
            self.warn(format!("Fn::Select: expected a list, got {}", describe(&list)));
            return None;
        };
        let picked = index
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| list.get(i).cloned());
        if picked.is_none() {
            self.warn(format!(
                "Fn::Select: index {} out of range for {} element(s)",
                index.as_string(),
                list.len()
            ));
        }
        picked
    }

    fn resolve_import(&mut self, ctx: &Context, operand: &Node) -> Node {
        let name = self.resolve_value(ctx, operand).as_string();
        Node::String(format!("imported-{}", name))
    }
}

impl Resolver for IntrinsicResolver {
    fn try_resolve(&mut self, ctx: &Context, node: &Node) -> Option<Node> {
        if let Node::String(s) = node {
            let replaced = substitute(&self.parameters, s);
            return (replaced != *s).then_some(Node::String(replaced));
        }

        let (name, operand) = node.as_call()?;
        tracing::trace!(call = name, depth = ctx.depth, "intrinsic");
        match name {
            "Ref" => self.resolve_ref(ctx, operand),
            "Fn::If" => self.resolve_if(operand),
            "Fn::Sub" => self.resolve_sub(ctx, operand),
            "Fn::Join" => self.resolve_join(ctx, operand),
            "Fn::GetAtt" => self.resolve_get_att(ctx, operand),
            "Fn::Split" => self.resolve_split(ctx, operand),
            "Fn::Select" => self.resolve_select(ctx, operand),
            "Fn::ImportValue" => Some(self.resolve_import(ctx, operand)),
            _ => None,
        }
    }

    fn depth_exceeded(&mut self, ctx: &Context, _node: &Node) {
        self.warn(format!(
            "maximum resolve depth {} exceeded; leaving value unresolved",
            ctx.max_depth
        ));
    }
}

/// Value for a `Ref` target or `${Name}` token: parameter, then pseudo-parameter.
fn lookup(parameters: &Parameters, name: &str) -> Option<String> {
    if let Some(value) = parameters.get(name) {
        return Some(value.clone());
    }
    name.strip_prefix(PSEUDO_PREFIX)
        .map(|rest| format!("local-{}", rest))
}

/// Replace every `${Name}` with its parameter or pseudo-parameter value.
/// Unknown names are left literal.
pub fn substitute(parameters: &Parameters, template: &str) -> String {
    if !template.contains("${") {
        return template.to_string();
    }
    SUB_PATTERN
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(parameters, &caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Deterministic stand-in for a resource attribute.
pub fn get_att_placeholder(resource: &str, attribute: &str) -> String {
    format!("arn:aws:local:{attribute}:global:{resource}/{attribute}")
}

fn describe(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "boolean",
        Node::Number(_) => "number",
        Node::String(_) => "string",
        Node::Sequence(_) => "sequence",
        Node::Mapping(_) => "mapping",
    }
}
