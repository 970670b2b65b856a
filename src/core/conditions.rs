//! SC-005: Named condition evaluation.
//!
//! Conditions are evaluated lazily, at most once each, and cached. A name that
//! is re-entered while it is still being evaluated is a cycle: it evaluates to
//! `false` and is reported once. `Fn::Equals` operands go back through the
//! intrinsic resolver, so the two are mutually recursive. A named condition
//! always starts from depth zero: its value must not depend on where in the
//! document it is first referenced.

use super::intrinsics::IntrinsicResolver;
use super::node::{Mapping, Node};
use super::walker::Context;
use rustc_hash::{FxHashMap, FxHashSet};

/// Raw `Conditions` section plus evaluation bookkeeping.
#[derive(Debug, Default)]
pub struct ConditionState {
    raw: Mapping,
    cache: FxHashMap<String, bool>,
    in_progress: FxHashSet<String>,
}

impl ConditionState {
    pub fn new(raw: Mapping) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }

}

/// String truthiness: case-insensitive `true`, or exactly `1`.
fn truthy(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s == "1"
}

impl IntrinsicResolver {
    /// Evaluate the named condition.
    pub fn condition_result(&mut self, name: &str) -> bool {
        if let Some(result) = self.conditions.cache.get(name) {
            return *result;
        }
        let Some(expression) = self.conditions.raw.get(name).cloned() else {
            self.warnings.pushf(format_args!("Condition {:?} not found", name));
            return false;
        };
        if self.conditions.in_progress.contains(name) {
            self.warnings
                .pushf(format_args!("Circular dependency detected in condition {:?}", name));
            return false;
        }

        self.conditions.in_progress.insert(name.to_string());
        let result = self.evaluate_condition(&Context::new(), &expression);
        self.conditions.in_progress.remove(name);
        self.conditions.cache.insert(name.to_string(), result);
        tracing::trace!(condition = name, result, "condition evaluated");
        result
    }

    /// Evaluate an anonymous condition expression.
    pub fn evaluate_condition(&mut self, ctx: &Context, node: &Node) -> bool {
        if ctx.exhausted() {
            self.warnings.pushf(format_args!(
                "maximum resolve depth {} exceeded while evaluating a condition",
                ctx.max_depth
            ));
            return false;
        }
        let next = ctx.descend();

        match node {
            Node::Bool(b) => return *b,
            Node::String(s) => return truthy(s),
            _ => {}
        }

        match node.as_call() {
            Some(("Fn::Equals", operand)) => match operand.as_seq() {
                Some([left, right]) => {
                    let left = self.resolve_value(&next, left).as_string();
                    let right = self.resolve_value(&next, right).as_string();
                    left == right
                }
                _ => {
                    self.warnings.push("Fn::Equals: arguments must be [value1, value2]");
                    false
                }
            },
            Some(("Fn::Not", operand)) => match operand.as_seq() {
                Some([inner]) => !self.evaluate_condition(&next, inner),
                _ => {
                    self.warnings.push("Fn::Not: arguments must be [condition]");
                    false
                }
            },
            Some(("Fn::And", operand)) => match operand.as_seq() {
                Some(items) => {
                    for item in items {
                        if !self.evaluate_condition(&next, item) {
                            return false;
                        }
                    }
                    true
                }
                None => {
                    self.warnings.push("Fn::And: arguments must be a list of conditions");
                    false
                }
            },
            Some(("Fn::Or", operand)) => match operand.as_seq() {
                Some(items) => {
                    for item in items {
                        if self.evaluate_condition(&next, item) {
                            return true;
                        }
                    }
                    false
                }
                None => {
                    self.warnings.push("Fn::Or: arguments must be a list of conditions");
                    false
                }
            },
            Some(("Condition", operand)) => {
                let name = operand.as_string();
                self.condition_result(&name)
            }
            _ => match self.resolve_value(&next, node) {
                Node::Bool(b) => b,
                Node::String(s) => truthy(&s),
                other => {
                    self.warnings.pushf(format_args!(
                        "unsupported condition expression: {}",
                        other.as_string()
                    ));
                    false
                }
            },
        }
    }
}
