//! SC-003: Depth-bounded tree walker.
//!
//! The walker knows nothing about CloudFormation. It asks a [`Resolver`] to
//! rewrite each node; rewritten nodes are walked again, untouched containers
//! have their children walked. Depth is an explicit counter, so a
//! self-referential template stops at the same place on every platform.

use super::node::{Mapping, Node};

/// Maximum nesting the walker will descend before giving up on a branch.
pub const MAX_RESOLVE_DEPTH: usize = 20;

/// Recursion bookkeeping threaded through every resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub depth: usize,
    pub max_depth: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            depth: 0,
            max_depth: MAX_RESOLVE_DEPTH,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    /// Context for one level deeper.
    pub fn descend(&self) -> Self {
        Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.depth >= self.max_depth
    }
}

/// A dialect of in-tree function calls.
pub trait Resolver {
    /// Rewrite `node` if it is a call this resolver understands.
    /// `None` means "not mine, or left as-is".
    fn try_resolve(&mut self, ctx: &Context, node: &Node) -> Option<Node>;

    /// Called when the walker stops descending because the depth limit was hit.
    fn depth_exceeded(&mut self, _ctx: &Context, _node: &Node) {}
}

/// Resolve every call in `node`, returning a new tree.
pub fn resolve_all<R: Resolver + ?Sized>(ctx: &Context, node: &Node, resolver: &mut R) -> Node {
    if ctx.exhausted() {
        resolver.depth_exceeded(ctx, node);
        return node.clone();
    }
    let next = ctx.descend();

    if let Some(rewritten) = resolver.try_resolve(ctx, node) {
        return resolve_all(&next, &rewritten, resolver);
    }

    match node {
        Node::Sequence(items) => Node::Sequence(
            items
                .iter()
                .map(|item| resolve_all(&next, item, resolver))
                .collect(),
        ),
        Node::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve_all(&next, value, resolver));
            }
            Node::Mapping(out)
        }
        other => other.clone(),
    }
}
