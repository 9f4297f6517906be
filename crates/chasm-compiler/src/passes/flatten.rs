//! Group flattening.
//!
//! Splices every [`Node::Group`] into its parent, recursively, so method
//! bodies become a flat instruction sequence. Offsets were fixed by the main
//! pass and are left untouched.

use crate::ir::{ModuleIr, Node};

/// Flatten every method body in `module`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn flatten_groups(module: &mut ModuleIr<'_>) {
    for method in &mut module.methods {
        let body = std::mem::take(&mut method.body);
        method.body = flatten(body);
    }
}

/// Flatten one node list, preserving order.
pub fn flatten(nodes: Vec<Node<'_>>) -> Vec<Node<'_>> {
    let mut out = Vec::with_capacity(nodes.len());
    splice(nodes, &mut out);
    out
}

fn splice<'ast>(nodes: Vec<Node<'ast>>, out: &mut Vec<Node<'ast>>) {
    for node in nodes {
        match node {
            Node::Group(children) => splice(children, out),
            other => out.push(other),
        }
    }
}
