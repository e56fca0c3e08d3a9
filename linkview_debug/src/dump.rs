// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented scene graph dumps.
//!
//! [`dump`] writes one line per node, children indented two spaces below
//! their parent. Switches show their selection and every child; inactive
//! children are prefixed with `-`. A node that is shared between parents
//! is printed under each of them. A node already on the current branch is
//! printed once more with a `(cycle)` marker and not descended into.

use std::io::{self, Write};

use linkview_core::scene::{NodeId, NodeKind, NodeStore};

/// Writes the tree below `root` to `writer`.
pub fn dump(graph: &NodeStore, root: NodeId, writer: &mut dyn Write) -> io::Result<()> {
    let mut branch = Vec::new();
    dump_node(graph, root, 0, true, &mut branch, writer)
}

/// Returns the tree below `root` as a string.
#[must_use]
pub fn dump_to_string(graph: &NodeStore, root: NodeId) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = dump(graph, root, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}

fn dump_node(
    graph: &NodeStore,
    id: NodeId,
    depth: usize,
    active: bool,
    branch: &mut Vec<NodeId>,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let indent = depth * 2;
    let marker = if active { "" } else { "-" };
    if !graph.is_alive(id) {
        return writeln!(writer, "{:indent$}{marker}<dead {id:?}>", "");
    }

    let kind = graph.kind(id);
    write!(writer, "{:indent$}{marker}{}", "", kind.label())?;
    if let Some(name) = graph.name(id) {
        write!(writer, " \"{name}\"")?;
    }
    let which = match kind {
        NodeKind::Switch { which } => {
            match which {
                Some(i) => write!(writer, " which={i}")?,
                None => write!(writer, " which=none")?,
            }
            Some(which)
        }
        _ => None,
    };
    if branch.contains(&id) {
        return writeln!(writer, " (cycle)");
    }
    writeln!(writer)?;

    branch.push(id);
    for (i, child) in graph.children(id).enumerate() {
        let shown = active && which.is_none_or(|w| w == Some(i));
        dump_node(graph, child, depth + 1, shown, branch, writer)?;
    }
    branch.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_marks_inactive_switch_children() {
        let mut graph = NodeStore::new();
        let root = graph.create_named(NodeKind::Separator, "root");
        let switch = graph.create_node(NodeKind::Switch { which: Some(1) });
        let a = graph.create_named(NodeKind::Group, "a");
        let b = graph.create_named(NodeKind::Group, "b");
        graph.add_child(root, switch);
        graph.add_child(switch, a);
        graph.add_child(switch, b);

        let text = dump_to_string(&graph, root);
        assert_eq!(
            text,
            "separator \"root\"\n  switch which=1\n    -group \"a\"\n    group \"b\"\n"
        );
    }

    #[test]
    fn shared_nodes_print_under_each_parent() {
        let mut graph = NodeStore::new();
        let root = graph.create_node(NodeKind::Group);
        let left = graph.create_node(NodeKind::Separator);
        let right = graph.create_node(NodeKind::Separator);
        let shared = graph.create_named(NodeKind::Group, "shared");
        graph.add_child(root, left);
        graph.add_child(root, right);
        graph.add_child(left, shared);
        graph.add_child(right, shared);

        let text = dump_to_string(&graph, root);
        assert_eq!(text.matches("\"shared\"").count(), 2);
    }
}
