//! Graphviz DOT rendering of a tree's topology, for visual debugging.

use std::io::{self, Write};

use crate::node::Node;
use crate::sbt::Sbt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderMode {
    /// Label each node with its leaf name (internal nodes get `n<id>`).
    Names,
    /// Label each node with its representative filter's bit string.
    Bits,
}

pub fn render_graph(sbt: &Sbt, mode: RenderMode) -> String {
    let mut out = String::new();
    out.push_str("digraph sbt {\n");
    if let Some(root) = sbt.root() {
        render_node(root, mode, &mut out);
    }
    out.push_str("}\n");
    out
}

fn render_node(node: &Node, mode: RenderMode, out: &mut String) {
    let label = match mode {
        RenderMode::Names => node.name.clone().unwrap_or_else(|| format!("n{}", node.id)),
        RenderMode::Bits => node.filters.representative().to_bit_string(),
    };
    out.push_str(&format!("  n{} [label=\"{}\"];\n", node.id, escape(&label)));
    let (left, right) = node.iter_children();
    if let Some(left) = left {
        out.push_str(&format!("  n{} -> n{};\n", node.id, left.id));
        render_node(left, mode, out);
    }
    if let Some(right) = right {
        out.push_str(&format!("  n{} -> n{};\n", node.id, right.id));
        render_node(right, mode, out);
    }
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Writes each node's name and bit string indented by depth, for debugging
/// a tree's shape and filter contents directly rather than through
/// Graphviz. Not part of the library's stable query/persistence contract —
/// a quick-look dump, same role as the CLI's `--dump` flag.
pub fn dump<W: Write>(sbt: &Sbt, writer: &mut W) -> io::Result<()> {
    if let Some(root) = sbt.root() {
        dump_node(root, 0, writer)?;
    }
    Ok(())
}

fn dump_node<W: Write>(node: &Node, depth: usize, writer: &mut W) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    let name = node.name.as_deref().unwrap_or("-");
    writeln!(writer, "{indent}{name} {}", node.filters.representative().to_bit_string())?;
    let (left, right) = node.iter_children();
    if let Some(left) = left {
        dump_node(left, depth + 1, writer)?;
    }
    if let Some(right) = right {
        dump_node(right, depth + 1, writer)?;
    }
    Ok(())
}
