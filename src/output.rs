//! Plain-text rendering of trees and cycle groups

use std::fmt::Write;
use std::path::Path;

use pylon_core::{CycleGroup, DependencyTree, FileId, TreeNode};

/// Render a tree with box-drawing connectors. Leaves that close a cycle are
/// marked `(cycle)`. Labels are relative to `root_path` when possible.
pub fn render_tree(tree: &DependencyTree, root_path: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tree.root.name.label(root_path));

    let mut ancestors = vec![&tree.root.name];
    render_children(&tree.root, root_path, "", &mut ancestors, &mut out);

    if !tree.cycles.is_empty() {
        let _ = writeln!(out, "\n{} cycle edge(s)", tree.cycles.len());
    }
    if tree.truncated {
        let _ = writeln!(out, "(output truncated by depth or node limit)");
    }
    out
}

fn render_children<'a>(
    node: &'a TreeNode,
    root_path: &Path,
    prefix: &str,
    ancestors: &mut Vec<&'a FileId>,
    out: &mut String,
) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { "└── " } else { "├── " };
        let marker = if child.is_leaf() && ancestors.contains(&&child.name) {
            " (cycle)"
        } else {
            ""
        };
        let _ = writeln!(out, "{prefix}{connector}{}{marker}", child.name.label(root_path));

        let next_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        ancestors.push(&child.name);
        render_children(child, root_path, &next_prefix, ancestors, out);
        ancestors.pop();
    }
}

pub fn render_cycle_groups(groups: &[CycleGroup], root_path: &Path) -> String {
    if groups.is_empty() {
        return "no import cycles\n".to_string();
    }
    let mut out = String::new();
    for (i, group) in groups.iter().enumerate() {
        let _ = writeln!(out, "cycle {} ({} files)", i + 1, group.len());
        for file in &group.files {
            let _ = writeln!(out, "  {}", file.label(root_path));
        }
    }
    out
}
