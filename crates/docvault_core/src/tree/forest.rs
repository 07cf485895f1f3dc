//! Forest builder over a flat item snapshot.
//!
//! # Invariants
//! - Every child's `parent_id` equals its node's `id`.
//! - Siblings at every level are ordered by a collation key that ignores case
//!   and diacritics, then the lowercased name, then the raw name, then the id,
//!   so repeated calls give identical output.
//! - Every input item appears exactly once. Orphans (parent missing from the
//!   snapshot) and self-parented items become roots. Members of a corrupt
//!   cycle that no root reaches are surfaced too: the lowest-sorting member
//!   becomes a root and the cycle is cut where it would revisit a node.
//! - Construction is iterative, so deep chains cannot overflow the stack.

use crate::model::{Item, ItemId};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One item with its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<TreeNode>,
}

type ChildIndex<'a> = HashMap<ItemId, Vec<&'a Item>>;

/// Builds the ordered forest for `items`.
pub fn build_forest(items: &[Item]) -> Vec<TreeNode> {
    let known: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
    let mut children_of: ChildIndex<'_> = HashMap::new();
    let mut roots: Vec<&Item> = Vec::new();

    for item in items {
        match item.parent_id {
            Some(parent_id) if parent_id != item.id && known.contains(&parent_id) => {
                children_of.entry(parent_id).or_default().push(item);
            }
            _ => roots.push(item),
        }
    }

    for siblings in children_of.values_mut() {
        siblings.sort_by(|a, b| sibling_order(a, b));
    }
    roots.sort_by(|a, b| sibling_order(a, b));

    let mut visited = HashSet::with_capacity(items.len());
    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .filter_map(|root| build_subtree(root, &children_of, &mut visited))
        .collect();

    let mut stranded: Vec<&Item> = items
        .iter()
        .filter(|item| !visited.contains(&item.id))
        .collect();
    if !stranded.is_empty() {
        stranded.sort_by(|a, b| sibling_order(a, b));
        for item in stranded {
            if let Some(node) = build_subtree(item, &children_of, &mut visited) {
                forest.push(node);
            }
        }
        forest.sort_by(|a, b| sibling_order(&a.item, &b.item));
    }

    forest
}

/// Sibling ordering used at every level of the forest.
///
/// `éclair` sorts between `Apple` and `fig`. Names that only differ by accent
/// or case fall back to the lowercased name, then the raw name.
pub fn sibling_order(a: &Item, b: &Item) -> Ordering {
    collation_key(&a.name)
        .cmp(&collation_key(&b.name))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Compatibility-decomposed, mark-stripped, lowercased form of `name`.
fn collation_key(name: &str) -> String {
    name.nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

struct Frame<'a> {
    item: &'a Item,
    pending: std::slice::Iter<'a, &'a Item>,
    built: Vec<TreeNode>,
}

impl<'a> Frame<'a> {
    fn new(item: &'a Item, children_of: &'a ChildIndex<'a>) -> Self {
        let children: &'a [&'a Item] = match children_of.get(&item.id) {
            Some(kids) => kids.as_slice(),
            None => &[],
        };
        Self {
            item,
            pending: children.iter(),
            built: Vec::with_capacity(children.len()),
        }
    }
}

fn build_subtree<'a>(
    root: &'a Item,
    children_of: &'a ChildIndex<'a>,
    visited: &mut HashSet<ItemId>,
) -> Option<TreeNode> {
    if !visited.insert(root.id) {
        return None;
    }

    let mut stack = vec![Frame::new(root, children_of)];
    loop {
        let next_child = stack.last_mut()?.pending.next().copied();
        if let Some(child) = next_child {
            if visited.insert(child.id) {
                stack.push(Frame::new(child, children_of));
            }
            continue;
        }

        let finished = stack.pop()?;
        let node = TreeNode {
            item: finished.item.clone(),
            children: finished.built,
        };
        match stack.last_mut() {
            Some(parent) => parent.built.push(node),
            None => return Some(node),
        }
    }
}
