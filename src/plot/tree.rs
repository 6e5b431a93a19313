//! Tidy-tree layout for path-encoded hierarchies such as `"root/a/leaf"`.
//!
//! Positions are normalized: `depth` runs from 0 (root) to 1 (deepest level)
//! and `breadth` from 0 to 1 across the leaves.

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub path: String,
    pub name: String,
    pub depth: f64,
    pub breadth: f64,
    pub leaf: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeLayout {
    pub nodes: Vec<TreeNode>,
    /// (parent, child) node indices.
    pub links: Vec<(usize, usize)>,
}

/// Segments past this depth are dropped.
pub const MAX_DEPTH: usize = 64;

struct Building {
    parent: usize,
    name: String,
    level: usize,
    children: Vec<usize>,
}

/// Build and lay out a tree from delimited paths.
///
/// Intermediate nodes are created implicitly; duplicate paths collapse into
/// one node. When every path shares the same first segment that segment is
/// the root, otherwise an unnamed root joins the top-level nodes. Only the
/// first `MAX_DEPTH` segments of a path are kept.
pub fn layout<I, S>(paths: I, delimiter: char) -> TreeLayout
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut nodes = vec![Building {
        parent: 0,
        name: String::new(),
        level: 0,
        children: Vec::new(),
    }];

    for path in paths {
        let mut current = 0;
        let segments = path.as_ref().split(delimiter).filter(|s| !s.is_empty());
        for segment in segments.take(MAX_DEPTH) {
            let existing = nodes[current]
                .children
                .iter()
                .copied()
                .find(|&c| nodes[c].name == segment);
            current = match existing {
                Some(child) => child,
                None => {
                    let level = nodes[current].level + 1;
                    nodes.push(Building {
                        parent: current,
                        name: segment.to_string(),
                        level,
                        children: Vec::new(),
                    });
                    let idx = nodes.len() - 1;
                    nodes[current].children.push(idx);
                    idx
                }
            };
        }
    }

    if nodes.len() == 1 {
        return TreeLayout::default();
    }

    // A synthetic root with a single child is dropped in favor of that child.
    let root = if nodes[0].children.len() == 1 {
        nodes[0].children[0]
    } else {
        0
    };

    let order = preorder(&nodes, root);

    let base_level = nodes[root].level;
    let max_level = order
        .iter()
        .map(|&i| nodes[i].level - base_level)
        .max()
        .unwrap_or(0);
    let breadth = breadths(&nodes, &order);

    let mut index_of = vec![usize::MAX; nodes.len()];
    let mut paths = vec![String::new(); nodes.len()];
    let mut out = TreeLayout::default();
    for &i in &order {
        // Preorder visits a parent before its children.
        let parent = nodes[i].parent;
        paths[i] = if parent == 0 {
            nodes[i].name.clone()
        } else {
            format!("{}{}{}", paths[parent], delimiter, nodes[i].name)
        };
        index_of[i] = out.nodes.len();
        let rel = nodes[i].level - base_level;
        out.nodes.push(TreeNode {
            path: paths[i].clone(),
            name: nodes[i].name.clone(),
            depth: if max_level == 0 {
                0.0
            } else {
                rel as f64 / max_level as f64
            },
            breadth: breadth[i],
            leaf: nodes[i].children.is_empty(),
        });
    }
    for &i in &order {
        for &c in &nodes[i].children {
            out.links.push((index_of[i], index_of[c]));
        }
    }
    out
}

fn preorder(nodes: &[Building], root: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        order.push(idx);
        stack.extend(nodes[idx].children.iter().rev().copied());
    }
    order
}

// Leaves are spaced evenly in visit order; parents sit midway between their
// first and last child.
fn breadths(nodes: &[Building], order: &[usize]) -> Vec<f64> {
    let leaf_count = order.iter().filter(|&&i| nodes[i].children.is_empty()).count().max(1);
    let mut breadth = vec![0.0; nodes.len()];

    let mut next_leaf = 0usize;
    for &i in order {
        if nodes[i].children.is_empty() {
            breadth[i] = (next_leaf as f64 + 0.5) / leaf_count as f64;
            next_leaf += 1;
        }
    }
    // Reverse preorder settles every child before its parent.
    for &i in order.iter().rev() {
        let children = &nodes[i].children;
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            breadth[i] = (breadth[first] + breadth[last]) / 2.0;
        }
    }
    breadth
}
