//! Static bone hierarchy
//!
//! A [`Skeleton`] is an ordered list of nodes, each with an optional parent
//! index and a local bind transform. Global bind transforms are derived once
//! at construction. Skeletons are immutable afterwards and shared between all
//! characters (and all clips) that use them.

use glam::{Mat4, Vec3};
use log::warn;

/// A single bone of a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Bone name as authored (lookups ignore ASCII case)
    pub name: String,
    /// Parent bone index, `None` for roots
    pub parent: Option<usize>,
    /// Local bind-pose transform relative to the parent
    pub transform: Mat4,
}

impl Node {
    /// Create a node with the given local bind transform
    pub fn new(name: impl Into<String>, parent: Option<usize>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            transform,
        }
    }
}

/// Immutable bone hierarchy with precomputed bind-pose global transforms
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: String,
    nodes: Vec<Node>,
    bind_global: Vec<Mat4>,
    root_nodes: Vec<usize>,
    root_translation: Vec3,
    order: Vec<usize>,
}

impl Skeleton {
    /// Build a skeleton and compute its global bind transforms
    ///
    /// Parent indices that are out of range or point at the node itself are
    /// treated as roots.
    pub fn new(name: impl Into<String>, mut nodes: Vec<Node>) -> Self {
        let name = name.into();
        let count = nodes.len();

        for (i, node) in nodes.iter_mut().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= count || parent == i {
                    warn!(
                        "Skeleton '{}': node '{}' has invalid parent {}, treating as root",
                        name, node.name, parent
                    );
                    node.parent = None;
                }
            }
        }

        let order = Self::traversal_order(&mut nodes);
        let mut bind_global = vec![Mat4::IDENTITY; count];
        for &i in &order {
            bind_global[i] = match nodes[i].parent {
                Some(p) => bind_global[p] * nodes[i].transform,
                None => nodes[i].transform,
            };
        }

        let root_nodes: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
            .collect();

        let root_translation = root_nodes
            .first()
            .map(|&r| nodes[r].transform.w_axis.truncate())
            .unwrap_or(Vec3::ZERO);

        Self {
            name,
            nodes,
            bind_global,
            root_nodes,
            root_translation,
            order,
        }
    }

    /// Node indices ordered so that every parent precedes its children
    ///
    /// Storage order is used as-is when it already satisfies this; otherwise
    /// the order is built by visiting each node's parent chain recursively.
    /// A parent cycle is broken by treating the node that closes it as a root.
    fn traversal_order(nodes: &mut [Node]) -> Vec<usize> {
        let sorted = nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.parent.is_none_or(|p| p < i));
        if sorted {
            return (0..nodes.len()).collect();
        }

        fn visit(i: usize, nodes: &mut [Node], state: &mut [u8], order: &mut Vec<usize>) {
            // 0 = new, 1 = on stack, 2 = done
            if state[i] == 2 {
                return;
            }
            state[i] = 1;
            if let Some(p) = nodes[i].parent {
                if state[p] == 1 {
                    warn!("Bone '{}' closes a parent cycle, treating as root", nodes[i].name);
                    nodes[i].parent = None;
                } else {
                    visit(p, nodes, state, order);
                }
            }
            state[i] = 2;
            order.push(i);
        }

        let mut state = vec![0u8; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());
        for i in 0..nodes.len() {
            visit(i, nodes, &mut state, &mut order);
        }
        order
    }

    /// Skeleton (model script) name, also the namespace of its clips
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Global bind-pose transform for every node
    pub fn bind_global(&self) -> &[Mat4] {
        &self.bind_global
    }

    /// Indices of parentless nodes, in storage order
    pub fn root_nodes(&self) -> &[usize] {
        &self.root_nodes
    }

    /// Parent-before-child traversal order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Bind-pose translation of the first root node
    pub fn root_translation(&self) -> Vec3 {
        self.root_translation
    }

    /// Find a node by name (ASCII case-insensitive)
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, y, z))
    }

    #[test]
    fn test_sorted_hierarchy() {
        let skeleton = Skeleton::new(
            "HUMANS",
            vec![
                Node::new("BIP01", None, translate(0.0, 90.0, 0.0)),
                Node::new("BIP01 SPINE", Some(0), translate(0.0, 10.0, 0.0)),
                Node::new("BIP01 HEAD", Some(1), translate(0.0, 30.0, 0.0)),
            ],
        );

        assert_eq!(skeleton.node_count(), 3);
        assert_eq!(skeleton.root_nodes(), &[0]);
        let head = skeleton.bind_global()[2].transform_point3(Vec3::ZERO);
        assert!((head.y - 130.0).abs() < 0.001);
        assert!((skeleton.root_translation().y - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_unsorted_hierarchy_matches_sorted() {
        // Child stored before its parent
        let skeleton = Skeleton::new(
            "UNSORTED",
            vec![
                Node::new("HAND", Some(2), translate(5.0, 0.0, 0.0)),
                Node::new("ROOT", None, translate(1.0, 0.0, 0.0)),
                Node::new("ARM", Some(1), translate(0.0, 2.0, 0.0)),
            ],
        );

        let hand = skeleton.bind_global()[0].transform_point3(Vec3::ZERO);
        assert!((hand.x - 6.0).abs() < 0.001);
        assert!((hand.y - 2.0).abs() < 0.001);
        assert_eq!(skeleton.root_nodes(), &[1]);
    }

    #[test]
    fn test_parent_cycle_is_broken() {
        let skeleton = Skeleton::new(
            "CYCLE",
            vec![
                Node::new("A", Some(1), translate(1.0, 0.0, 0.0)),
                Node::new("B", Some(0), translate(0.0, 1.0, 0.0)),
            ],
        );
        assert_eq!(skeleton.root_nodes().len(), 1);
        assert_eq!(skeleton.order().len(), 2);
    }

    #[test]
    fn test_invalid_parent_becomes_root() {
        let skeleton = Skeleton::new(
            "BROKEN",
            vec![
                Node::new("A", Some(7), Mat4::IDENTITY),
                Node::new("B", Some(1), Mat4::IDENTITY),
            ],
        );
        assert_eq!(skeleton.root_nodes(), &[0, 1]);
    }

    #[test]
    fn test_find_node() {
        let skeleton = Skeleton::new(
            "HUMANS",
            vec![
                Node::new("BIP01", None, Mat4::IDENTITY),
                Node::new("BIP01 R HAND", Some(0), Mat4::IDENTITY),
            ],
        );
        assert_eq!(skeleton.find_node("bip01 r hand"), Some(1));
        assert_eq!(skeleton.find_node("BIP01 L HAND"), None);
    }
}
