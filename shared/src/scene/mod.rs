/*!
Engine-agnostic scene graph for a loaded venue.

Nodes are stored in a flat arena indexed by [`NodeId`]; parent/child links are indices.
World matrices and bounds are composed on demand so callers always see the current
local transforms.
*/

mod anchor;
mod glb;

pub use anchor::{AnchorKey, AnchorRole, parse_anchor_name};
pub use glb::{SceneError, parse_glb, parse_gltf_json, parse_scene_bytes};

use crate::types::{Aabb, Mat4};
use std::collections::HashMap;

pub type NodeId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub local_matrix: Mat4,
    /// Mesh bounds in the node's local space. `None` for non-mesh nodes.
    pub local_bounds: Option<Aabb>,
    pub is_mesh: bool,
    pub casts_shadows: bool,
    pub receives_shadows: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local_matrix: Mat4::identity(),
            local_bounds: None,
            is_mesh: false,
            casts_shadows: false,
            receives_shadows: false,
        }
    }

    pub fn with_matrix(mut self, local_matrix: Mat4) -> Self {
        self.local_matrix = local_matrix;
        self
    }

    pub fn with_mesh(mut self, local_bounds: Option<Aabb>) -> Self {
        self.is_mesh = true;
        self.local_bounds = local_bounds;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    animations: Vec<String>,
    default_scene: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `node` under `parent` (or as a root). Unknown parents make it a root.
    pub fn add_node(&mut self, mut node: SceneNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let parent = parent.filter(|&p| p < id);
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);

        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn add_animation(&mut self, name: impl Into<String>) {
        self.animations.push(name.into());
    }

    /// Index of the document scene the graph was built from.
    #[inline]
    pub fn default_scene(&self) -> usize {
        self.default_scene
    }

    pub fn set_default_scene(&mut self, scene: usize) {
        self.default_scene = scene;
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[inline]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[inline]
    pub fn animations(&self) -> &[String] {
        &self.animations
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns false for unknown nodes.
    pub fn set_local_matrix(&mut self, id: NodeId, local_matrix: Mat4) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.local_matrix = local_matrix;
                true
            }
            None => false,
        }
    }

    /// Node ids in depth-first pre-order, roots in insertion order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    /// Local-to-world matrix: the product of every ancestor's local matrix.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(id)?;
        let mut world = node.local_matrix;
        while let Some(parent) = node.parent {
            node = &self.nodes[parent];
            world = node.local_matrix * world;
        }
        Some(world)
    }

    /// World-space box around the mesh bounds of `id` and all of its descendants.
    ///
    /// `None` if the subtree holds no mesh bounds.
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb> {
        let world = self.world_matrix(id)?;
        let mut out: Option<Aabb> = None;
        let mut stack = vec![(id, world)];

        while let Some((current, matrix)) = stack.pop() {
            let node = &self.nodes[current];
            if let Some(local) = node.local_bounds {
                let bounds = local.transformed(&matrix);
                out = Some(match out {
                    Some(acc) => acc.union(&bounds),
                    None => bounds,
                });
            }
            for &child in &node.children {
                stack.push((child, matrix * self.nodes[child].local_matrix));
            }
        }
        out
    }

    /// Mesh nodes cast shadows; ground and wall geometry receives them.
    pub fn classify_shadows(&mut self) {
        for node in &mut self.nodes {
            node.casts_shadows = node.is_mesh;
            node.receives_shadows = receives_shadows(&node.name);
        }
    }
}

/// Whether a node name marks shadow-receiving geometry.
pub fn receives_shadows(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("ground") || lower.contains("wall")
}

/// Name and anchor lookups built in one traversal at load time.
#[derive(Clone, Debug, Default)]
pub struct SceneIndex {
    by_name: HashMap<String, NodeId>,
    anchors: HashMap<AnchorKey, NodeId>,
}

impl SceneIndex {
    /// Indexes `graph` in depth-first order. The first node seen wins a duplicated name.
    pub fn build(graph: &SceneGraph) -> Self {
        let mut index = Self::default();
        for id in graph.depth_first() {
            let name = &graph.nodes[id].name;
            index.by_name.entry(name.clone()).or_insert(id);
            if let Some(key) = parse_anchor_name(name) {
                index.anchors.entry(key).or_insert(id);
            }
        }
        index
    }

    #[inline]
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn anchor(&self, key: AnchorKey) -> Option<NodeId> {
        self.anchors.get(&key).copied()
    }

    /// Sorted anchor keys present in the scene.
    pub fn anchor_keys(&self) -> Vec<AnchorKey> {
        let mut keys: Vec<_> = self.anchors.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Number of consecutive slots (from 0) authored for `role`.
    pub fn anchor_slots(&self, role: AnchorRole) -> usize {
        (0..)
            .take_while(|&slot| self.anchors.contains_key(&AnchorKey::new(role, slot)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point3, Vec3};

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(-0.5, 0.0, -0.5), Point3::new(0.5, 1.0, 0.5))
    }

    fn store_graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(
            SceneNode::new("Store").with_matrix(Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0))),
            None,
        );
        let table = graph.add_node(
            SceneNode::new("Table1")
                .with_matrix(Mat4::new_translation(&Vec3::new(0.0, 0.0, 2.0)))
                .with_mesh(Some(unit_box())),
            Some(root),
        );
        graph.add_node(
            SceneNode::new("Lamp")
                .with_matrix(Mat4::new_translation(&Vec3::new(0.0, 3.0, 0.0)))
                .with_mesh(Some(unit_box())),
            Some(table),
        );
        graph.add_node(SceneNode::new("Ground_Floor").with_mesh(Some(unit_box())), None);
        graph.add_node(SceneNode::new("sign_1"), Some(root));
        graph
    }

    #[test]
    fn world_matrix_composes_parents() {
        let graph = store_graph();
        let lamp = 2;
        let origin = graph
            .world_matrix(lamp)
            .unwrap()
            .transform_point(&Point3::origin());
        assert_eq!(origin, Point3::new(10.0, 3.0, 2.0));
        assert!(graph.world_matrix(99).is_none());
    }

    #[test]
    fn world_bounds_cover_descendants_and_track_changes() {
        let mut graph = store_graph();
        let bounds = graph.world_bounds(1).unwrap();
        assert_eq!(bounds.min, Point3::new(9.5, 0.0, 1.5));
        assert_eq!(bounds.max, Point3::new(10.5, 4.0, 2.5));

        // Moving the parent moves the anchor without rebuilding anything.
        graph.set_local_matrix(0, Mat4::new_translation(&Vec3::new(-4.0, 0.0, 0.0)));
        let moved = graph.world_bounds(1).unwrap();
        assert_eq!(moved.min, Point3::new(-4.5, 0.0, 1.5));

        // Empty node without mesh descendants has no bounds.
        assert!(graph.world_bounds(4).is_none());
    }

    #[test]
    fn shadow_classification() {
        let mut graph = store_graph();
        graph.classify_shadows();

        let table = graph.node(1).unwrap();
        assert!(table.casts_shadows && !table.receives_shadows);

        let ground = graph.node(3).unwrap();
        assert!(ground.casts_shadows && ground.receives_shadows);

        let store = graph.node(0).unwrap();
        assert!(!store.casts_shadows && !store.receives_shadows);

        assert!(receives_shadows("OuterWALL_north"));
    }

    #[test]
    fn index_finds_names_and_anchors() {
        let graph = store_graph();
        let index = SceneIndex::build(&graph);

        assert_eq!(index.node_by_name("Lamp"), Some(2));
        assert_eq!(index.anchor(AnchorKey::new(AnchorRole::Table, 0)), Some(1));
        assert_eq!(index.anchor(AnchorKey::new(AnchorRole::Sign, 0)), Some(4));
        assert_eq!(index.anchor(AnchorKey::new(AnchorRole::Shelf, 0)), None);
        assert_eq!(index.anchor_slots(AnchorRole::Table), 1);
        assert_eq!(index.anchor_slots(AnchorRole::Cashier), 0);
        assert_eq!(
            index.anchor_keys(),
            vec![
                AnchorKey::new(AnchorRole::Table, 0),
                AnchorKey::new(AnchorRole::Sign, 0)
            ]
        );
    }
}
