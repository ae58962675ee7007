//! Binary glTF container reader.
//!
//! Only the parts of the document the venue needs are read: the node hierarchy of the
//! default scene, node transforms, mesh bounds from accessor min/max, and animation
//! names. Buffer payloads are never decoded.

use super::{NodeId, SceneGraph, SceneNode};
use crate::types::{Aabb, Mat4, Point3, Quat, Vec3};
use nalgebra::Quaternion;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("not a binary glTF container (magic {0:#010x})")]
    BadMagic(u32),
    #[error("unsupported glTF container version {0}")]
    UnsupportedVersion(u32),
    #[error("container truncated: needs {needed} bytes, has {available}")]
    Truncated { needed: usize, available: usize },
    #[error("first chunk is not JSON (type {0:#010x})")]
    MissingJson(u32),
    #[error("invalid glTF JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene {0} does not exist")]
    MissingScene(usize),
    #[error("node {0} does not exist")]
    MissingNode(usize),
    #[error("node {node} references missing mesh {mesh}")]
    MissingMesh { node: usize, mesh: usize },
    #[error("mesh {mesh} references missing accessor {accessor}")]
    MissingAccessor { mesh: usize, accessor: usize },
    #[error("node {0} appears more than once in the hierarchy")]
    RepeatedNode(usize),
}

#[derive(Debug, Deserialize)]
struct Document {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<DocScene>,
    #[serde(default)]
    nodes: Vec<DocNode>,
    #[serde(default)]
    meshes: Vec<DocMesh>,
    #[serde(default)]
    accessors: Vec<DocAccessor>,
    #[serde(default)]
    animations: Vec<DocAnimation>,
}

#[derive(Debug, Deserialize)]
struct DocScene {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct DocNode {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f32; 16]>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct DocMesh {
    #[serde(default)]
    primitives: Vec<DocPrimitive>,
}

#[derive(Debug, Deserialize)]
struct DocPrimitive {
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct DocAccessor {
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct DocAnimation {
    name: Option<String>,
}

/// Parses either a `.glb` container or a plain `.gltf` JSON document.
pub fn parse_scene_bytes(bytes: &[u8]) -> Result<SceneGraph, SceneError> {
    if bytes.len() >= 4 && read_u32(bytes, 0) == GLB_MAGIC {
        parse_glb(bytes)
    } else {
        parse_gltf_json(bytes)
    }
}

pub fn parse_glb(bytes: &[u8]) -> Result<SceneGraph, SceneError> {
    ensure_len(bytes, HEADER_LEN)?;

    let magic = read_u32(bytes, 0);
    if magic != GLB_MAGIC {
        return Err(SceneError::BadMagic(magic));
    }
    let version = read_u32(bytes, 4);
    if version != GLB_VERSION {
        return Err(SceneError::UnsupportedVersion(version));
    }
    let declared = read_u32(bytes, 8) as usize;
    ensure_len(bytes, declared)?;
    let bytes = &bytes[..declared];

    ensure_len(bytes, HEADER_LEN + CHUNK_HEADER_LEN)?;
    let chunk_len = read_u32(bytes, HEADER_LEN) as usize;
    let chunk_type = read_u32(bytes, HEADER_LEN + 4);
    if chunk_type != CHUNK_JSON {
        return Err(SceneError::MissingJson(chunk_type));
    }

    let start = HEADER_LEN + CHUNK_HEADER_LEN;
    ensure_len(bytes, start + chunk_len)?;
    parse_gltf_json(&bytes[start..start + chunk_len])
}

pub fn parse_gltf_json(json: &[u8]) -> Result<SceneGraph, SceneError> {
    let doc: Document = serde_json::from_slice(json)?;
    build_graph(&doc)
}

fn build_graph(doc: &Document) -> Result<SceneGraph, SceneError> {
    let roots = scene_roots(doc)?;
    let mut graph = SceneGraph::new();
    graph.set_default_scene(doc.scene.unwrap_or(0));
    let mut seen = HashSet::new();
    let mut stack: Vec<(usize, Option<NodeId>)> =
        roots.into_iter().rev().map(|n| (n, None)).collect();

    while let Some((index, parent)) = stack.pop() {
        if !seen.insert(index) {
            return Err(SceneError::RepeatedNode(index));
        }
        let doc_node = doc.nodes.get(index).ok_or(SceneError::MissingNode(index))?;

        let name = doc_node
            .name
            .clone()
            .unwrap_or_else(|| format!("Node{index}"));
        let mut node = SceneNode::new(name).with_matrix(local_matrix(doc_node));
        if let Some(mesh) = doc_node.mesh {
            node = node.with_mesh(mesh_bounds(doc, index, mesh)?);
        }

        let id = graph.add_node(node, parent);
        stack.extend(doc_node.children.iter().rev().map(|&child| (child, Some(id))));
    }

    for (i, animation) in doc.animations.iter().enumerate() {
        graph.add_animation(
            animation
                .name
                .clone()
                .unwrap_or_else(|| format!("Animation{i}")),
        );
    }

    Ok(graph)
}

/// Root nodes of the default scene, or every parentless node when no scene is declared.
fn scene_roots(doc: &Document) -> Result<Vec<usize>, SceneError> {
    if doc.scenes.is_empty() {
        let children: HashSet<usize> = doc
            .nodes
            .iter()
            .flat_map(|n| n.children.iter().copied())
            .collect();
        return Ok((0..doc.nodes.len()).filter(|i| !children.contains(i)).collect());
    }

    let scene = doc.scene.unwrap_or(0);
    doc.scenes
        .get(scene)
        .map(|s| s.nodes.clone())
        .ok_or(SceneError::MissingScene(scene))
}

fn local_matrix(node: &DocNode) -> Mat4 {
    if let Some(m) = node.matrix {
        return Mat4::from_column_slice(&m);
    }

    let translation = node.translation.map(Vec3::from).unwrap_or_else(Vec3::zeros);
    let rotation = node
        .rotation
        .map(|[x, y, z, w]| Quat::from_quaternion(Quaternion::new(w, x, y, z)))
        .unwrap_or_else(Quat::identity);
    let scale = node.scale.map(Vec3::from).unwrap_or_else(|| Vec3::repeat(1.0));

    Mat4::new_translation(&translation)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(&scale)
}

/// Union of the POSITION accessor ranges over every primitive of `mesh`.
fn mesh_bounds(doc: &Document, node: usize, mesh: usize) -> Result<Option<Aabb>, SceneError> {
    let doc_mesh = doc
        .meshes
        .get(mesh)
        .ok_or(SceneError::MissingMesh { node, mesh })?;

    let mut out: Option<Aabb> = None;
    for primitive in &doc_mesh.primitives {
        let Some(&accessor) = primitive.attributes.get("POSITION") else {
            continue;
        };
        let acc = doc
            .accessors
            .get(accessor)
            .ok_or(SceneError::MissingAccessor { mesh, accessor })?;

        let (Some(min), Some(max)) = (point_of(acc.min.as_deref()), point_of(acc.max.as_deref()))
        else {
            continue;
        };
        let bounds = Aabb::new(min, max);
        out = Some(out.map_or(bounds, |prev| prev.union(&bounds)));
    }
    Ok(out)
}

fn point_of(values: Option<&[f32]>) -> Option<Point3> {
    match values? {
        [x, y, z, ..] => Some(Point3::new(*x, *y, *z)),
        _ => None,
    }
}

fn ensure_len(bytes: &[u8], needed: usize) -> Result<(), SceneError> {
    if bytes.len() < needed {
        return Err(SceneError::Truncated {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

/// Little-endian u32 at `offset`. Callers check the length first.
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wraps `json` in a minimal GLB container (JSON chunk only).
    fn glb_from_json(json: &str) -> Vec<u8> {
        let mut payload = json.as_bytes().to_vec();
        while payload.len() % 4 != 0 {
            payload.push(b' ');
        }
        let total = HEADER_LEN + CHUNK_HEADER_LEN + payload.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    const VENUE_JSON: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 3]}],
        "nodes": [
            {"name": "Store", "translation": [10.0, 0.0, 0.0], "children": [1, 2]},
            {"name": "Table1", "mesh": 0, "translation": [0.0, 0.0, 2.0]},
            {"name": "Sign1", "mesh": 1, "scale": [2.0, 1.0, 1.0]},
            {"name": "Ground", "mesh": 0, "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,-1,0,1]}
        ],
        "meshes": [
            {"primitives": [
                {"attributes": {"POSITION": 0}},
                {"attributes": {"POSITION": 1, "NORMAL": 2}}
            ]},
            {"primitives": [{"attributes": {"POSITION": 1}}]}
        ],
        "accessors": [
            {"min": [-1.0, 0.0, -0.5], "max": [1.0, 0.8, 0.5]},
            {"min": [-0.5, 0.0, -0.5], "max": [0.5, 1.2, 0.5]},
            {}
        ],
        "animations": [{"name": "Doors"}, {}]
    }"#;

    #[test]
    fn parses_hierarchy_transforms_and_bounds() {
        let graph = parse_glb(&glb_from_json(VENUE_JSON)).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.roots().len(), 2);
        let names: Vec<_> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Store", "Table1", "Sign1", "Ground"]);
        assert_eq!(graph.node(1).unwrap().parent, Some(0));
        assert_eq!(graph.node(0).unwrap().children, vec![1, 2]);

        let table = graph.world_bounds(1).unwrap();
        assert_eq!(table.min, Point3::new(9.0, 0.0, 1.5));
        assert_eq!(table.max, Point3::new(11.0, 1.2, 2.5));

        let sign = graph.world_bounds(2).unwrap();
        assert_eq!(sign.min.x, 9.0);
        assert_eq!(sign.max.x, 11.0);

        let ground = graph.world_bounds(3).unwrap();
        assert_eq!(ground.min.y, -1.0);

        assert!(!graph.node(0).unwrap().is_mesh);
        assert_eq!(graph.animations(), ["Doors", "Animation1"]);
    }

    #[test]
    fn plain_json_is_accepted() {
        let graph = parse_scene_bytes(VENUE_JSON.as_bytes()).unwrap();
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn graph_keeps_the_default_scene_index() {
        let json = r#"{
            "scene": 1,
            "scenes": [{"nodes": [0]}, {"nodes": [1]}],
            "nodes": [{"name": "Lobby"}, {"name": "Hall"}]
        }"#;
        let graph = parse_gltf_json(json.as_bytes()).unwrap();
        assert_eq!(graph.default_scene(), 1);
        assert_eq!(graph.node(graph.roots()[0]).unwrap().name, "Hall");

        let graph = parse_scene_bytes(VENUE_JSON.as_bytes()).unwrap();
        assert_eq!(graph.default_scene(), 0);
    }

    #[test]
    fn without_scenes_all_parentless_nodes_are_roots() {
        let json = r#"{"nodes": [{"name": "A", "children": [2]}, {"name": "B"}, {"name": "C"}]}"#;
        let graph = parse_gltf_json(json.as_bytes()).unwrap();
        let roots: Vec<_> = graph
            .roots()
            .iter()
            .map(|&r| graph.node(r).unwrap().name.clone())
            .collect();
        assert_eq!(roots, ["A", "B"]);
    }

    #[test]
    fn rejects_malformed_containers() {
        let good = glb_from_json(VENUE_JSON);

        let mut bad_magic = good.clone();
        bad_magic[0] = b'x';
        assert!(matches!(parse_glb(&bad_magic), Err(SceneError::BadMagic(_))));

        let mut bad_version = good.clone();
        bad_version[4] = 1;
        assert!(matches!(
            parse_glb(&bad_version),
            Err(SceneError::UnsupportedVersion(1))
        ));

        assert!(matches!(
            parse_glb(&good[..good.len() - 4]),
            Err(SceneError::Truncated { .. })
        ));
        assert!(matches!(parse_glb(&good[..6]), Err(SceneError::Truncated { .. })));

        let mut bin_first = good.clone();
        bin_first[16..20].copy_from_slice(&0x004E_4942u32.to_le_bytes());
        assert!(matches!(parse_glb(&bin_first), Err(SceneError::MissingJson(_))));

        assert!(matches!(
            parse_glb(&glb_from_json("{not json")),
            Err(SceneError::Json(_))
        ));
    }

    #[test]
    fn rejects_dangling_references_and_cycles() {
        let cases = [
            (r#"{"scenes": [{"nodes": [4]}], "nodes": []}"#, "node"),
            (r#"{"scene": 2, "scenes": [{"nodes": []}]}"#, "scene"),
            (r#"{"scenes": [{"nodes": [0]}], "nodes": [{"mesh": 3}]}"#, "mesh"),
            (
                r#"{"scenes": [{"nodes": [0]}], "nodes": [{"mesh": 0}],
                    "meshes": [{"primitives": [{"attributes": {"POSITION": 7}}]}]}"#,
                "accessor",
            ),
            (
                r#"{"scenes": [{"nodes": [0]}], "nodes": [{"children": [1]}, {"children": [0]}]}"#,
                "cycle",
            ),
        ];

        for (json, label) in cases {
            let err = parse_gltf_json(json.as_bytes()).unwrap_err();
            let ok = match label {
                "node" => matches!(err, SceneError::MissingNode(4)),
                "scene" => matches!(err, SceneError::MissingScene(2)),
                "mesh" => matches!(err, SceneError::MissingMesh { node: 0, mesh: 3 }),
                "accessor" => matches!(err, SceneError::MissingAccessor { mesh: 0, accessor: 7 }),
                _ => matches!(err, SceneError::RepeatedNode(0)),
            };
            assert!(ok, "{label}: {err}");
        }
    }
}
