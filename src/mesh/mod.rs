//! Plain element/node mesh model shared by the reader, the balancer and the
//! writer.

pub mod distributed;

pub use distributed::DistributedMesh;

use crate::mesh_error::MeshError;
use std::collections::BTreeMap;

/// Largest node count of any supported element (hexahedron).
pub const MAX_ELEMENT_NODES: usize = 8;
/// Element tags kept per element: physical group and elementary entity.
pub const MAX_ELEMENT_TAGS: usize = 2;

/// Supported first-order element shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Point,
    Line,
    Triangle,
    Quad,
    Tet,
    Hex,
    Prism,
    Pyramid,
}

impl ElementKind {
    /// Gmsh element type code.
    pub fn gmsh_type(self) -> u32 {
        match self {
            ElementKind::Line => 1,
            ElementKind::Triangle => 2,
            ElementKind::Quad => 3,
            ElementKind::Tet => 4,
            ElementKind::Hex => 5,
            ElementKind::Prism => 6,
            ElementKind::Pyramid => 7,
            ElementKind::Point => 15,
        }
    }

    pub fn from_gmsh_type(code: u32) -> Option<Self> {
        match code {
            1 => Some(ElementKind::Line),
            2 => Some(ElementKind::Triangle),
            3 => Some(ElementKind::Quad),
            4 => Some(ElementKind::Tet),
            5 => Some(ElementKind::Hex),
            6 => Some(ElementKind::Prism),
            7 => Some(ElementKind::Pyramid),
            15 => Some(ElementKind::Point),
            _ => None,
        }
    }

    pub fn node_count(self) -> usize {
        match self {
            ElementKind::Point => 1,
            ElementKind::Line => 2,
            ElementKind::Triangle => 3,
            ElementKind::Quad | ElementKind::Tet => 4,
            ElementKind::Pyramid => 5,
            ElementKind::Prism => 6,
            ElementKind::Hex => 8,
        }
    }
}

/// One mesh element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub id: u64,
    pub kind: ElementKind,
    /// At most [`MAX_ELEMENT_TAGS`] tags.
    pub tags: Vec<u64>,
    /// Exactly `kind.node_count()` node ids.
    pub nodes: Vec<u64>,
}

/// Node id → coordinates.
pub type NodeMap = BTreeMap<u64, [f64; 3]>;

/// A whole mesh as held by one process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerialMesh {
    pub nodes: NodeMap,
    pub elements: Vec<Element>,
}

impl SerialMesh {
    /// Check that every element references known nodes.
    pub fn validate(&self) -> Result<(), MeshError> {
        for elem in &self.elements {
            if let Some(&node) = elem.nodes.iter().find(|n| !self.nodes.contains_key(n)) {
                return Err(MeshError::MissingNode {
                    element: elem.id,
                    node,
                });
            }
        }
        Ok(())
    }
}

/// Arithmetic mean of an element's node coordinates.
pub fn centroid(elem: &Element, nodes: &NodeMap) -> Result<[f64; 3], MeshError> {
    let mut sum = [0.0; 3];
    for n in &elem.nodes {
        let xyz = nodes.get(n).ok_or(MeshError::MissingNode {
            element: elem.id,
            node: *n,
        })?;
        for (s, c) in sum.iter_mut().zip(xyz) {
            *s += c;
        }
    }
    let k = elem.nodes.len().max(1) as f64;
    Ok(sum.map(|s| s / k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmsh_codes_round_trip() {
        for kind in [
            ElementKind::Point,
            ElementKind::Line,
            ElementKind::Triangle,
            ElementKind::Quad,
            ElementKind::Tet,
            ElementKind::Hex,
            ElementKind::Prism,
            ElementKind::Pyramid,
        ] {
            assert_eq!(ElementKind::from_gmsh_type(kind.gmsh_type()), Some(kind));
            assert!(kind.node_count() <= MAX_ELEMENT_NODES);
        }
        assert_eq!(ElementKind::from_gmsh_type(9), None);
    }

    #[test]
    fn centroid_and_missing_node() {
        let mut nodes = NodeMap::new();
        nodes.insert(1, [0.0, 0.0, 0.0]);
        nodes.insert(2, [2.0, 0.0, 0.0]);
        let line = Element {
            id: 5,
            kind: ElementKind::Line,
            tags: vec![],
            nodes: vec![1, 2],
        };
        assert_eq!(centroid(&line, &nodes).unwrap(), [1.0, 0.0, 0.0]);

        let mesh = SerialMesh {
            nodes,
            elements: vec![Element {
                nodes: vec![1, 3],
                ..line
            }],
        };
        assert_eq!(
            mesh.validate(),
            Err(MeshError::MissingNode { element: 5, node: 3 })
        );
    }
}
