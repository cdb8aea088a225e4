//! Gmsh `.msh` reader and writer.
//!
//! # Supported format
//! - ASCII `.msh` version **2.2**.
//! - Element types: 1 (line), 2 (triangle), 3 (quad), 4 (tet), 5 (hex),
//!   6 (prism), 7 (pyramid), 15 (point).
//!
//! # Limitations
//! - Binary files are not supported.
//! - `.msh` v4.x (block-based) is not supported.
//! - Higher-order elements are not supported.
//! - Only the first two element tags (physical, elementary) are kept; gmsh
//!   partition tags are dropped since the balancer assigns its own.

use crate::mesh::{Element, ElementKind, MAX_ELEMENT_TAGS, NodeMap, SerialMesh};
use crate::mesh_error::MeshError;
use std::io::{Read, Write};

/// Gmsh `.msh` reader for ASCII v2.2 meshes.
#[derive(Debug, Default, Clone)]
pub struct GmshReader;

impl GmshReader {
    fn parse_version(line: &str) -> Result<&str, MeshError> {
        let mut parts = line.split_whitespace();
        let version = parts
            .next()
            .ok_or_else(|| MeshError::MeshIoParse("missing mesh format version".into()))?;
        let file_type = parts
            .next()
            .ok_or_else(|| MeshError::MeshIoParse("missing mesh format type".into()))?;
        if file_type != "0" {
            return Err(MeshError::MeshIoParse(
                "binary .msh files are not supported".into(),
            ));
        }
        Ok(version)
    }

    fn parse_id(raw: &str, what: &str) -> Result<u64, MeshError> {
        raw.parse::<u64>()
            .map_err(|_| MeshError::MeshIoParse(format!("invalid {what}: {raw}")))
    }

    fn parse_coord(raw: &str) -> Result<f64, MeshError> {
        raw.parse::<f64>()
            .map_err(|_| MeshError::MeshIoParse(format!("invalid coordinate: {raw}")))
    }

    fn parse_count(line: Option<&str>, what: &str) -> Result<usize, MeshError> {
        let line = line.ok_or_else(|| MeshError::MeshIoParse(format!("missing {what}")))?;
        line.trim()
            .parse::<usize>()
            .map_err(|_| MeshError::MeshIoParse(format!("invalid {what}: {line}")))
    }

    fn expect_end(line: Option<&str>, marker: &str) -> Result<(), MeshError> {
        match line {
            Some(l) if l.trim() == marker => Ok(()),
            _ => Err(MeshError::MeshIoParse(format!("missing {marker}"))),
        }
    }

    fn parse_node(line: &str) -> Result<(u64, [f64; 3]), MeshError> {
        let mut parts = line.split_whitespace();
        let mut next = |what: &str| {
            parts
                .next()
                .ok_or_else(|| MeshError::MeshIoParse(format!("missing {what}")))
        };
        let id = Self::parse_id(next("node id")?, "node id")?;
        let x = Self::parse_coord(next("x coordinate")?)?;
        let y = Self::parse_coord(next("y coordinate")?)?;
        let z = Self::parse_coord(next("z coordinate")?)?;
        Ok((id, [x, y, z]))
    }

    fn parse_element(line: &str) -> Result<Element, MeshError> {
        let mut parts = line.split_whitespace();
        let mut next = |what: &str| {
            parts
                .next()
                .ok_or_else(|| MeshError::MeshIoParse(format!("missing {what}")))
        };
        let id = Self::parse_id(next("element id")?, "element id")?;
        let code = next("element type")?
            .parse::<u32>()
            .map_err(|_| MeshError::MeshIoParse("invalid element type".into()))?;
        let kind = ElementKind::from_gmsh_type(code)
            .ok_or_else(|| MeshError::MeshIoParse(format!("unsupported element type: {code}")))?;
        let num_tags = next("element tag count")?
            .parse::<usize>()
            .map_err(|_| MeshError::MeshIoParse("invalid element tag count".into()))?;
        let mut tags = Vec::with_capacity(num_tags.min(MAX_ELEMENT_TAGS));
        for i in 0..num_tags {
            let tag = Self::parse_id(next("element tag")?, "element tag")?;
            if i < MAX_ELEMENT_TAGS {
                tags.push(tag);
            }
        }
        let mut nodes = Vec::with_capacity(kind.node_count());
        for _ in 0..kind.node_count() {
            nodes.push(Self::parse_id(next("element node id")?, "element node id")?);
        }
        Ok(Element {
            id,
            kind,
            tags,
            nodes,
        })
    }

    /// Parse a whole mesh from `reader`.
    pub fn read<R: Read>(&self, mut reader: R) -> Result<SerialMesh, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut lines = contents.lines();

        let mut version: Option<String> = None;
        let mut nodes = NodeMap::new();
        let mut elements = Vec::new();

        while let Some(line) = lines.next() {
            match line.trim() {
                "$MeshFormat" => {
                    let format_line = lines
                        .next()
                        .ok_or_else(|| MeshError::MeshIoParse("missing MeshFormat".into()))?;
                    version = Some(Self::parse_version(format_line)?.to_string());
                    Self::expect_end(lines.next(), "$EndMeshFormat")?;
                }
                "$Nodes" => {
                    let count = Self::parse_count(lines.next(), "node count")?;
                    for _ in 0..count {
                        let node_line = lines.next().ok_or_else(|| {
                            MeshError::MeshIoParse("unexpected end of node list".into())
                        })?;
                        let (id, xyz) = Self::parse_node(node_line)?;
                        if nodes.insert(id, xyz).is_some() {
                            return Err(MeshError::MeshIoParse(format!("duplicate node id {id}")));
                        }
                    }
                    Self::expect_end(lines.next(), "$EndNodes")?;
                }
                "$Elements" => {
                    let count = Self::parse_count(lines.next(), "element count")?;
                    for _ in 0..count {
                        let elem_line = lines.next().ok_or_else(|| {
                            MeshError::MeshIoParse("unexpected end of element list".into())
                        })?;
                        elements.push(Self::parse_element(elem_line)?);
                    }
                    Self::expect_end(lines.next(), "$EndElements")?;
                }
                _ => {
                    // ignore other sections
                }
            }
        }

        let version = version.unwrap_or_else(|| "2.2".to_string());
        if version != "2.2" {
            return Err(MeshError::MeshIoParse(format!(
                "unsupported gmsh version: {version}"
            )));
        }

        let mesh = SerialMesh { nodes, elements };
        mesh.validate()?;
        Ok(mesh)
    }
}

/// Gmsh `.msh` writer producing ASCII v2.2.
#[derive(Debug, Default, Clone)]
pub struct GmshWriter;

impl GmshWriter {
    /// Write `nodes` and `elements` (in the given order).
    pub fn write<W: Write>(
        &self,
        mut writer: W,
        nodes: &NodeMap,
        elements: &[Element],
    ) -> Result<(), MeshError> {
        writeln!(writer, "$MeshFormat")?;
        writeln!(writer, "2.2 0 8")?;
        writeln!(writer, "$EndMeshFormat")?;

        writeln!(writer, "$Nodes")?;
        writeln!(writer, "{}", nodes.len())?;
        for (id, [x, y, z]) in nodes {
            writeln!(writer, "{id} {x:?} {y:?} {z:?}")?;
        }
        writeln!(writer, "$EndNodes")?;

        writeln!(writer, "$Elements")?;
        writeln!(writer, "{}", elements.len())?;
        for elem in elements {
            write!(
                writer,
                "{} {} {}",
                elem.id,
                elem.kind.gmsh_type(),
                elem.tags.len()
            )?;
            for t in elem.tags.iter().chain(&elem.nodes) {
                write!(writer, " {t}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "$EndElements")?;
        writer.flush()?;
        Ok(())
    }
}
