//! Fixed, versioned, little-endian wire types for moving mesh pieces between
//! group members.
//!
//! A packet is a [`WireHdr`] followed by `n_elements` [`WireElement`]s and
//! `n_nodes` [`WireNode`]s. Received buffers carry no alignment guarantee, so
//! records are decoded with `pod_read_unaligned`.

use crate::mesh::{Element, ElementKind, MAX_ELEMENT_NODES, MAX_ELEMENT_TAGS};
use crate::mesh_error::MeshError;
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// What a packet is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum PacketKind {
    /// Owned elements gathered for the partitioner.
    Summary = 1,
    /// Elements shipped to their destination rank.
    Migration = 2,
}

impl PacketKind {
    fn from_wire(raw: u16) -> Result<Self, MeshError> {
        match raw {
            1 => Ok(PacketKind::Summary),
            2 => Ok(PacketKind::Migration),
            other => Err(MeshError::Wire(format!("unknown packet kind {other}"))),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub reserved_le: u32, // keep zero
    pub n_elements_le: u64,
    pub n_nodes_le: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireElement {
    pub id_le: u64,
    pub gmsh_type_le: u32,
    pub n_nodes_le: u32,
    pub n_tags_le: u32,
    pub reserved_le: u32,
    pub destination_le: u64,
    pub tags_le: [u64; MAX_ELEMENT_TAGS],
    pub nodes_le: [u64; MAX_ELEMENT_NODES],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireNode {
    pub id_le: u64,
    /// `f64::to_bits`, little-endian.
    pub xyz_le: [u64; 3],
}

impl WireElement {
    fn encode(elem: &Element, destination: usize) -> Self {
        let mut tags_le = [0u64; MAX_ELEMENT_TAGS];
        for (slot, t) in tags_le.iter_mut().zip(&elem.tags) {
            *slot = t.to_le();
        }
        let mut nodes_le = [0u64; MAX_ELEMENT_NODES];
        for (slot, n) in nodes_le.iter_mut().zip(&elem.nodes) {
            *slot = n.to_le();
        }
        Self {
            id_le: elem.id.to_le(),
            gmsh_type_le: elem.kind.gmsh_type().to_le(),
            n_nodes_le: (elem.nodes.len() as u32).to_le(),
            n_tags_le: (elem.tags.len() as u32).to_le(),
            reserved_le: 0,
            destination_le: (destination as u64).to_le(),
            tags_le,
            nodes_le,
        }
    }

    fn decode(&self) -> Result<(Element, usize), MeshError> {
        let id = u64::from_le(self.id_le);
        let kind = ElementKind::from_gmsh_type(u32::from_le(self.gmsh_type_le)).ok_or_else(|| {
            MeshError::Wire(format!("element {id} has an unknown type"))
        })?;
        let n_nodes = u32::from_le(self.n_nodes_le) as usize;
        let n_tags = u32::from_le(self.n_tags_le) as usize;
        if n_nodes != kind.node_count() || n_tags > MAX_ELEMENT_TAGS {
            return Err(MeshError::Wire(format!(
                "element {id}: bad counts (nodes {n_nodes}, tags {n_tags})"
            )));
        }
        let nodes = self.nodes_le[..n_nodes].iter().map(|&n| u64::from_le(n)).collect();
        let tags = self.tags_le[..n_tags].iter().map(|&t| u64::from_le(t)).collect();
        let destination = u64::from_le(self.destination_le) as usize;
        Ok((Element { id, kind, tags, nodes }, destination))
    }
}

/// A decoded packet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Packet {
    /// Elements with the destination rank recorded by the sender.
    pub elements: Vec<(Element, usize)>,
    /// Node coordinates referenced by `elements`.
    pub nodes: Vec<(u64, [f64; 3])>,
}

/// Serialize elements (with destinations) and nodes into one packet.
pub fn encode_packet<'a>(
    kind: PacketKind,
    elements: impl ExactSizeIterator<Item = (&'a Element, usize)>,
    nodes: impl ExactSizeIterator<Item = (u64, [f64; 3])>,
) -> Vec<u8> {
    let hdr = WireHdr {
        version_le: WIRE_VERSION.to_le(),
        kind_le: (kind as u16).to_le(),
        reserved_le: 0,
        n_elements_le: (elements.len() as u64).to_le(),
        n_nodes_le: (nodes.len() as u64).to_le(),
    };
    let mut out = Vec::with_capacity(
        size_of::<WireHdr>()
            + elements.len() * size_of::<WireElement>()
            + nodes.len() * size_of::<WireNode>(),
    );
    out.extend_from_slice(bytemuck::bytes_of(&hdr));
    for (elem, dest) in elements {
        out.extend_from_slice(bytemuck::bytes_of(&WireElement::encode(elem, dest)));
    }
    for (id, xyz) in nodes {
        let rec = WireNode {
            id_le: id.to_le(),
            xyz_le: xyz.map(|c| c.to_bits().to_le()),
        };
        out.extend_from_slice(bytemuck::bytes_of(&rec));
    }
    out
}

/// Byte length of `count` records of `T`, or an error when a corrupt count
/// would overflow.
fn block_len<T>(count: usize) -> Result<usize, MeshError> {
    count
        .checked_mul(size_of::<T>())
        .ok_or_else(|| MeshError::Wire("packet length overflow".into()))
}

fn records<T: Pod>(bytes: &[u8], count: usize, what: &str) -> Result<Vec<T>, MeshError> {
    let need = block_len::<T>(count)?;
    if bytes.len() < need {
        return Err(MeshError::Wire(format!(
            "truncated {what} block: expected {need} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes[..need]
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

fn wire_count(raw_le: u64) -> Result<usize, MeshError> {
    usize::try_from(u64::from_le(raw_le))
        .map_err(|_| MeshError::Wire("packet length overflow".into()))
}

/// Decode a packet, checking version, kind and length.
pub fn decode_packet(bytes: &[u8], expect: PacketKind) -> Result<Packet, MeshError> {
    if bytes.len() < size_of::<WireHdr>() {
        return Err(MeshError::Wire(format!(
            "packet shorter than header ({} bytes)",
            bytes.len()
        )));
    }
    let hdr: WireHdr = bytemuck::pod_read_unaligned(&bytes[..size_of::<WireHdr>()]);
    let version = u16::from_le(hdr.version_le);
    if version != WIRE_VERSION {
        return Err(MeshError::Wire(format!("unsupported wire version {version}")));
    }
    let kind = PacketKind::from_wire(u16::from_le(hdr.kind_le))?;
    if kind != expect {
        return Err(MeshError::Wire(format!("expected {expect:?} packet, got {kind:?}")));
    }
    let n_elements = wire_count(hdr.n_elements_le)?;
    let n_nodes = wire_count(hdr.n_nodes_le)?;

    let body = &bytes[size_of::<WireHdr>()..];
    let elem_bytes = block_len::<WireElement>(n_elements)?;
    let total = elem_bytes
        .checked_add(block_len::<WireNode>(n_nodes)?)
        .ok_or_else(|| MeshError::Wire("packet length overflow".into()))?;
    let wire_elems: Vec<WireElement> = records(body, n_elements, "element")?;
    let wire_nodes: Vec<WireNode> = records(&body[elem_bytes..], n_nodes, "node")?;
    if body.len() != total {
        return Err(MeshError::Wire("trailing bytes after packet".into()));
    }

    let elements = wire_elems
        .iter()
        .map(WireElement::decode)
        .collect::<Result<Vec<_>, _>>()?;
    let nodes = wire_nodes
        .iter()
        .map(|n| {
            (
                u64::from_le(n.id_le),
                n.xyz_le.map(|c| f64::from_bits(u64::from_le(c))),
            )
        })
        .collect();
    Ok(Packet { elements, nodes })
}
