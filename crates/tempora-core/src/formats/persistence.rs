//! # Snapshot Format
//!
//! Binary save/load of a whole [`Graph`] between ETL runs, so a long
//! accumulation does not have to round-trip through XML.
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("TMPR")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, so a
//! truncated or foreign file fails fast with a `DeserializationError`.

use crate::graph::{Graph, SerializableGraph};
use crate::{TemporaError, primitives};

/// Maximum accepted snapshot size (1 GB).
///
/// Checked before deserialization so a corrupt length cannot drive a huge
/// allocation.
pub const MAX_SNAPSHOT_SIZE: usize = 1024 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TemporaError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TemporaError::DeserializationError(
                "Not a tempora snapshot (bad magic bytes)".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TemporaError::DeserializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [a, b, c, d] = self.magic;
        [a, b, c, d, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TemporaError> {
        let Some(&[a, b, c, d, version]) = bytes.first_chunk::<HEADER_LEN>() else {
            return Err(TemporaError::DeserializationError(format!(
                "Snapshot too short: {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        };
        Ok(Self {
            magic: [a, b, c, d],
            version,
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, TemporaError> {
    let payload = postcard::to_stdvec(&SerializableGraph::from(graph))
        .map_err(|e| TemporaError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a graph from bytes produced by [`graph_to_bytes`].
pub fn graph_from_bytes(bytes: &[u8]) -> Result<Graph, TemporaError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(TemporaError::DeserializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_LEN..).unwrap_or_default();
    let serializable: SerializableGraph = postcard::from_bytes(payload).map_err(|e| {
        TemporaError::DeserializationError(format!("Failed to decode graph data: {}", e))
    })?;

    Ok(Graph::from(serializable))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::entity::{Edge, GraphElement, Node};
    use crate::time::Interval;
    use crate::types::{TimeDomain, TimeFormat};

    fn sample() -> Graph {
        let mut graph = Graph::new();
        graph.set_time_format(TimeFormat::DateTime);
        let i = Interval::parse(TimeDomain::Calendar, Some("2020-01-01"), Some("2020-02-01"))
            .expect("interval");

        let mut node = Node::new("a", "Alice", i.clone());
        node.element_mut()
            .add_attribute(AttributeValue::new("party", "DEM", i.clone()), None);
        graph.upsert(node);
        graph.upsert(Edge::new("ab", "a", "b", i).with_weight(10.0));
        graph
    }

    #[test]
    fn header_roundtrip() {
        let header = SnapshotHeader::new();
        let restored = SnapshotHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let graph = sample();

        let bytes1 = graph_to_bytes(&graph).expect("first serialize");
        let restored = graph_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = graph_to_bytes(&restored).expect("second serialize");

        assert_eq!(bytes1, bytes2, "save -> load -> save must produce identical bytes");
        assert_eq!(
            restored
                .node("a")
                .and_then(|n| n.attributes().get("party"))
                .map(|v| v.value.as_str()),
            Some("DEM")
        );
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(graph_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_header_rejected() {
        assert!(matches!(
            graph_from_bytes(b"TMP"),
            Err(TemporaError::DeserializationError(_))
        ));
    }

    #[test]
    fn newer_version_rejected() {
        let mut bytes = graph_to_bytes(&sample()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(graph_from_bytes(&bytes).is_err());
    }
}
