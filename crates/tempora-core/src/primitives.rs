//! # Innate Primitives
//!
//! Hardcoded constants for the Tempora CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Anything that needs to vary per call (time formatting, read caps) lives in
//! the option structs of the `formats` module instead.

/// The value ETL adapters use when a field is empty or unknown.
///
/// Under the MERGE policy a sentinel never overwrites a real value, and a
/// stored sentinel is replaced by the first real value that overlaps it.
pub const UNKNOWN_SENTINEL: &str = "na";

/// Separator used when two string values are concatenated by ADD, TOTAL or a
/// MERGE conflict.
pub const VALUE_SEPARATOR: &str = ", ";

/// Separator used to synthesize an edge id from its endpoints when a
/// document omits the `id` attribute.
pub const EDGE_ID_SEPARATOR: &str = "||";

/// Node size reported by the JSON projection when none was set.
pub const DEFAULT_NODE_SIZE: f64 = 10.0;

/// JSON key under which an edge weight is projected.
pub const JSON_WEIGHT_KEY: &str = "Weight";

// =============================================================================
// DOCUMENT FORMAT
// =============================================================================

/// GEXF namespace written on the root element.
pub const GEXF_NAMESPACE: &str = "http://www.gexf.net/1.3";

/// GEXF visualization namespace.
pub const GEXF_VIZ_NAMESPACE: &str = "http://www.gexf.net/1.3/viz";

/// XML Schema instance namespace, for `xsi:schemaLocation`.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// GEXF schema location.
pub const GEXF_SCHEMA_LOCATION: &str = "http://www.gexf.net/1.3 http://www.gexf.net/1.3/gexf.xsd";

/// GEXF version attribute.
pub const GEXF_VERSION: &str = "1.3";

/// Default value of `<creator>` in written documents.
pub const DEFAULT_CREATOR: &str = "tempora";

/// The reader logs a progress line every this many XML events.
pub const PROGRESS_EVENT_INTERVAL: u64 = 1_000_000;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the Tempora binary snapshot header.
///
/// - File Header = Magic Bytes ("TMPR") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"TMPR";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for node, edge and attribute ids accepted by the Ingestor.
pub const MAX_ID_LENGTH: usize = 1024;

/// Maximum length for attribute values accepted by the Ingestor (1 MB).
///
/// Free-text fields (posts, memo lines) can be long, but not unbounded.
pub const MAX_VALUE_LENGTH: usize = 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"TMPR");
    }

    #[test]
    fn sentinel_is_lowercase_na() {
        assert_eq!(UNKNOWN_SENTINEL, "na");
    }
}
