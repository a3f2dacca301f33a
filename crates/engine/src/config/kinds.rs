//! Enumerated configuration values
//!
//! Every enumerated setting is a closed enum resolved once by name.
//! Lookup is a case-insensitive exact match; unknown values produce
//! `Unsupported <kind>: <value> - supported values: [<V1>, <V2>, ...]`
//! listing the values in declaration order.

use spatia_core::{ContextKind, Result, SpatialError};
use std::fmt;

/// Closed set of named configuration values
pub trait SupportedValue: Sized + Copy + 'static {
    /// Kind name used in error messages
    const KIND: &'static str;

    /// All values in declaration order
    const ALL: &'static [Self];

    /// Configuration name of the value
    fn name(&self) -> &'static str;

    /// Resolve a value by name, ignoring case
    fn by_name(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|v| v.name()).collect();
                SpatialError::configuration(format!(
                    "Unsupported {}: {} - supported values: [{}]",
                    Self::KIND,
                    value,
                    supported.join(", ")
                ))
            })
    }
}

// ============================================================================
// StrategyKind
// ============================================================================

/// Indexing algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Covering cells of a prefix tree grid
    RecursivePrefixTree,
    /// Bounding box comparison
    BBox,
    /// Prefix tree candidates verified against the stored geometry
    Composite,
}

impl SupportedValue for StrategyKind {
    const KIND: &'static str = "Spatial strategy";
    const ALL: &'static [Self] = &[
        StrategyKind::RecursivePrefixTree,
        StrategyKind::BBox,
        StrategyKind::Composite,
    ];

    fn name(&self) -> &'static str {
        match self {
            StrategyKind::RecursivePrefixTree => "RecursivePrefixTree",
            StrategyKind::BBox => "BBox",
            StrategyKind::Composite => "Composite",
        }
    }
}

// ============================================================================
// PrefixTreeKind
// ============================================================================

/// Grid used by prefix tree strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixTreeKind {
    /// Base-32 geohash cells, 32 children per cell
    GeohashPrefixTree,
    /// Quadrant cells, 4 children per cell
    QuadPrefixTree,
}

impl PrefixTreeKind {
    /// Deepest level the grid supports
    pub fn max_supported_levels(&self) -> usize {
        match self {
            PrefixTreeKind::GeohashPrefixTree => 24,
            PrefixTreeKind::QuadPrefixTree => 50,
        }
    }
}

impl SupportedValue for PrefixTreeKind {
    const KIND: &'static str = "spatial prefix tree";
    const ALL: &'static [Self] = &[
        PrefixTreeKind::GeohashPrefixTree,
        PrefixTreeKind::QuadPrefixTree,
    ];

    fn name(&self) -> &'static str {
        match self {
            PrefixTreeKind::GeohashPrefixTree => "GeohashPrefixTree",
            PrefixTreeKind::QuadPrefixTree => "QuadPrefixTree",
        }
    }
}

// ============================================================================
// DirectoryKind
// ============================================================================

/// Storage medium of type indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    /// Files on disk, read through memory maps
    MMapDirectory,
    /// Transient in-memory files
    RAMDirectory,
}

impl SupportedValue for DirectoryKind {
    const KIND: &'static str = "directory";
    const ALL: &'static [Self] = &[DirectoryKind::MMapDirectory, DirectoryKind::RAMDirectory];

    fn name(&self) -> &'static str {
        match self {
            DirectoryKind::MMapDirectory => "MMapDirectory",
            DirectoryKind::RAMDirectory => "RAMDirectory",
        }
    }
}

// ============================================================================
// Context
// ============================================================================

impl SupportedValue for ContextKind {
    const KIND: &'static str = "spatial context";
    const ALL: &'static [Self] = &[ContextKind::Spatial4J, ContextKind::Jts];

    fn name(&self) -> &'static str {
        ContextKind::name(self)
    }
}

macro_rules! display_by_name {
    ($($kind:ty),*) => {
        $(
            impl fmt::Display for $kind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(SupportedValue::name(self))
                }
            }
        )*
    };
}

display_by_name!(StrategyKind, PrefixTreeKind, DirectoryKind);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(StrategyKind::by_name("bbox").unwrap(), StrategyKind::BBox);
        assert_eq!(
            StrategyKind::by_name("RECURSIVEPREFIXTREE").unwrap(),
            StrategyKind::RecursivePrefixTree
        );
        assert_eq!(
            PrefixTreeKind::by_name("quadprefixtree").unwrap(),
            PrefixTreeKind::QuadPrefixTree
        );
        assert_eq!(
            DirectoryKind::by_name("ramdirectory").unwrap(),
            DirectoryKind::RAMDirectory
        );
        assert_eq!(ContextKind::by_name("jts").unwrap(), ContextKind::Jts);
        assert_eq!(ContextKind::by_name("spatial4j").unwrap(), ContextKind::Spatial4J);
    }

    #[test]
    fn test_no_partial_or_padded_matches() {
        assert!(StrategyKind::by_name("BBo").is_err());
        assert!(StrategyKind::by_name(" BBox").is_err());
        assert!(DirectoryKind::by_name("").is_err());
    }

    #[test]
    fn test_unsupported_messages() {
        assert_eq!(
            StrategyKind::by_name("A").unwrap_err().to_string(),
            "Unsupported Spatial strategy: A - supported values: [RecursivePrefixTree, BBox, Composite]"
        );
        assert_eq!(
            PrefixTreeKind::by_name("A").unwrap_err().to_string(),
            "Unsupported spatial prefix tree: A - supported values: [GeohashPrefixTree, QuadPrefixTree]"
        );
        assert_eq!(
            ContextKind::by_name("A").unwrap_err().to_string(),
            "Unsupported spatial context: A - supported values: [Spatial4J, JTS]"
        );
        assert_eq!(
            DirectoryKind::by_name("A").unwrap_err().to_string(),
            "Unsupported directory: A - supported values: [MMapDirectory, RAMDirectory]"
        );
    }

    #[test]
    fn test_display_uses_configuration_name() {
        assert_eq!(StrategyKind::Composite.to_string(), "Composite");
        assert_eq!(DirectoryKind::MMapDirectory.to_string(), "MMapDirectory");
        assert_eq!(PrefixTreeKind::GeohashPrefixTree.max_supported_levels(), 24);
    }
}
