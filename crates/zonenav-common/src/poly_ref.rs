//! Opaque polygon and tile references

use std::fmt;

/// Reference to a polygon inside a loaded navigation mesh
///
/// The value is engine defined. Zero is reserved for "no polygon".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PolyRef(u32);

/// Reference to a tile inside a loaded navigation mesh
pub type TileRef = PolyRef;

impl PolyRef {
    /// The null reference
    pub const NULL: PolyRef = PolyRef(0);

    /// Creates a reference from its raw value
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value
    pub const fn id(&self) -> u32 {
        self.0
    }

    /// Returns true unless this is the null reference
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for PolyRef {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for PolyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
