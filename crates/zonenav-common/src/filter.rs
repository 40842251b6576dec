//! Polygon query filter

/// Decides which polygons a query may visit, based on polygon flags
///
/// A polygon passes when at least one of its flags is included and none is
/// excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter {
    /// Flags a polygon must share with the filter
    pub include_flags: u16,
    /// Flags that reject a polygon outright
    pub exclude_flags: u16,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl QueryFilter {
    /// Filter that includes every traversal flag and excludes none
    pub const fn all() -> Self {
        Self {
            include_flags: 0xffff,
            exclude_flags: 0,
        }
    }

    /// Returns true if a polygon with the given flags passes
    pub fn pass_flags(&self, flags: u16) -> bool {
        (flags & self.include_flags) != 0 && (flags & self.exclude_flags) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_filter() {
        let filter = QueryFilter::all();
        assert!(filter.pass_flags(0x0001));
        assert!(filter.pass_flags(0x8000));
        // Polygons without any flag are disabled
        assert!(!filter.pass_flags(0));
    }

    #[test]
    fn test_exclude_wins() {
        let filter = QueryFilter {
            include_flags: 0xffff,
            exclude_flags: 0x0004,
        };
        assert!(filter.pass_flags(0x0001));
        assert!(!filter.pass_flags(0x0005));
    }
}
