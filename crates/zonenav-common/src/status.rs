//! Engine status codes
//!
//! A status is a bit set: one high-level bit (failure, success, in progress)
//! plus any number of detail bits describing what went wrong or what was
//! cut short. The layout matches Detour's `dtStatus` so statuses coming from a
//! native engine can be carried unchanged.

use std::fmt;

/// Status returned by every engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineStatus(pub u32);

impl EngineStatus {
    /// Operation failed
    pub const FAILURE: u32 = 1u32 << 31;
    /// Operation succeeded
    pub const SUCCESS: u32 = 1u32 << 30;
    /// Operation still in progress
    pub const IN_PROGRESS: u32 = 1u32 << 29;

    /// Mask covering every detail bit
    pub const DETAIL_MASK: u32 = 0x0ff_ffff;
    /// Input data is not recognized
    pub const WRONG_MAGIC: u32 = 1 << 0;
    /// Input data is in wrong version
    pub const WRONG_VERSION: u32 = 1 << 1;
    /// Operation ran out of memory
    pub const OUT_OF_MEMORY: u32 = 1 << 2;
    /// An input parameter was invalid
    pub const INVALID_PARAM: u32 = 1 << 3;
    /// Result buffer for the query was too small to store all results
    pub const BUFFER_TOO_SMALL: u32 = 1 << 4;
    /// Query ran out of nodes during search
    pub const OUT_OF_NODES: u32 = 1 << 5;
    /// Query did not reach the end location, returning best guess
    pub const PARTIAL_RESULT: u32 = 1 << 6;
    /// A tile has already been assigned to the given x,y coordinate
    pub const ALREADY_OCCUPIED: u32 = 1 << 7;

    const DETAIL_NAMES: [(u32, &'static str); 8] = [
        (Self::WRONG_MAGIC, "wrong magic"),
        (Self::WRONG_VERSION, "wrong version"),
        (Self::OUT_OF_MEMORY, "out of memory"),
        (Self::INVALID_PARAM, "invalid param"),
        (Self::BUFFER_TOO_SMALL, "buffer too small"),
        (Self::OUT_OF_NODES, "out of nodes"),
        (Self::PARTIAL_RESULT, "partial result"),
        (Self::ALREADY_OCCUPIED, "already occupied"),
    ];

    /// Creates a status from raw bits
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Creates a success status
    pub const fn success() -> Self {
        Self(Self::SUCCESS)
    }

    /// Creates a failure status
    pub const fn failure() -> Self {
        Self(Self::FAILURE)
    }

    /// Creates a failure status with detail
    pub const fn failure_detail(detail: u32) -> Self {
        Self(Self::FAILURE | detail)
    }

    /// Creates a success status with detail
    pub const fn success_detail(detail: u32) -> Self {
        Self(Self::SUCCESS | detail)
    }

    /// Returns a copy of this status with extra detail bits set
    pub const fn with_detail(self, detail: u32) -> Self {
        Self(self.0 | (detail & Self::DETAIL_MASK))
    }

    /// Returns true if status is success
    pub fn is_success(&self) -> bool {
        (self.0 & Self::SUCCESS) != 0
    }

    /// Returns true if status is failure
    pub fn is_failure(&self) -> bool {
        (self.0 & Self::FAILURE) != 0
    }

    /// Returns true if status is in progress
    pub fn is_in_progress(&self) -> bool {
        (self.0 & Self::IN_PROGRESS) != 0
    }

    /// Returns true if specific detail is set
    pub fn has_detail(&self, detail: u32) -> bool {
        (self.0 & detail) != 0
    }

    /// Gets the detail bits
    pub fn detail(&self) -> u32 {
        self.0 & Self::DETAIL_MASK
    }

    /// Iterates over a readable name for every detail bit that is set
    pub fn detail_messages(&self) -> impl Iterator<Item = &'static str> + '_ {
        Self::DETAIL_NAMES
            .iter()
            .filter(move |(bit, _)| self.has_detail(*bit))
            .map(|(_, name)| *name)
    }

    /// Converts into a `Result`, keeping the status on both sides
    pub fn into_result(self) -> Result<EngineStatus, EngineStatus> {
        if self.is_failure() {
            Err(self)
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "Success")?;
        } else if self.is_failure() {
            write!(f, "Failure")?;
        } else if self.is_in_progress() {
            write!(f, "In Progress")?;
        } else {
            write!(f, "Unknown")?;
        }

        let details: Vec<&str> = self.detail_messages().collect();
        if !details.is_empty() {
            write!(f, " ({})", details.join(", "))?;
        }

        Ok(())
    }
}

impl std::error::Error for EngineStatus {}
