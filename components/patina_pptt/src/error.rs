//! Error codes for the PPTT generator.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
use core::fmt;

use r_efi::efi;

use crate::cm_object::{CmObjectId, CmObjectToken};

/// Broad classification of a [`PpttError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    InvalidParameter,
    /// A referenced object or token does not exist.
    NotFound,
    /// A working allocation could not be made.
    OutOfResources,
}

/// The error type for PPTT generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpttError {
    /// The requested table revision is outside the supported range.
    InvalidTableRevision { revision: u8 },
    /// The table info does not describe a PPTT.
    InvalidTableSignature { signature: u32 },
    /// A processor node does not fit the one-byte structure length field.
    NodeTooLarge { token: CmObjectToken, private_resources: u32 },
    /// The table does not fit the 32-bit length field of the ACPI header.
    TableTooLarge,
    /// A structure write fell outside the table buffer.
    BufferOverflow { index: usize, len: usize },
    /// A parent or private-resource token does not resolve to an indexed node.
    TokenNotFound { token: CmObjectToken },
    /// The Configuration Manager has no object for the query.
    CmObjectNotFound { id: CmObjectId, token: Option<CmObjectToken> },
    /// A processor node names a leaf node as its parent.
    LeafParent { token: CmObjectToken, parent: CmObjectToken },
    /// A node claims a valid ACPI processor ID but carries no GIC CPU interface reference.
    MissingGicCReference { token: CmObjectToken },
    /// A GIC CPU interface reference matched zero or several objects.
    GicCReferenceMismatch { token: CmObjectToken, count: usize },
    /// Two processor nodes reference the same GIC CPU interface.
    DuplicateGicCReference { first_index: usize, second_index: usize },
    /// Some platform GIC CPU interfaces are not referenced by any processor node.
    UnreferencedGicC { platform: usize, referenced: usize },
    /// The private resource list does not hold the declared number of entries.
    PrivateResourceCountMismatch { token: CmObjectToken, declared: u32, found: usize },
    /// The number of sets exceeds the architectural maximum.
    NumberOfSetsTooLarge { token: CmObjectToken, number_of_sets: u32 },
    /// The associativity does not fit the one-byte structure field.
    AssociativityTooLarge { token: CmObjectToken, associativity: u32 },
    /// The line size is not a power of two within the supported range.
    InvalidLineSize { token: CmObjectToken, line_size: u16 },
    /// A cache ID is zero.
    InvalidCacheId { token: CmObjectToken },
    /// Two cache nodes share the same cache ID.
    DuplicateCacheId { token: CmObjectToken, cache_id: u32 },
    /// Following parent / next-level links from this node loops back.
    CycleDetected { token: CmObjectToken },
    /// A working allocation could not be made.
    AllocationFailed,
}

impl PpttError {
    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PpttError::TokenNotFound { .. } | PpttError::CmObjectNotFound { .. } => ErrorKind::NotFound,
            PpttError::AllocationFailed => ErrorKind::OutOfResources,
            _ => ErrorKind::InvalidParameter,
        }
    }
}

impl fmt::Display for PpttError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PpttError::InvalidTableRevision { revision } => write!(fmt, "Unsupported PPTT revision {revision}"),
            PpttError::InvalidTableSignature { signature } => {
                write!(fmt, "Table signature {signature:#010X} is not PPTT")
            }
            PpttError::NodeTooLarge { token, private_resources } => {
                write!(fmt, "Processor node {token} has too many private resources ({private_resources})")
            }
            PpttError::TableTooLarge => write!(fmt, "Table length exceeds 32 bits"),
            PpttError::BufferOverflow { index, len } => {
                write!(fmt, "Write at {index:#X} is outside the {len:#X} byte table")
            }
            PpttError::TokenNotFound { token } => write!(fmt, "Token {token} does not reference any PPTT node"),
            PpttError::CmObjectNotFound { id, token } => match token {
                Some(token) => write!(fmt, "{id:?} object {token} not found"),
                None => write!(fmt, "No {id:?} objects found"),
            },
            PpttError::LeafParent { token, parent } => {
                write!(fmt, "Processor node {token} has leaf node {parent} as its parent")
            }
            PpttError::MissingGicCReference { token } => {
                write!(fmt, "Processor node {token} has a valid ACPI processor ID but no GIC CPU interface")
            }
            PpttError::GicCReferenceMismatch { token, count } => {
                write!(fmt, "GIC CPU interface reference from node {token} matched {count} objects")
            }
            PpttError::DuplicateGicCReference { first_index, second_index } => {
                write!(
                    fmt,
                    "Processor nodes {first_index} and {second_index} reference the same GIC CPU interface"
                )
            }
            PpttError::UnreferencedGicC { platform, referenced } => {
                write!(fmt, "Only {referenced} of {platform} GIC CPU interfaces are referenced")
            }
            PpttError::PrivateResourceCountMismatch { token, declared, found } => {
                write!(fmt, "Processor node {token} declares {declared} private resources, found {found}")
            }
            PpttError::NumberOfSetsTooLarge { token, number_of_sets } => {
                write!(fmt, "Cache {token} has too many sets ({number_of_sets})")
            }
            PpttError::AssociativityTooLarge { token, associativity } => {
                write!(fmt, "Cache {token} associativity {associativity} does not fit in one byte")
            }
            PpttError::InvalidLineSize { token, line_size } => {
                write!(fmt, "Cache {token} line size {line_size} is invalid")
            }
            PpttError::InvalidCacheId { token } => write!(fmt, "Cache {token} has a zero cache ID"),
            PpttError::DuplicateCacheId { token, cache_id } => {
                write!(fmt, "Cache {token} reuses cache ID {cache_id:#X}")
            }
            PpttError::CycleDetected { token } => write!(fmt, "Cycle in topology starting at node {token}"),
            PpttError::AllocationFailed => write!(fmt, "Allocation failed"),
        }
    }
}

impl From<PpttError> for efi::Status {
    fn from(err: PpttError) -> Self {
        match err {
            PpttError::BufferOverflow { .. } => efi::Status::BAD_BUFFER_SIZE,
            PpttError::AllocationFailed => efi::Status::OUT_OF_RESOURCES,
            PpttError::TokenNotFound { .. } | PpttError::CmObjectNotFound { .. } => efi::Status::NOT_FOUND,
            _ => efi::Status::INVALID_PARAMETER,
        }
    }
}

/// A specialized result type for PPTT generation.
pub type PpttResult<T> = Result<T, PpttError>;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    fn token(value: usize) -> CmObjectToken {
        CmObjectToken::new(value).unwrap()
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(PpttError::TokenNotFound { token: token(1) }.kind(), ErrorKind::NotFound);
        assert_eq!(
            PpttError::CmObjectNotFound { id: CmObjectId::CacheInfo, token: None }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(PpttError::AllocationFailed.kind(), ErrorKind::OutOfResources);
        assert_eq!(PpttError::CycleDetected { token: token(1) }.kind(), ErrorKind::InvalidParameter);
        assert_eq!(PpttError::TableTooLarge.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_error_into_status() {
        let status: efi::Status = PpttError::AllocationFailed.into();
        assert_eq!(status, efi::Status::OUT_OF_RESOURCES);
        let status: efi::Status = PpttError::TokenNotFound { token: token(3) }.into();
        assert_eq!(status, efi::Status::NOT_FOUND);
        let status: efi::Status = PpttError::DuplicateCacheId { token: token(3), cache_id: 1 }.into();
        assert_eq!(status, efi::Status::INVALID_PARAMETER);
        let status: efi::Status = PpttError::BufferOverflow { index: 40, len: 36 }.into();
        assert_eq!(status, efi::Status::BAD_BUFFER_SIZE);
    }

    #[test]
    fn test_error_display() {
        let msg = PpttError::DuplicateGicCReference { first_index: 0, second_index: 2 }.to_string();
        assert!(msg.contains('0') && msg.contains('2'));
        let msg = PpttError::CmObjectNotFound { id: CmObjectId::GicCInfo, token: Some(token(0x20)) }.to_string();
        assert_eq!(msg, "GicCInfo object 0x20 not found");
    }
}
