//! Configuration Manager Objects.
//!
//! Describes the platform objects the PPTT generator consumes. Objects are
//! produced by a Configuration Manager and cross-reference each other through
//! [`CmObjectToken`]s.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use core::fmt;
use core::num::NonZeroUsize;

/// Opaque identifier of a Configuration Manager object.
///
/// A token is never null. Optional references are expressed as
/// `Option<CmObjectToken>`, where `None` plays the role of the null token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CmObjectToken(NonZeroUsize);

impl CmObjectToken {
    /// Creates a token, returning `None` for the null value.
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the raw token value.
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for CmObjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// Class of a Configuration Manager object, used to report failed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmObjectId {
    CmInfo,
    ProcHierarchyInfo,
    CacheInfo,
    CmRef,
    GicCInfo,
}

bitflags::bitflags! {
    /// Processor hierarchy node flags.
    ///
    /// Bit positions match the PPTT processor structure flags field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcNodeFlags: u32 {
        const PHYSICAL_PACKAGE = 1 << 0;
        const ACPI_PROCESSOR_ID_VALID = 1 << 1;
        const PROCESSOR_IS_THREAD = 1 << 2;
        const NODE_IS_LEAF = 1 << 3;
        const IDENTICAL_IMPLEMENTATION = 1 << 4;
    }
}

/// Configuration Manager standard information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmInfo {
    /// Configuration Manager revision, used as the default OEM revision.
    pub revision: u32,
    /// Platform vendor.
    pub oem_id: [u8; 6],
}

/// A processor hierarchy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcHierarchyInfo {
    pub token: CmObjectToken,
    pub flags: ProcNodeFlags,
    /// Parent processor hierarchy node, if any.
    pub parent_token: Option<CmObjectToken>,
    /// GIC CPU interface supplying the ACPI processor UID.
    /// Only consulted when `ACPI_PROCESSOR_ID_VALID` is set.
    pub acpi_id_object_token: Option<CmObjectToken>,
    pub no_of_private_resources: u32,
    /// Cross-reference list naming the private resources.
    pub private_resources_array_token: Option<CmObjectToken>,
}

impl ProcHierarchyInfo {
    /// Creates a node with no parent, no GIC reference and no private resources.
    pub fn new(token: CmObjectToken, flags: ProcNodeFlags) -> Self {
        Self {
            token,
            flags,
            parent_token: None,
            acpi_id_object_token: None,
            no_of_private_resources: 0,
            private_resources_array_token: None,
        }
    }

    pub fn with_parent(mut self, parent: CmObjectToken) -> Self {
        self.parent_token = Some(parent);
        self
    }

    pub fn with_acpi_id_object(mut self, gic_c: CmObjectToken) -> Self {
        self.acpi_id_object_token = Some(gic_c);
        self
    }

    pub fn with_private_resources(mut self, count: u32, list: CmObjectToken) -> Self {
        self.no_of_private_resources = count;
        self.private_resources_array_token = Some(list);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.flags.contains(ProcNodeFlags::NODE_IS_LEAF)
    }
}

/// Cache attribute masks of [`CacheInfo::attributes`].
pub mod cache_attributes {
    pub const ALLOCATION_TYPE_MASK: u8 = 0x03;
    pub const CACHE_TYPE_MASK: u8 = 0x0C;
    pub const CACHE_TYPE_SHIFT: u8 = 2;
    pub const WRITE_POLICY_MASK: u8 = 0x10;
    pub const WRITE_POLICY_SHIFT: u8 = 4;

    pub const ALLOCATION_READ: u8 = 0x00;
    pub const ALLOCATION_WRITE: u8 = 0x01;
    pub const ALLOCATION_READ_WRITE: u8 = 0x02;

    pub const CACHE_TYPE_DATA: u8 = 0x00;
    pub const CACHE_TYPE_INSTRUCTION: u8 = 0x01;
    pub const CACHE_TYPE_UNIFIED: u8 = 0x02;

    pub const WRITE_POLICY_WRITE_BACK: u8 = 0x00;
    pub const WRITE_POLICY_WRITE_THROUGH: u8 = 0x01;

    /// Packs the three attribute sub-fields into the 5-bit source mask.
    pub const fn pack(allocation_type: u8, cache_type: u8, write_policy: u8) -> u8 {
        (allocation_type & 0x3)
            | ((cache_type & 0x3) << CACHE_TYPE_SHIFT)
            | ((write_policy & 0x1) << WRITE_POLICY_SHIFT)
    }
}

/// A cache node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub token: CmObjectToken,
    pub next_level_of_cache_token: Option<CmObjectToken>,
    /// Size of the cache in bytes.
    pub size: u32,
    pub number_of_sets: u32,
    pub associativity: u32,
    /// Allocation type (bits 0-1), cache type (bits 2-3) and write policy (bit 4).
    pub attributes: u8,
    pub line_size: u16,
    /// Unique, non-zero identifier. Only serialized on revision 3 tables.
    pub cache_id: u32,
}

/// One entry of a cross-reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmRef {
    pub reference_token: CmObjectToken,
}

/// A GIC CPU interface, as described in the MADT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GicCInfo {
    pub token: CmObjectToken,
    pub cpu_interface_number: u32,
    pub acpi_processor_uid: u32,
    pub mpidr: u64,
}
