//! PPTT Constants.
//!
//! Defines the table signature, supported revisions, structure layouts and
//! architectural limits used by the PPTT generator.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::acpi_table::AcpiTableHeader;

pub const PPTT: u32 = 0x54545050;

/// PPTT revision introduced with ACPI 6.3.
pub const ACPI_6_3_PPTT_REVISION: u8 = 2;
/// PPTT revision introduced with ACPI 6.4. Adds the cache ID field.
pub const ACPI_6_4_PPTT_REVISION: u8 = 3;

pub const PPTT_MIN_REVISION: u8 = ACPI_6_3_PPTT_REVISION;
pub const PPTT_MAX_REVISION: u8 = ACPI_6_4_PPTT_REVISION;

pub const ACPI_HEADER_LEN: usize = 36;
pub(crate) const ACPI_CHECKSUM_OFFSET: usize = memoffset::offset_of!(AcpiTableHeader, checksum);

pub const ACPI_RESERVED_BYTE: u8 = 0x00;

/// Structure type tags.
pub const PPTT_TYPE_PROCESSOR: u8 = 0;
pub const PPTT_TYPE_CACHE: u8 = 1;

/// Processor hierarchy node structure layout, without the private resources array.
pub(crate) mod processor {
    pub const TYPE: usize = 0;
    pub const LENGTH: usize = 1;
    pub const FLAGS: usize = 4;
    pub const PARENT: usize = 8;
    pub const ACPI_PROCESSOR_ID: usize = 12;
    pub const NUMBER_OF_PRIVATE_RESOURCES: usize = 16;
    pub const PRIVATE_RESOURCES: usize = 20;
}

/// Cache type structure layout.
pub(crate) mod cache {
    pub const TYPE: usize = 0;
    pub const LENGTH: usize = 1;
    pub const FLAGS: usize = 4;
    pub const NEXT_LEVEL_OF_CACHE: usize = 8;
    pub const SIZE: usize = 12;
    pub const NUMBER_OF_SETS: usize = 16;
    pub const ASSOCIATIVITY: usize = 20;
    pub const ATTRIBUTES: usize = 21;
    pub const LINE_SIZE: usize = 22;
    pub const CACHE_ID: usize = 24;
}

pub const PPTT_PROCESSOR_STRUCT_LEN: usize = processor::PRIVATE_RESOURCES;
pub const PPTT_PRIVATE_RESOURCE_LEN: usize = core::mem::size_of::<u32>();
pub const PPTT_CACHE_STRUCT_LEN_REV2: usize = cache::CACHE_ID;
pub const PPTT_CACHE_STRUCT_LEN_REV3: usize = cache::CACHE_ID + core::mem::size_of::<u32>();

/// Structure lengths are stored in a single byte.
pub const PPTT_MAX_STRUCT_LEN: usize = u8::MAX as usize;

/// Cache structure flags.
pub const PPTT_CACHE_SIZE_VALID: u32 = 1 << 0;
pub const PPTT_CACHE_NUMBER_OF_SETS_VALID: u32 = 1 << 1;
pub const PPTT_CACHE_ASSOCIATIVITY_VALID: u32 = 1 << 2;
pub const PPTT_CACHE_ALLOCATION_TYPE_VALID: u32 = 1 << 3;
pub const PPTT_CACHE_CACHE_TYPE_VALID: u32 = 1 << 4;
pub const PPTT_CACHE_WRITE_POLICY_VALID: u32 = 1 << 5;
pub const PPTT_CACHE_LINE_SIZE_VALID: u32 = 1 << 6;
pub const PPTT_CACHE_ID_VALID: u32 = 1 << 7;

// Arm cache geometry limits (CCSIDR_EL1).
pub const PPTT_ARM_CCIDX_CACHE_NUMBER_OF_SETS_MAX: u32 = 1 << 24;
pub const PPTT_ARM_CACHE_NUMBER_OF_SETS_MAX: u32 = 1 << 15;
pub const PPTT_ARM_CACHE_LINE_SIZE_MIN: u16 = 16;
pub const PPTT_ARM_CACHE_LINE_SIZE_MAX: u16 = 2048;
