//! PPTT Generator Configuration.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::signature;

/// Describes the table a caller asks the generator to build.
#[derive(Debug, Clone, Copy)]
pub struct AcpiTableInfo {
    /// Signature of the requested table. Must be `PPTT`.
    pub table_signature: u32,
    /// Revision of the requested table.
    pub table_revision: u8,
    /// Product variant for platform vendor. Zero selects a default derived from the creator ID and signature.
    pub oem_table_id: u64,
    /// Platform edition (OEM-defined). Zero selects the Configuration Manager revision.
    pub oem_revision: u32,
}

impl AcpiTableInfo {
    pub fn new(table_revision: u8, oem_table_id: u64, oem_revision: u32) -> Self {
        Self { table_signature: signature::PPTT, table_revision, oem_table_id, oem_revision }
    }
}

impl Default for AcpiTableInfo {
    fn default() -> Self {
        Self::new(signature::PPTT_MAX_REVISION, 0, 0)
    }
}

/// Initialization configuration for the PPTT generator.
#[derive(Debug, Clone, Copy)]
pub struct PpttGeneratorInit {
    /// ID of the tool used to generate the ACPI table.
    pub creator_id: u32,
    /// Version of the tool used to generate the ACPI table.
    pub creator_revision: u32,
}

impl PpttGeneratorInit {
    /// `PTNA`
    pub const DEFAULT_CREATOR_ID: u32 = 0x414E5450;

    pub fn new(creator_id: u32, creator_revision: u32) -> Self {
        Self { creator_id, creator_revision }
    }
}

impl Default for PpttGeneratorInit {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CREATOR_ID, 1)
    }
}
