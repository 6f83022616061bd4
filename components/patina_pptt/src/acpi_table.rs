//! ACPI Table Header.
//!
//! Defines the standard ACPI description header and the helpers used to stamp
//! it onto a generated table.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use core::mem;

use alloc::vec::Vec;

use crate::config::{AcpiTableInfo, PpttGeneratorInit};
use crate::error::PpttResult;
use crate::service::ConfigurationManager;

/// Represents a standard ACPI header.
/// Equivalent to EFI_ACPI_DESCRIPTION_HEADER.
#[repr(C)]
#[derive(Default, Clone, Debug, Copy, PartialEq, Eq)]
pub struct AcpiTableHeader {
    pub signature: u32,
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl AcpiTableHeader {
    /// Serialize `self` into a `Vec<u8>` in ACPI's canonical layout.
    pub fn hdr_to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(mem::size_of::<Self>());

        buf.extend_from_slice(&self.signature.to_le_bytes());
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf.push(self.revision);
        buf.push(self.checksum);
        buf.extend_from_slice(&self.oem_id);
        buf.extend_from_slice(&self.oem_table_id);
        buf.extend_from_slice(&self.oem_revision.to_le_bytes());
        buf.extend_from_slice(&self.creator_id.to_le_bytes());
        buf.extend_from_slice(&self.creator_revision.to_le_bytes());

        buf
    }
}

/// Builds the ACPI header for a generated table of `length` bytes.
///
/// The OEM ID comes from the Configuration Manager. The OEM table ID and OEM revision come from `table_info`
/// unless they are zero, in which case the OEM table ID is built from the creator ID and the table signature,
/// and the OEM revision falls back to the Configuration Manager revision.
/// The checksum is left at zero; see [`acpi_table_update_checksum`].
pub fn add_acpi_header<C>(
    cm: &C,
    init: &PpttGeneratorInit,
    table_info: &AcpiTableInfo,
    length: u32,
) -> PpttResult<AcpiTableHeader>
where
    C: ConfigurationManager + ?Sized,
{
    let cm_info = cm.cm_info().inspect_err(|err| log::error!("PPTT: Failed to get CM info: {err}"))?;

    let oem_table_id = if table_info.oem_table_id != 0 {
        table_info.oem_table_id
    } else {
        (init.creator_id as u64) | ((table_info.table_signature as u64) << 32)
    };
    let oem_revision = if table_info.oem_revision != 0 { table_info.oem_revision } else { cm_info.revision };

    Ok(AcpiTableHeader {
        signature: table_info.table_signature,
        length,
        revision: table_info.table_revision,
        checksum: 0,
        oem_id: cm_info.oem_id,
        oem_table_id: oem_table_id.to_le_bytes(),
        oem_revision,
        creator_id: init.creator_id,
        creator_revision: init.creator_revision,
    })
}

/// Recalculates the checksum for an ACPI table so that all bytes sum to zero.
pub fn acpi_table_update_checksum(table: &mut [u8], offset: usize) {
    if offset >= table.len() {
        return;
    }
    table[offset] = 0;
    let total_without_checksum = table.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
    table[offset] = total_without_checksum.wrapping_neg();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cm_object::CmInfo;
    use crate::error::PpttError;
    use crate::service::MockConfigurationManager;
    use crate::signature::{self, ACPI_CHECKSUM_OFFSET, ACPI_HEADER_LEN};

    fn mock_cm(revision: u32) -> MockConfigurationManager {
        let mut cm = MockConfigurationManager::new();
        cm.expect_cm_info().returning(move || Ok(CmInfo { revision, oem_id: *b"PATINA" }));
        cm
    }

    #[test]
    fn test_header_layout() {
        let header = AcpiTableHeader {
            signature: signature::PPTT,
            length: 0x40,
            revision: 3,
            checksum: 0xAA,
            oem_id: *b"OEMID0",
            oem_table_id: *b"TABLEID0",
            oem_revision: 0x11223344,
            creator_id: 0x55667788,
            creator_revision: 0x99AABBCC,
        };
        let bytes = header.hdr_to_bytes();
        assert_eq!(bytes.len(), ACPI_HEADER_LEN);
        assert_eq!(&bytes[0..4], b"PPTT");
        assert_eq!(&bytes[4..8], &0x40u32.to_le_bytes());
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[ACPI_CHECKSUM_OFFSET], 0xAA);
        assert_eq!(&bytes[10..16], b"OEMID0");
        assert_eq!(&bytes[16..24], b"TABLEID0");
        assert_eq!(&bytes[24..28], &0x11223344u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &0x55667788u32.to_le_bytes());
        assert_eq!(&bytes[32..36], &0x99AABBCCu32.to_le_bytes());
    }

    #[test]
    fn test_add_acpi_header_defaults() {
        let cm = mock_cm(7);
        let init = PpttGeneratorInit::default();
        let header = add_acpi_header(&cm, &init, &AcpiTableInfo::default(), 100).unwrap();
        assert_eq!(header.signature, signature::PPTT);
        assert_eq!(header.length, 100);
        assert_eq!(header.revision, signature::PPTT_MAX_REVISION);
        assert_eq!(header.oem_id, *b"PATINA");
        assert_eq!(&header.oem_table_id, b"PTNAPPTT");
        assert_eq!(header.oem_revision, 7);
        assert_eq!(header.creator_id, PpttGeneratorInit::DEFAULT_CREATOR_ID);
        assert_eq!(header.creator_revision, 1);
    }

    #[test]
    fn test_add_acpi_header_overrides() {
        let cm = mock_cm(7);
        let info = AcpiTableInfo::new(2, u64::from_le_bytes(*b"MYTABLE0"), 42);
        let header = add_acpi_header(&cm, &PpttGeneratorInit::new(0x1234, 5), &info, 36).unwrap();
        assert_eq!(&header.oem_table_id, b"MYTABLE0");
        assert_eq!(header.oem_revision, 42);
        assert_eq!(header.revision, 2);
        assert_eq!(header.creator_id, 0x1234);
        assert_eq!(header.creator_revision, 5);
    }

    #[test]
    fn test_add_acpi_header_cm_failure() {
        let mut cm = MockConfigurationManager::new();
        cm.expect_cm_info()
            .returning(|| Err(PpttError::CmObjectNotFound { id: crate::cm_object::CmObjectId::CmInfo, token: None }));
        let result = add_acpi_header(&cm, &PpttGeneratorInit::default(), &AcpiTableInfo::default(), 36);
        assert!(matches!(result, Err(PpttError::CmObjectNotFound { .. })));
    }

    #[test]
    fn test_update_checksum() {
        let mut table = [0x10u8, 0x20, 0xFF, 0x33, 0x44];
        acpi_table_update_checksum(&mut table, 2);
        assert_eq!(table.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)), 0);
        assert_eq!(table[2], 0u8.wrapping_sub(0x10 + 0x20 + 0x33 + 0x44));
    }
}
