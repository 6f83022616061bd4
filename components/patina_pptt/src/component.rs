//! PPTT generator entry point.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::vec::Vec;

use crate::acpi_table::{acpi_table_update_checksum, add_acpi_header};
use crate::byte_writer::ByteWriter;
use crate::cm_object::CacheInfo;
use crate::config::{AcpiTableInfo, PpttGeneratorInit};
use crate::error::{PpttError, PpttResult};
use crate::pptt::PpttContext;
use crate::service::ConfigurationManager;
use crate::signature::{self, ACPI_CHECKSUM_OFFSET};

/// Builds the PPTT from Configuration Manager objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpttGenerator {
    init: PpttGeneratorInit,
}

impl PpttGenerator {
    /// Initializes a new `PpttGenerator`.
    pub fn new(init: PpttGeneratorInit) -> Self {
        Self { init }
    }

    /// Builds the PPTT described by `table_info` from the objects provided by `cm`.
    ///
    /// On success the returned buffer holds the complete, checksummed table: the ACPI header followed by all
    /// processor hierarchy nodes and then all cache type structures. On failure every working allocation is
    /// released and the first error encountered is returned.
    pub fn build_table<C>(&self, cm: &C, table_info: &AcpiTableInfo) -> PpttResult<Vec<u8>>
    where
        C: ConfigurationManager + ?Sized,
    {
        Self::validate_table_info(table_info)?;

        let proc_nodes = cm.proc_hierarchy_info(None).inspect_err(|err| {
            log::error!("PPTT: Failed to get processor hierarchy info. Status = {err}");
        })?;

        let cache_nodes: Vec<CacheInfo> = match cm.cache_info(None) {
            Ok(list) => list,
            Err(PpttError::CmObjectNotFound { .. }) => {
                log::debug!("PPTT: No cache info on this platform.");
                Vec::new()
            }
            Err(err) => {
                log::error!("PPTT: Failed to get cache info. Status = {err}");
                return Err(err);
            }
        };

        let mut ctx = PpttContext::new(table_info.table_revision, &proc_nodes, &cache_nodes)?;
        let table_length = ctx.table_length()?;

        let mut table: Vec<u8> = Vec::new();
        table.try_reserve_exact(table_length as usize).map_err(|_| {
            log::error!("PPTT: Failed to allocate {table_length} bytes for the table.");
            PpttError::AllocationFailed
        })?;
        table.resize(table_length as usize, 0);

        let header = add_acpi_header(cm, &self.init, table_info, table_length)?;
        table.write_bytes(0, &header.hdr_to_bytes())?;

        ctx.add_proc_hierarchy_nodes(cm, &mut table)?;
        ctx.add_cache_type_structures(&mut table)?;
        ctx.detect_cycles()?;

        acpi_table_update_checksum(&mut table, ACPI_CHECKSUM_OFFSET);

        log::debug!("PPTT: Built revision {} table, {table_length} bytes.", table_info.table_revision);
        Ok(table)
    }

    fn validate_table_info(table_info: &AcpiTableInfo) -> PpttResult<()> {
        if table_info.table_signature != signature::PPTT {
            log::error!("PPTT: Requested table signature {:#010x} is not PPTT.", table_info.table_signature);
            return Err(PpttError::InvalidTableSignature { signature: table_info.table_signature });
        }

        if !(signature::PPTT_MIN_REVISION..=signature::PPTT_MAX_REVISION).contains(&table_info.table_revision) {
            log::error!(
                "PPTT: Requested table revision {} is not supported. Supported revisions are {}..={}.",
                table_info.table_revision,
                signature::PPTT_MIN_REVISION,
                signature::PPTT_MAX_REVISION
            );
            return Err(PpttError::InvalidTableRevision { revision: table_info.table_revision });
        }

        Ok(())
    }
}
