//! PPTT Structure Builders.
//!
//! Computes the table layout and serializes the processor hierarchy node and
//! cache type structures into the table buffer.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::vec::Vec;

use crate::byte_writer::ByteWriter;
use crate::cm_object::{
    cache_attributes, CacheInfo, CmObjectId, CmObjectToken, CmRef, ProcHierarchyInfo, ProcNodeFlags,
};
use crate::error::{PpttError, PpttResult};
use crate::node_indexer::{IndexedRange, NodeIndexer};
use crate::service::ConfigurationManager;
use crate::signature::{
    self, cache, processor, ACPI_HEADER_LEN, ACPI_RESERVED_BYTE, PPTT_CACHE_STRUCT_LEN_REV2,
    PPTT_CACHE_STRUCT_LEN_REV3, PPTT_MAX_STRUCT_LEN, PPTT_PRIVATE_RESOURCE_LEN, PPTT_PROCESSOR_STRUCT_LEN,
};

/// Returns the serialized size of a processor hierarchy node, including its private resources array.
pub(crate) fn proc_hierarchy_node_size(node: &ProcHierarchyInfo) -> PpttResult<u32> {
    let size = (node.no_of_private_resources as usize)
        .checked_mul(PPTT_PRIVATE_RESOURCE_LEN)
        .and_then(|resources| resources.checked_add(PPTT_PROCESSOR_STRUCT_LEN));

    match size {
        Some(size) if size <= PPTT_MAX_STRUCT_LEN => Ok(size as u32),
        _ => {
            log::error!(
                "PPTT: Processor hierarchy node {} has too many private resources ({}).",
                node.token,
                node.no_of_private_resources
            );
            Err(PpttError::NodeTooLarge { token: node.token, private_resources: node.no_of_private_resources })
        }
    }
}

/// Returns the serialized size of a cache type structure for the given table revision.
pub(crate) fn cache_struct_size(revision: u8) -> u32 {
    if revision >= signature::ACPI_6_4_PPTT_REVISION {
        PPTT_CACHE_STRUCT_LEN_REV3 as u32
    } else {
        PPTT_CACHE_STRUCT_LEN_REV2 as u32
    }
}

/// Working state of one table build.
///
/// Holds the node lists obtained from the Configuration Manager and the node indexer describing where each node
/// lands in the table. Dropped at the end of the build, whether or not it succeeds.
pub(crate) struct PpttContext<'a> {
    revision: u8,
    proc_nodes: &'a [ProcHierarchyInfo],
    cache_nodes: &'a [CacheInfo],
    indexer: NodeIndexer,
    proc_range: IndexedRange,
    cache_range: IndexedRange,
}

impl<'a> PpttContext<'a> {
    /// Indexes all processor hierarchy nodes, then all cache nodes, right after the ACPI header.
    pub(crate) fn new(
        revision: u8,
        proc_nodes: &'a [ProcHierarchyInfo],
        cache_nodes: &'a [CacheInfo],
    ) -> PpttResult<Self> {
        let node_count = proc_nodes.len().checked_add(cache_nodes.len()).ok_or(PpttError::TableTooLarge)?;
        let mut indexer = NodeIndexer::with_capacity(node_count)?;

        let proc_range = indexer.index_nodes(proc_nodes, ACPI_HEADER_LEN as u32, proc_hierarchy_node_size)?;
        let cache_offset = (ACPI_HEADER_LEN as u32).checked_add(proc_range.size).ok_or(PpttError::TableTooLarge)?;
        let cache_size = cache_struct_size(revision);
        let cache_range = indexer.index_nodes(cache_nodes, cache_offset, |_| Ok(cache_size))?;

        log::debug!(
            "PPTT: Processor hierarchy nodes = {} ({} bytes), cache nodes = {} ({} bytes)",
            proc_range.count,
            proc_range.size,
            cache_range.count,
            cache_range.size
        );

        Ok(Self { revision, proc_nodes, cache_nodes, indexer, proc_range, cache_range })
    }

    /// Total length of the table, header included.
    pub(crate) fn table_length(&self) -> PpttResult<u32> {
        (ACPI_HEADER_LEN as u32)
            .checked_add(self.proc_range.size)
            .and_then(|size| size.checked_add(self.cache_range.size))
            .ok_or_else(|| {
                log::error!("PPTT: Table size exceeds 32 bits.");
                PpttError::TableTooLarge
            })
    }

    /// Serializes every processor hierarchy node into `table`.
    ///
    /// Afterwards checks that no two nodes reference the same GIC CPU interface and that every GIC CPU interface
    /// of the platform is referenced.
    pub(crate) fn add_proc_hierarchy_nodes<C>(&mut self, cm: &C, table: &mut [u8]) -> PpttResult<()>
    where
        C: ConfigurationManager + ?Sized,
    {
        let platform_gic_c_count = match cm.gic_c_info(None) {
            Ok(list) => list.len(),
            Err(PpttError::CmObjectNotFound { .. }) => 0,
            Err(err) => {
                log::error!("PPTT: Failed to get GIC CPU interface information. Status = {err}");
                return Err(err);
            }
        };

        let mut unique_gic_c_refs = 0usize;
        let proc_nodes = self.proc_nodes;

        for (node_index, node) in proc_nodes.iter().enumerate() {
            let indexer_index = self.proc_range.start + node_index;
            let offset = self.indexer.get(indexer_index).offset as usize;
            let length = proc_hierarchy_node_size(node)?;

            table.write8(offset + processor::TYPE, signature::PPTT_TYPE_PROCESSOR)?;
            table.write8(offset + processor::LENGTH, length as u8)?;
            table.write_bytes(offset + processor::LENGTH + 1, &[ACPI_RESERVED_BYTE; 2])?;
            table.write32(offset + processor::FLAGS, (node.flags & ProcNodeFlags::all()).bits())?;

            let parent_offset = match node.parent_token {
                Some(parent_token) => self.resolve_parent(indexer_index, node, parent_token)?,
                None => 0,
            };
            table.write32(offset + processor::PARENT, parent_offset)?;

            let acpi_processor_id = if node.flags.contains(ProcNodeFlags::ACPI_PROCESSOR_ID_VALID) {
                let uid = Self::resolve_acpi_processor_id(cm, node)?;
                unique_gic_c_refs += 1;
                uid
            } else {
                0
            };
            table.write32(offset + processor::ACPI_PROCESSOR_ID, acpi_processor_id)?;

            table.write32(offset + processor::NUMBER_OF_PRIVATE_RESOURCES, node.no_of_private_resources)?;
            self.add_private_resources(cm, node, table, offset + processor::PRIVATE_RESOURCES)?;

            log::trace!("PPTT: Processor node {} at {offset:#x}, length {length}", node.token);
        }

        if let Some((first_index, second_index)) = find_duplicate_gic_c_reference(proc_nodes) {
            log::error!(
                "PPTT: Processor hierarchy nodes {first_index} and {second_index} reference the same GIC CPU interface."
            );
            return Err(PpttError::DuplicateGicCReference { first_index, second_index });
        }

        if platform_gic_c_count != unique_gic_c_refs {
            log::error!(
                "PPTT: {platform_gic_c_count} GIC CPU interfaces on the platform, {unique_gic_c_refs} referenced by processor hierarchy nodes."
            );
            return Err(PpttError::UnreferencedGicC { platform: platform_gic_c_count, referenced: unique_gic_c_refs });
        }

        Ok(())
    }

    /// Resolves the parent of a processor node and records it as the node's topology parent.
    fn resolve_parent(
        &mut self,
        indexer_index: usize,
        node: &ProcHierarchyInfo,
        parent_token: CmObjectToken,
    ) -> PpttResult<u32> {
        let parent_index = self.indexer.resolve(&self.proc_range, parent_token).inspect_err(|_| {
            log::error!("PPTT: Failed to get parent processor hierarchy node. Token = {parent_token}");
        })?;

        if self.proc_nodes[self.proc_range.position(parent_index)].is_leaf() {
            log::error!("PPTT: Processor node {} has leaf node {parent_token} as its parent.", node.token);
            return Err(PpttError::LeafParent { token: node.token, parent: parent_token });
        }

        let parent_offset = self.indexer.get(parent_index).offset;
        self.indexer.set_topology_parent(indexer_index, parent_index);
        Ok(parent_offset)
    }

    /// Looks up the ACPI processor UID of a node through its GIC CPU interface reference.
    fn resolve_acpi_processor_id<C>(cm: &C, node: &ProcHierarchyInfo) -> PpttResult<u32>
    where
        C: ConfigurationManager + ?Sized,
    {
        let Some(gic_c_token) = node.acpi_id_object_token else {
            log::error!("PPTT: Processor node {} has a valid ACPI processor ID but no GIC CPU interface.", node.token);
            return Err(PpttError::MissingGicCReference { token: node.token });
        };

        let gic_c_list = match cm.gic_c_info(Some(gic_c_token)) {
            Ok(list) => list,
            Err(PpttError::CmObjectNotFound { .. }) => Vec::new(),
            Err(err) => {
                log::error!("PPTT: Failed to get GIC CPU interface {gic_c_token}. Status = {err}");
                return Err(err);
            }
        };

        match gic_c_list.as_slice() {
            [gic_c] => Ok(gic_c.acpi_processor_uid),
            _ => {
                log::error!(
                    "PPTT: GIC CPU interface token {gic_c_token} of processor node {} matched {} objects.",
                    node.token,
                    gic_c_list.len()
                );
                Err(PpttError::GicCReferenceMismatch { token: gic_c_token, count: gic_c_list.len() })
            }
        }
    }

    /// Writes the offsets of the private resources of `node` starting at `array_offset`.
    ///
    /// Private resources must be cache nodes.
    fn add_private_resources<C>(
        &self,
        cm: &C,
        node: &ProcHierarchyInfo,
        table: &mut [u8],
        array_offset: usize,
    ) -> PpttResult<()>
    where
        C: ConfigurationManager + ?Sized,
    {
        if node.no_of_private_resources == 0 {
            return Ok(());
        }

        let Some(list_token) = node.private_resources_array_token else {
            log::error!(
                "PPTT: Processor node {} declares {} private resources but no resource list.",
                node.token,
                node.no_of_private_resources
            );
            return Err(PpttError::CmObjectNotFound { id: CmObjectId::CmRef, token: None });
        };

        let private_resources: Vec<CmRef> = cm.cm_ref(list_token).inspect_err(|err| {
            log::error!("PPTT: Failed to get private resources of node {}. Status = {err}", node.token);
        })?;

        if private_resources.len() != node.no_of_private_resources as usize {
            log::error!(
                "PPTT: Processor node {} declares {} private resources, found {}.",
                node.token,
                node.no_of_private_resources,
                private_resources.len()
            );
            return Err(PpttError::PrivateResourceCountMismatch {
                token: node.token,
                declared: node.no_of_private_resources,
                found: private_resources.len(),
            });
        }

        let mut cursor = array_offset;
        for resource in private_resources.iter() {
            let resource_index =
                self.indexer.resolve(&self.cache_range, resource.reference_token).inspect_err(|_| {
                    log::error!(
                        "PPTT: Failed to get private resource {} of node {}.",
                        resource.reference_token,
                        node.token
                    );
                })?;
            table.write32_with(&mut cursor, self.indexer.get(resource_index).offset)?;
        }

        Ok(())
    }

    /// Serializes every cache node into `table`.
    pub(crate) fn add_cache_type_structures(&mut self, table: &mut [u8]) -> PpttResult<()> {
        let with_cache_id = self.revision >= signature::ACPI_6_4_PPTT_REVISION;
        let length = cache_struct_size(self.revision);

        let mut flags = signature::PPTT_CACHE_SIZE_VALID
            | signature::PPTT_CACHE_NUMBER_OF_SETS_VALID
            | signature::PPTT_CACHE_ASSOCIATIVITY_VALID
            | signature::PPTT_CACHE_ALLOCATION_TYPE_VALID
            | signature::PPTT_CACHE_CACHE_TYPE_VALID
            | signature::PPTT_CACHE_WRITE_POLICY_VALID
            | signature::PPTT_CACHE_LINE_SIZE_VALID;
        if with_cache_id {
            flags |= signature::PPTT_CACHE_ID_VALID;
        }

        let mut found_cache_ids: Vec<u32> = Vec::new();
        if with_cache_id {
            found_cache_ids.try_reserve_exact(self.cache_nodes.len()).map_err(|_| {
                log::error!("PPTT: Failed to allocate the cache ID list.");
                PpttError::AllocationFailed
            })?;
        }

        let cache_nodes = self.cache_nodes;
        for (node_index, node) in cache_nodes.iter().enumerate() {
            let indexer_index = self.cache_range.start + node_index;
            let offset = self.indexer.get(indexer_index).offset as usize;

            table.write8(offset + cache::TYPE, signature::PPTT_TYPE_CACHE)?;
            table.write8(offset + cache::LENGTH, length as u8)?;
            table.write_bytes(offset + cache::LENGTH + 1, &[ACPI_RESERVED_BYTE; 2])?;
            table.write32(offset + cache::FLAGS, flags)?;

            let next_level_offset = match node.next_level_of_cache_token {
                Some(next_token) => {
                    let next_index = self.indexer.resolve(&self.cache_range, next_token).inspect_err(|_| {
                        log::error!("PPTT: Failed to get next level of cache {next_token} of cache {}.", node.token);
                    })?;
                    self.indexer.set_topology_parent(indexer_index, next_index);
                    self.indexer.get(next_index).offset
                }
                None => 0,
            };
            table.write32(offset + cache::NEXT_LEVEL_OF_CACHE, next_level_offset)?;

            table.write32(offset + cache::SIZE, node.size)?;

            validate_number_of_sets(node)?;
            table.write32(offset + cache::NUMBER_OF_SETS, node.number_of_sets)?;

            let associativity = u8::try_from(node.associativity).map_err(|_| {
                log::error!("PPTT: Cache {} associativity {} exceeds 255.", node.token, node.associativity);
                PpttError::AssociativityTooLarge { token: node.token, associativity: node.associativity }
            })?;
            table.write8(offset + cache::ASSOCIATIVITY, associativity)?;

            table.write8(offset + cache::ATTRIBUTES, cache_struct_attributes(node.attributes))?;

            validate_line_size(node)?;
            table.write16(offset + cache::LINE_SIZE, node.line_size)?;

            if with_cache_id {
                if node.cache_id == 0 {
                    log::error!("PPTT: Cache {} has a zero cache ID.", node.token);
                    return Err(PpttError::InvalidCacheId { token: node.token });
                }
                if found_cache_ids.contains(&node.cache_id) {
                    log::error!("PPTT: Cache {} reuses cache ID {:#x}.", node.token, node.cache_id);
                    return Err(PpttError::DuplicateCacheId { token: node.token, cache_id: node.cache_id });
                }
                found_cache_ids.push(node.cache_id);
                table.write32(offset + cache::CACHE_ID, node.cache_id)?;
            }

            log::trace!("PPTT: Cache node {} at {offset:#x}", node.token);
        }

        Ok(())
    }

    /// Rejects any topology in which following parent / next level of cache links loops.
    pub(crate) fn detect_cycles(&mut self) -> PpttResult<()> {
        self.indexer.detect_cycles()
    }
}

/// Returns the indices of the first two processor nodes referencing the same GIC CPU interface.
fn find_duplicate_gic_c_reference(proc_nodes: &[ProcHierarchyInfo]) -> Option<(usize, usize)> {
    let gic_c_ref = |node: &ProcHierarchyInfo| {
        node.flags.contains(ProcNodeFlags::ACPI_PROCESSOR_ID_VALID).then_some(node.acpi_id_object_token).flatten()
    };

    for (first_index, first) in proc_nodes.iter().enumerate() {
        let Some(first_ref) = gic_c_ref(first) else { continue };
        for (second_index, second) in proc_nodes.iter().enumerate().skip(first_index + 1) {
            if gic_c_ref(second) == Some(first_ref) {
                return Some((first_index, second_index));
            }
        }
    }
    None
}

fn validate_number_of_sets(node: &CacheInfo) -> PpttResult<()> {
    if node.number_of_sets > signature::PPTT_ARM_CCIDX_CACHE_NUMBER_OF_SETS_MAX {
        log::error!(
            "PPTT: Cache {} number of sets {} exceeds {}.",
            node.token,
            node.number_of_sets,
            signature::PPTT_ARM_CCIDX_CACHE_NUMBER_OF_SETS_MAX
        );
        return Err(PpttError::NumberOfSetsTooLarge { token: node.token, number_of_sets: node.number_of_sets });
    }

    if node.number_of_sets > signature::PPTT_ARM_CACHE_NUMBER_OF_SETS_MAX {
        log::info!(
            "PPTT: Cache {} number of sets {} requires FEAT_CCIDX (maximum without it is {}).",
            node.token,
            node.number_of_sets,
            signature::PPTT_ARM_CACHE_NUMBER_OF_SETS_MAX
        );
    }

    Ok(())
}

fn validate_line_size(node: &CacheInfo) -> PpttResult<()> {
    let line_size = node.line_size;
    if !(signature::PPTT_ARM_CACHE_LINE_SIZE_MIN..=signature::PPTT_ARM_CACHE_LINE_SIZE_MAX).contains(&line_size)
        || !line_size.is_power_of_two()
    {
        log::error!(
            "PPTT: Cache {} line size {line_size} must be a power of two between {} and {}.",
            node.token,
            signature::PPTT_ARM_CACHE_LINE_SIZE_MIN,
            signature::PPTT_ARM_CACHE_LINE_SIZE_MAX
        );
        return Err(PpttError::InvalidLineSize { token: node.token, line_size });
    }
    Ok(())
}

/// Translates the Configuration Manager attribute mask into the cache structure attributes byte.
fn cache_struct_attributes(attributes: u8) -> u8 {
    let allocation_type = attributes & cache_attributes::ALLOCATION_TYPE_MASK;
    let cache_type = (attributes & cache_attributes::CACHE_TYPE_MASK) >> cache_attributes::CACHE_TYPE_SHIFT;
    let write_policy = (attributes & cache_attributes::WRITE_POLICY_MASK) >> cache_attributes::WRITE_POLICY_SHIFT;
    cache_attributes::pack(allocation_type, cache_type, write_policy)
}
