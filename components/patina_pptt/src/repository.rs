//! In-memory Configuration Manager.
//!
//! `PlatformRepository` holds the platform description objects in plain
//! vectors and answers the [`ConfigurationManager`] queries from them. It is
//! meant for platforms whose topology is known statically.
//!
//! ## Examples and Usage
//!
//! ```
//! use patina_pptt::cm_object::{CmObjectToken, ProcHierarchyInfo, ProcNodeFlags};
//! use patina_pptt::config::AcpiTableInfo;
//! use patina_pptt::repository::PlatformRepository;
//! use patina_pptt::PpttGenerator;
//!
//! let package = CmObjectToken::new(1).unwrap();
//! let repository = PlatformRepository::new()
//!     .with_proc_node(ProcHierarchyInfo::new(package, ProcNodeFlags::PHYSICAL_PACKAGE));
//!
//! let table = PpttGenerator::default().build_table(&repository, &AcpiTableInfo::default()).unwrap();
//! assert_eq!(&table[0..4], b"PPTT");
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent

use alloc::vec::Vec;

use crate::cm_object::{CacheInfo, CmInfo, CmObjectId, CmObjectToken, CmRef, GicCInfo, ProcHierarchyInfo};
use crate::error::{PpttError, PpttResult};
use crate::service::ConfigurationManager;

/// Static platform description answering Configuration Manager queries.
#[derive(Debug, Clone, Default)]
pub struct PlatformRepository {
    cm_info: CmInfo,
    proc_nodes: Vec<ProcHierarchyInfo>,
    cache_nodes: Vec<CacheInfo>,
    cm_refs: Vec<(CmObjectToken, Vec<CmRef>)>,
    gic_c: Vec<GicCInfo>,
}

impl PlatformRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cm_info(mut self, cm_info: CmInfo) -> Self {
        self.cm_info = cm_info;
        self
    }

    pub fn with_proc_node(mut self, node: ProcHierarchyInfo) -> Self {
        self.proc_nodes.push(node);
        self
    }

    pub fn with_cache(mut self, cache: CacheInfo) -> Self {
        self.cache_nodes.push(cache);
        self
    }

    /// Adds a cross-reference list identified by `token`, listing `references` in order.
    pub fn with_cm_refs(mut self, token: CmObjectToken, references: &[CmObjectToken]) -> Self {
        let list = references.iter().map(|&reference_token| CmRef { reference_token }).collect();
        self.cm_refs.push((token, list));
        self
    }

    pub fn with_gic_c(mut self, gic_c: GicCInfo) -> Self {
        self.gic_c.push(gic_c);
        self
    }

    fn select<T: Copy>(
        objects: &[T],
        id: CmObjectId,
        token: Option<CmObjectToken>,
        object_token: impl Fn(&T) -> CmObjectToken,
    ) -> PpttResult<Vec<T>> {
        let selected: Vec<T> = objects
            .iter()
            .filter(|object| token.map_or(true, |token| object_token(*object) == token))
            .copied()
            .collect();

        if selected.is_empty() {
            return Err(PpttError::CmObjectNotFound { id, token });
        }
        Ok(selected)
    }
}

impl ConfigurationManager for PlatformRepository {
    fn cm_info(&self) -> PpttResult<CmInfo> {
        Ok(self.cm_info)
    }

    fn proc_hierarchy_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<ProcHierarchyInfo>> {
        Self::select(&self.proc_nodes, CmObjectId::ProcHierarchyInfo, token, |node| node.token)
    }

    fn cache_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<CacheInfo>> {
        Self::select(&self.cache_nodes, CmObjectId::CacheInfo, token, |node| node.token)
    }

    fn cm_ref(&self, token: CmObjectToken) -> PpttResult<Vec<CmRef>> {
        self.cm_refs
            .iter()
            .find(|(list_token, _)| *list_token == token)
            .map(|(_, list)| list.clone())
            .ok_or(PpttError::CmObjectNotFound { id: CmObjectId::CmRef, token: Some(token) })
    }

    fn gic_c_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<GicCInfo>> {
        Self::select(&self.gic_c, CmObjectId::GicCInfo, token, |gic_c| gic_c.token)
    }
}
