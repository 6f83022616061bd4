//! Configuration Manager Service Definitions.
//!
//! Defines the query contract the PPTT generator consumes.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;

use crate::cm_object::{CacheInfo, CmInfo, CmObjectToken, CmRef, GicCInfo, ProcHierarchyInfo};
use crate::error::PpttResult;

/// The `ConfigurationManager` trait provides the platform description objects needed to build the PPTT.
///
/// Queries taking an `Option<CmObjectToken>` treat `None` as a wildcard and return every object of that class.
/// A query with no matching object returns `PpttError::CmObjectNotFound`.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigurationManager {
    /// Returns the Configuration Manager standard information (OEM ID and revision).
    fn cm_info(&self) -> PpttResult<CmInfo>;

    /// Returns the processor hierarchy nodes matching `token`.
    fn proc_hierarchy_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<ProcHierarchyInfo>>;

    /// Returns the cache nodes matching `token`.
    ///
    /// A platform without caches answers the wildcard query with `CmObjectNotFound`.
    fn cache_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<CacheInfo>>;

    /// Resolves a cross-reference list token into its ordered list of references.
    fn cm_ref(&self, token: CmObjectToken) -> PpttResult<Vec<CmRef>>;

    /// Returns the GIC CPU interfaces matching `token`.
    ///
    /// The wildcard query returns every GIC CPU interface of the platform.
    fn gic_c_info(&self, token: Option<CmObjectToken>) -> PpttResult<Vec<GicCInfo>>;
}
