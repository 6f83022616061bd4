//! PPTT Generator
//!
//! This library builds the ACPI Processor Properties Topology Table (PPTT) from platform description objects
//! supplied by a Configuration Manager.
//!
//! The generator indexes every processor hierarchy node and cache node, lays them out after the ACPI header
//! (processor nodes first, then caches), serializes each structure with its cross references turned into table
//! offsets, and validates the result:
//!
//! - parents must be non-leaf processor nodes, and private resources must be cache nodes,
//! - every GIC CPU interface of the platform is referenced by exactly one processor node,
//! - cache geometry is within architectural limits, and cache IDs are unique (revision 3),
//! - following parent / next level of cache links never loops.
//!
//! ## Examples and Usage
//!
//! Implement [`ConfigurationManager`](service::ConfigurationManager) for the platform, or describe the platform
//! statically with [`PlatformRepository`](repository::PlatformRepository), then build the table:
//!
//! ```ignore
//!  let generator = PpttGenerator::new(PpttGeneratorInit::new(creator_id, creator_revision));
//!  let table = generator.build_table(&platform_cm, &AcpiTableInfo::new(3, 0, 0))?;
//!  acpi_provider.install_acpi_table(table.as_ptr() as *const AcpiTableHeader)?;
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
extern crate alloc;

pub mod acpi_table;
pub mod cm_object;
pub mod component;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;
pub mod signature;

mod byte_writer;
mod node_indexer;
mod pptt;


pub use component::PpttGenerator;
