//! core
//!
//! Core domain types, configuration and coordination for volborg.
//!
//! # Modules
//!
//! - [`types`] - Strong types: VolumeName, ArchiveName, RepoLocation
//! - [`repository`] - Repository descriptor (location plus credentials)
//! - [`paths`] - Guarded clearing of restore targets
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Per-repository locking
//!
//! # Design Principles
//!
//! - Strong typing keeps unsanitized archive names out of borg arguments
//! - Nothing in `core` spawns a process

pub mod config;
pub mod ops;
pub mod paths;
pub mod repository;
pub mod types;
