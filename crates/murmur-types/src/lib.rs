//! Core types and traits for Murmur, the tiered memory behind a persona agent.
//!
//! This crate defines the data shared between the memory substrate, the
//! embedding drivers and the CLI: records, the context key, configuration,
//! errors, and the collaborator traits the tiered cache is built on.
//! It contains no storage or network logic.

pub mod actor;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod memory;
