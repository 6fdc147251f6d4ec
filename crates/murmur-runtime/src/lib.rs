//! Embedding drivers for Murmur.
//!
//! The memory substrate only knows [`murmur_types::embedding::EmbeddingDriver`];
//! this crate supplies the concrete drivers and picks one from configuration.

pub mod embedding;
pub mod local;

pub use embedding::{
    create_embedding_driver, create_embedding_driver_or_unavailable, UnavailableEmbeddingDriver,
};
pub use local::HashEmbeddingDriver;
