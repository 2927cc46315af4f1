//! Foundation types for the Transactional Staging Store (TSS).
//!
//! This crate provides the content-addressing primitives shared by the
//! storage and transaction layers. Every other TSS crate depends on
//! `tss-types`.
//!
//! # Key Types
//!
//! - [`BlobKey`] — Content-addressed identifier (SHA-256 digest, hex-keyed)
//! - [`TypeError`] — Parse and validation errors for the above

pub mod error;
pub mod key;

pub use error::TypeError;
pub use key::BlobKey;
