//! Shared error definitions and catalog types used across marketbot crates.

pub mod catalog;
pub mod error;

pub use {
    catalog::{ProductMatch, ProductView},
    error::{Error, FromMessage, Result},
};
