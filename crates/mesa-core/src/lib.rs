//! Mesa Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Mesa:
//! - Tenant keys and document types
//! - Entity schema definitions and validation
//! - Storage connector trait abstractions
//! - Core error types

pub mod connector;
pub mod document;
pub mod error;
pub mod schema;
pub mod tenant;

pub use error::{Error, Result};
