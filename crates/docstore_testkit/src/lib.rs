//! # Docstore Testkit
//!
//! Test utilities for docstore.
//!
//! This crate provides:
//! - Document fixtures and a snapshot builder
//! - Property-based test generators using proptest
//! - Invariant assertions (marks, selection, integrity)
//! - Temporary snapshot files for CLI round-trips
//!
//! ## Usage
//!
//! ```rust
//! use docstore_testkit::prelude::*;
//! use docstore_model::{Mark, Operation};
//!
//! let store = hello_world(vec![Mark::new("bold", 6, 11)]);
//! store.execute(&[Operation::insert_text("t1", 6, "Beautiful ")]).unwrap();
//! assert_text(&store, "t1", "Hello Beautiful World");
//! assert_store_sound(&store);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod assertions;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use assertions::*;
pub use fixtures::*;
pub use generators::*;
