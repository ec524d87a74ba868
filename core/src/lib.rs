//! Canopy Core Library
//! 
//! Core types, traits, and abstractions shared by every Canopy crate:
//! store keys, commit identifiers, the query envelope, the substore
//! capability traits and the error taxonomy.

pub mod types;
pub mod query;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use query::*;
pub use traits::*;
pub use error::*;
pub use config::*;
