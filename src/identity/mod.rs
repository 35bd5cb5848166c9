//! Composite resource identity module
//!
//! Encodes an ordered tuple of components into the single opaque id a host
//! stores as the resource's durable key, and decodes it back with an arity
//! check.
//!
//! # Format
//!
//! ```text
//! component_1#component_2#...#component_n
//! ```
//!
//! The delimiter is reserved: a component containing it, or an empty
//! component, is rejected at encode time.

mod codec;

pub use codec::{IdentityCodec, ResourceIdentity, DELIMITER};
