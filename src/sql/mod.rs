//! Safe SQL builder: identifiers validated and quoted, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
