//! Typed model of a star system snapshot and the filterable field table

pub mod body;
pub mod fields;
pub mod station;
pub mod system;
pub mod values;

pub use body::*;
pub use fields::*;
pub use station::*;
pub use system::*;
pub use values::*;
