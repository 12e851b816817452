//! Testing targets, elements and observers for Scarlet graphs

pub mod elements;
pub mod observer;
pub mod targets;

pub use elements::*;
pub use observer::*;
pub use targets::*;

pub mod prelude {
    pub use crate::elements::*;
    pub use crate::observer::*;
    pub use crate::targets::*;
}
