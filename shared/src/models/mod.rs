//! Domain models for the Bobina Tracker

mod audit;
mod freight;
mod invoice;
mod manifest;
mod order;
mod pre_registration;
mod roll;
mod volume;

pub use audit::*;
pub use freight::*;
pub use invoice::*;
pub use manifest::*;
pub use order::*;
pub use pre_registration::*;
pub use roll::*;
pub use volume::*;
