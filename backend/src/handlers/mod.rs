//! HTTP request handlers

pub mod consolidation;
pub mod departures;
pub mod freight;
pub mod health;
pub mod intake;
pub mod manifests;
pub mod orders;
pub mod pre_registration;
pub mod reporting;
pub mod stock;

pub use consolidation::*;
pub use departures::*;
pub use freight::*;
pub use health::*;
pub use intake::*;
pub use manifests::*;
pub use orders::*;
pub use pre_registration::*;
pub use reporting::*;
pub use stock::*;
