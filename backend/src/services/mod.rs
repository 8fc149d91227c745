//! Business logic services for the Bobina Tracker

pub mod consolidation;
pub mod departure;
pub mod documents;
pub mod freight;
pub mod intake;
pub mod manifest;
pub mod orders;
pub mod pre_registration;
pub mod reporting;
pub mod stock;

pub use consolidation::ConsolidationService;
pub use departure::DepartureService;
pub use freight::FreightService;
pub use intake::IntakeService;
pub use manifest::ManifestService;
pub use orders::OrderService;
pub use pre_registration::PreRegistrationService;
pub use reporting::ReportingService;
pub use stock::StockService;
