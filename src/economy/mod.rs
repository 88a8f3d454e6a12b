//! Economy layer - global productivity and the activity pools it feeds

pub mod activity;
pub mod productivity;

pub use activity::{ActivityKind, ProductivityActivity};
pub use productivity::{EconomySnapshot, ProductivityBand, ProductivityEconomy, THRIVING_THRESHOLD};
