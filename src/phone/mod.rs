//! Phones - disruptive events dropped onto the village

pub mod dispatcher;
pub mod effects;
pub mod event;

pub use dispatcher::{ClearReason, PhoneDispatcher, PhoneEvent};
pub use effects::{apply_slowdown, effect_for, PhoneEffect};
pub use event::{Phone, PhonePhase, PhoneType};
