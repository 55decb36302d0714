//! Identification & submission flow
//!
//! - [`state`]: the `FlowState` value and its reducer
//! - [`form`]: raw form input and validation
//! - [`controller`]: the controller sequencing gateway calls

pub mod controller;
pub mod form;
pub mod state;

pub use controller::{FlowController, FlowError, Notice, NoticeLevel, MAX_PROVISION_ATTEMPTS};
pub use form::ChantForm;
pub use state::{FlowEvent, FlowState, Mode, Phase, SubMode};
