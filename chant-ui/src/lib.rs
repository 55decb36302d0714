//! chant-ui library - chant counter client
//!
//! Gateway to the chant backend plus the identification and submission flow
//! that sits behind the add-chant screens. The `chant-ui` binary is a
//! command-line front end over this library.

pub mod commands;
pub mod flow;
pub mod gateway;

pub use flow::{ChantForm, FlowController, FlowError, FlowState, Mode, Notice, SubMode};
pub use gateway::{ChantGateway, GatewayError, HttpGateway};
