//! Test helpers for chant-ui integration tests
//!
//! - ScriptedGateway: in-memory gateway with queued responses and a call log
//! - MockBackend: in-process axum server speaking the backend HTTP contract

#![allow(dead_code)]

pub mod mock_backend;
pub mod scripted_gateway;

pub use mock_backend::MockBackend;
pub use scripted_gateway::{accepted, rejected, stats, Call, ScriptedGateway};
