//! Types for the chant backend HTTP contract
//!
//! The backend is reached under a base path (normally `/api`):
//! - `POST /users/create` -> [`ApiResponse`]
//! - `POST /chants/add` -> [`ApiResponse`]
//! - `GET /chants/user/{userid}/total` -> [`UserTotalResponse`]
//! - `GET /chants/total` -> [`TotalChantsResponse`]
//! - `GET /chants/usersCounts` -> list of [`UserChantCount`]
//! - `GET /users/exists/{userid}` -> boolean
//!
//! This module has no HTTP client dependency; the client crate wraps these
//! types with its transport.

pub mod types;

pub use types::{
    AddChantRequest, ApiReply, ApiResponse, ChantEntry, CreateUserRequest, RejectionKind,
    TotalChantsResponse, UserChantCount, UserStats, UserTotalResponse,
};
