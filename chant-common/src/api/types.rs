//! Request/response types for the chant backend
//!
//! Field names follow the backend's JSON (`userid` in requests, camelCase in
//! responses). Message text on [`ApiResponse`] is classified exactly once, by
//! [`ApiResponse::into_reply`], so callers branch on [`RejectionKind`] rather
//! than on strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifier::CanonicalId;

// ========================================
// Requests
// ========================================

/// Body of `POST /users/create`
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub userid: CanonicalId,
}

/// Body of `POST /chants/add`
///
/// `date` serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize)]
pub struct AddChantRequest {
    pub userid: CanonicalId,
    pub date: NaiveDate,
    pub count: u32,
}

/// One chant submission: a count for a calendar day, attributed to a user
///
/// Built from validated form input at submit time and sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChantEntry {
    pub userid: CanonicalId,
    pub date: NaiveDate,
    pub count: u32,
}

impl ChantEntry {
    pub fn to_request(&self) -> AddChantRequest {
        AddChantRequest {
            userid: self.userid.clone(),
            date: self.date,
            count: self.count,
        }
    }
}

// ========================================
// Responses
// ========================================

/// Generic mutation response from the backend
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Why the backend refused a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The identifier has no user record
    NotFound,
    /// The identifier is already claimed
    Conflict,
    Other,
}

impl RejectionKind {
    /// Classify a backend failure message
    ///
    /// Conflict wins over not-found so "user already exists" is never read
    /// as a missing user.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("already exists") || lower.contains("user exists") {
            RejectionKind::Conflict
        } else if lower.contains("user does not exist")
            || lower.contains("user not found")
            || (lower.contains("user") && lower.contains("not"))
        {
            RejectionKind::NotFound
        } else {
            RejectionKind::Other
        }
    }
}

/// Classified mutation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply {
    Accepted { message: String },
    Rejected { kind: RejectionKind, message: String },
}

impl ApiReply {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ApiReply::Accepted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ApiReply::Accepted { message } | ApiReply::Rejected { message, .. } => message,
        }
    }
}

impl ApiResponse {
    /// Classify this response
    pub fn into_reply(self) -> ApiReply {
        if self.success {
            ApiReply::Accepted {
                message: self.message,
            }
        } else {
            ApiReply::Rejected {
                kind: RejectionKind::classify(&self.message),
                message: self.message,
            }
        }
    }
}

/// Response of `GET /chants/user/{userid}/total`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotalResponse {
    pub user_id: String,
    pub total_count: u64,
}

/// Per-user totals snapshot; superseded by the next fetch
pub type UserStats = UserTotalResponse;

/// Response of `GET /chants/total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalChantsResponse {
    pub total_chants: u64,
}

/// Entry of `GET /chants/usersCounts`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChantCount {
    pub user_id: String,
    #[serde(default)]
    pub total_chants: u64,
}

// ========================================
// Tests
// ========================================
