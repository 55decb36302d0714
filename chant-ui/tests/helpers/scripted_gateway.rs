//! In-memory ChantGateway with scripted responses
//!
//! Each operation pops its next queued result; an empty queue falls back to a
//! benign default (accepted / exists / zero totals). Every call is recorded.

use async_trait::async_trait;
use chant_common::api::{ApiReply, ApiResponse, ChantEntry, UserChantCount, UserStats};
use chant_common::CanonicalId;
use chant_ui::gateway::{ChantGateway, GatewayResult};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateUser(String),
    AddChant { userid: String, date: NaiveDate, count: u32 },
    UserTotal(String),
    TotalChants,
    UserExists(String),
    UserCounts,
}

pub fn accepted(message: &str) -> GatewayResult<ApiReply> {
    Ok(ApiResponse {
        success: true,
        message: message.to_string(),
        data: None,
    }
    .into_reply())
}

pub fn rejected(message: &str) -> GatewayResult<ApiReply> {
    Ok(ApiResponse {
        success: false,
        message: message.to_string(),
        data: None,
    }
    .into_reply())
}

#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<Call>>,
    create_user: Mutex<VecDeque<GatewayResult<ApiReply>>>,
    add_chant: Mutex<VecDeque<GatewayResult<ApiReply>>>,
    user_total: Mutex<VecDeque<GatewayResult<UserStats>>>,
    total_chants: Mutex<VecDeque<GatewayResult<u64>>>,
    user_exists: Mutex<VecDeque<GatewayResult<bool>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create_user(self, result: GatewayResult<ApiReply>) -> Self {
        self.create_user.lock().unwrap().push_back(result);
        self
    }

    pub fn on_add_chant(self, result: GatewayResult<ApiReply>) -> Self {
        self.add_chant.lock().unwrap().push_back(result);
        self
    }

    pub fn on_user_total(self, result: GatewayResult<UserStats>) -> Self {
        self.user_total.lock().unwrap().push_back(result);
        self
    }

    pub fn on_total_chants(self, result: GatewayResult<u64>) -> Self {
        self.total_chants.lock().unwrap().push_back(result);
        self
    }

    pub fn on_user_exists(self, result: GatewayResult<bool>) -> Self {
        self.user_exists.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn add_chant_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::AddChant { .. }))
    }

    pub fn create_user_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateUser(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn stats(userid: &str, total: u64) -> UserStats {
    UserStats {
        user_id: userid.to_string(),
        total_count: total,
    }
}

#[async_trait]
impl ChantGateway for ScriptedGateway {
    async fn create_user(&self, userid: &CanonicalId) -> GatewayResult<ApiReply> {
        self.record(Call::CreateUser(userid.to_string()));
        self.create_user
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| accepted("User created successfully"))
    }

    async fn add_chant(&self, entry: &ChantEntry) -> GatewayResult<ApiReply> {
        self.record(Call::AddChant {
            userid: entry.userid.to_string(),
            date: entry.date,
            count: entry.count,
        });
        self.add_chant
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| accepted("Chant added successfully"))
    }

    async fn user_total(&self, userid: &CanonicalId) -> GatewayResult<UserStats> {
        self.record(Call::UserTotal(userid.to_string()));
        self.user_total
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(stats(userid.as_str(), 0)))
    }

    async fn total_chants(&self) -> GatewayResult<u64> {
        self.record(Call::TotalChants);
        self.total_chants.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    async fn user_exists(&self, userid: &CanonicalId) -> GatewayResult<bool> {
        self.record(Call::UserExists(userid.to_string()));
        self.user_exists.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }

    async fn user_counts(&self) -> GatewayResult<Vec<UserChantCount>> {
        self.record(Call::UserCounts);
        Ok(Vec::new())
    }
}
