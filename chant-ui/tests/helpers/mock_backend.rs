//! In-process chant backend for HTTP-level tests
//!
//! Serves the backend contract under `/api` on an ephemeral localhost port,
//! backed by an in-memory store the tests can inspect.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChant {
    pub userid: String,
    pub date: String,
    pub count: u64,
}

#[derive(Default)]
struct Store {
    users: HashSet<String>,
    chants: Vec<StoredChant>,
    add_chant_calls: usize,
    create_user_calls: usize,
    /// Register unknown phone numbers on add, like the production backend
    auto_register_phones: bool,
    /// Delay applied before answering add-chant requests
    add_delay: Option<Duration>,
    /// Answer add-chant with HTTP 500 and this message
    add_failure: Option<String>,
}

type Shared = Arc<Mutex<Store>>;

fn is_phone(userid: &str) -> bool {
    userid.len() == 10 && userid.bytes().all(|b| b.is_ascii_digit())
}

impl Store {
    fn total_for(&self, userid: &str) -> u64 {
        self.chants
            .iter()
            .filter(|c| c.userid == userid)
            .map(|c| c.count)
            .sum()
    }
}

/// Running mock backend; stops when dropped
pub struct MockBackend {
    pub base_url: String,
    store: Shared,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::start_with(Store::default()).await
    }

    /// Backend that registers unknown phone numbers on add-chant
    pub async fn start_auto_registering() -> Self {
        Self::start_with(Store {
            auto_register_phones: true,
            ..Default::default()
        })
        .await
    }

    /// Backend whose add-chant handler stalls for `delay`
    pub async fn start_slow(delay: Duration) -> Self {
        Self::start_with(Store {
            add_delay: Some(delay),
            ..Default::default()
        })
        .await
    }

    /// Backend whose add-chant handler fails with a 500 error envelope
    pub async fn start_failing(message: &str) -> Self {
        Self::start_with(Store {
            add_failure: Some(message.to_string()),
            ..Default::default()
        })
        .await
    }

    async fn start_with(store: Store) -> Self {
        let store: Shared = Arc::new(Mutex::new(store));

        let app = Router::new()
            .route("/api/users/create", post(create_user))
            .route("/api/users/exists/:userid", get(user_exists))
            .route("/api/chants/add", post(add_chant))
            .route("/api/chants/user/:userid/total", get(user_total))
            .route("/api/chants/total", get(total_chants))
            .route("/api/chants/usersCounts", get(user_counts))
            .with_state(Arc::clone(&store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend server");
        });

        Self {
            base_url: format!("http://{}/api", addr),
            store,
            handle,
        }
    }

    pub fn add_user(&self, userid: &str) {
        self.store.lock().unwrap().users.insert(userid.to_string());
    }

    pub fn has_user(&self, userid: &str) -> bool {
        self.store.lock().unwrap().users.contains(userid)
    }

    pub fn record_chant(&self, userid: &str, date: &str, count: u64) {
        self.store.lock().unwrap().chants.push(StoredChant {
            userid: userid.to_string(),
            date: date.to_string(),
            count,
        });
    }

    pub fn chants(&self) -> Vec<StoredChant> {
        self.store.lock().unwrap().chants.clone()
    }

    pub fn add_chant_calls(&self) -> usize {
        self.store.lock().unwrap().add_chant_calls
    }

    pub fn create_user_calls(&self) -> usize {
        self.store.lock().unwrap().create_user_calls
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn userid_of(body: &Value) -> String {
    body.get("userid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

async fn create_user(State(store): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let userid = userid_of(&body);
    let mut store = store.lock().unwrap();
    store.create_user_calls += 1;

    if store.users.contains(&userid) {
        return Json(json!({"success": false, "message": "User already exists", "data": null}));
    }
    store.users.insert(userid.clone());
    Json(json!({"success": true, "message": "User created successfully", "data": userid}))
}

async fn add_chant(
    State(store): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let (delay, failure) = {
        let mut store = store.lock().unwrap();
        store.add_chant_calls += 1;
        (store.add_delay, store.add_failure.clone())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(message) = failure {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": message, "data": null})),
        );
    }

    let userid = userid_of(&body);
    let mut store = store.lock().unwrap();

    if !store.users.contains(&userid) {
        if store.auto_register_phones && is_phone(&userid) {
            store.users.insert(userid.clone());
        } else {
            return (
                StatusCode::OK,
                Json(json!({"success": false, "message": "User not found", "data": null})),
            );
        }
    }

    store.chants.push(StoredChant {
        userid: userid.clone(),
        date: body.get("date").and_then(Value::as_str).unwrap_or_default().to_string(),
        count: body.get("count").and_then(Value::as_u64).unwrap_or_default(),
    });
    let total = store.total_for(&userid);
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Chant added successfully",
            "data": {"userId": userid, "totalCount": total}
        })),
    )
}

async fn user_total(State(store): State<Shared>, Path(userid): Path<String>) -> Json<Value> {
    let store = store.lock().unwrap();
    Json(json!({"userId": userid, "totalCount": store.total_for(&userid)}))
}

async fn total_chants(State(store): State<Shared>) -> Json<Value> {
    let store = store.lock().unwrap();
    let total: u64 = store.chants.iter().map(|c| c.count).sum();
    Json(json!({"totalChants": total}))
}

async fn user_counts(State(store): State<Shared>) -> Json<Value> {
    let store = store.lock().unwrap();
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for chant in &store.chants {
        *totals.entry(chant.userid.as_str()).or_default() += chant.count;
    }
    let counts: Vec<Value> = totals
        .into_iter()
        .map(|(userid, total)| json!({"userId": userid, "totalChants": total}))
        .collect();
    Json(Value::Array(counts))
}

async fn user_exists(State(store): State<Shared>, Path(userid): Path<String>) -> Json<bool> {
    Json(store.lock().unwrap().users.contains(&userid))
}
