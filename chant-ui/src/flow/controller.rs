//! Identification & submission flow controller
//!
//! Drives the verify -> create-if-absent -> add -> refresh sequence for one
//! form instance. All state changes go through [`FlowState::reduce`].
//!
//! Operations take `&mut self`, so one controller runs at most one sequence
//! at a time; the `pending` flag additionally rejects re-entrant triggers.
//! Dropping an in-flight future abandons its result: the phase it started
//! is closed as failed and the controller accepts new requests.

use chant_common::api::{ApiReply, ChantEntry, RejectionKind, UserStats};
use chant_common::config::NetworkFailurePolicy;
use chant_common::identifier::{self, validate_username_confirmation};
use chant_common::{time, CanonicalId, ValidationError};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::form::ChantForm;
use super::state::{FlowEvent, FlowState, Mode, SubMode};
use crate::gateway::{ChantGateway, GatewayError};

/// Automatic user creation happens at most once per submission
pub const MAX_PROVISION_ATTEMPTS: u8 = 1;

const USERNAME_NOT_FOUND: &str =
    "Username not found. Please verify your username or create a new account.";
const USERNAME_TAKEN: &str = "This username already exists. Please choose a different username.";
const ADD_CHANT_FAILED: &str = "Error adding chant count. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure of a flow operation, recovered locally and shown as a notice
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    /// Blocked before any network call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A verification or submission is already in flight
    #[error("Please wait for the current request to finish")]
    Busy,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Transport failure talking to the backend
    #[error("{0}")]
    Network(String),

    /// Backend refused the request for some other reason
    #[error("{0}")]
    Rejected(String),
}

impl FlowError {
    pub fn notice(&self) -> Notice {
        Notice::error(self.to_string())
    }
}

/// Next call of the submission saga
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SagaStep {
    CreateUser,
    AddChant,
}

/// A verification or submission in progress
///
/// Holds the flow state while the gateway call is awaited. If the owning
/// future is dropped before [`InFlight::finish`] runs, the abandon event is
/// applied so the controller is not left pending.
struct InFlight<'a> {
    state: &'a mut FlowState,
    on_abandon: FlowEvent,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a mut FlowState, start: FlowEvent, on_abandon: FlowEvent) -> Self {
        transition(state, start);
        Self {
            state,
            on_abandon,
            finished: false,
        }
    }

    fn finish(mut self, event: FlowEvent) {
        transition(self.state, event);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(event = ?self.on_abandon, "In-flight request abandoned");
            transition(self.state, self.on_abandon);
        }
    }
}

fn transition(state: &mut FlowState, event: FlowEvent) {
    let next = state.reduce(event);
    debug!(?event, from = ?state.phase, to = ?next.phase, "Flow transition");
    *state = next;
}

/// Flow controller for one add-chant form
pub struct FlowController<G: ChantGateway> {
    gateway: Arc<G>,
    policy: NetworkFailurePolicy,
    state: FlowState,
    user_stats: Option<UserStats>,
    global_total: Option<u64>,
}

impl<G: ChantGateway> FlowController<G> {
    pub fn new(gateway: Arc<G>, policy: NetworkFailurePolicy) -> Self {
        Self {
            gateway,
            policy,
            state: FlowState::default(),
            user_stats: None,
            global_total: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn user_stats(&self) -> Option<&UserStats> {
        self.user_stats.as_ref()
    }

    pub fn global_total(&self) -> Option<u64> {
        self.global_total
    }

    pub fn policy(&self) -> NetworkFailurePolicy {
        self.policy
    }

    pub fn can_submit(&self) -> bool {
        self.state.can_submit()
    }

    fn apply(&mut self, event: FlowEvent) {
        transition(&mut self.state, event);
    }

    fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.state.pending {
            Err(FlowError::Busy)
        } else {
            Ok(())
        }
    }

    /// Switch identification mode; discards verification and stats
    pub fn select_mode(&mut self, mode: Mode, sub_mode: Option<SubMode>) {
        self.apply(FlowEvent::ModeSelected(mode, sub_mode));
        self.user_stats = None;
    }

    /// The identifier field changed; previous verification no longer applies
    pub fn edit_identifier(&mut self) {
        self.apply(FlowEvent::IdentifierEdited);
        self.user_stats = None;
    }

    /// Look up the identifier and load its totals
    ///
    /// Usernames must exist to verify. For phone numbers the lookup is
    /// informational: a failure never blocks submission.
    pub async fn verify(&mut self, raw_identifier: &str) -> Result<Notice, FlowError> {
        self.ensure_idle()?;
        let mode = self.state.mode;
        let raw = identifier::validate(raw_identifier, mode)?;
        let userid = identifier::normalize(raw);

        let in_flight = InFlight::begin(
            &mut self.state,
            FlowEvent::VerifyStarted,
            FlowEvent::VerifyFailed,
        );
        let result = match mode {
            Mode::Username => verify_username(&*self.gateway, &userid).await,
            Mode::Phone => lookup_phone(&*self.gateway, &userid).await,
        };

        match result {
            Ok(stats) => {
                let notice = match mode {
                    Mode::Phone => format!(
                        "Phone number verified! Your total count: {}",
                        stats.total_count
                    ),
                    Mode::Username => {
                        format!("Total count loaded! Your total count: {}", stats.total_count)
                    }
                };
                info!(userid = %userid, total = stats.total_count, "Identifier verified");
                self.user_stats = Some(stats);
                in_flight.finish(FlowEvent::VerifySucceeded { verified: true });
                Ok(Notice::success(notice))
            }
            Err(e) => {
                info!(userid = %userid, error = %e, "Verification failed");
                self.user_stats = None;
                in_flight.finish(FlowEvent::VerifyFailed);
                Err(e)
            }
        }
    }

    /// Submit the form, dated today if no date was entered
    pub async fn submit(&mut self, form: &mut ChantForm) -> Result<Notice, FlowError> {
        self.submit_as_of(form, time::today()).await
    }

    /// Submit the form with `today` as the current calendar day
    ///
    /// On success the form's count and date are cleared and both totals are
    /// refreshed.
    pub async fn submit_as_of(
        &mut self,
        form: &mut ChantForm,
        today: NaiveDate,
    ) -> Result<Notice, FlowError> {
        self.ensure_idle()?;
        let mode = self.state.mode;
        let entry = form.validate(mode, today)?;

        if mode == Mode::Username && self.state.sub_mode.is_none() {
            return Err(ValidationError::UserTypeUnset.into());
        }
        if self.state.requires_verification() && !self.state.verified {
            return Err(ValidationError::NotVerified.into());
        }

        let submission = Submission {
            gateway: &*self.gateway,
            policy: self.policy,
            mode,
            sub_mode: self.state.sub_mode,
        };
        let in_flight = InFlight::begin(
            &mut self.state,
            FlowEvent::SubmitStarted,
            FlowEvent::SubmitFailed,
        );

        let outcome = submission.run(&entry).await;
        match outcome {
            Ok(provisioned) => {
                in_flight.finish(FlowEvent::SubmitSucceeded);
                info!(
                    userid = %entry.userid,
                    date = %time::format_date(entry.date),
                    count = entry.count,
                    provisioned,
                    "Chant submitted"
                );
                form.clear_entry();
                self.refresh_after_submit(&entry.userid).await;

                let message = match (provisioned, mode) {
                    (false, _) => "Chant count added successfully!",
                    (true, Mode::Username) => {
                        "Username created and chant count added successfully!"
                    }
                    (true, Mode::Phone) => "User created and chant count added successfully!",
                };
                Ok(Notice::success(message))
            }
            Err(e) => {
                in_flight.finish(FlowEvent::SubmitFailed);
                info!(userid = %entry.userid, error = %e, "Chant submission failed");
                Err(e)
            }
        }
    }

    /// Claim a new username outright (create-username screen)
    ///
    /// On success the controller continues as a verified existing user.
    pub async fn create_username(
        &mut self,
        username: &str,
        confirmation: &str,
    ) -> Result<Notice, FlowError> {
        self.ensure_idle()?;
        let name = validate_username_confirmation(username, confirmation)?;
        let userid = identifier::normalize(name);

        self.apply(FlowEvent::ModeSelected(Mode::Username, Some(SubMode::New)));
        self.user_stats = None;
        let in_flight = InFlight::begin(
            &mut self.state,
            FlowEvent::VerifyStarted,
            FlowEvent::VerifyFailed,
        );

        let result = match self.gateway.create_user(&userid).await {
            Ok(ApiReply::Accepted { .. }) => Ok(()),
            Ok(ApiReply::Rejected {
                kind: RejectionKind::Conflict,
                ..
            }) => Err(FlowError::Conflict(USERNAME_TAKEN.to_string())),
            Ok(ApiReply::Rejected { message, .. }) => Err(FlowError::Rejected(message)),
            Err(e) => {
                warn!(error = %e, "Create username failed");
                Err(FlowError::Network(
                    "Error creating username. Please try again.".to_string(),
                ))
            }
        };

        match result {
            Ok(()) => {
                info!(userid = %userid, "Username claimed");
                in_flight.finish(FlowEvent::UsernameClaimed);
                Ok(Notice::success("Username created successfully!"))
            }
            Err(e) => {
                in_flight.finish(FlowEvent::VerifyFailed);
                Err(e)
            }
        }
    }

    /// Re-fetch both totals concurrently; the global read is best-effort
    async fn refresh_after_submit(&mut self, userid: &CanonicalId) {
        let gateway = Arc::clone(&self.gateway);
        let (user, global) = tokio::join!(gateway.user_total(userid), gateway.total_chants());
        self.store_user_stats(user);
        self.store_global_total(global);
    }

    /// Reload per-user totals
    pub async fn refresh_stats(&mut self, userid: &CanonicalId) -> Option<&UserStats> {
        let result = self.gateway.user_total(userid).await;
        self.store_user_stats(result);
        self.user_stats.as_ref()
    }

    /// Reload the global total; failures keep the previous value
    pub async fn refresh_global_total(&mut self) -> Option<u64> {
        let result = self.gateway.total_chants().await;
        self.store_global_total(result);
        self.global_total
    }

    fn store_user_stats(&mut self, result: Result<UserStats, GatewayError>) {
        match result {
            Ok(stats) => self.user_stats = Some(stats),
            Err(e) => {
                warn!(error = %e, "Could not load user stats");
                self.user_stats = None;
            }
        }
    }

    fn store_global_total(&mut self, result: Result<u64, GatewayError>) {
        match result {
            Ok(total) => self.global_total = Some(total),
            Err(e) => debug!(error = %e, "Could not load total chants"),
        }
    }
}

async fn verify_username<G: ChantGateway>(
    gateway: &G,
    userid: &CanonicalId,
) -> Result<UserStats, FlowError> {
    match gateway.user_exists(userid).await {
        Ok(true) => {}
        Ok(false) => return Err(FlowError::NotFound(USERNAME_NOT_FOUND.to_string())),
        Err(e) => {
            warn!(error = %e, "User existence check failed");
            return Err(FlowError::Network(
                "Error checking username. Please try again.".to_string(),
            ));
        }
    }

    gateway.user_total(userid).await.map_err(|e| {
        warn!(error = %e, "User total lookup failed");
        FlowError::NotFound("Username not found. Please check and try again.".to_string())
    })
}

async fn lookup_phone<G: ChantGateway>(
    gateway: &G,
    userid: &CanonicalId,
) -> Result<UserStats, FlowError> {
    gateway.user_total(userid).await.map_err(|e| {
        debug!(error = %e, "Phone total lookup failed");
        FlowError::NotFound(
            "Phone number not found in our records. You can still add your first chant count."
                .to_string(),
        )
    })
}

/// Create/add saga for one submission
struct Submission<'a, G: ChantGateway> {
    gateway: &'a G,
    policy: NetworkFailurePolicy,
    mode: Mode,
    sub_mode: Option<SubMode>,
}

impl<G: ChantGateway> Submission<'_, G> {
    /// Whether a missing user may be created automatically on this path
    fn may_provision(&self) -> bool {
        !(self.mode == Mode::Username && self.sub_mode == Some(SubMode::Existing))
    }

    fn claims_username(&self) -> bool {
        self.mode == Mode::Username && self.sub_mode == Some(SubMode::New)
    }

    /// Run create/add steps until the chant is recorded or the saga fails
    ///
    /// Returns whether a user was created along the way.
    async fn run(&self, entry: &ChantEntry) -> Result<bool, FlowError> {
        let mut step = if self.claims_username() {
            SagaStep::CreateUser
        } else {
            SagaStep::AddChant
        };
        let mut provision_attempts: u8 = 0;

        loop {
            match step {
                SagaStep::CreateUser => {
                    provision_attempts += 1;
                    self.create_user(&entry.userid).await?;
                    step = SagaStep::AddChant;
                }
                SagaStep::AddChant => {
                    let can_retry =
                        self.may_provision() && provision_attempts < MAX_PROVISION_ATTEMPTS;

                    match self.gateway.add_chant(entry).await {
                        Ok(ApiReply::Accepted { .. }) => return Ok(provision_attempts > 0),
                        Ok(ApiReply::Rejected {
                            kind: RejectionKind::NotFound,
                            message,
                        }) => {
                            if can_retry {
                                info!(userid = %entry.userid, "User not found, provisioning");
                                step = SagaStep::CreateUser;
                            } else if !self.may_provision() {
                                return Err(FlowError::NotFound(USERNAME_NOT_FOUND.to_string()));
                            } else {
                                return Err(FlowError::NotFound(message));
                            }
                        }
                        Ok(ApiReply::Rejected { message, .. }) => {
                            return Err(FlowError::Rejected(message));
                        }
                        Err(e) if e.is_transport() => {
                            if can_retry && self.policy == NetworkFailurePolicy::Provision {
                                warn!(
                                    userid = %entry.userid,
                                    error = %e,
                                    "Add chant failed in transport, provisioning per policy"
                                );
                                step = SagaStep::CreateUser;
                            } else {
                                return Err(self.transport_error(&e, provision_attempts));
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Add chant failed");
                            return Err(FlowError::Rejected(ADD_CHANT_FAILED.to_string()));
                        }
                    }
                }
            }
        }
    }

    fn transport_error(&self, e: &GatewayError, provision_attempts: u8) -> FlowError {
        warn!(error = %e, "Add chant failed in transport");
        let message = if provision_attempts > 0 {
            ADD_CHANT_FAILED
        } else if !self.may_provision() {
            "Error adding chant. Please check your username and try again."
        } else {
            "Error adding chant. Please try again."
        };
        FlowError::Network(message.to_string())
    }

    async fn create_user(&self, userid: &CanonicalId) -> Result<(), FlowError> {
        match self.gateway.create_user(userid).await {
            Ok(ApiReply::Accepted { .. }) => {
                info!(userid = %userid, "User created");
                Ok(())
            }
            Ok(ApiReply::Rejected {
                kind: RejectionKind::Conflict,
                message,
            }) => {
                if self.claims_username() {
                    Err(FlowError::Conflict(USERNAME_TAKEN.to_string()))
                } else {
                    Err(FlowError::Conflict(message))
                }
            }
            Ok(ApiReply::Rejected { message, .. }) => Err(FlowError::Rejected(message)),
            Err(e) => {
                warn!(error = %e, "Create user failed");
                Err(FlowError::Network(
                    "Error creating user. Please try again.".to_string(),
                ))
            }
        }
    }
}
