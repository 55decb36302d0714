//! Identification and submission state
//!
//! [`FlowState`] is a plain value; [`FlowState::reduce`] is the only way it
//! changes. The controller feeds it events as user actions and network
//! responses arrive.

use chant_common::IdentifierKind;
use std::fmt;

/// How the user identifies themselves
pub type Mode = IdentifierKind;

/// Username sub-mode chosen on the user-type screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubMode {
    /// Continue with a previously claimed username
    Existing,
    /// Claim a new username
    New,
}

impl fmt::Display for SubMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubMode::Existing => f.write_str("existing"),
            SubMode::New => f.write_str("new"),
        }
    }
}

/// Progress of the current verification or submission sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Verifying,
    Verified,
    VerifyFailed,
    Submitting,
    Submitted,
    SubmitFailed,
}

impl Phase {
    /// A network sequence is in flight
    pub fn is_pending(self) -> bool {
        matches!(self, Phase::Verifying | Phase::Submitting)
    }
}

/// Inputs to [`FlowState::reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// Navigation to an identification mode; resets everything else
    ModeSelected(Mode, Option<SubMode>),
    /// The identifier field changed
    IdentifierEdited,
    VerifyStarted,
    /// `verified` records whether the identity now counts as confirmed
    VerifySucceeded { verified: bool },
    VerifyFailed,
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed,
    /// A username was claimed outright, so it is now a verified existing one
    UsernameClaimed,
}

/// State owned by one flow controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowState {
    pub mode: Mode,
    pub sub_mode: Option<SubMode>,
    pub phase: Phase,
    pub verified: bool,
    pub pending: bool,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new(Mode::Phone, None)
    }
}

impl FlowState {
    pub fn new(mode: Mode, sub_mode: Option<SubMode>) -> Self {
        Self {
            mode,
            sub_mode,
            phase: Phase::Idle,
            verified: false,
            pending: false,
        }
    }

    /// Verification must succeed before a submission is allowed
    pub fn requires_verification(&self) -> bool {
        self.mode == Mode::Username && self.sub_mode == Some(SubMode::Existing)
    }

    /// Submit button enabled
    pub fn can_submit(&self) -> bool {
        if self.pending {
            return false;
        }
        match self.mode {
            Mode::Phone => true,
            Mode::Username => match self.sub_mode {
                Some(SubMode::Existing) => self.verified,
                Some(SubMode::New) => true,
                None => false,
            },
        }
    }

    /// Apply one event, producing the next state
    pub fn reduce(self, event: FlowEvent) -> FlowState {
        match event {
            FlowEvent::ModeSelected(mode, sub_mode) => {
                // Sub-modes only exist for usernames
                let sub_mode = if mode == Mode::Username { sub_mode } else { None };
                FlowState::new(mode, sub_mode)
            }
            FlowEvent::IdentifierEdited => FlowState {
                phase: Phase::Idle,
                verified: false,
                pending: false,
                ..self
            },
            FlowEvent::VerifyStarted => FlowState {
                phase: Phase::Verifying,
                pending: true,
                ..self
            },
            FlowEvent::VerifySucceeded { verified } => FlowState {
                phase: Phase::Verified,
                verified,
                pending: false,
                ..self
            },
            FlowEvent::VerifyFailed => FlowState {
                phase: Phase::VerifyFailed,
                verified: false,
                pending: false,
                ..self
            },
            FlowEvent::SubmitStarted => FlowState {
                phase: Phase::Submitting,
                pending: true,
                ..self
            },
            FlowEvent::SubmitSucceeded => FlowState {
                phase: Phase::Submitted,
                pending: false,
                ..self
            },
            FlowEvent::SubmitFailed => FlowState {
                phase: Phase::SubmitFailed,
                pending: false,
                ..self
            },
            FlowEvent::UsernameClaimed => FlowState {
                mode: Mode::Username,
                sub_mode: Some(SubMode::Existing),
                phase: Phase::Verified,
                verified: true,
                pending: false,
            },
        }
    }
}
