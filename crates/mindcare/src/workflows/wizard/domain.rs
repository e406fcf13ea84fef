use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier of a step, unique within its flow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for StepId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier selecting which catalog a flow runs against (e.g. `depression`, `booking`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub String);

impl From<&str> for FlowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one run of a flow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowInstanceId(pub String);

impl fmt::Display for FlowInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Assessment,
    Booking,
}

impl FlowKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assessment => "Assessment",
            Self::Booking => "Booking",
        }
    }
}

/// Shape of input a step collects. Validation branches on this, never on content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    SingleChoice,
    FreeText,
    DateTimePair,
}

impl InputKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SingleChoice => "single choice",
            Self::FreeText => "free text",
            Self::DateTimePair => "date and time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub weight: u32,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>, weight: u32) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub prompt: String,
    pub input_kind: InputKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Choice value pre-selected when a flow starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_choice: Option<String>,
}

impl Step {
    pub fn single_choice(id: impl Into<StepId>, prompt: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            input_kind: InputKind::SingleChoice,
            choices,
            default_choice: None,
        }
    }

    pub fn free_text(id: impl Into<StepId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            input_kind: InputKind::FreeText,
            choices: Vec::new(),
            default_choice: None,
        }
    }

    pub fn date_time(id: impl Into<StepId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            input_kind: InputKind::DateTimePair,
            choices: Vec::new(),
            default_choice: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_choice = Some(value.into());
        self
    }

    pub fn choice(&self, value: &str) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.value == value)
    }

    pub fn max_weight(&self) -> u32 {
        self.choices
            .iter()
            .map(|choice| choice.weight)
            .max()
            .unwrap_or(0)
    }
}

/// A user's current input for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Choice {
        value: String,
    },
    Text {
        text: String,
    },
    Schedule {
        #[serde(default)]
        date: Option<NaiveDate>,
        #[serde(default)]
        time: Option<NaiveTime>,
    },
}

impl Answer {
    pub fn choice(value: impl Into<String>) -> Self {
        Self::Choice {
            value: value.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn schedule(date: NaiveDate, time: NaiveTime) -> Self {
        Self::Schedule {
            date: Some(date),
            time: Some(time),
        }
    }

    pub const fn input_kind(&self) -> InputKind {
        match self {
            Self::Choice { .. } => InputKind::SingleChoice,
            Self::Text { .. } => InputKind::FreeText,
            Self::Schedule { .. } => InputKind::DateTimePair,
        }
    }
}

pub type AnswerMap = BTreeMap<StepId, Answer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl FlowStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Explicitly passed identity of the person driving a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub user_id: String,
    pub display_name: String,
}

impl SessionHandle {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous", "Anonymous Student")
    }
}

/// Errors raised by the wizard engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("cannot move from step {from} to step {to}")]
    InvalidJump { from: usize, to: usize },
    #[error("flow is incomplete; unanswered steps: {}", join_ids(.missing))]
    IncompleteFlow { missing: Vec<StepId> },
    #[error("invalid flow configuration: {0}")]
    InvalidConfiguration(String),
    #[error("step '{0}' is not part of this flow")]
    UnknownStep(StepId),
    #[error("flow '{0}' is not registered")]
    UnknownFlow(FlowId),
    #[error("step '{step_id}' expects a {} answer", .expected.label())]
    AnswerKindMismatch { step_id: StepId, expected: InputKind },
    #[error("flow is {} and can no longer change", .status.label())]
    FlowClosed { status: FlowStatus },
    #[error("flow '{flow_id}' is not a {} flow", .expected.label())]
    FlowKindMismatch { flow_id: FlowId, expected: FlowKind },
    #[error("counselor '{counselor_ref}' has no open slot on {date} at {}", .time.format("%H:%M"))]
    SlotUnavailable {
        counselor_ref: String,
        date: NaiveDate,
        time: NaiveTime,
    },
    #[error("result '{0}' is not a booking")]
    NotABooking(FlowInstanceId),
    #[error("booking '{0}' belongs to another student")]
    NotOwner(FlowInstanceId),
    #[error("booking '{0}' is already cancelled")]
    AlreadyCancelled(FlowInstanceId),
    #[error("booking '{0}' has already started")]
    BookingStarted(FlowInstanceId),
}

fn join_ids(ids: &[StepId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
