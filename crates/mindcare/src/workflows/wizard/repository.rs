use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{FlowId, FlowInstanceId, FlowStatus, SessionHandle};
use super::instance::FlowSnapshot;
use super::scoring::{BookingSelection, ScoreResult};

/// Derived artifact of a finished flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowOutcome {
    Assessment(ScoreResult),
    Booking(BookingSelection),
}

/// Lifecycle of a stored record after the flow itself has completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Cancelled,
}

impl RecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Repository record pairing the instance snapshot with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedFlowRecord {
    pub snapshot: FlowSnapshot,
    pub outcome: FlowOutcome,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub record_status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl CompletedFlowRecord {
    pub fn new(snapshot: FlowSnapshot, outcome: FlowOutcome, completed_at: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            outcome,
            completed_at,
            record_status: RecordStatus::Active,
            cancelled_at: None,
        }
    }

    pub fn instance_id(&self) -> &FlowInstanceId {
        &self.snapshot.instance_id
    }

    pub fn owner(&self) -> &SessionHandle {
        &self.snapshot.owner
    }

    pub fn booking(&self) -> Option<&BookingSelection> {
        match &self.outcome {
            FlowOutcome::Booking(selection) => Some(selection),
            FlowOutcome::Assessment(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.record_status == RecordStatus::Cancelled
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.record_status = RecordStatus::Cancelled;
        self.cancelled_at = Some(at);
    }

    /// Booking summary with its start time; `None` for assessments.
    pub fn booking_view(&self) -> Option<BookingView> {
        self.booking().map(|selection| BookingView {
            instance_id: self.instance_id().clone(),
            booking_ref: booking_reference(self.instance_id()),
            starts_at: selection.date.and_time(selection.time),
            selection: selection.clone(),
            record_status: self.record_status,
            cancelled_at: self.cancelled_at,
        })
    }

    pub fn status_view(&self) -> CompletedFlowView {
        let (percentage, severity_band) = match &self.outcome {
            FlowOutcome::Assessment(score) => {
                (Some(score.percentage), Some(score.severity_band.label()))
            }
            FlowOutcome::Booking(_) => (None, None),
        };

        CompletedFlowView {
            instance_id: self.snapshot.instance_id.clone(),
            flow_id: self.snapshot.flow_id.clone(),
            status: self.snapshot.status,
            record_status: self.record_status,
            completed_at: self.completed_at,
            percentage,
            severity_band,
        }
    }
}

/// Storage abstraction so presentation can be exercised without a durable backend.
pub trait ResultStore: Send + Sync {
    fn save(&self, record: CompletedFlowRecord) -> Result<(), StoreError>;
    /// Replaces an existing record; `NotFound` when nothing was saved under its id.
    fn update(&self, record: CompletedFlowRecord) -> Result<(), StoreError>;
    fn fetch(&self, id: &FlowInstanceId) -> Result<Option<CompletedFlowRecord>, StoreError>;
    fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, StoreError>;
    /// Every record whose snapshot owner has `user_id`.
    fn for_owner(&self, user_id: &str) -> Result<Vec<CompletedFlowRecord>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

/// Public summary of a stored result.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedFlowView {
    pub instance_id: FlowInstanceId,
    pub flow_id: FlowId,
    pub status: FlowStatus,
    pub record_status: RecordStatus,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_band: Option<&'static str>,
}

pub fn booking_reference(instance_id: &FlowInstanceId) -> String {
    format!("booking-{instance_id}")
}

/// One booking as listed on a student's appointments page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub instance_id: FlowInstanceId,
    pub booking_ref: String,
    pub starts_at: NaiveDateTime,
    pub selection: BookingSelection,
    pub record_status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// A student's bookings split around the current local time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingSchedule {
    /// Active bookings that have not started, soonest first.
    pub upcoming: Vec<BookingView>,
    /// Started or cancelled bookings, most recent first.
    pub past: Vec<BookingView>,
}

impl BookingSchedule {
    pub fn split(records: &[CompletedFlowRecord], now: NaiveDateTime) -> Self {
        let (mut upcoming, mut past): (Vec<_>, Vec<_>) = records
            .iter()
            .filter_map(CompletedFlowRecord::booking_view)
            .partition(|view| view.record_status == RecordStatus::Active && view.starts_at > now);
        upcoming.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        past.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        Self { upcoming, past }
    }
}
