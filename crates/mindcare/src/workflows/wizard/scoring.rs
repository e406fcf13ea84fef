use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::StepCatalog;
use super::domain::{
    Answer, AnswerMap, FlowId, FlowInstanceId, FlowKind, SessionHandle, StepId, WizardError,
};
use super::gate::unsatisfied_steps;
use super::standard::{
    self, BOOKING_COUNSELOR_STEP, BOOKING_DURATION_STEP, BOOKING_MODE_STEP, BOOKING_REASON_STEP,
    BOOKING_SCHEDULE_STEP, BOOKING_URGENCY_STEP,
};

/// Coarse bucket derived from a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Low,
    Moderate,
    High,
}

impl SeverityBand {
    pub const LOW_CEILING: u8 = 25;
    pub const MODERATE_CEILING: u8 = 60;

    pub const fn ordered() -> [Self; 3] {
        [Self::Low, Self::Moderate, Self::High]
    }

    pub const fn from_percentage(percentage: u8) -> Self {
        if percentage <= Self::LOW_CEILING {
            Self::Low
        } else if percentage <= Self::MODERATE_CEILING {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub raw_score: u32,
    pub max_score: u32,
    pub percentage: u8,
    pub severity_band: SeverityBand,
}

/// Completion metadata wrapped around a derived result. The timestamp never feeds the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEnvelope<T> {
    pub instance_id: FlowInstanceId,
    pub flow_id: FlowId,
    pub owner: SessionHandle,
    pub result: T,
    pub completed_at: DateTime<Utc>,
}

/// Folds a finished assessment's answers into a [`ScoreResult`].
pub fn score_assessment(
    catalog: &StepCatalog,
    answers: &AnswerMap,
    today: NaiveDate,
) -> Result<ScoreResult, WizardError> {
    if catalog.kind() != FlowKind::Assessment {
        return Err(WizardError::FlowKindMismatch {
            flow_id: catalog.flow_id().clone(),
            expected: FlowKind::Assessment,
        });
    }

    let missing = unsatisfied_steps(catalog, answers, today);
    if !missing.is_empty() {
        return Err(WizardError::IncompleteFlow { missing });
    }

    let mut raw_score = 0u32;
    for step in catalog.steps() {
        let weight = match answers.get(&step.id) {
            Some(Answer::Choice { value }) => step.choice(value).map(|choice| choice.weight),
            _ => None,
        };
        let weight = weight.ok_or_else(|| WizardError::IncompleteFlow {
            missing: vec![step.id.clone()],
        })?;
        raw_score = raw_score.checked_add(weight).ok_or_else(|| {
            WizardError::InvalidConfiguration(format!(
                "assessment '{}' score overflows",
                catalog.flow_id()
            ))
        })?;
    }

    let max_score = catalog.max_score();
    if max_score == 0 {
        return Err(WizardError::InvalidConfiguration(format!(
            "assessment '{}' has no weighted choices",
            catalog.flow_id()
        )));
    }

    let percentage = rounded_percentage(raw_score, max_score);
    Ok(ScoreResult {
        raw_score,
        max_score,
        percentage,
        severity_band: SeverityBand::from_percentage(percentage),
    })
}

/// `round(100 * raw / max)` with halves rounded up, clamped to 100.
fn rounded_percentage(raw_score: u32, max_score: u32) -> u8 {
    let raw = u64::from(raw_score);
    let max = u64::from(max_score);
    let rounded = (200 * raw + max) / (2 * max);
    rounded.min(100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Online,
    InPerson,
}

impl SessionMode {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "online" => Some(Self::Online),
            "in_person" | "in-person" | "offline" => Some(Self::InPerson),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::InPerson => "In person",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Urgent,
}

impl Urgency {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

/// Finalized counselor booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSelection {
    pub counselor_ref: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u16,
    pub mode: SessionMode,
    pub reason_text: String,
    pub urgency: Urgency,
}

/// Partially collected booking read straight from the answer store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub counselor_ref: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<u16>,
    pub mode: Option<SessionMode>,
    pub reason_text: Option<String>,
    pub urgency: Option<Urgency>,
}

impl BookingDraft {
    pub fn from_answers(answers: &AnswerMap) -> Self {
        let choice = |step: &str| match answers.get(&StepId::from(step)) {
            Some(Answer::Choice { value }) => Some(value.clone()),
            _ => None,
        };

        let (date, time) = match answers.get(&StepId::from(BOOKING_SCHEDULE_STEP)) {
            Some(Answer::Schedule { date, time }) => (*date, *time),
            _ => (None, None),
        };

        let reason_text = match answers.get(&StepId::from(BOOKING_REASON_STEP)) {
            Some(Answer::Text { text }) => Some(text.trim().to_string()),
            _ => None,
        };

        Self {
            counselor_ref: choice(BOOKING_COUNSELOR_STEP),
            date,
            time,
            duration_minutes: choice(BOOKING_DURATION_STEP).and_then(|raw| raw.parse().ok()),
            mode: choice(BOOKING_MODE_STEP).and_then(|raw| SessionMode::from_value(&raw)),
            reason_text,
            urgency: choice(BOOKING_URGENCY_STEP).and_then(|raw| Urgency::from_value(&raw)),
        }
    }

    /// Counselor, date, time, and a non-empty reason are all present.
    pub fn is_finalizable(&self) -> bool {
        self.counselor_ref.is_some()
            && self.date.is_some()
            && self.time.is_some()
            && self
                .reason_text
                .as_deref()
                .is_some_and(|reason| !reason.is_empty())
    }

    fn missing_steps(&self) -> Vec<StepId> {
        let mut missing = Vec::new();
        if self.counselor_ref.is_none() {
            missing.push(StepId::from(BOOKING_COUNSELOR_STEP));
        }
        if self.date.is_none() || self.time.is_none() {
            missing.push(StepId::from(BOOKING_SCHEDULE_STEP));
        }
        if self.mode.is_none() {
            missing.push(StepId::from(BOOKING_MODE_STEP));
        }
        if self.duration_minutes.is_none() {
            missing.push(StepId::from(BOOKING_DURATION_STEP));
        }
        if self.urgency.is_none() {
            missing.push(StepId::from(BOOKING_URGENCY_STEP));
        }
        if self.reason_text.as_deref().map_or(true, str::is_empty) {
            missing.push(StepId::from(BOOKING_REASON_STEP));
        }
        missing
    }

    pub fn finalize(self) -> Result<BookingSelection, WizardError> {
        let missing = self.missing_steps();
        match self {
            BookingDraft {
                counselor_ref: Some(counselor_ref),
                date: Some(date),
                time: Some(time),
                duration_minutes: Some(duration_minutes),
                mode: Some(mode),
                reason_text: Some(reason_text),
                urgency: Some(urgency),
            } if missing.is_empty() => Ok(BookingSelection {
                counselor_ref,
                date,
                time,
                duration_minutes,
                mode,
                reason_text,
                urgency,
            }),
            _ => Err(WizardError::IncompleteFlow { missing }),
        }
    }
}

/// Gates the whole booking catalog, builds the [`BookingSelection`], and checks the
/// chosen slot against the counselor's published hours as of the local time `now`.
/// Counselors missing from the directory publish no hours and are not restricted.
pub fn summarize_booking(
    catalog: &StepCatalog,
    answers: &AnswerMap,
    now: NaiveDateTime,
) -> Result<BookingSelection, WizardError> {
    let today = now.date();
    if catalog.kind() != FlowKind::Booking {
        return Err(WizardError::FlowKindMismatch {
            flow_id: catalog.flow_id().clone(),
            expected: FlowKind::Booking,
        });
    }

    let missing = unsatisfied_steps(catalog, answers, today);
    if !missing.is_empty() {
        return Err(WizardError::IncompleteFlow { missing });
    }

    let selection = BookingDraft::from_answers(answers).finalize()?;
    ensure_slot_open(&selection, now)?;
    Ok(selection)
}

fn ensure_slot_open(selection: &BookingSelection, now: NaiveDateTime) -> Result<(), WizardError> {
    match standard::counselor(&selection.counselor_ref) {
        Some(listing) if !listing.offers(selection.date, selection.time, now) => {
            Err(WizardError::SlotUnavailable {
                counselor_ref: selection.counselor_ref.clone(),
                date: selection.date,
                time: selection.time,
            })
        }
        _ => Ok(()),
    }
}
