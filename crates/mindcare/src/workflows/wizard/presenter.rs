use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::domain::{FlowId, FlowInstanceId};
use super::instance::FlowSnapshot;
use super::repository::{booking_reference, CompletedFlowRecord, FlowOutcome, ResultStore};
use super::scoring::{BookingSelection, CompletionEnvelope, ScoreResult, SessionMode, SeverityBand};
use super::standard;

const IN_PERSON_LOCATION: &str = "Mental Health Center, Room 101";
const MEETING_ROOT: &str = "https://meet.mentalcare.com/room";

/// Lookup miss in a [`RecommendationTable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no recommendations for flow '{flow_id}' at {} severity", .band.label())]
pub struct MissingRecommendation {
    pub flow_id: FlowId,
    pub band: SeverityBand,
}

/// Advisory strings keyed by `(flow, band)`.
#[derive(Debug, Clone, Default)]
pub struct RecommendationTable {
    entries: HashMap<(FlowId, SeverityBand), Vec<String>>,
}

impl RecommendationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, flow_id: impl Into<FlowId>, band: SeverityBand, advice: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            (flow_id.into(), band),
            advice.into_iter().map(Into::into).collect(),
        );
    }

    pub fn lookup(&self, flow_id: &FlowId, band: SeverityBand) -> Result<&[String], MissingRecommendation> {
        self.entries
            .get(&(flow_id.clone(), band))
            .map(Vec::as_slice)
            .ok_or_else(|| MissingRecommendation {
                flow_id: flow_id.clone(),
                band,
            })
    }

    pub fn standard() -> Self {
        let mut table = Self::new();
        for (flow_id, band, advice) in STANDARD_RECOMMENDATIONS {
            table.insert(*flow_id, *band, advice.iter().copied());
        }
        table
    }
}

const STANDARD_RECOMMENDATIONS: &[(&str, SeverityBand, &[&str])] = &[
    ("depression", SeverityBand::Low, &[
        "Continue with healthy habits like regular exercise and good sleep",
        "Stay connected with supportive friends and family",
        "Practice gratitude and mindfulness exercises",
        "Monitor your mood and seek help if symptoms worsen",
    ]),
    ("depression", SeverityBand::Moderate, &[
        "Consider speaking with a counselor or therapist",
        "Establish a daily routine with physical activity",
        "Practice self-care activities you enjoy",
        "Reach out to trusted friends or support groups",
    ]),
    ("depression", SeverityBand::High, &[
        "Strongly consider professional help from a mental health provider",
        "Contact a crisis helpline if you have thoughts of self-harm",
        "Reach out to trusted friends, family, or support groups immediately",
        "Consider calling 988 (Suicide & Crisis Lifeline) if needed",
    ]),
    ("anxiety", SeverityBand::Low, &[
        "Practice deep breathing and relaxation techniques",
        "Maintain regular exercise and good sleep habits",
        "Limit caffeine and practice stress management",
        "Stay aware of your triggers and coping strategies",
    ]),
    ("anxiety", SeverityBand::Moderate, &[
        "Consider learning more anxiety management techniques",
        "Practice mindfulness and meditation regularly",
        "Consider talking to a counselor about your anxiety",
        "Join a support group or find others who understand",
    ]),
    ("anxiety", SeverityBand::High, &[
        "Consider professional treatment from a mental health provider",
        "Learn and practice anxiety management techniques daily",
        "Consider whether medication might be helpful",
        "Avoid isolation and maintain social connections",
    ]),
    ("stress", SeverityBand::Low, &[
        "Continue your current stress management practices",
        "Maintain work-life balance and regular relaxation",
        "Keep up with healthy lifestyle habits",
        "Stay aware of stress levels and early warning signs",
    ]),
    ("stress", SeverityBand::Moderate, &[
        "Implement better time management and organization",
        "Practice regular relaxation and stress-reduction techniques",
        "Consider what stressors you can reduce or eliminate",
        "Make sure you're getting adequate rest and recreation",
    ]),
    ("stress", SeverityBand::High, &[
        "Take immediate steps to reduce your stress load",
        "Consider professional help for stress management",
        "Prioritize self-care and say no to additional stressors",
        "Talk to someone about what's causing your stress",
    ]),
    ("social-media", SeverityBand::Low, &[
        "Continue being mindful of your social media usage",
        "Maintain healthy boundaries with technology",
        "Focus on real-world connections and activities",
        "Keep following accounts that inspire and uplift you",
    ]),
    ("social-media", SeverityBand::Moderate, &[
        "Set daily time limits for social media apps",
        "Turn off non-essential notifications",
        "Unfollow accounts that make you feel bad about yourself",
        "Practice taking regular breaks from social media",
    ]),
    ("social-media", SeverityBand::High, &[
        "Consider taking a social media break or detox",
        "Strictly limit your daily usage time",
        "Focus on real-world relationships and activities",
        "Consider talking to someone about your relationship with social media",
    ]),
    ("self-esteem", SeverityBand::Low, &[
        "Continue practicing self-acceptance and self-compassion",
        "Maintain positive relationships that support you",
        "Celebrate your achievements, both big and small",
        "Keep focusing on your strengths and growth",
    ]),
    ("self-esteem", SeverityBand::Moderate, &[
        "Practice daily positive self-affirmations",
        "Keep a journal of your accomplishments and positive qualities",
        "Surround yourself with supportive and encouraging people",
        "Consider working on specific self-esteem building activities",
    ]),
    ("self-esteem", SeverityBand::High, &[
        "Consider working with a therapist on self-esteem issues",
        "Challenge negative self-talk patterns actively",
        "Focus on your strengths and past achievements",
        "Consider joining a support group or finding others with similar experiences",
    ]),
    ("sleep", SeverityBand::Low, &[
        "Continue with your current good sleep habits",
        "Maintain a regular bedtime routine",
        "Keep your sleep environment comfortable",
        "Stay aware of factors that might affect your sleep",
    ]),
    ("sleep", SeverityBand::Moderate, &[
        "Implement better sleep hygiene practices",
        "Keep a consistent sleep schedule, even on weekends",
        "Limit screen time before bed",
        "Create a relaxing bedtime routine",
    ]),
    ("sleep", SeverityBand::High, &[
        "Consider consulting with a sleep specialist or doctor",
        "Establish a strict bedtime routine and sleep schedule",
        "Address any underlying stress or anxiety affecting sleep",
        "Consider whether your sleep environment needs improvement",
    ]),
];

/// Used whenever the table has no entry for the flow and band.
pub fn fallback_recommendations(band: SeverityBand) -> Vec<String> {
    let advice: &[&str] = match band {
        SeverityBand::Low => &[
            "Keep up the routines that are working for you",
            "Stay connected with people who support you",
            "Check in with yourself regularly and retake this assessment if things change",
        ],
        SeverityBand::Moderate => &[
            "Consider speaking with a counselor about what you are experiencing",
            "Build small, regular self-care activities into your week",
            "Reach out to trusted friends or a peer support volunteer",
        ],
        SeverityBand::High => &[
            "Please consider reaching out to a mental health professional soon",
            "Contact a crisis helpline if you feel unsafe",
            "Consider calling 988 (Suicide & Crisis Lifeline) if needed",
        ],
    };
    advice.iter().map(|line| line.to_string()).collect()
}

pub const fn severity_message(band: SeverityBand) -> &'static str {
    match band {
        SeverityBand::Low => {
            "Your responses suggest minimal concerns in this area. Keep up the good work!"
        }
        SeverityBand::Moderate => {
            "Your responses suggest some concerns that may benefit from attention and care."
        }
        SeverityBand::High => {
            "Your responses suggest significant concerns. Consider reaching out for professional support."
        }
    }
}

/// Rendered outcome of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    pub instance_id: FlowInstanceId,
    pub flow_id: FlowId,
    pub score: ScoreResult,
    pub severity_label: &'static str,
    pub message: &'static str,
    pub recommendations: Vec<String>,
    pub used_fallback: bool,
    /// High severity results surface crisis resources ahead of everything else.
    pub show_crisis_resources: bool,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Human-readable confirmation of a booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub booking_ref: String,
    pub selection: BookingSelection,
    pub counselor_name: String,
    pub summary: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PersistenceStatus {
    Stored,
    Failed(String),
}

impl PersistenceStatus {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// Presented artifact plus the outcome of handing it to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation<T> {
    pub artifact: T,
    pub persistence: PersistenceStatus,
    #[serde(skip)]
    pub record: CompletedFlowRecord,
}

/// Turns completed flows into reports and hands them to the result store.
pub struct ResultPresenter<S> {
    recommendations: RecommendationTable,
    store: Arc<S>,
}

impl<S> ResultPresenter<S>
where
    S: ResultStore + 'static,
{
    pub fn new(recommendations: RecommendationTable, store: Arc<S>) -> Self {
        Self {
            recommendations,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Never fails: a recommendation miss degrades to the generic list.
    pub fn assessment_report(&self, envelope: &CompletionEnvelope<ScoreResult>) -> AssessmentReport {
        let band = envelope.result.severity_band;
        let (recommendations, used_fallback) =
            match self.recommendations.lookup(&envelope.flow_id, band) {
                Ok(advice) => (advice.to_vec(), false),
                Err(miss) => {
                    warn!(%miss, "falling back to generic recommendations");
                    (fallback_recommendations(band), true)
                }
            };

        AssessmentReport {
            instance_id: envelope.instance_id.clone(),
            flow_id: envelope.flow_id.clone(),
            score: envelope.result,
            severity_label: band.label(),
            message: severity_message(band),
            recommendations,
            used_fallback,
            show_crisis_resources: band == SeverityBand::High,
            completed_at: envelope.completed_at,
        }
    }

    pub fn booking_confirmation(
        &self,
        envelope: &CompletionEnvelope<BookingSelection>,
    ) -> BookingConfirmation {
        let selection = envelope.result.clone();
        let booking_ref = booking_reference(&envelope.instance_id);
        let counselor_name = standard::counselor(&selection.counselor_ref)
            .map(|listing| listing.name.to_string())
            .unwrap_or_else(|| selection.counselor_ref.clone());

        let (meeting_link, location) = match selection.mode {
            SessionMode::Online => (Some(format!("{MEETING_ROOT}/{booking_ref}")), None),
            SessionMode::InPerson => (None, Some(IN_PERSON_LOCATION.to_string())),
        };

        let mut summary = vec![
            format!("Counselor: {counselor_name}"),
            format!("Date: {}", selection.date.format("%A, %B %-d, %Y")),
            format!(
                "Time: {} ({} minutes)",
                selection.time.format("%H:%M"),
                selection.duration_minutes
            ),
            format!("Session: {}", selection.mode.label()),
            format!("Urgency: {}", selection.urgency.label()),
        ];
        match (&meeting_link, &location) {
            (Some(link), _) => summary.push(format!("Meeting link: {link}")),
            (_, Some(place)) => summary.push(format!("Location: {place}")),
            _ => {}
        }

        BookingConfirmation {
            booking_ref,
            selection,
            counselor_name,
            summary,
            meeting_link,
            location,
        }
    }

    pub fn present_assessment(
        &self,
        snapshot: FlowSnapshot,
        envelope: &CompletionEnvelope<ScoreResult>,
    ) -> Presentation<AssessmentReport> {
        let artifact = self.assessment_report(envelope);
        let record = CompletedFlowRecord::new(
            snapshot,
            FlowOutcome::Assessment(envelope.result),
            envelope.completed_at,
        );
        let persistence = self.persist(&record);
        Presentation {
            artifact,
            persistence,
            record,
        }
    }

    pub fn present_booking(
        &self,
        snapshot: FlowSnapshot,
        envelope: &CompletionEnvelope<BookingSelection>,
    ) -> Presentation<BookingConfirmation> {
        let artifact = self.booking_confirmation(envelope);
        let record = CompletedFlowRecord::new(
            snapshot,
            FlowOutcome::Booking(envelope.result.clone()),
            envelope.completed_at,
        );
        let persistence = self.persist(&record);
        Presentation {
            artifact,
            persistence,
            record,
        }
    }

    /// Hands a record to the store. Safe to call again after a failure.
    pub fn persist(&self, record: &CompletedFlowRecord) -> PersistenceStatus {
        match self.store.save(record.clone()) {
            Ok(()) => PersistenceStatus::Stored,
            Err(err) => {
                warn!(instance_id = %record.instance_id(), %err, "failed to persist completed flow");
                PersistenceStatus::Failed(err.to_string())
            }
        }
    }
}
