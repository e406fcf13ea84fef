//! Linear step-wizard engine behind the self-assessments and counselor booking.
//!
//! A [`StepCatalog`] describes one flow. A [`WizardSession`] drives a single
//! [`FlowInstance`] through it, gating forward moves on each step's answer, and
//! the terminal step reduces the collected answers into a [`ScoreResult`] or a
//! [`BookingSelection`] that the [`ResultPresenter`] renders and persists.

pub mod catalog;
pub mod clock;
pub mod domain;
pub mod events;
pub mod gate;
pub mod instance;
pub mod navigation;
pub mod presenter;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod standard;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogDefinition, CatalogRegistry, CatalogSummary, StepCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Answer, AnswerMap, Choice, FlowId, FlowInstanceId, FlowKind, FlowStatus, InputKind,
    SessionHandle, Step, StepId, WizardError,
};
pub use events::{FlowEvent, FlowObserver, ObserverId};
pub use instance::{FlowInstance, FlowSnapshot};
pub use navigation::{Navigation, NavigationController};
pub use presenter::{
    AssessmentReport, BookingConfirmation, MissingRecommendation, PersistenceStatus,
    Presentation, RecommendationTable, ResultPresenter,
};
pub use repository::{
    booking_reference, BookingSchedule, BookingView, CompletedFlowRecord, CompletedFlowView,
    FlowOutcome, RecordStatus, ResultStore, StoreError,
};
pub use router::{wizard_router, CancellationRequest, SubmissionRequest};
pub use scoring::{
    BookingDraft, BookingSelection, CompletionEnvelope, ScoreResult, SessionMode, SeverityBand,
    Urgency,
};
pub use service::{WizardService, WizardServiceError};
pub use session::WizardSession;
