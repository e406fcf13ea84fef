use std::sync::Arc;

use tracing::info;

use super::catalog::{CatalogRegistry, CatalogSummary, StepCatalog};
use super::clock::{Clock, SystemClock};
use super::domain::{AnswerMap, FlowId, FlowInstanceId, FlowKind, SessionHandle, WizardError};
use super::navigation::Navigation;
use super::presenter::{
    AssessmentReport, BookingConfirmation, Presentation, RecommendationTable, ResultPresenter,
};
use super::repository::{BookingSchedule, CompletedFlowRecord, ResultStore, StoreError};
use super::session::WizardSession;
use super::standard::BOOKING_FLOW;

/// Service composing the catalog registry, clock, and result presenter.
pub struct WizardService<S> {
    catalogs: Arc<CatalogRegistry>,
    clock: Arc<dyn Clock>,
    presenter: ResultPresenter<S>,
}

impl<S> WizardService<S>
where
    S: ResultStore + 'static,
{
    pub fn new(
        catalogs: CatalogRegistry,
        recommendations: RecommendationTable,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalogs: Arc::new(catalogs),
            clock,
            presenter: ResultPresenter::new(recommendations, store),
        }
    }

    /// Built-in catalogs and advice, evaluated against the system clock.
    pub fn standard(store: Arc<S>) -> Self {
        Self::new(
            CatalogRegistry::standard(),
            RecommendationTable::standard(),
            store,
            Arc::new(SystemClock),
        )
    }

    pub fn catalogs(&self) -> Vec<CatalogSummary> {
        self.catalogs.summaries()
    }

    pub fn catalog(&self, flow_id: &FlowId) -> Result<Arc<StepCatalog>, WizardServiceError> {
        Ok(self.catalogs.require(flow_id)?)
    }

    pub fn presenter(&self) -> &ResultPresenter<S> {
        &self.presenter
    }

    /// Opens an interactive session for callers that drive steps one at a time.
    pub fn start(
        &self,
        flow_id: &FlowId,
        owner: SessionHandle,
    ) -> Result<WizardSession, WizardServiceError> {
        let catalog = self.catalogs.require(flow_id)?;
        Ok(WizardSession::start(catalog, owner, Arc::clone(&self.clock)))
    }

    /// Runs a full answer set through every gate, scores it, and stores the result.
    pub fn submit_assessment(
        &self,
        flow_id: &FlowId,
        owner: SessionHandle,
        answers: AnswerMap,
    ) -> Result<Presentation<AssessmentReport>, WizardServiceError> {
        let mut session = self.prepare(flow_id, FlowKind::Assessment, owner, answers)?;
        let envelope = session.complete_assessment()?;
        let presentation = self
            .presenter
            .present_assessment(session.instance().snapshot(), &envelope);

        info!(
            instance_id = %envelope.instance_id,
            flow_id = %envelope.flow_id,
            stored = presentation.persistence.is_stored(),
            "assessment submission processed"
        );
        Ok(presentation)
    }

    /// Answers are layered over the booking defaults before gating.
    pub fn submit_booking(
        &self,
        owner: SessionHandle,
        answers: AnswerMap,
    ) -> Result<Presentation<BookingConfirmation>, WizardServiceError> {
        let flow_id = FlowId::from(BOOKING_FLOW);
        let mut session = self.prepare(&flow_id, FlowKind::Booking, owner, answers)?;
        let envelope = session.complete_booking()?;
        let presentation = self
            .presenter
            .present_booking(session.instance().snapshot(), &envelope);

        info!(
            instance_id = %envelope.instance_id,
            booking_ref = %presentation.artifact.booking_ref,
            stored = presentation.persistence.is_stored(),
            "booking submission processed"
        );
        Ok(presentation)
    }

    pub fn result(
        &self,
        instance_id: &FlowInstanceId,
    ) -> Result<CompletedFlowRecord, WizardServiceError> {
        let record = self
            .presenter
            .store()
            .fetch(instance_id)?
            .ok_or(StoreError::NotFound)?;
        Ok(record)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, WizardServiceError> {
        Ok(self.presenter.store().recent(limit)?)
    }

    /// The owner's bookings split into upcoming and past as of the clock's local time.
    pub fn bookings_for(&self, user_id: &str) -> Result<BookingSchedule, WizardServiceError> {
        let records = self.presenter.store().for_owner(user_id)?;
        Ok(BookingSchedule::split(&records, self.clock.local_now()))
    }

    /// Marks an upcoming booking cancelled. Only the student who booked it may cancel.
    pub fn cancel_booking(
        &self,
        instance_id: &FlowInstanceId,
        owner: &SessionHandle,
    ) -> Result<CompletedFlowRecord, WizardServiceError> {
        let mut record = self.result(instance_id)?;
        let starts_at = match record.booking() {
            Some(selection) => selection.date.and_time(selection.time),
            None => return Err(WizardError::NotABooking(instance_id.clone()).into()),
        };
        if record.owner().user_id != owner.user_id {
            return Err(WizardError::NotOwner(instance_id.clone()).into());
        }
        if record.is_cancelled() {
            return Err(WizardError::AlreadyCancelled(instance_id.clone()).into());
        }
        if starts_at <= self.clock.local_now() {
            return Err(WizardError::BookingStarted(instance_id.clone()).into());
        }

        record.cancel(self.clock.now());
        self.presenter.store().update(record.clone())?;
        info!(%instance_id, user_id = %owner.user_id, "booking cancelled");
        Ok(record)
    }

    fn prepare(
        &self,
        flow_id: &FlowId,
        kind: FlowKind,
        owner: SessionHandle,
        answers: AnswerMap,
    ) -> Result<WizardSession, WizardServiceError> {
        let catalog = self.catalogs.require(flow_id)?;
        if catalog.kind() != kind {
            return Err(WizardError::FlowKindMismatch {
                flow_id: flow_id.clone(),
                expected: kind,
            }
            .into());
        }

        let mut session = WizardSession::start(catalog, owner, Arc::clone(&self.clock));
        for (step_id, answer) in answers {
            session.answer(step_id, answer)?;
        }

        let missing = session.unanswered_steps();
        if !missing.is_empty() {
            return Err(WizardError::IncompleteFlow { missing }.into());
        }

        while let Navigation::Moved { .. } = session.advance()? {}
        Ok(session)
    }
}

/// Error raised by the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum WizardServiceError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
