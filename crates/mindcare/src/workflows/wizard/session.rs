use std::sync::Arc;

use tracing::{debug, info};

use super::catalog::StepCatalog;
use super::clock::Clock;
use super::domain::{Answer, FlowKind, SessionHandle, Step, StepId, WizardError};
use super::events::{FlowEvent, FlowObserver, ObserverId, ObserverRegistry};
use super::gate;
use super::instance::FlowInstance;
use super::navigation::{Navigation, NavigationController};
use super::scoring::{self, BookingDraft, BookingSelection, CompletionEnvelope, ScoreResult};

/// UI-facing handle over one flow run: the instance, its shared catalog, and observers.
pub struct WizardSession {
    catalog: Arc<StepCatalog>,
    instance: FlowInstance,
    clock: Arc<dyn Clock>,
    navigator: NavigationController,
    observers: ObserverRegistry,
}

impl WizardSession {
    pub fn start(catalog: Arc<StepCatalog>, owner: SessionHandle, clock: Arc<dyn Clock>) -> Self {
        let instance = FlowInstance::new(&catalog, owner, clock.now());
        debug!(
            instance_id = %instance.id(),
            flow_id = %catalog.flow_id(),
            steps = catalog.len(),
            "wizard flow started"
        );

        Self {
            catalog,
            instance,
            clock,
            navigator: NavigationController::new(),
            observers: ObserverRegistry::default(),
        }
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn instance(&self) -> &FlowInstance {
        &self.instance
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.catalog.step(self.instance.current_step_index())
    }

    pub fn subscribe(&mut self, observer: Arc<dyn FlowObserver>) -> ObserverId {
        self.observers.register(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn answer(&mut self, step_id: impl Into<StepId>, answer: Answer) -> Result<(), WizardError> {
        let step_id = step_id.into();
        self.instance
            .record_answer(&self.catalog, step_id.clone(), answer)?;
        self.observers.emit(FlowEvent::AnswerRecorded { step_id });
        Ok(())
    }

    /// Answers whichever step the cursor is on.
    pub fn answer_current(&mut self, answer: Answer) -> Result<(), WizardError> {
        let step_id = self
            .current_step()
            .map(|step| step.id.clone())
            .ok_or_else(|| WizardError::InvalidConfiguration("cursor outside catalog".to_string()))?;
        self.answer(step_id, answer)
    }

    pub fn clear(&mut self, step_id: impl Into<StepId>) -> Result<(), WizardError> {
        let step_id = step_id.into();
        if self
            .instance
            .clear_answer(&self.catalog, &step_id)?
            .is_some()
        {
            self.observers.emit(FlowEvent::AnswerCleared { step_id });
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<Navigation, WizardError> {
        let result = self
            .navigator
            .advance(&self.catalog, &mut self.instance, self.clock.today());
        self.publish_navigation(&result);
        result
    }

    pub fn retreat(&mut self) -> Result<Navigation, WizardError> {
        let result = self.navigator.retreat(&self.catalog, &mut self.instance);
        self.publish_navigation(&result);
        result
    }

    pub fn jump_to(&mut self, index: usize) -> Result<Navigation, WizardError> {
        let result =
            self.navigator
                .jump_to(&self.catalog, &mut self.instance, index, self.clock.today());
        self.publish_navigation(&result);
        result
    }

    pub fn progress_fraction(&self) -> f64 {
        self.navigator
            .progress_fraction(&self.catalog, &self.instance)
    }

    pub fn is_current_step_satisfied(&self) -> bool {
        self.current_step()
            .map(|step| gate::is_step_satisfied(step, self.instance.answers(), self.clock.today()))
            .unwrap_or(false)
    }

    pub fn can_complete(&self) -> bool {
        gate::can_complete_flow(&self.catalog, self.instance.answers(), self.clock.today())
    }

    pub fn unanswered_steps(&self) -> Vec<StepId> {
        gate::unsatisfied_steps(&self.catalog, self.instance.answers(), self.clock.today())
    }

    /// Booking fields collected so far, whether or not the flow can finish yet.
    pub fn booking_draft(&self) -> BookingDraft {
        BookingDraft::from_answers(self.instance.answers())
    }

    /// Scores the assessment and closes the flow. A failure leaves the instance in progress.
    pub fn complete_assessment(&mut self) -> Result<CompletionEnvelope<ScoreResult>, WizardError> {
        self.ensure_kind(FlowKind::Assessment)?;
        self.instance.ensure_open()?;
        let result =
            scoring::score_assessment(&self.catalog, self.instance.answers(), self.clock.today())?;
        let envelope = self.finish(result);
        info!(
            instance_id = %envelope.instance_id,
            flow_id = %envelope.flow_id,
            percentage = envelope.result.percentage,
            band = envelope.result.severity_band.label(),
            "assessment completed"
        );
        Ok(envelope)
    }

    pub fn complete_booking(&mut self) -> Result<CompletionEnvelope<BookingSelection>, WizardError> {
        self.ensure_kind(FlowKind::Booking)?;
        self.instance.ensure_open()?;
        let selection =
            scoring::summarize_booking(&self.catalog, self.instance.answers(), self.clock.local_now())?;
        let envelope = self.finish(selection);
        info!(
            instance_id = %envelope.instance_id,
            counselor = %envelope.result.counselor_ref,
            date = %envelope.result.date,
            "booking completed"
        );
        Ok(envelope)
    }

    pub fn abandon(&mut self) -> Result<(), WizardError> {
        self.instance.abandon()?;
        self.observers.emit(FlowEvent::Abandoned {
            instance_id: self.instance.id().clone(),
        });
        Ok(())
    }

    fn finish<T>(&mut self, result: T) -> CompletionEnvelope<T> {
        let completed_at = self.clock.now();
        self.instance.mark_completed(completed_at);
        self.observers.emit(FlowEvent::Completed {
            instance_id: self.instance.id().clone(),
            flow_id: self.instance.flow_id().clone(),
        });

        CompletionEnvelope {
            instance_id: self.instance.id().clone(),
            flow_id: self.instance.flow_id().clone(),
            owner: self.instance.owner().clone(),
            result,
            completed_at,
        }
    }

    fn ensure_kind(&self, expected: FlowKind) -> Result<(), WizardError> {
        if self.catalog.kind() == expected {
            Ok(())
        } else {
            Err(WizardError::FlowKindMismatch {
                flow_id: self.catalog.flow_id().clone(),
                expected,
            })
        }
    }

    fn publish_navigation(&self, result: &Result<Navigation, WizardError>) {
        match result {
            Ok(Navigation::Moved { from, to }) => self.observers.emit(FlowEvent::StepChanged {
                from: *from,
                to: *to,
            }),
            Err(WizardError::InvalidJump { from, to }) => {
                debug!(
                    instance_id = %self.instance.id(),
                    from,
                    to,
                    "navigation rejected by validation gate"
                );
                self.observers.emit(FlowEvent::NavigationRejected {
                    from: *from,
                    to: *to,
                });
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardSession")
            .field("flow_id", self.catalog.flow_id())
            .field("instance", &self.instance)
            .field("observers", &self.observers)
            .finish()
    }
}
