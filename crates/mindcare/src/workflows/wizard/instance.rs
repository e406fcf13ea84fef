use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::StepCatalog;
use super::domain::{
    Answer, AnswerMap, FlowId, FlowInstanceId, FlowStatus, SessionHandle, StepId, WizardError,
};

static FLOW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> FlowInstanceId {
    let id = FLOW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FlowInstanceId(format!("flow-{id:06}"))
}

/// One user's run through a catalog. Owns its answers and cursor exclusively.
#[derive(Debug, Clone)]
pub struct FlowInstance {
    id: FlowInstanceId,
    flow_id: FlowId,
    owner: SessionHandle,
    current_step_index: usize,
    answers: AnswerMap,
    status: FlowStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Serializable view of an instance for persistence and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    pub instance_id: FlowInstanceId,
    pub flow_id: FlowId,
    pub owner: SessionHandle,
    pub answers: AnswerMap,
    pub status: FlowStatus,
    pub started_at: DateTime<Utc>,
}

impl FlowInstance {
    /// Starts at step 0 with any catalog defaults pre-selected.
    pub fn new(catalog: &StepCatalog, owner: SessionHandle, started_at: DateTime<Utc>) -> Self {
        let answers = catalog
            .steps()
            .iter()
            .filter_map(|step| {
                step.default_choice
                    .as_ref()
                    .map(|value| (step.id.clone(), Answer::choice(value.clone())))
            })
            .collect();

        Self {
            id: next_instance_id(),
            flow_id: catalog.flow_id().clone(),
            owner,
            current_step_index: 0,
            answers,
            status: FlowStatus::InProgress,
            started_at,
            completed_at: None,
        }
    }

    pub fn id(&self) -> &FlowInstanceId {
        &self.id
    }

    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    pub fn owner(&self) -> &SessionHandle {
        &self.owner
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer(&self, step_id: &StepId) -> Option<&Answer> {
        self.answers.get(step_id)
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_open(&self) -> bool {
        self.status == FlowStatus::InProgress
    }

    pub(crate) fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(WizardError::FlowClosed {
                status: self.status,
            })
        }
    }

    /// Replaces the answer for `step_id`. The shape must match the step's input kind.
    pub fn record_answer(
        &mut self,
        catalog: &StepCatalog,
        step_id: StepId,
        answer: Answer,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.ensure_catalog(catalog)?;

        let step = catalog
            .find(&step_id)
            .ok_or_else(|| WizardError::UnknownStep(step_id.clone()))?;
        if step.input_kind != answer.input_kind() {
            return Err(WizardError::AnswerKindMismatch {
                step_id,
                expected: step.input_kind,
            });
        }

        self.answers.insert(step_id, answer);
        Ok(())
    }

    pub fn clear_answer(
        &mut self,
        catalog: &StepCatalog,
        step_id: &StepId,
    ) -> Result<Option<Answer>, WizardError> {
        self.ensure_open()?;
        self.ensure_catalog(catalog)?;
        if catalog.find(step_id).is_none() {
            return Err(WizardError::UnknownStep(step_id.clone()));
        }
        Ok(self.answers.remove(step_id))
    }

    pub fn abandon(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.status = FlowStatus::Abandoned;
        Ok(())
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            instance_id: self.id.clone(),
            flow_id: self.flow_id.clone(),
            owner: self.owner.clone(),
            answers: self.answers.clone(),
            status: self.status,
            started_at: self.started_at,
        }
    }

    pub(crate) fn set_current_step(&mut self, index: usize) {
        self.current_step_index = index;
    }

    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = FlowStatus::Completed;
        self.completed_at = Some(at);
    }

    pub(crate) fn ensure_catalog(&self, catalog: &StepCatalog) -> Result<(), WizardError> {
        if catalog.flow_id() == &self.flow_id {
            Ok(())
        } else {
            Err(WizardError::InvalidConfiguration(format!(
                "catalog '{}' does not drive flow '{}'",
                catalog.flow_id(),
                self.flow_id
            )))
        }
    }
}
