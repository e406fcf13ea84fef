use std::sync::Arc;

use serde::Serialize;

use super::domain::{FlowId, FlowInstanceId, StepId};

/// State change emitted to observers after the mutation has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    AnswerRecorded { step_id: StepId },
    AnswerCleared { step_id: StepId },
    StepChanged { from: usize, to: usize },
    NavigationRejected { from: usize, to: usize },
    Completed { instance_id: FlowInstanceId, flow_id: FlowId },
    Abandoned { instance_id: FlowInstanceId },
}

/// UI-side subscriber to a wizard session.
pub trait FlowObserver: Send + Sync {
    fn on_event(&self, event: &FlowEvent);
}

impl<F> FlowObserver for F
where
    F: Fn(&FlowEvent) + Send + Sync,
{
    fn on_event(&self, event: &FlowEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn FlowObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, observer: Arc<dyn FlowObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn emit(&self, event: FlowEvent) {
        for (_, observer) in &self.observers {
            observer.on_event(&event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
