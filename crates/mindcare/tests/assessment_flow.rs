//! End-to-end assessment runs through the public wizard facade.
//!
//! Each scenario drives a session step by step the way a UI would, then checks the scored
//! report and what reached the result store.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use mindcare::workflows::wizard::{
        CompletedFlowRecord, FixedClock, FlowInstanceId, ResultStore, SessionHandle, StoreError,
    };

    pub(super) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date")
    }

    pub(super) fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::on(today()))
    }

    pub(super) fn student() -> SessionHandle {
        SessionHandle::new("student-42", "Jordan")
    }

    #[derive(Default)]
    pub(super) struct MemoryResultStore {
        records: Mutex<HashMap<FlowInstanceId, CompletedFlowRecord>>,
    }

    impl ResultStore for MemoryResultStore {
        fn save(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
            self.records
                .lock()
                .expect("store mutex poisoned")
                .insert(record.instance_id().clone(), record);
            Ok(())
        }

        fn fetch(&self, id: &FlowInstanceId) -> Result<Option<CompletedFlowRecord>, StoreError> {
            Ok(self
                .records
                .lock()
                .expect("store mutex poisoned")
                .get(id)
                .cloned())
        }

        fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, StoreError> {
            let guard = self.records.lock().expect("store mutex poisoned");
            Ok(guard.values().take(limit).cloned().collect())
        }

        fn update(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            match guard.get_mut(record.instance_id()) {
                Some(existing) => {
                    *existing = record;
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            }
        }

        fn for_owner(&self, user_id: &str) -> Result<Vec<CompletedFlowRecord>, StoreError> {
            let guard = self.records.lock().expect("store mutex poisoned");
            Ok(guard
                .values()
                .filter(|record| record.owner().user_id == user_id)
                .cloned()
                .collect())
        }
    }
}

use std::sync::Arc;

use common::*;
use mindcare::workflows::wizard::{
    Answer, CatalogRegistry, CompletionEnvelope, FlowId, FlowStatus, Navigation,
    PersistenceStatus, RecommendationTable, ResultPresenter, ResultStore, ScoreResult,
    SeverityBand, WizardError, WizardSession,
};

fn run_depression(value: &str) -> (WizardSession, ScoreResult) {
    let catalog = CatalogRegistry::standard()
        .require(&FlowId::from("depression"))
        .expect("depression registered");
    let mut session = WizardSession::start(catalog, student(), clock());

    loop {
        session
            .answer_current(Answer::choice(value))
            .expect("answer accepted");
        match session.advance().expect("gate passes") {
            Navigation::Moved { .. } => continue,
            Navigation::AtTerminal => break,
            Navigation::AtStart => unreachable!("advance never reports the start"),
        }
    }

    let envelope = session.complete_assessment().expect("assessment completes");
    (session, envelope.result)
}

#[test]
fn moderate_result_for_all_sometimes() {
    let (_, result) = run_depression("sometimes");
    assert_eq!(
        (result.raw_score, result.max_score, result.percentage),
        (9, 27, 33)
    );
    assert_eq!(result.severity_band, SeverityBand::Moderate);
}

#[test]
fn low_result_for_all_never() {
    let (_, result) = run_depression("never");
    assert_eq!(result.raw_score, 0);
    assert_eq!(result.percentage, 0);
    assert_eq!(result.severity_band, SeverityBand::Low);
}

#[test]
fn high_result_for_all_always() {
    let (session, result) = run_depression("always");
    assert_eq!(result.raw_score, 27);
    assert_eq!(result.percentage, 100);
    assert_eq!(result.severity_band, SeverityBand::High);
    assert_eq!(session.instance().status(), FlowStatus::Completed);
}

#[test]
fn unanswered_step_blocks_advance_without_moving() {
    let catalog = CatalogRegistry::standard()
        .require(&FlowId::from("anxiety"))
        .expect("anxiety registered");
    let mut session = WizardSession::start(catalog, student(), clock());

    assert_eq!(
        session.advance(),
        Err(WizardError::InvalidJump { from: 0, to: 1 })
    );
    assert_eq!(session.instance().current_step_index(), 0);
}

#[test]
fn completed_assessment_is_presented_and_stored() {
    let (session, result) = run_depression("often");
    let store = Arc::new(MemoryResultStore::default());
    let presenter = ResultPresenter::new(RecommendationTable::standard(), store.clone());
    let envelope = CompletionEnvelope {
        instance_id: session.instance().id().clone(),
        flow_id: session.instance().flow_id().clone(),
        owner: student(),
        result,
        completed_at: session.instance().completed_at().expect("completed"),
    };

    let presentation = presenter.present_assessment(session.instance().snapshot(), &envelope);

    assert_eq!(presentation.persistence, PersistenceStatus::Stored);
    assert_eq!(presentation.artifact.severity_label, "High");
    assert_eq!(presentation.artifact.recommendations.len(), 4);
    let stored = store
        .fetch(&envelope.instance_id)
        .expect("fetch")
        .expect("stored");
    assert_eq!(stored.snapshot.status, FlowStatus::Completed);
    assert_eq!(stored.status_view().percentage, Some(67));
}
