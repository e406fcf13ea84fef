use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::workflows::wizard::catalog::{CatalogRegistry, StepCatalog};
use crate::workflows::wizard::clock::{Clock, FixedClock};
use crate::workflows::wizard::domain::{Answer, AnswerMap, FlowId, FlowInstanceId, SessionHandle, StepId};
use crate::workflows::wizard::presenter::RecommendationTable;
use crate::workflows::wizard::repository::{CompletedFlowRecord, ResultStore, StoreError};
use crate::workflows::wizard::service::WizardService;
use crate::workflows::wizard::session::WizardSession;
use crate::workflows::wizard::standard::{
    self, BOOKING_COUNSELOR_STEP, BOOKING_REASON_STEP, BOOKING_SCHEDULE_STEP,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date")
}

pub(super) fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::on(today()))
}

pub(super) fn student() -> SessionHandle {
    SessionHandle::new("student-42", "Jordan")
}

pub(super) fn depression_catalog() -> Arc<StepCatalog> {
    CatalogRegistry::standard()
        .require(&FlowId::from("depression"))
        .expect("depression catalog registered")
}

pub(super) fn booking_catalog() -> Arc<StepCatalog> {
    Arc::new(standard::booking_catalog().expect("booking catalog builds"))
}

pub(super) fn depression_session() -> WizardSession {
    WizardSession::start(depression_catalog(), student(), clock())
}

pub(super) fn booking_session() -> WizardSession {
    WizardSession::start(booking_catalog(), student(), clock())
}

/// Every question of `catalog` answered with the same choice value.
pub(super) fn uniform_answers(catalog: &StepCatalog, value: &str) -> AnswerMap {
    catalog
        .steps()
        .iter()
        .map(|step| (step.id.clone(), Answer::choice(value)))
        .collect()
}

pub(super) fn booking_answers(reason: &str) -> AnswerMap {
    booking_answers_at(today().succ_opt().expect("valid date"), 10, reason)
}

/// Booking with counselor c1 on `date` at `hour`:00.
pub(super) fn booking_answers_at(date: NaiveDate, hour: u32, reason: &str) -> AnswerMap {
    let mut answers = AnswerMap::new();
    answers.insert(StepId::from(BOOKING_COUNSELOR_STEP), Answer::choice("c1"));
    answers.insert(
        StepId::from(BOOKING_SCHEDULE_STEP),
        Answer::schedule(
            date,
            NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"),
        ),
    );
    answers.insert(StepId::from(BOOKING_REASON_STEP), Answer::text(reason));
    answers
}

pub(super) fn build_service() -> (WizardService<MemoryResultStore>, Arc<MemoryResultStore>) {
    let store = Arc::new(MemoryResultStore::default());
    let service = WizardService::new(
        CatalogRegistry::standard(),
        RecommendationTable::standard(),
        store.clone(),
        clock(),
    );
    (service, store)
}

/// A second service over `store` whose clock reads 09:00 on `date`.
pub(super) fn service_on(
    store: &Arc<MemoryResultStore>,
    date: NaiveDate,
) -> WizardService<MemoryResultStore> {
    WizardService::new(
        CatalogRegistry::standard(),
        RecommendationTable::standard(),
        store.clone(),
        Arc::new(FixedClock::on(date)),
    )
}

#[derive(Default, Clone)]
pub(super) struct MemoryResultStore {
    pub(super) records: Arc<Mutex<HashMap<FlowInstanceId, CompletedFlowRecord>>>,
}

impl MemoryResultStore {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }
}

impl ResultStore for MemoryResultStore {
    fn save(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(record.instance_id()) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.instance_id().clone(), record);
        Ok(())
    }

    fn update(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if !guard.contains_key(record.instance_id()) {
            return Err(StoreError::NotFound);
        }
        guard.insert(record.instance_id().clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &FlowInstanceId) -> Result<Option<CompletedFlowRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records.truncate(limit);
        Ok(records)
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

/// Store that fails until `recover` is called.
#[derive(Default)]
pub(super) struct FlakyResultStore {
    pub(super) inner: MemoryResultStore,
    recovered: Mutex<bool>,
}

impl FlakyResultStore {
    pub(super) fn recover(&self) {
        *self.recovered.lock().expect("flag mutex poisoned") = true;
    }
}

impl ResultStore for FlakyResultStore {
    fn save(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        if *self.recovered.lock().expect("flag mutex poisoned") {
            self.inner.save(record)
        } else {
            Err(StoreError::Unavailable("database offline".to_string()))
        }
    }

    fn update(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        if *self.recovered.lock().expect("flag mutex poisoned") {
            self.inner.update(record)
        } else {
            Err(StoreError::Unavailable("database offline".to_string()))
        }
    }

    fn fetch(&self, id: &FlowInstanceId) -> Result<Option<CompletedFlowRecord>, StoreError> {
        self.inner.fetch(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, StoreError> {
        self.inner.recent(limit)
    }

    fn for_owner(&self, user_id: &str) -> Result<Vec<CompletedFlowRecord>, StoreError> {
        self.inner.for_owner(user_id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
