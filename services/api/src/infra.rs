use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use mindcare::workflows::wizard::{
    Answer, AnswerMap, CompletedFlowRecord, FlowInstanceId, ResultStore, StepCatalog, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoredResults {
    records: HashMap<FlowInstanceId, CompletedFlowRecord>,
    order: Vec<FlowInstanceId>,
}

/// Process-local result store backing the HTTP service and CLI demos.
#[derive(Default, Clone)]
pub(crate) struct InMemoryResultStore {
    inner: Arc<Mutex<StoredResults>>,
}

impl InMemoryResultStore {
    fn guard(&self) -> Result<MutexGuard<'_, StoredResults>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("result store mutex poisoned".to_string()))
    }
}

impl ResultStore for InMemoryResultStore {
    fn save(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        let mut guard = self.guard()?;
        let id = record.instance_id().clone();
        if guard.records.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        guard.order.push(id.clone());
        guard.records.insert(id, record);
        Ok(())
    }

    fn update(&self, record: CompletedFlowRecord) -> Result<(), StoreError> {
        let mut guard = self.guard()?;
        match guard.records.get_mut(record.instance_id()) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn fetch(&self, id: &FlowInstanceId) -> Result<Option<CompletedFlowRecord>, StoreError> {
        Ok(self.guard()?.records.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CompletedFlowRecord>, StoreError> {
        let guard = self.guard()?;
        Ok(guard
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| guard.records.get(id).cloned())
            .collect())
    }

    fn for_owner(&self, user_id: &str) -> Result<Vec<CompletedFlowRecord>, StoreError> {
        let guard = self.guard()?;
        Ok(guard
            .order
            .iter()
            .filter_map(|id| guard.records.get(id))
            .filter(|record| record.owner().user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Pairs comma separated choice values with the catalog's steps by position.
/// An empty entry leaves its step unanswered.
pub(crate) fn answers_from_values(catalog: &StepCatalog, raw: &str) -> AnswerMap {
    catalog
        .steps()
        .iter()
        .zip(raw.split(',').map(str::trim))
        .filter(|(_, value)| !value.is_empty())
        .map(|(step, value)| (step.id.clone(), Answer::choice(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare::workflows::wizard::{
        CatalogRegistry, FixedClock, FlowId, RecommendationTable, SessionHandle, StepId,
        WizardService,
    };

    #[test]
    fn answers_follow_catalog_order() {
        let catalog = CatalogRegistry::standard()
            .require(&FlowId::from("anxiety"))
            .expect("anxiety registered");

        let answers = answers_from_values(&catalog, "never, often,,always");

        assert_eq!(answers.len(), 3);
        assert_eq!(answers.get(&StepId::from("2")), Some(&Answer::choice("often")));
        assert_eq!(answers.get(&StepId::from("3")), None);
        assert_eq!(answers.get(&StepId::from("4")), Some(&Answer::choice("always")));
    }

    #[test]
    fn store_keeps_insertion_order_and_scopes_by_owner() {
        let service = WizardService::new(
            CatalogRegistry::standard(),
            RecommendationTable::standard(),
            Arc::new(InMemoryResultStore::default()),
            Arc::new(FixedClock::on(parse_date("2025-10-06").expect("valid date"))),
        );
        let flow = FlowId::from("sleep");
        let catalog = service.catalog(&flow).expect("sleep registered");
        let answers = answers_from_values(&catalog, &vec!["never"; 8].join(","));
        let jordan = SessionHandle::new("student-42", "Jordan");
        let priya = SessionHandle::new("student-7", "Priya");

        let first = service
            .submit_assessment(&flow, jordan.clone(), answers.clone())
            .expect("first submission");
        service
            .submit_assessment(&flow, priya, answers.clone())
            .expect("second submission");
        let third = service
            .submit_assessment(&flow, jordan, answers)
            .expect("third submission");

        let store = service.presenter().store();
        let recent = store.recent(2).expect("recent");
        assert_eq!(recent[0].instance_id(), third.record.instance_id());
        let owned = store.for_owner("student-42").expect("owner records");
        assert_eq!(
            owned.iter().map(|record| record.instance_id()).collect::<Vec<_>>(),
            vec![first.record.instance_id(), third.record.instance_id()]
        );

        let mut missing = first.record.clone();
        missing.snapshot.instance_id = FlowInstanceId("flow-unknown".to_string());
        assert_eq!(store.update(missing), Err(StoreError::NotFound));
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2025-10-06").is_ok());
        assert!(parse_date("10/06/2025").is_err());
    }

    #[test]
    fn parse_date_accepts_the_local_calendar_date() {
        let today = chrono::Local::now().date_naive();

        assert_eq!(parse_date(&today.format("%Y-%m-%d").to_string()), Ok(today));
    }
}
