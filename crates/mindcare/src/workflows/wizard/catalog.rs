use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{FlowId, FlowKind, InputKind, Step, StepId, WizardError};
use super::standard;

/// Ordered, immutable list of steps for one flow type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCatalog {
    flow_id: FlowId,
    kind: FlowKind,
    title: String,
    description: String,
    steps: Vec<Step>,
}

impl StepCatalog {
    pub fn new(
        flow_id: impl Into<FlowId>,
        kind: FlowKind,
        title: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<Step>,
    ) -> Result<Self, WizardError> {
        let flow_id = flow_id.into();
        validate_steps(&flow_id, kind, &steps)?;

        Ok(Self {
            flow_id,
            kind,
            title: title.into(),
            description: description.into(),
            steps,
        })
    }

    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed catalog; kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn find(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.id == id)
    }

    pub fn position(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|step| &step.id == id)
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Sum of the heaviest choice of every step. Construction guarantees it fits in a `u32`.
    pub fn max_score(&self) -> u32 {
        self.steps
            .iter()
            .map(Step::max_weight)
            .fold(0u32, u32::saturating_add)
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            flow_id: self.flow_id.clone(),
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            step_count: self.steps.len(),
        }
    }
}

fn validate_steps(flow_id: &FlowId, kind: FlowKind, steps: &[Step]) -> Result<(), WizardError> {
    if steps.is_empty() {
        return Err(WizardError::InvalidConfiguration(format!(
            "flow '{flow_id}' has no steps"
        )));
    }

    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(&step.id) {
            return Err(WizardError::InvalidConfiguration(format!(
                "flow '{flow_id}' repeats step id '{}'",
                step.id
            )));
        }

        match step.input_kind {
            InputKind::SingleChoice => {
                if step.choices.is_empty() {
                    return Err(WizardError::InvalidConfiguration(format!(
                        "step '{}' in flow '{flow_id}' has no choices",
                        step.id
                    )));
                }
                let mut values = HashSet::new();
                if !step.choices.iter().all(|choice| values.insert(&choice.value)) {
                    return Err(WizardError::InvalidConfiguration(format!(
                        "step '{}' in flow '{flow_id}' repeats a choice value",
                        step.id
                    )));
                }
            }
            InputKind::FreeText | InputKind::DateTimePair => {
                if !step.choices.is_empty() {
                    return Err(WizardError::InvalidConfiguration(format!(
                        "step '{}' in flow '{flow_id}' is {} but lists choices",
                        step.id,
                        step.input_kind.label()
                    )));
                }
            }
        }

        if let Some(default) = &step.default_choice {
            if step.choice(default).is_none() {
                return Err(WizardError::InvalidConfiguration(format!(
                    "step '{}' in flow '{flow_id}' defaults to unknown choice '{default}'",
                    step.id
                )));
            }
        }
    }

    // Raw scores never exceed this total, so bounding it bounds every later sum.
    let max_score = steps
        .iter()
        .map(Step::max_weight)
        .try_fold(0u32, u32::checked_add)
        .ok_or_else(|| {
            WizardError::InvalidConfiguration(format!(
                "flow '{flow_id}' choice weights overflow the score range"
            ))
        })?;

    if kind == FlowKind::Assessment {
        for step in steps {
            if step.input_kind != InputKind::SingleChoice {
                return Err(WizardError::InvalidConfiguration(format!(
                    "assessment '{flow_id}' step '{}' is not single choice",
                    step.id
                )));
            }
            if step.max_weight() == 0 {
                return Err(WizardError::InvalidConfiguration(format!(
                    "assessment '{flow_id}' step '{}' has no weighted choices",
                    step.id
                )));
            }
        }
        if max_score == 0 {
            return Err(WizardError::InvalidConfiguration(format!(
                "assessment '{flow_id}' has no weighted choices"
            )));
        }
    }

    Ok(())
}

/// Listing entry for catalog discovery endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub flow_id: FlowId,
    pub kind: FlowKind,
    pub title: String,
    pub description: String,
    pub step_count: usize,
}

/// Serialized catalog shape accepted by [`CatalogRegistry::from_json`].
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDefinition {
    pub flow_id: FlowId,
    pub kind: FlowKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl TryFrom<CatalogDefinition> for StepCatalog {
    type Error = WizardError;

    fn try_from(definition: CatalogDefinition) -> Result<Self, Self::Error> {
        StepCatalog::new(
            definition.flow_id,
            definition.kind,
            definition.title,
            definition.description,
            definition.steps,
        )
    }
}

/// Shared, read-only catalogs keyed by flow id.
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    catalogs: BTreeMap<FlowId, Arc<StepCatalog>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in assessments plus the counselor booking flow.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for catalog in standard::assessment_catalogs() {
            registry.insert(catalog);
        }
        match standard::booking_catalog() {
            Ok(catalog) => {
                registry.insert(catalog);
            }
            Err(err) => tracing::error!(%err, "skipping built-in booking flow"),
        }
        registry
    }

    pub fn from_json(raw: &str) -> Result<Self, WizardError> {
        let definitions: Vec<CatalogDefinition> = serde_json::from_str(raw)
            .map_err(|err| WizardError::InvalidConfiguration(format!("catalog json: {err}")))?;

        let mut registry = Self::new();
        for definition in definitions {
            let catalog = StepCatalog::try_from(definition)?;
            if registry.get(catalog.flow_id()).is_some() {
                return Err(WizardError::InvalidConfiguration(format!(
                    "flow '{}' is defined twice",
                    catalog.flow_id()
                )));
            }
            registry.insert(catalog);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, catalog: StepCatalog) -> Arc<StepCatalog> {
        let catalog = Arc::new(catalog);
        self.catalogs
            .insert(catalog.flow_id().clone(), Arc::clone(&catalog));
        catalog
    }

    pub fn get(&self, flow_id: &FlowId) -> Option<Arc<StepCatalog>> {
        self.catalogs.get(flow_id).cloned()
    }

    pub fn require(&self, flow_id: &FlowId) -> Result<Arc<StepCatalog>, WizardError> {
        self.get(flow_id)
            .ok_or_else(|| WizardError::UnknownFlow(flow_id.clone()))
    }

    pub fn summaries(&self) -> Vec<CatalogSummary> {
        self.catalogs
            .values()
            .map(|catalog| catalog.summary())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}
