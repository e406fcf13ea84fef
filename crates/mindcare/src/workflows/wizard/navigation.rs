use chrono::NaiveDate;
use serde::Serialize;

use super::catalog::StepCatalog;
use super::domain::WizardError;
use super::gate::is_step_satisfied;
use super::instance::FlowInstance;

/// Result of a navigation request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
    Moved { from: usize, to: usize },
    AtTerminal,
    AtStart,
}

/// Stateless cursor rules. Every call takes the catalog and the instance it moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigationController;

impl NavigationController {
    pub fn new() -> Self {
        Self
    }

    /// Moves forward one step once the current step's gate passes.
    pub fn advance(
        &self,
        catalog: &StepCatalog,
        instance: &mut FlowInstance,
        today: NaiveDate,
    ) -> Result<Navigation, WizardError> {
        instance.ensure_open()?;
        instance.ensure_catalog(catalog)?;

        let from = instance.current_step_index();
        let step = catalog
            .step(from)
            .ok_or(WizardError::InvalidJump { from, to: from })?;
        if !is_step_satisfied(step, instance.answers(), today) {
            return Err(WizardError::InvalidJump { from, to: from + 1 });
        }

        if from >= catalog.last_index() {
            return Ok(Navigation::AtTerminal);
        }

        let to = from + 1;
        instance.set_current_step(to);
        Ok(Navigation::Moved { from, to })
    }

    /// Moves back one step. Never gated.
    pub fn retreat(
        &self,
        catalog: &StepCatalog,
        instance: &mut FlowInstance,
    ) -> Result<Navigation, WizardError> {
        instance.ensure_open()?;
        instance.ensure_catalog(catalog)?;

        let from = instance.current_step_index();
        if from == 0 {
            return Ok(Navigation::AtStart);
        }

        let to = from - 1;
        instance.set_current_step(to);
        Ok(Navigation::Moved { from, to })
    }

    /// Jumps backwards freely, or forwards when every earlier step is answered.
    pub fn jump_to(
        &self,
        catalog: &StepCatalog,
        instance: &mut FlowInstance,
        index: usize,
        today: NaiveDate,
    ) -> Result<Navigation, WizardError> {
        instance.ensure_open()?;
        instance.ensure_catalog(catalog)?;

        let from = instance.current_step_index();
        if index >= catalog.len() {
            return Err(WizardError::InvalidJump { from, to: index });
        }

        let reachable = index <= from
            || catalog.steps()[..index]
                .iter()
                .all(|step| is_step_satisfied(step, instance.answers(), today));
        if !reachable {
            return Err(WizardError::InvalidJump { from, to: index });
        }

        instance.set_current_step(index);
        Ok(Navigation::Moved { from, to: index })
    }

    /// `(current + 1) / len`, in `(0, 1]`.
    pub fn progress_fraction(&self, catalog: &StepCatalog, instance: &FlowInstance) -> f64 {
        (instance.current_step_index() + 1) as f64 / catalog.len() as f64
    }
}
