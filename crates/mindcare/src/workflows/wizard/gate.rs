use chrono::NaiveDate;

use super::catalog::StepCatalog;
use super::domain::{Answer, AnswerMap, InputKind, Step, StepId};

/// Whether `answers` holds a complete, valid input for `step` as of `today`.
pub fn is_step_satisfied(step: &Step, answers: &AnswerMap, today: NaiveDate) -> bool {
    let Some(answer) = answers.get(&step.id) else {
        return false;
    };

    match (step.input_kind, answer) {
        (InputKind::SingleChoice, Answer::Choice { value }) => step.choice(value).is_some(),
        (InputKind::FreeText, Answer::Text { text }) => !text.trim().is_empty(),
        (InputKind::DateTimePair, Answer::Schedule { date, time }) => match (date, time) {
            (Some(date), Some(_)) => *date >= today,
            _ => false,
        },
        _ => false,
    }
}

pub fn can_complete_flow(catalog: &StepCatalog, answers: &AnswerMap, today: NaiveDate) -> bool {
    catalog
        .steps()
        .iter()
        .all(|step| is_step_satisfied(step, answers, today))
}

/// Ids of every step that still blocks completion, in catalog order.
pub fn unsatisfied_steps(catalog: &StepCatalog, answers: &AnswerMap, today: NaiveDate) -> Vec<StepId> {
    catalog
        .steps()
        .iter()
        .filter(|step| !is_step_satisfied(step, answers, today))
        .map(|step| step.id.clone())
        .collect()
}
