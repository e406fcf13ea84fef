use std::sync::{Arc, Mutex};

use super::common::*;
use crate::workflows::wizard::domain::{Answer, FlowStatus, InputKind, StepId, WizardError};
use crate::workflows::wizard::events::FlowEvent;
use crate::workflows::wizard::navigation::Navigation;
use crate::workflows::wizard::session::WizardSession;
use crate::workflows::wizard::standard::{
    BOOKING_DURATION_STEP, BOOKING_MODE_STEP, BOOKING_URGENCY_STEP,
};

#[test]
fn advance_is_blocked_until_the_current_step_is_answered() {
    let mut session = depression_session();

    let result = session.advance();

    assert_eq!(result, Err(WizardError::InvalidJump { from: 0, to: 1 }));
    assert_eq!(session.instance().current_step_index(), 0);
}

#[test]
fn advance_moves_one_step_after_answering() {
    let mut session = depression_session();
    session
        .answer_current(Answer::choice("sometimes"))
        .expect("answer accepted");

    assert_eq!(
        session.advance().expect("gate passes"),
        Navigation::Moved { from: 0, to: 1 }
    );
    assert_eq!(session.instance().current_step_index(), 1);
}

#[test]
fn unlisted_choice_value_does_not_satisfy_the_gate() {
    let mut session = depression_session();
    session
        .answer("1", Answer::choice("rarely"))
        .expect("shape matches");

    assert!(!session.is_current_step_satisfied());
    assert!(session.advance().is_err());
}

#[test]
fn advance_at_last_step_stays_put() {
    let mut session = depression_session();
    let last = session.catalog().last_index();
    for step in session.catalog().steps().to_vec() {
        session
            .answer(step.id, Answer::choice("never"))
            .expect("answer accepted");
    }
    session.jump_to(last).expect("all earlier steps answered");

    assert_eq!(session.advance(), Ok(Navigation::AtTerminal));
    assert_eq!(session.instance().current_step_index(), last);
}

#[test]
fn retreat_is_never_gated_and_stops_at_start() {
    let mut session = depression_session();
    assert_eq!(session.retreat(), Ok(Navigation::AtStart));

    session
        .answer_current(Answer::choice("often"))
        .expect("answer accepted");
    session.advance().expect("gate passes");
    assert!(!session.is_current_step_satisfied());

    assert_eq!(session.retreat(), Ok(Navigation::Moved { from: 1, to: 0 }));
    assert_eq!(session.instance().current_step_index(), 0);
}

#[test]
fn jump_forward_requires_every_earlier_step() {
    let mut session = depression_session();
    session.answer("1", Answer::choice("often")).expect("answer");
    session.answer("2", Answer::choice("often")).expect("answer");

    assert_eq!(
        session.jump_to(4),
        Err(WizardError::InvalidJump { from: 0, to: 4 })
    );
    assert_eq!(session.jump_to(2), Ok(Navigation::Moved { from: 0, to: 2 }));
    assert_eq!(session.jump_to(0), Ok(Navigation::Moved { from: 2, to: 0 }));
    assert_eq!(
        session.jump_to(99),
        Err(WizardError::InvalidJump { from: 0, to: 99 })
    );
}

#[test]
fn progress_fraction_counts_the_current_step() {
    let mut session = depression_session();
    assert!((session.progress_fraction() - 1.0 / 9.0).abs() < f64::EPSILON);

    session.answer_current(Answer::choice("never")).expect("answer");
    session.advance().expect("gate passes");
    assert!((session.progress_fraction() - 2.0 / 9.0).abs() < f64::EPSILON);
}

#[test]
fn progress_rises_monotonically_to_exactly_one() {
    let mut session = depression_session();
    let steps = session.catalog().len();
    let mut previous = session.progress_fraction();

    loop {
        session.answer_current(Answer::choice("often")).expect("answer");
        match session.advance().expect("gate passes") {
            Navigation::Moved { .. } => {
                let progress = session.progress_fraction();
                assert!(progress > previous, "{progress} after {previous}");
                assert!(progress <= 1.0);
                previous = progress;
            }
            Navigation::AtTerminal => break,
            other => panic!("unexpected navigation {other:?}"),
        }
    }

    assert_eq!(session.instance().current_step_index(), steps - 1);
    assert_eq!(session.progress_fraction(), 1.0);
    assert_eq!(session.advance(), Ok(Navigation::AtTerminal));
    assert_eq!(session.progress_fraction(), 1.0);
}

#[test]
fn retake_starts_a_fresh_instance_on_the_shared_catalog() {
    let catalog = booking_catalog();
    let mut first = WizardSession::start(catalog.clone(), student(), clock());
    for (step_id, answer) in booking_answers("Exam stress") {
        first.answer(step_id, answer).expect("answer accepted");
    }
    first
        .answer(BOOKING_MODE_STEP, Answer::choice("in_person"))
        .expect("answer accepted");
    let first_answers = first.instance().answers().clone();

    let retake = WizardSession::start(catalog, student(), clock());

    assert_ne!(retake.instance().id(), first.instance().id());
    assert_eq!(retake.instance().current_step_index(), 0);
    assert_eq!(retake.instance().status(), FlowStatus::InProgress);
    let seeded: Vec<_> = retake.instance().answers().keys().cloned().collect();
    assert_eq!(
        seeded,
        vec![
            StepId::from(BOOKING_DURATION_STEP),
            StepId::from(BOOKING_MODE_STEP),
            StepId::from(BOOKING_URGENCY_STEP),
        ]
    );
    assert_eq!(
        retake.instance().answers().get(&StepId::from(BOOKING_MODE_STEP)),
        Some(&Answer::choice("online"))
    );
    assert_eq!(first.instance().answers(), &first_answers);
}

#[test]
fn answers_must_match_the_step_input_kind() {
    let mut session = depression_session();

    assert_eq!(
        session.answer("1", Answer::text("sometimes")),
        Err(WizardError::AnswerKindMismatch {
            step_id: StepId::from("1"),
            expected: InputKind::SingleChoice,
        })
    );
    assert_eq!(
        session.answer("42", Answer::choice("never")),
        Err(WizardError::UnknownStep(StepId::from("42")))
    );
}

#[test]
fn answers_are_replaced_and_cleared() {
    let mut session = depression_session();
    session.answer("1", Answer::choice("never")).expect("answer");
    session.answer("1", Answer::choice("always")).expect("answer");
    assert_eq!(
        session.instance().answer(&StepId::from("1")),
        Some(&Answer::choice("always"))
    );

    session.clear("1").expect("clear");
    assert!(session.instance().answer(&StepId::from("1")).is_none());
    assert!(session.advance().is_err());
}

#[test]
fn observers_see_changes_and_rejections_in_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut session = depression_session();
    let id = session.subscribe(Arc::new(move |event: &FlowEvent| {
        sink.lock().expect("events mutex poisoned").push(event.clone());
    }));

    let _ = session.advance();
    session.answer("1", Answer::choice("often")).expect("answer");
    session.advance().expect("gate passes");

    assert!(session.unsubscribe(id));
    session.retreat().expect("retreat");

    let seen = events.lock().expect("events mutex poisoned").clone();
    assert_eq!(
        seen,
        vec![
            FlowEvent::NavigationRejected { from: 0, to: 1 },
            FlowEvent::AnswerRecorded {
                step_id: StepId::from("1")
            },
            FlowEvent::StepChanged { from: 0, to: 1 },
        ]
    );
    assert_eq!(session.observer_count(), 0);
}

#[test]
fn abandoned_flows_reject_further_changes() {
    let mut session = depression_session();
    session.abandon().expect("abandon open flow");

    assert_eq!(session.instance().status(), FlowStatus::Abandoned);
    assert_eq!(
        session.answer("1", Answer::choice("never")),
        Err(WizardError::FlowClosed {
            status: FlowStatus::Abandoned
        })
    );
    assert!(session.advance().is_err());
}

#[test]
fn booking_defaults_are_preselected() {
    let session = booking_session();
    let draft = session.booking_draft();

    assert_eq!(draft.duration_minutes, Some(60));
    assert!(draft.mode.is_some());
    assert!(draft.urgency.is_some());
    assert!(draft.counselor_ref.is_none());
}
