use chrono::{Days, NaiveTime};

use super::common::*;
use crate::workflows::wizard::domain::{Answer, FlowKind, FlowStatus, StepId, WizardError};
use crate::workflows::wizard::scoring::{score_assessment, SessionMode, SeverityBand, Urgency};
use crate::workflows::wizard::standard::{
    assessment_catalogs, BOOKING_MODE_STEP, BOOKING_REASON_STEP, BOOKING_SCHEDULE_STEP,
};

fn complete_uniform(value: &str) -> crate::workflows::wizard::scoring::ScoreResult {
    let mut session = depression_session();
    for (step_id, answer) in uniform_answers(session.catalog(), value) {
        session.answer(step_id, answer).expect("answer accepted");
    }
    session.complete_assessment().expect("assessment completes").result
}

#[test]
fn all_sometimes_scores_moderate() {
    let result = complete_uniform("sometimes");

    assert_eq!(result.raw_score, 9);
    assert_eq!(result.max_score, 27);
    assert_eq!(result.percentage, 33);
    assert_eq!(result.severity_band, SeverityBand::Moderate);
}

#[test]
fn all_never_scores_low() {
    let result = complete_uniform("never");

    assert_eq!(result.raw_score, 0);
    assert_eq!(result.percentage, 0);
    assert_eq!(result.severity_band, SeverityBand::Low);
}

#[test]
fn all_always_scores_high() {
    let result = complete_uniform("always");

    assert_eq!(result.raw_score, 27);
    assert_eq!(result.percentage, 100);
    assert_eq!(result.severity_band, SeverityBand::High);
}

#[test]
fn completion_requires_every_question() {
    let mut session = depression_session();
    session.answer("1", Answer::choice("often")).expect("answer");

    match session.complete_assessment() {
        Err(WizardError::IncompleteFlow { missing }) => assert_eq!(missing.len(), 8),
        other => panic!("expected incomplete flow, got {other:?}"),
    }
    assert_eq!(session.instance().status(), FlowStatus::InProgress);
}

#[test]
fn scoring_is_deterministic_for_the_same_answers() {
    let catalog = depression_catalog();
    let answers = uniform_answers(&catalog, "often");

    let first = score_assessment(&catalog, &answers, today()).expect("scores");
    let second = score_assessment(&catalog, &answers, today()).expect("scores");

    assert_eq!(first, second);
    assert_eq!(first.percentage, 67);
}

#[test]
fn answer_entry_order_does_not_change_the_score() {
    let values = ["never", "often", "always", "sometimes"];
    let mixed: Vec<_> = depression_catalog()
        .steps()
        .iter()
        .zip(values.iter().cycle())
        .map(|(step, value)| (step.id.clone(), Answer::choice(*value)))
        .collect();

    let mut forward = depression_session();
    for (step_id, answer) in mixed.iter().cloned() {
        forward.answer(step_id, answer).expect("answer accepted");
    }

    let mut shuffled = depression_session();
    let (evens, odds): (Vec<_>, Vec<_>) = mixed
        .iter()
        .cloned()
        .enumerate()
        .partition(|(index, _)| index % 2 == 0);
    for (_, (step_id, answer)) in odds.into_iter().rev().chain(evens) {
        shuffled.answer(step_id, answer).expect("answer accepted");
    }
    // a revised answer only counts once it is the final one
    shuffled.answer("1", Answer::choice("always")).expect("answer accepted");
    shuffled.answer("1", Answer::choice("never")).expect("answer accepted");

    let forward = forward.complete_assessment().expect("completes").result;
    let shuffled = shuffled.complete_assessment().expect("completes").result;

    assert_eq!(forward, shuffled);
    assert_eq!(forward.raw_score, 12);
    assert_eq!(forward.max_score, 27);
    assert_eq!(forward.percentage, 44);
}

#[test]
fn every_built_in_assessment_uses_the_frequency_scale() {
    for catalog in assessment_catalogs() {
        assert_eq!(catalog.kind(), FlowKind::Assessment);
        assert_eq!(catalog.max_score(), catalog.len() as u32 * 3);
        let answers = uniform_answers(&catalog, "always");
        let result = score_assessment(&catalog, &answers, today()).expect("scores");
        assert_eq!(result.percentage, 100, "flow {}", catalog.flow_id());
    }
}

#[test]
fn completed_flow_is_closed() {
    let mut session = depression_session();
    for (step_id, answer) in uniform_answers(session.catalog(), "never") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    let envelope = session.complete_assessment().expect("completes");

    assert_eq!(envelope.owner, student());
    assert_eq!(session.instance().status(), FlowStatus::Completed);
    assert_eq!(session.instance().completed_at(), Some(envelope.completed_at));
    assert!(matches!(
        session.complete_assessment(),
        Err(WizardError::FlowClosed { .. })
    ));
}

#[test]
fn booking_needs_a_reason_before_it_can_complete() {
    let mut session = booking_session();
    for (step_id, answer) in booking_answers("") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    assert!(!session.can_complete());
    assert_eq!(
        session.unanswered_steps(),
        vec![StepId::from(BOOKING_REASON_STEP)]
    );

    session
        .answer(BOOKING_REASON_STEP, Answer::text("Exam stress"))
        .expect("answer accepted");
    assert!(session.can_complete());
}

#[test]
fn booking_rejects_dates_before_today() {
    let mut session = booking_session();
    for (step_id, answer) in booking_answers("Trouble sleeping") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    session
        .answer(
            BOOKING_SCHEDULE_STEP,
            Answer::schedule(
                today().pred_opt().expect("valid date"),
                NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            ),
        )
        .expect("shape matches");

    assert!(!session.can_complete());
    assert!(matches!(
        session.complete_booking(),
        Err(WizardError::IncompleteFlow { .. })
    ));
}

#[test]
fn booking_completion_carries_defaults_and_overrides() {
    let mut session = booking_session();
    for (step_id, answer) in booking_answers("  Homesick  ") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    session
        .answer(BOOKING_MODE_STEP, Answer::choice("in_person"))
        .expect("answer accepted");

    let selection = session.complete_booking().expect("booking completes").result;

    assert_eq!(selection.counselor_ref, "c1");
    assert_eq!(selection.date, today().succ_opt().expect("valid date"));
    assert_eq!(selection.duration_minutes, 60);
    assert_eq!(selection.mode, SessionMode::InPerson);
    assert_eq!(selection.urgency, Urgency::Normal);
    assert_eq!(selection.reason_text, "Homesick");
}

#[test]
fn booking_outside_counselor_hours_is_rejected() {
    let mut session = booking_session();
    for (step_id, answer) in booking_answers("Panic attacks") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    let sunday = today().checked_add_days(Days::new(6)).expect("valid date");
    session
        .answer(
            BOOKING_SCHEDULE_STEP,
            Answer::schedule(sunday, NaiveTime::from_hms_opt(3, 17, 0).expect("valid time")),
        )
        .expect("shape matches");

    assert!(session.can_complete());
    match session.complete_booking() {
        Err(WizardError::SlotUnavailable {
            counselor_ref,
            date,
            ..
        }) => {
            assert_eq!(counselor_ref, "c1");
            assert_eq!(date, sunday);
        }
        other => panic!("expected unavailable slot, got {other:?}"),
    }
    assert_eq!(session.instance().status(), FlowStatus::InProgress);
}

#[test]
fn same_day_booking_needs_a_later_hour_than_now() {
    // the fixture clock reads 09:00 on a Monday
    let mut session = booking_session();
    for (step_id, answer) in booking_answers("Sleep trouble") {
        session.answer(step_id, answer).expect("answer accepted");
    }
    session
        .answer(
            BOOKING_SCHEDULE_STEP,
            Answer::schedule(today(), NaiveTime::from_hms_opt(9, 0, 0).expect("valid time")),
        )
        .expect("shape matches");
    assert!(matches!(
        session.complete_booking(),
        Err(WizardError::SlotUnavailable { .. })
    ));

    session
        .answer(
            BOOKING_SCHEDULE_STEP,
            Answer::schedule(today(), NaiveTime::from_hms_opt(10, 0, 0).expect("valid time")),
        )
        .expect("shape matches");
    let selection = session.complete_booking().expect("booking completes").result;
    assert_eq!(selection.date, today());
}

#[test]
fn completing_with_the_wrong_reducer_is_rejected() {
    let mut session = booking_session();
    assert!(matches!(
        session.complete_assessment(),
        Err(WizardError::FlowKindMismatch { .. })
    ));
}
