use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use super::catalog::StepCatalog;
use super::domain::{Choice, FlowKind, Step, WizardError};

pub const BOOKING_FLOW: &str = "booking";

pub const BOOKING_COUNSELOR_STEP: &str = "counselor";
pub const BOOKING_SCHEDULE_STEP: &str = "schedule";
pub const BOOKING_MODE_STEP: &str = "session_mode";
pub const BOOKING_DURATION_STEP: &str = "duration";
pub const BOOKING_URGENCY_STEP: &str = "urgency";
pub const BOOKING_REASON_STEP: &str = "reason";

/// Canonical frequency scale shared by every built-in assessment.
pub fn frequency_choices() -> Vec<Choice> {
    vec![
        Choice::new("never", "Never", 0),
        Choice::new("sometimes", "Sometimes", 1),
        Choice::new("often", "Often", 2),
        Choice::new("always", "Always", 3),
    ]
}

struct AssessmentTemplate {
    flow_id: &'static str,
    title: &'static str,
    description: &'static str,
    questions: &'static [&'static str],
}

const ASSESSMENTS: &[AssessmentTemplate] = &[
    AssessmentTemplate {
        flow_id: "depression",
        title: "Depression Assessment",
        description: "This assessment helps identify symptoms of depression",
        questions: &[
            "Little interest or pleasure in doing things?",
            "Feeling down, depressed, or hopeless?",
            "Trouble falling or staying asleep, or sleeping too much?",
            "Feeling tired or having little energy?",
            "Poor appetite or overeating?",
            "Feeling bad about yourself or that you are a failure?",
            "Trouble concentrating on things?",
            "Moving or speaking slowly, or being restless?",
            "Thoughts that you would be better off dead?",
        ],
    },
    AssessmentTemplate {
        flow_id: "anxiety",
        title: "Anxiety Assessment",
        description: "This assessment evaluates anxiety symptoms",
        questions: &[
            "Feeling nervous, anxious, or on edge?",
            "Not being able to stop or control worrying?",
            "Worrying too much about different things?",
            "Trouble relaxing?",
            "Being so restless that it is hard to sit still?",
            "Becoming easily annoyed or irritable?",
            "Feeling afraid as if something awful might happen?",
        ],
    },
    AssessmentTemplate {
        flow_id: "stress",
        title: "Stress Assessment",
        description: "Evaluate your current stress levels",
        questions: &[
            "How often have you been upset because of unexpected events?",
            "How often have you felt unable to control important things in your life?",
            "How often have you felt nervous and stressed?",
            "How often have you felt confident about handling personal problems?",
            "How often have you felt that things were going your way?",
            "How often have you found that you could not cope with things you had to do?",
            "How often have you been able to control irritations in your life?",
            "How often have you felt on top of things?",
            "How often have you been angered by things outside of your control?",
            "How often have you felt difficulties were piling up so high that you could not overcome them?",
        ],
    },
    AssessmentTemplate {
        flow_id: "social-media",
        title: "Social Media Impact Assessment",
        description: "Assess how social media affects your wellbeing",
        questions: &[
            "Do you spend more time on social media than you intended?",
            "Do you feel anxious when you can't check social media?",
            "Do you compare yourself to others on social media?",
            "Does social media make you feel worse about your life?",
            "Do you check social media first thing in the morning?",
            "Do you use social media to avoid real-world problems?",
            "Has social media affected your sleep or productivity?",
            "Do you feel like you need to post constantly to feel validated?",
        ],
    },
    AssessmentTemplate {
        flow_id: "self-esteem",
        title: "Self-Esteem Assessment",
        description: "Evaluate your self-worth and confidence",
        questions: &[
            "Do you feel satisfied with yourself?",
            "Do you sometimes think you are no good at all?",
            "Do you feel that you have good qualities?",
            "Are you able to do things as well as most other people?",
            "Do you feel you do not have much to be proud of?",
            "Do you sometimes feel useless?",
            "Do you feel that you're a person of worth?",
            "Do you wish you could have more respect for yourself?",
            "Do you tend to think you are a failure?",
            "Do you take a positive attitude toward yourself?",
        ],
    },
    AssessmentTemplate {
        flow_id: "sleep",
        title: "Sleep Quality Assessment",
        description: "Analyze your sleep patterns and quality",
        questions: &[
            "Do you have trouble falling asleep?",
            "Do you wake up frequently during the night?",
            "Do you wake up too early and can't get back to sleep?",
            "Do you feel tired during the day?",
            "Does your sleep problem affect your daily activities?",
            "Do you worry about your sleep?",
            "Do you use your phone or screen devices before bed?",
            "Do you feel rested when you wake up?",
        ],
    },
];

/// Built-in assessments, question ids numbered from 1.
pub fn assessment_catalogs() -> Vec<StepCatalog> {
    ASSESSMENTS
        .iter()
        .filter_map(|template| match build_assessment(template) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                tracing::error!(flow_id = template.flow_id, %err, "skipping built-in assessment");
                None
            }
        })
        .collect()
}

fn build_assessment(template: &AssessmentTemplate) -> Result<StepCatalog, WizardError> {
    let steps = template
        .questions
        .iter()
        .zip(1u32..)
        .map(|(prompt, id)| Step::single_choice(id, *prompt, frequency_choices()))
        .collect();

    StepCatalog::new(
        template.flow_id,
        FlowKind::Assessment,
        template.title,
        template.description,
        steps,
    )
}

/// Counselor directory entry offered by the booking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounselorListing {
    pub id: &'static str,
    pub name: &'static str,
    pub specialization: &'static str,
    /// Hourly start slots per weekday, Monday first.
    pub availability: [&'static [u32]; 7],
}

/// How far ahead [`CounselorListing::next_open_slot`] searches.
const SLOT_SEARCH_DAYS: usize = 14;

impl CounselorListing {
    pub fn weekly_hours(&self, weekday: Weekday) -> &'static [u32] {
        self.availability[weekday.num_days_from_monday() as usize]
    }

    /// Start times still bookable on `date` as of the local time `now`.
    /// Same-day slots must start in a later hour than the current one.
    pub fn open_slots(&self, date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
        let today = now.date();
        if date < today {
            return Vec::new();
        }
        self.weekly_hours(date.weekday())
            .iter()
            .copied()
            .filter(|hour| date > today || *hour > now.hour())
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
            .collect()
    }

    pub fn offers(&self, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
        self.open_slots(date, now).contains(&time)
    }

    pub fn next_open_slot(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        now.date()
            .iter_days()
            .take(SLOT_SEARCH_DAYS)
            .find_map(|date| {
                self.open_slots(date, now)
                    .first()
                    .map(|time| date.and_time(*time))
            })
    }
}

pub const COUNSELORS: &[CounselorListing] = &[
    CounselorListing {
        id: "c1",
        name: "Dr. Sarah Johnson",
        specialization: "Anxiety & Depression",
        availability: [
            &[9, 10, 11, 14, 15, 16],
            &[9, 10, 11, 14, 15],
            &[10, 11, 14, 15, 16],
            &[9, 10, 14, 15, 16],
            &[9, 10, 11, 14, 15],
            &[10, 11, 14],
            &[],
        ],
    },
    CounselorListing {
        id: "c2",
        name: "Dr. Michael Chen",
        specialization: "Stress Management",
        availability: [
            &[10, 11, 14, 15, 16],
            &[9, 10, 14, 15, 16],
            &[9, 11, 14, 15],
            &[10, 11, 14, 15],
            &[9, 10, 11, 15, 16],
            &[9, 10, 11],
            &[10, 11],
        ],
    },
    CounselorListing {
        id: "c3",
        name: "Dr. Emily Rodriguez",
        specialization: "Academic Pressure",
        availability: [
            &[9, 10, 15, 16],
            &[10, 11, 14, 15],
            &[9, 10, 11, 16],
            &[9, 14, 15, 16],
            &[10, 11, 14, 15],
            &[9, 10],
            &[],
        ],
    },
];

pub fn counselor(id: &str) -> Option<&'static CounselorListing> {
    COUNSELORS.iter().find(|listing| listing.id == id)
}

pub fn booking_catalog() -> Result<StepCatalog, WizardError> {
    let counselors = COUNSELORS
        .iter()
        .map(|listing| {
            Choice::new(
                listing.id,
                format!("{} ({})", listing.name, listing.specialization),
                0,
            )
        })
        .collect();

    let steps = vec![
        Step::single_choice(BOOKING_COUNSELOR_STEP, "Select a counselor", counselors),
        Step::date_time(BOOKING_SCHEDULE_STEP, "Choose a date and time"),
        Step::single_choice(
            BOOKING_MODE_STEP,
            "How would you like to meet?",
            vec![
                Choice::new("online", "Online (video call)", 0),
                Choice::new("in_person", "In person", 0),
            ],
        )
        .with_default("online"),
        Step::single_choice(
            BOOKING_DURATION_STEP,
            "Session length",
            vec![
                Choice::new("30", "30 minutes", 0),
                Choice::new("45", "45 minutes", 0),
                Choice::new("60", "60 minutes", 0),
                Choice::new("90", "90 minutes", 0),
            ],
        )
        .with_default("60"),
        Step::single_choice(
            BOOKING_URGENCY_STEP,
            "How urgent is your need?",
            vec![
                Choice::new("low", "Low - General wellbeing", 0),
                Choice::new("normal", "Normal - Regular support", 0),
                Choice::new("high", "High - Need immediate help", 0),
                Choice::new("urgent", "Urgent - Crisis situation", 0),
            ],
        )
        .with_default("normal"),
        Step::free_text(BOOKING_REASON_STEP, "What would you like to talk about?"),
    ];

    StepCatalog::new(
        BOOKING_FLOW,
        FlowKind::Booking,
        "Book a Counseling Session",
        "Select a counselor, choose a time, and tell us what you need",
        steps,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date")
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn hour(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
    }

    #[test]
    fn directory_publishes_weekday_slots() {
        let sarah = counselor("c1").expect("c1 listed");
        assert_eq!(sarah.weekly_hours(Weekday::Sat), &[10, 11, 14]);
        assert!(sarah.weekly_hours(Weekday::Sun).is_empty());
        assert_eq!(counselor("c2").expect("c2 listed").weekly_hours(Weekday::Sun), &[10, 11]);
    }

    #[test]
    fn same_day_slots_must_start_after_the_current_hour() {
        let sarah = counselor("c1").expect("c1 listed");
        let slots = sarah.open_slots(monday(), at(monday(), 10, 5));
        assert_eq!(slots, vec![hour(11), hour(14), hour(15), hour(16)]);

        let tomorrow = monday().succ_opt().expect("valid date");
        assert_eq!(sarah.open_slots(tomorrow, at(monday(), 23, 0)).len(), 5);
        assert!(sarah
            .open_slots(monday().pred_opt().expect("valid date"), at(monday(), 8, 0))
            .is_empty());
    }

    #[test]
    fn offers_only_listed_start_times() {
        let sarah = counselor("c1").expect("c1 listed");
        let sunday = NaiveDate::from_ymd_opt(2025, 10, 12).expect("valid date");
        assert!(!sarah.offers(sunday, hour(10), at(monday(), 9, 0)));
        let half_past = NaiveTime::from_hms_opt(14, 30, 0).expect("valid time");
        assert!(!sarah.offers(monday(), half_past, at(monday(), 9, 0)));
        assert!(sarah.offers(monday(), hour(14), at(monday(), 9, 0)));
    }

    #[test]
    fn next_open_slot_skips_closed_days() {
        let emily = counselor("c3").expect("c3 listed");
        let saturday = NaiveDate::from_ymd_opt(2025, 10, 11).expect("valid date");
        let next = emily.next_open_slot(at(saturday, 12, 0)).expect("slot within two weeks");
        let following_monday = NaiveDate::from_ymd_opt(2025, 10, 13).expect("valid date");
        assert_eq!(next, at(following_monday, 9, 0));
    }
}
