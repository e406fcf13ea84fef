use crate::infra::{answers_from_values, parse_date, InMemoryResultStore};
use chrono::NaiveDate;
use clap::Args;
use mindcare::config::ChatConfig;
use mindcare::error::AppError;
use mindcare::workflows::peer_chat::ChatHub;
use mindcare::workflows::wizard::standard::{
    self, BOOKING_COUNSELOR_STEP, BOOKING_MODE_STEP, BOOKING_REASON_STEP, BOOKING_SCHEDULE_STEP,
};
use mindcare::workflows::wizard::{
    Answer, AnswerMap, AssessmentReport, CatalogRegistry, Clock, FixedClock, FlowId,
    PersistenceStatus, RecommendationTable, SessionHandle, StepId, SystemClock, WizardService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Flow id of the assessment (e.g. depression, anxiety, sleep)
    #[arg(long)]
    pub(crate) flow: String,
    /// Comma separated choice values in question order (never,sometimes,often,always)
    #[arg(long)]
    pub(crate) answers: String,
    /// Optional JSON file with catalog definitions replacing the built-in flows
    #[arg(long)]
    pub(crate) catalog_file: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogsArgs {
    /// Optional JSON file with catalog definitions replacing the built-in flows
    #[arg(long)]
    pub(crate) catalog_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the peer chat portion of the demo.
    #[arg(long)]
    pub(crate) skip_chat: bool,
}

fn load_registry(catalog_file: Option<PathBuf>) -> Result<CatalogRegistry, AppError> {
    match catalog_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(CatalogRegistry::from_json(&raw)?)
        }
        None => Ok(CatalogRegistry::standard()),
    }
}

pub(crate) fn run_catalogs(args: CatalogsArgs) -> Result<(), AppError> {
    let registry = load_registry(args.catalog_file)?;
    println!("Registered flows ({})", registry.len());
    for summary in registry.summaries() {
        println!(
            "- {} [{}] {} ({} steps)",
            summary.flow_id,
            summary.kind.label(),
            summary.title,
            summary.step_count
        );
    }
    Ok(())
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        flow,
        answers,
        catalog_file,
        json,
    } = args;

    let registry = load_registry(catalog_file)?;
    let flow_id = FlowId(flow);
    let catalog = registry.require(&flow_id)?;
    let answers = answers_from_values(&catalog, &answers);

    let service = WizardService::new(
        registry,
        RecommendationTable::standard(),
        Arc::new(InMemoryResultStore::default()),
        Arc::new(SystemClock),
    );
    let presentation =
        service.submit_assessment(&flow_id, SessionHandle::anonymous(), answers)?;

    if json {
        match serde_json::to_string_pretty(&presentation.artifact) {
            Ok(payload) => println!("{}", payload),
            Err(err) => println!("Report payload unavailable: {}", err),
        }
    } else {
        render_report(catalog.title(), &presentation.artifact);
    }
    Ok(())
}

fn render_report(title: &str, report: &AssessmentReport) {
    println!("{}", title);
    println!(
        "- Score {}/{} ({}%) -> {} severity",
        report.score.raw_score,
        report.score.max_score,
        report.score.percentage,
        report.severity_label
    );
    println!("  {}", report.message);
    if report.show_crisis_resources {
        println!("  If you are in crisis, call or text 988 (Suicide & Crisis Lifeline).");
    }
    println!("  Recommendations:");
    for line in &report.recommendations {
        println!("    - {}", line);
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, skip_chat } = args;

    let clock: Arc<dyn Clock> = match today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    };
    let store = Arc::new(InMemoryResultStore::default());
    let service = WizardService::new(
        CatalogRegistry::standard(),
        RecommendationTable::standard(),
        store,
        clock.clone(),
    );
    let student = SessionHandle::new("student-demo", "Demo Student");

    println!("MindCare walkthrough");

    let flow_id = FlowId::from("stress");
    let catalog = service.catalog(&flow_id)?;
    let answers = answers_from_values(
        &catalog,
        "sometimes,often,often,sometimes,sometimes,often,sometimes,sometimes,often,often",
    );
    match service.submit_assessment(&flow_id, student.clone(), answers) {
        Ok(presentation) => {
            render_report(catalog.title(), &presentation.artifact);
            print_persistence(&presentation.persistence);
        }
        Err(err) => println!("  Assessment rejected: {}", err),
    }

    println!("\nCounselor booking");
    let slot = standard::counselor("c2")
        .and_then(|listing| listing.next_open_slot(clock.local_now()));
    match slot {
        Some(starts_at) => {
            let mut answers = AnswerMap::new();
            answers.insert(StepId::from(BOOKING_COUNSELOR_STEP), Answer::choice("c2"));
            answers.insert(
                StepId::from(BOOKING_SCHEDULE_STEP),
                Answer::schedule(starts_at.date(), starts_at.time()),
            );
            answers.insert(StepId::from(BOOKING_MODE_STEP), Answer::choice("online"));
            answers.insert(
                StepId::from(BOOKING_REASON_STEP),
                Answer::text("Feeling overwhelmed by exams"),
            );
            match service.submit_booking(student.clone(), answers) {
                Ok(presentation) => {
                    println!("- Booking {}", presentation.artifact.booking_ref);
                    for line in &presentation.artifact.summary {
                        println!("  {}", line);
                    }
                    print_persistence(&presentation.persistence);
                }
                Err(err) => println!("  Booking rejected: {}", err),
            }
        }
        None => println!("  No open counselor slots in the next two weeks"),
    }

    match service.bookings_for(&student.user_id) {
        Ok(schedule) => {
            println!(
                "  {} upcoming, {} past",
                schedule.upcoming.len(),
                schedule.past.len()
            );
            if let Some(next) = schedule.upcoming.first() {
                match service.cancel_booking(&next.instance_id, &student) {
                    Ok(record) => println!(
                        "  Cancelled {} ({})",
                        next.booking_ref,
                        record.record_status.label()
                    ),
                    Err(err) => println!("  Cancellation rejected: {}", err),
                }
            }
        }
        Err(err) => println!("  Bookings unavailable: {}", err),
    }

    match service.recent(10) {
        Ok(records) => {
            println!("\nStored results");
            for record in records {
                let view = record.status_view();
                println!(
                    "- {} {} ({})",
                    view.instance_id,
                    view.flow_id,
                    view.status.label()
                );
            }
        }
        Err(err) => println!("  Result store unavailable: {}", err),
    }

    if skip_chat {
        return Ok(());
    }

    println!("\nPeer chat");
    let hub = ChatHub::new(ChatConfig::default(), clock);
    let volunteer = SessionHandle::new("volunteer-demo", "Peer Volunteer");
    let room = hub.open_room(vec![student.clone(), volunteer.clone()])?;
    let mut subscription = hub.subscribe(&room, None)?;
    hub.post(&room, &student, "Hi, is anyone there?")?;
    hub.post(&room, &volunteer, "Hi! I'm here to listen. What's on your mind?")?;

    for _ in 0..2 {
        match tokio::time::timeout(Duration::from_millis(250), subscription.next()).await {
            Ok(Some(message)) => println!(
                "  #{} {}: {}",
                message.sequence, message.sender_name, message.body
            ),
            Ok(None) | Err(_) => break,
        }
    }

    let feedback = hub.end_room(&room, &student, Some(5), Some("Thanks for listening"))?;
    println!(
        "  Session ended after {} messages (rating {})",
        feedback.message_count,
        feedback.rating.unwrap_or_default()
    );

    Ok(())
}

fn print_persistence(status: &PersistenceStatus) {
    match status {
        PersistenceStatus::Stored => println!("  Saved to result store"),
        PersistenceStatus::Failed(reason) => println!("  Not saved: {}", reason),
    }
}
