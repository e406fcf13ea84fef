use crate::demo::{run_assess, run_catalogs, run_demo, AssessArgs, CatalogsArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use mindcare::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "MindCare",
    about = "Run the student wellbeing assessment, booking, and peer chat service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score one assessment from a comma separated list of answers
    Assess(AssessArgs),
    /// List the registered assessment and booking flows
    Catalogs(CatalogsArgs),
    /// Walk through an assessment, a booking, and a peer chat exchange
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args),
        Command::Catalogs(args) => run_catalogs(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["mindcare-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_assess_arguments() {
        let cli = Cli::try_parse_from([
            "mindcare-api",
            "assess",
            "--flow",
            "sleep",
            "--answers",
            "never,often",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Assess(args)) => {
                assert_eq!(args.flow, "sleep");
                assert_eq!(args.answers, "never,often");
            }
            other => panic!("expected assess command, got {other:?}"),
        }
    }
}
