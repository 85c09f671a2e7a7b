use crate::demo::{run_check_config, run_demo, run_evaluate, CheckConfigArgs, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use risk_gate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Risk Gate",
    about = "Run and exercise the GO / REVIEW / NO-GO risk decisioning engine",
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
    /// Evaluate a single request read from a JSON file and print the outcome
    Evaluate(EvaluateArgs),
    /// Validate a decision configuration document without activating it
    CheckConfig(CheckConfigArgs),
    /// Run a scripted demo across the three gate outcomes
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
        Command::Evaluate(args) => run_evaluate(args).await,
        Command::CheckConfig(args) => run_check_config(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
