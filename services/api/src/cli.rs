use crate::commands::{
    run_age, run_form_header, run_form_schema, run_form_submit, AgeArgs, SubmitArgs,
};
use crate::server;
use cis_intake::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Ficha de Ingreso CIS",
    about = "Serve and operate the CIS admissions intake form from the command line",
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
    /// Inspect the form or submit a prepared answer file
    Form {
        #[command(subcommand)]
        command: FormCommand,
    },
    /// Compute an age in whole years the way the form does
    Age(AgeArgs),
}

#[derive(Subcommand, Debug)]
enum FormCommand {
    /// Print the sections, fields and reveal rules as JSON
    Schema,
    /// Print the column order the configured sink will receive
    Header,
    /// Validate a JSON answer file and append it to the configured sink
    Submit(SubmitArgs),
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
        Command::Form {
            command: FormCommand::Schema,
        } => run_form_schema(),
        Command::Form {
            command: FormCommand::Header,
        } => run_form_header().await,
        Command::Form {
            command: FormCommand::Submit(args),
        } => run_form_submit(args).await,
        Command::Age(args) => {
            run_age(args);
            Ok(())
        }
    }
}
