#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use coord::cli::{parse_cli_args, suggest_commands, CliAction, CliError, HELP_TEXT};
use coord::commands::execute;
use coord::config::CoordConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_VAR: &str = "COORD_LOG";
const USAGE_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = run(&args).await;
    std::process::exit(code);
}

async fn run(args: &[String]) -> i32 {
    let command = match parse_cli_args(args) {
        Ok(CliAction::ShowHelp) => {
            print!("{HELP_TEXT}");
            return 0;
        }
        Ok(CliAction::ShowVersion) => {
            println!("coord {}", env!("CARGO_PKG_VERSION"));
            return 0;
        }
        Ok(CliAction::Command(command)) => command,
        Err(err) => {
            report_usage_error(&err);
            return USAGE_EXIT_CODE;
        }
    };

    let config = match CoordConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return err.exit_code();
        }
    };

    match execute(command, &config).await {
        Ok(output) => {
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            output.exit_code
        }
        Err(err) => {
            debug!(code = err.code(), "command failed: {err}");
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn report_usage_error(err: &CliError) {
    eprintln!("error: {err}");
    if let CliError::UnknownCommand { cmd } = err {
        if let Some(suggestion) = suggest_commands(cmd).first() {
            eprintln!("did you mean `{suggestion}`?");
        }
    }
    eprintln!("run `coord --help` for usage");
    debug!(?err, "usage error");
}

fn init_tracing() {
    let filter = std::env::var(LOG_FILTER_VAR)
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
