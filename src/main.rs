use kim::cli::{self, App};
use kim::infra::telemetry;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::parse();
    telemetry::init(cli.verbose);

    let result = App::from_cli(&cli).and_then(|app| app.run(cli.command.clone()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kim: {err:#}");
            ExitCode::FAILURE
        }
    }
}
