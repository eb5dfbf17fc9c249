use std::process::ExitCode;

use sspf::app::{RunOutcome, run};
use sspf::config::RunConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RunConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config.with_env(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(&config) {
        Ok(RunOutcome::OutputExists(path)) => {
            println!("===============");
            println!("file {} exists. Delete it first", path.display());
            println!("or change the output filename");
            println!("===============");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Written(result)) => {
            println!("Completeness = {}", result.completeness);
            println!("Purity = {}", result.purity);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
