use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::{
    config::{App, Args},
    crawler::WebPage,
    ledger::Ledger,
    persistence::GitCli,
    tracker::Outcome,
};

pub mod config;
pub mod crawler;
pub mod declare;
pub mod ledger;
pub mod logging;
pub mod persistence;
pub mod tracker;
pub mod util;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    util::http::init_crypto();

    let args = Args::parse();
    let status = report(run(&args).await);

    logging::flush();
    ExitCode::from(status)
}

/// Prints the outcome of a run and maps it to the process exit status.
fn report(result: Result<Outcome>) -> u8 {
    match result {
        Ok(Outcome::Unchanged(record)) => {
            logging::info_console(format!("Price unchanged: {}", record));
            EXIT_SUCCESS
        }
        Ok(Outcome::Updated(record)) => {
            logging::info_console(format!("Price updated: {}", record));
            EXIT_SUCCESS
        }
        Err(why) => {
            logging::error_console(format!("{:#}", why));
            logging::error_file_async(format!("{:?}", why));
            EXIT_FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<Outcome> {
    let settings = App::load(args)?;
    logging::info_file_async(format!(
        "Checking {} for {} in {}{}",
        settings.source.url,
        settings.source.ident,
        settings.repository.path,
        settings.repository.file_name
    ));

    // ledger 在這個範圍結束時關閉，包含發生錯誤的情況
    let mut ledger = Ledger::open(&settings.repo_dir(), &settings.repository.file_name)?;
    let source = WebPage::from_source(&settings.source, settings.http_timeout());
    let backend = GitCli::from_config(&settings.git);

    tracker::update_price(&settings, &mut ledger, &source, &backend).await
}
