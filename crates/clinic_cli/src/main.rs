//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `clinic_core` linkage with deterministic output.
//! - `doctors`: print the public doctor directory from the configured
//!   database as JSON.

use clinic_api::ApiConfig;
use clinic_core::db::open_db;
use clinic_core::{AccountService, LogNotifier, SqliteAccountRepository};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {
            println!("clinic_core ping={}", clinic_core::ping());
            println!("clinic_core version={}", clinic_core::core_version());
            ExitCode::SUCCESS
        }
        Some("doctors") => match print_doctors(ApiConfig::global()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(message) => {
                eprintln!("doctors failed: {message}");
                ExitCode::FAILURE
            }
        },
        Some(other) => {
            eprintln!("unknown command `{other}`; expected no arguments or `doctors`");
            ExitCode::from(2)
        }
    }
}

fn print_doctors(config: &ApiConfig) -> Result<(), String> {
    config.init_logging().map_err(|err| err.to_string())?;
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteAccountRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = AccountService::new(repo, Arc::new(LogNotifier));
    let doctors = service
        .list_available_doctors()
        .map_err(|err| err.to_string())?;
    let rendered = serde_json::to_string_pretty(&doctors).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}
