//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `fractal_core` end to end against an in-memory database.
//! - Print results as JSON so runs are easy to diff.

use fractal_core::{
    condition, init_logging, record, Database, DbConfig, Field, LogConfig, Schema, SqlType,
    StoreResult,
};
use log::warn;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(config) = LogConfig::from_env() {
        if let Err(err) = init_logging(&config) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("fractal_core version={}", fractal_core::core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> StoreResult<()> {
    let db = Database::open_with(&DbConfig::memory())?;
    let schema = Schema::with_implicit_fields([
        Field::new("name", SqlType::Text).not_null(),
        Field::new("age", SqlType::Integer),
    ])?;
    let people = db.create_collection("people", schema)?;
    people.insert([
        record! { "name" => "Ada", "age" => 36 },
        record! { "name" => "Alan", "age" => 41 },
        record! { "name" => "Grace" },
    ])?;

    let adults = people
        .select(["name", "age"])
        .filter(&(condition("age").gt(40) | condition("age").is_null()))?;
    println!("{}", serde_json::to_string(&adults)?);
    println!("count={}", people.count()?);
    Ok(())
}
