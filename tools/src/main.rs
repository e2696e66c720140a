//! lift-runner: line-oriented front end for lift studies.
//!
//! Reads one JSON request per stdin line and writes one JSON response per
//! stdout line. Logs go to stderr.
//!
//! Usage:
//!   lift-runner --db lift.db --bucket-dir ./bucket
//!   lift-runner --today 2024-05-01 --seed 7
//!
//! Requests:
//!   {"type":"http","method":"POST","body":{"name":"spring","start_date":"2024-05-01",...}}
//!   {"type":"http","method":"GET","study_id":"<id>","query":{"conversion_event":"Purchase"}}
//!   {"type":"http","method":"PATCH","study_id":"<id>","body":{"status":"paused"}}
//!   {"type":"message","template":"spring_promo","to":"+1 555 010 2030"}
//!   {"type":"quit"}

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use lift_core::{
    assignment::ParticipantRouter,
    blob::FsBlobStore,
    clock::StudyClock,
    config::LiftConfig,
    handler::{handle_request, LiftRequest},
    rng::AssignmentRng,
    store::LiftStore,
    study_service::StudyService,
};
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RunnerRequest {
    Http {
        method: String,
        #[serde(default)]
        study_id: Option<String>,
        #[serde(default)]
        query: HashMap<String, String>,
        #[serde(default)]
        body: Option<serde_json::Value>,
    },
    Message {
        template: String,
        to: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = LiftConfig::from_env()?;
    if let Some(db) = string_arg(&args, "--db") {
        config.db_path = db;
    }
    if let Some(dir) = string_arg(&args, "--bucket-dir") {
        config.bucket_dir = dir;
    }
    if let Some(seed) = string_arg(&args, "--seed") {
        config.assignment_seed = Some(seed.parse()?);
    }
    if let Some(today) = string_arg(&args, "--today") {
        let date = NaiveDate::parse_from_str(&today, "%Y-%m-%d")?;
        config.clock = StudyClock::Fixed(date);
    }

    // For :memory: use a shared-cache URI so every per-request connection
    // sees the same database. `anchor` keeps it alive for the whole run.
    if config.db_path == ":memory:" {
        config.db_path = format!(
            "file:lift_{}?mode=memory&cache=shared",
            Utc::now().timestamp()
        );
    }
    let anchor = LiftStore::open(&config.db_path)?;
    anchor.migrate()?;
    log::info!(
        "lift-runner ready (db={}, schema v{})",
        config.db_path,
        anchor.schema_version()?
    );

    let blobs = FsBlobStore::new(&config.bucket_dir);
    let mut rng = AssignmentRng::from_seed(config.assignment_seed);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: RunnerRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        // One connection per request, closed when `store` drops.
        let store = LiftStore::open(&config.db_path)?;
        let response = match request {
            RunnerRequest::Quit => break,
            RunnerRequest::Http {
                method,
                study_id,
                query,
                body,
            } => {
                let service = StudyService::new(&store, &blobs, &config);
                let request = LiftRequest {
                    method,
                    study_id,
                    query,
                    body,
                };
                serde_json::to_value(handle_request(&service, &request))?
            }
            RunnerRequest::Message { template, to } => {
                let mut router = ParticipantRouter::new(&store, config.clock, &mut rng);
                serde_json::to_value(router.route_or_deliver(&template, &to))?
            }
        };
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }

    Ok(())
}

fn string_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
