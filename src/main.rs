mod error;

use build_orchestrator::{RunRequest, Terminal, run_request};
use core_config::RunConfig;
use error::CoreError;
use provenance_ledger::Ledger;
use serde_json::json;
use syntax_engine::LanguageKind;
use tracing_subscriber::EnvFilter;

/// Reads the demo source from `DEMO_SOURCE_FILE` if set, falling back
/// to the embedded greet() sample. Exercises the pure-input-error path
/// (§7: "target file missing") when the env var points at a file that
/// isn't there.
fn load_source() -> error::Result<String> {
    match std::env::var("DEMO_SOURCE_FILE") {
        Ok(path) => std::fs::read_to_string(&path).map_err(|source| CoreError::TargetFile {
            path: path.into(),
            source,
        }),
        Err(_) => Ok("def greet(name):\n    pass\n".to_string()),
    }
}

/// Demo entry point: runs one request end to end against a mock
/// backbone and prints the resulting patch. Not a CLI — request
/// assembly and batch scheduling are left to callers; see
/// `build_orchestrator::run_batch` for the multi-request path.
#[tokio::main]
async fn main() -> error::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RunConfig::mock();

    let source = load_source()?;
    let request = RunRequest::new(
        "demo/greet.py",
        source,
        vec!["greet".to_string()],
        "make greet return a friendly greeting string for name",
        LanguageKind::Python,
    );

    let mut ledger = Ledger::new(request.instruction.clone(), config.snapshot());
    let outcome = run_request(&request, &config, &mut ledger).await;

    match outcome.terminal {
        Terminal::Accepted => {
            println!(
                "accepted after {} attempt(s), risk={:.2}",
                outcome.attempts, outcome.patch.risk_score
            );
            println!("{}", outcome.patch.unified_diff);
        }
        Terminal::RejectedExhausted => {
            println!("rejected after {} attempt(s): retries exhausted", outcome.attempts);
        }
        Terminal::HardError => {
            println!("hard error: no matching constructs found");
        }
    }

    let record = ledger.finalize(None);
    let artifacts_dir = std::path::Path::new(&config.artifacts_dir);
    let filename = if record.success {
        format!("artifact_metadata_{}.json", record.run_id)
    } else {
        format!("artifact_metadata_{}_failed.json", record.run_id)
    };
    let path = artifacts_dir.join(filename);
    if let Err(e) = Ledger::save(&record, &path).await {
        eprintln!(
            "failed to persist ledger: {e}, continuing without on-disk artifact ({})",
            json!({ "run_id": record.run_id })
        );
    }

    Ok(())
}
