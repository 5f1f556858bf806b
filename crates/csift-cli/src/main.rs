//! ClipSift command-line client binary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use csift_client::ApiClient;
use csift_models::{FilterMode, JobState, SubmitOptions};
use csift_tracker::{FileCandidate, JobTracker, QuotaDecision, TrackerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON when requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("csift=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .init();
    }

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("Usage: csift <media-file>...");
        eprintln!("Environment: CSIFT_API_URL, CSIFT_API_TOKEN, CSIFT_MODE, CSIFT_THRESHOLD, CSIFT_LANGUAGES, CSIFT_OUTPUT_DIR");
        std::process::exit(2);
    }

    let client = match ApiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Invalid client configuration: {}", e);
            std::process::exit(1);
        }
    };
    let tracker = JobTracker::new(TrackerConfig::from_env(), client);

    match tracker.check_quota().await {
        QuotaDecision::Block(reason) => {
            error!(reason = %reason, "Submission blocked by quota");
            std::process::exit(1);
        }
        QuotaDecision::ProceedWithWarning(warning) => {
            warn!(warning = %warning, "Close to the submission quota");
            if !confirm("Continue anyway? [y/N] ") {
                info!("Aborted");
                return;
            }
        }
        QuotaDecision::Proceed => {}
    }

    let options = options_from_env();
    info!(mode = %options.mode, threshold = options.threshold, "Submitting {} file(s)", paths.len());

    let mut submitted = Vec::new();
    for path in paths {
        let candidate = match FileCandidate::from_path(&path).await {
            Ok(candidate) => candidate,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Cannot read file");
                continue;
            }
        };
        match tracker.submit(candidate, options.clone()).await {
            Ok(id) => submitted.push(id),
            Err(e) => error!(path = %path.display(), error = %e, "Submission refused"),
        }
    }

    if submitted.is_empty() {
        error!("Nothing was submitted");
        std::process::exit(1);
    }

    // Render progress until every job settles
    let mut last_rendered: HashMap<String, String> = HashMap::new();
    loop {
        let jobs = tracker.jobs();
        for job in &jobs {
            let phase = job.phase.as_deref().unwrap_or("Waiting");
            let line = format!("{}:{}:{}", job.state, job.display_percent, phase);
            if last_rendered.get(job.id.as_str()) != Some(&line) {
                info!(
                    file = %job.file_name,
                    state = %job.state,
                    percent = job.display_percent,
                    phase = phase,
                    "Progress"
                );
                last_rendered.insert(job.id.as_str().to_string(), line);
            }
        }
        if jobs.iter().all(|j| j.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    // Download artifacts for completed jobs
    let out_dir = PathBuf::from(std::env::var("CSIFT_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()));
    let mut failures = 0usize;
    for job in tracker.jobs() {
        match job.state {
            JobState::Completed => match tracker.download_result(&job.id, &out_dir).await {
                Ok(saved) => info!(file = %job.file_name, saved = %saved.display(), "Artifact saved"),
                Err(e) => {
                    failures += 1;
                    error!(file = %job.file_name, error = %e, "Artifact download failed");
                }
            },
            JobState::Failed => {
                failures += 1;
                error!(
                    file = %job.file_name,
                    error = job.error_message.as_deref().unwrap_or("unknown error"),
                    "Job failed"
                );
            }
            _ => {}
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

/// Build submission options from `CSIFT_MODE`, `CSIFT_THRESHOLD` and
/// `CSIFT_LANGUAGES`.
fn options_from_env() -> SubmitOptions {
    let defaults = SubmitOptions::default();
    SubmitOptions {
        mode: match std::env::var("CSIFT_MODE").as_deref() {
            Ok("beep") => FilterMode::Beep,
            Ok("cut") => FilterMode::Cut,
            _ => FilterMode::Mute,
        },
        threshold: std::env::var("CSIFT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.threshold),
        languages: std::env::var("CSIFT_LANGUAGES")
            .map(|s| s.split(',').map(|l| l.trim().to_string()).collect())
            .unwrap_or(defaults.languages),
    }
}

fn confirm(prompt: &str) -> bool {
    use std::io::Write;

    print!("{prompt}");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
