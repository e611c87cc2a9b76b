use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::ContactRow;
use crate::engine::EligibilityEngine;
use crate::roster;
use crate::whatsapp::WhatsAppClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Contacts whose day and window matched right now.
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
}

pub async fn run(cfg: Config) -> Result<Summary> {
    let rows = roster::load(&cfg.events_path)?;
    let engine = EligibilityEngine::from_config(&cfg);
    let client = WhatsAppClient::from_config(&cfg)?;

    info!(
        rows = rows.len(),
        dry_run = cfg.dry_run,
        send_hour = cfg.send_hour,
        window_minutes = cfg.send_window_minutes,
        "run.start"
    );

    let summary = run_batch(&engine, &client, &rows, Utc::now(), cfg.send_concurrency, cfg.dry_run).await;

    info!(
        candidates = summary.candidates,
        sent = summary.sent,
        failed = summary.failed,
        "run.summary"
    );
    println!("Eligible contacts: {} | Sent: {}", summary.candidates, summary.sent);

    Ok(summary)
}

/// Evaluates every row against `now` and dispatches the eligible ones,
/// at most `concurrency` requests in flight. A failed send never stops the batch.
pub async fn run_batch(
    engine: &EligibilityEngine,
    client: &WhatsAppClient,
    rows: &[ContactRow],
    now: DateTime<Utc>,
    concurrency: usize,
    dry_run: bool,
) -> Summary {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = Summary::default();

    for row in rows {
        let Some(decision) = engine.evaluate(row, now) else {
            continue;
        };
        if !decision.should_send {
            continue;
        }
        summary.candidates += 1;

        if dry_run {
            info!(
                to = %decision.contact.phone,
                template = %decision.template_name,
                lang = %decision.language_code,
                zone = %decision.zone,
                local = %decision.local_time,
                "dispatch.dry_run"
            );
            continue;
        }

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let client = client.clone();
        tasks.spawn(async move {
            let _permit = permit;
            client.dispatch(&decision).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) if outcome.ok => summary.sent += 1,
            Ok(_) => summary.failed += 1,
            Err(err) => {
                warn!(error = %err, "dispatch.task_failed");
                summary.failed += 1;
            }
        }
    }

    summary
}
