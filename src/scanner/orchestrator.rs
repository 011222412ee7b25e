//! Scan orchestration: candidate lifecycle from generation to report.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinSet;

use crate::config::ProbeConfig;
use crate::credential::{Candidate, CredentialSource};
use crate::error::ProbeError;
use crate::gate::ConcurrencyGate;
use crate::lifecycle::Shutdown;
use crate::limiter::{QueryOutcome, RateLimiter};
use crate::safety::Dispatcher;
use crate::scanner::report::{ScanReport, ScanStats};
use crate::scanner::types::{BalanceResult, QueryStatus, ScanRecord};
use crate::wallet::{derive_address, Chain, ChainAddress};

/// Shared state every query task sees. One allocation for the whole run.
struct ScanContext {
    config: Arc<ProbeConfig>,
    dispatcher: Dispatcher,
    gate: ConcurrencyGate,
    limiter: RateLimiter,
    stats: ScanStats,
    shutdown: Arc<Shutdown>,
    source: CredentialSource,
}

/// Drives a full scan run.
pub struct ScanOrchestrator {
    ctx: Arc<ScanContext>,
}

impl ScanOrchestrator {
    pub fn new(config: Arc<ProbeConfig>, dispatcher: Dispatcher, shutdown: Arc<Shutdown>) -> Self {
        let gate = ConcurrencyGate::new(config.scan.max_concurrent);
        let limiter = RateLimiter::from_config(&config.services);
        Self {
            ctx: Arc::new(ScanContext {
                config,
                dispatcher,
                gate,
                limiter,
                stats: ScanStats::new(),
                shutdown,
                source: CredentialSource::new(),
            }),
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.ctx.gate
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.ctx.dispatcher
    }

    /// Run until `target_scans` candidates complete, the deadline fires, or
    /// shutdown is triggered. Always returns a report except when the
    /// entropy source fails.
    pub async fn run_scan(&self) -> Result<ScanReport, ProbeError> {
        let target = self.ctx.config.scan.target_scans;
        let spawn_cap = self.ctx.config.scan.max_concurrent * 2;
        tracing::info!(
            target_scans = target,
            max_concurrent = self.ctx.config.scan.max_concurrent,
            live = self.ctx.dispatcher.is_live(),
            "Scan starting"
        );

        let watchdog = self.spawn_deadline_watchdog();

        let mut tasks: JoinSet<ScanRecord> = JoinSet::new();
        let mut records = Vec::with_capacity(target);
        let mut entropy_failure = None;

        let mut spawned = 0;
        while spawned < target {
            if self.ctx.shutdown.is_triggered() {
                break;
            }
            // Keep the task set bounded; the gate bounds actual queries.
            while tasks.len() >= spawn_cap {
                if let Some(Ok(record)) = tasks.join_next().await {
                    records.push(record);
                }
            }

            let candidate = match self.ctx.source.next() {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::error!(error = %e, "Entropy source failed, shutting down");
                    self.ctx.shutdown.trigger();
                    entropy_failure = Some(e);
                    break;
                }
            };
            let ctx = Arc::clone(&self.ctx);
            tasks.spawn(async move { scan_candidate(&ctx, candidate).await });
            spawned += 1;
        }

        if self.ctx.shutdown.is_triggered() {
            // Fail blocked admission waits so in-flight tasks unwind fast.
            self.ctx.gate.close();
        }
        while let Some(joined) = tasks.join_next().await {
            if let Ok(record) = joined {
                records.push(record);
            }
        }
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        self.ctx.dispatcher.close();

        if let Some(e) = entropy_failure {
            return Err(e);
        }

        let report = ScanReport {
            completed: records.len(),
            records,
            counts: self.ctx.stats.counts(),
            target_scans: target,
            cancelled: self.ctx.shutdown.is_triggered(),
            elapsed: self.ctx.stats.elapsed(),
        };
        tracing::info!(
            completed = report.completed,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scan finished"
        );
        Ok(report)
    }

    fn spawn_deadline_watchdog(&self) -> Option<tokio::task::JoinHandle<()>> {
        let deadline_secs = self.ctx.config.scan.run_deadline_secs?;
        let shutdown = Arc::clone(&self.ctx.shutdown);
        Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(deadline_secs)).await;
            tracing::warn!(deadline_secs, "Run deadline reached, cancelling scan");
            shutdown.trigger();
        }))
    }
}

/// Derive addresses for one candidate and query every chain.
async fn scan_candidate(ctx: &Arc<ScanContext>, candidate: Candidate) -> ScanRecord {
    let candidate_id = candidate.id;
    let started_at = SystemTime::now();

    // Derivation hashes on the CPU; keep it off the I/O workers. The
    // candidate (and its secret) is consumed here and dropped after.
    let targets: Vec<ChainAddress> = tokio::task::spawn_blocking(move || {
        Chain::ALL
            .iter()
            .map(|&chain| derive_address(&candidate, chain))
            .collect()
    })
    .await
    .unwrap_or_default();

    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let result = query_chain(ctx, target).await;
        ctx.stats.record(&result);
        results.push(result);
    }
    ctx.stats.record_candidate();
    tracing::debug!(candidate = %candidate_id, results = results.len(), "Candidate scanned");

    ScanRecord {
        candidate_id,
        results,
        started_at,
        finished_at: SystemTime::now(),
    }
}

/// One balance query, cancellable at every await point before dispatch.
async fn query_chain(ctx: &Arc<ScanContext>, target: ChainAddress) -> BalanceResult {
    let mut cancel = ctx.shutdown.subscribe();
    // Subscribe first, then check the flag: a trigger in between is
    // caught by one or the other.
    if ctx.shutdown.is_triggered() {
        return BalanceResult::unresolved(target, QueryStatus::Error);
    }

    tokio::select! {
        _ = cancel.recv() => BalanceResult::unresolved(target, QueryStatus::Error),
        result = execute_query(ctx, target.clone()) => result,
    }
}

async fn execute_query(ctx: &Arc<ScanContext>, target: ChainAddress) -> BalanceResult {
    let lease = match ctx.gate.acquire().await {
        Ok(lease) => lease,
        Err(_) => return BalanceResult::unresolved(target, QueryStatus::Error),
    };

    ctx.limiter.await_turn(target.chain).await;
    let reply = ctx.dispatcher.dispatch(&target).await;
    ctx.limiter
        .record_outcome(target.chain, reply.latency, outcome_of(reply.status))
        .await;
    drop(lease);

    BalanceResult {
        chain_address: target,
        amount: reply.amount,
        status: reply.status,
        latency: reply.latency,
        timestamp: SystemTime::now(),
    }
}

fn outcome_of(status: QueryStatus) -> QueryOutcome {
    match status {
        QueryStatus::Ok | QueryStatus::NotFound | QueryStatus::Mocked => QueryOutcome::Success,
        QueryStatus::RateLimited => QueryOutcome::RateLimited,
        QueryStatus::Error => QueryOutcome::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    fn instant_config(target_scans: usize) -> Arc<ProbeConfig> {
        let mut config = ProbeConfig::default();
        config.scan.target_scans = target_scans;
        config.services.btc.min_delay_ms = 0;
        config.services.eth.min_delay_ms = 0;
        Arc::new(config)
    }

    fn orchestrator(config: Arc<ProbeConfig>) -> ScanOrchestrator {
        let dispatcher = Dispatcher::from_config(&config).unwrap();
        ScanOrchestrator::new(config, dispatcher, Arc::new(Shutdown::new()))
    }

    #[tokio::test]
    async fn test_mode_run_completes_the_target() {
        let orchestrator = orchestrator(instant_config(5));
        let report = orchestrator.run_scan().await.unwrap();

        assert_eq!(report.completed, 5);
        assert!(!report.cancelled);
        assert_eq!(report.counts.mocked, 10); // two chains per candidate
        for record in &report.records {
            assert_eq!(record.results.len(), 2);
            for result in &record.results {
                assert_eq!(result.status, QueryStatus::Mocked);
                assert_eq!(result.amount, Some(0.0));
            }
        }
        assert_eq!(orchestrator.gate().in_flight(), 0);
    }

    #[tokio::test]
    async fn pre_triggered_shutdown_yields_an_empty_cancelled_report() {
        let config = instant_config(50);
        let shutdown = Arc::new(Shutdown::new());
        shutdown.trigger();
        let dispatcher = Dispatcher::from_config(&config).unwrap();
        let orchestrator = ScanOrchestrator::new(config, dispatcher, shutdown);

        let report = orchestrator.run_scan().await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed, 0);
    }

    #[tokio::test]
    async fn deadline_cancels_a_long_run() {
        let mut config = ProbeConfig::default();
        config.mode = Mode::Test;
        config.scan.target_scans = 1_000;
        // Pacing keeps the run far longer than the deadline.
        config.services.btc.min_delay_ms = 50;
        config.services.eth.min_delay_ms = 50;
        config.scan.run_deadline_secs = Some(1);

        let orchestrator = orchestrator(Arc::new(config));
        let report = orchestrator.run_scan().await.unwrap();
        assert!(report.cancelled);
        assert!(report.completed < 1_000);
        assert_eq!(orchestrator.gate().in_flight(), 0);
    }
}
