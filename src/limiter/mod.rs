//! Adaptive per-service request pacing.
//!
//! # Data Flow
//! ```text
//! query task → await_turn(chain)
//!     → suspend until last_request_at + current_delay
//!     → stamp last_request_at, return
//! query task → record_outcome(chain, latency, outcome)
//!     → append to latency window
//!     → 429 or slow moving average: delay ×1.5, capped at the ceiling
//!     → full, fast, error-free window: delay ×0.9, floored at the
//!       configured per-service minimum
//! ```
//!
//! # Design Decisions
//! - One mutex per service; it is held across the wait in `await_turn`,
//!   which makes stamp-before-return atomic with respect to concurrent
//!   callers of the same service and spaces their returns by the current
//!   delay. Different services never contend.
//! - The latency window stores outcomes too, so "error-free" is read
//!   straight from the samples rather than a counter that can drift.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ServicesConfig;
use crate::wallet::Chain;

/// How one completed request went, as far as pacing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success,
    RateLimited,
    Error,
}

/// Per-service pacing knobs.
#[derive(Debug, Clone)]
pub struct PacerSettings {
    /// Floor for the inter-request delay.
    pub min_delay: Duration,
    /// Ceiling for the inter-request delay.
    pub ceiling: Duration,
    /// Moving-average latency above which the delay grows.
    pub high_water: Duration,
    /// Number of recent samples kept.
    pub window: usize,
}

const GROWTH_FACTOR: f64 = 1.5;
const DECAY_FACTOR: f64 = 0.9;
/// Backoff starts from at least this much; a zero configured floor must
/// not pin the delay at zero under sustained 429s.
const GROWTH_SEED: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct Sample {
    latency: Duration,
    ok: bool,
}

#[derive(Debug)]
struct PacerState {
    last_request_at: Option<Instant>,
    current_delay: Duration,
    window: VecDeque<Sample>,
}

struct Lane {
    settings: PacerSettings,
    state: Mutex<PacerState>,
}

impl Lane {
    fn new(settings: PacerSettings) -> Self {
        let state = PacerState {
            last_request_at: None,
            current_delay: settings.min_delay,
            window: VecDeque::with_capacity(settings.window),
        };
        Self {
            settings,
            state: Mutex::new(state),
        }
    }
}

/// Per-service adaptive rate limiter.
pub struct RateLimiter {
    btc: Lane,
    eth: Lane,
}

impl RateLimiter {
    pub fn new(btc: PacerSettings, eth: PacerSettings) -> Self {
        Self {
            btc: Lane::new(btc),
            eth: Lane::new(eth),
        }
    }

    pub fn from_config(services: &ServicesConfig) -> Self {
        let settings = |chain: Chain| PacerSettings {
            min_delay: Duration::from_millis(services.for_chain(chain).min_delay_ms),
            ceiling: Duration::from_millis(services.delay_ceiling_ms),
            high_water: Duration::from_millis(services.latency_high_water_ms),
            window: services.latency_window,
        };
        Self::new(settings(Chain::Btc), settings(Chain::Eth))
    }

    fn lane(&self, chain: Chain) -> &Lane {
        match chain {
            Chain::Btc => &self.btc,
            Chain::Eth => &self.eth,
        }
    }

    /// Suspend until this service's turn, then claim it.
    ///
    /// The lock is held across the wait: two callers can never both observe
    /// a stale `last_request_at` and fire together.
    pub async fn await_turn(&self, chain: Chain) {
        let lane = self.lane(chain);
        let mut state = lane.state.lock().await;
        if let Some(last) = state.last_request_at {
            let due = last + state.current_delay;
            tokio::time::sleep_until(due).await;
        }
        state.last_request_at = Some(Instant::now());
    }

    /// Feed a completed request back into the adaptive policy.
    pub async fn record_outcome(&self, chain: Chain, latency: Duration, outcome: QueryOutcome) {
        let lane = self.lane(chain);
        let mut state = lane.state.lock().await;

        if state.window.len() == lane.settings.window {
            state.window.pop_front();
        }
        state.window.push_back(Sample {
            latency,
            ok: outcome == QueryOutcome::Success,
        });

        let average = average_latency(&state.window);
        match outcome {
            QueryOutcome::RateLimited => {
                grow(&mut state, &lane.settings);
                tracing::debug!(
                    service = %chain,
                    delay_ms = state.current_delay.as_millis() as u64,
                    "Upstream rate limit signal, backing off"
                );
            }
            _ if average > lane.settings.high_water => {
                grow(&mut state, &lane.settings);
                tracing::debug!(
                    service = %chain,
                    avg_latency_ms = average.as_millis() as u64,
                    delay_ms = state.current_delay.as_millis() as u64,
                    "Latency above high-water mark, backing off"
                );
            }
            QueryOutcome::Success
                if state.window.len() == lane.settings.window
                    && state.window.iter().all(|s| s.ok) =>
            {
                decay(&mut state, &lane.settings);
            }
            _ => {}
        }
    }

    /// Current inter-request delay for a service. Test and logging hook.
    pub async fn current_delay(&self, chain: Chain) -> Duration {
        self.lane(chain).state.lock().await.current_delay
    }
}

fn average_latency(window: &VecDeque<Sample>) -> Duration {
    if window.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = window.iter().map(|s| s.latency).sum();
    total / window.len() as u32
}

fn grow(state: &mut PacerState, settings: &PacerSettings) {
    state.current_delay = state
        .current_delay
        .max(GROWTH_SEED)
        .mul_f64(GROWTH_FACTOR)
        .min(settings.ceiling)
        .max(settings.min_delay);
}

fn decay(state: &mut PacerState, settings: &PacerSettings) {
    state.current_delay = state
        .current_delay
        .mul_f64(DECAY_FACTOR)
        .max(settings.min_delay);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(min_ms: u64) -> PacerSettings {
        PacerSettings {
            min_delay: Duration::from_millis(min_ms),
            ceiling: Duration::from_millis(2_000),
            high_water: Duration::from_millis(500),
            window: 4,
        }
    }

    fn limiter(min_ms: u64) -> RateLimiter {
        RateLimiter::new(settings(min_ms), settings(min_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_turns_are_spaced_by_the_delay() {
        let limiter = limiter(100);

        limiter.await_turn(Chain::Btc).await;
        let first = Instant::now();
        limiter.await_turn(Chain::Btc).await;
        let gap = Instant::now() - first;
        assert!(gap >= Duration::from_millis(100), "gap was {:?}", gap);
    }

    #[tokio::test(start_paused = true)]
    async fn services_pace_independently() {
        let limiter = limiter(100);

        limiter.await_turn(Chain::Btc).await;
        let before = Instant::now();
        limiter.await_turn(Chain::Eth).await;
        // First turn on an untouched service returns immediately.
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test]
    async fn rate_limit_signal_grows_delay_multiplicatively() {
        let limiter = limiter(100);

        limiter
            .record_outcome(Chain::Eth, Duration::from_millis(10), QueryOutcome::RateLimited)
            .await;
        assert_eq!(
            limiter.current_delay(Chain::Eth).await,
            Duration::from_millis(150)
        );

        limiter
            .record_outcome(Chain::Eth, Duration::from_millis(10), QueryOutcome::RateLimited)
            .await;
        assert_eq!(
            limiter.current_delay(Chain::Eth).await,
            Duration::from_millis(225)
        );
    }

    #[tokio::test]
    async fn backoff_grows_even_from_a_zero_floor() {
        // A zero floor is legal for mocked runs and reachable through the
        // delay overrides; sustained 429s must still open a gap.
        let limiter = RateLimiter::new(settings(0), settings(0));
        for _ in 0..50 {
            limiter
                .record_outcome(Chain::Btc, Duration::from_millis(10), QueryOutcome::RateLimited)
                .await;
        }
        let delay = limiter.current_delay(Chain::Btc).await;
        assert!(delay >= Duration::from_millis(150), "delay was {:?}", delay);
        assert!(delay <= Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn delay_is_capped_at_the_ceiling() {
        let limiter = limiter(100);
        for _ in 0..20 {
            limiter
                .record_outcome(Chain::Btc, Duration::from_millis(10), QueryOutcome::RateLimited)
                .await;
        }
        assert_eq!(
            limiter.current_delay(Chain::Btc).await,
            Duration::from_millis(2_000)
        );
    }

    #[tokio::test]
    async fn slow_average_grows_delay() {
        let limiter = limiter(100);
        for _ in 0..4 {
            limiter
                .record_outcome(Chain::Btc, Duration::from_millis(800), QueryOutcome::Success)
                .await;
        }
        assert!(limiter.current_delay(Chain::Btc).await > Duration::from_millis(100));
    }

    #[tokio::test]
    async fn fast_clean_window_decays_toward_the_floor() {
        let limiter = limiter(100);

        // Drive the delay up first.
        for _ in 0..4 {
            limiter
                .record_outcome(Chain::Eth, Duration::from_millis(10), QueryOutcome::RateLimited)
                .await;
        }
        let inflated = limiter.current_delay(Chain::Eth).await;
        assert!(inflated > Duration::from_millis(100));

        // A long run of fast, error-free responses decays back to the floor.
        for _ in 0..100 {
            limiter
                .record_outcome(Chain::Eth, Duration::from_millis(5), QueryOutcome::Success)
                .await;
        }
        assert_eq!(
            limiter.current_delay(Chain::Eth).await,
            Duration::from_millis(100)
        );
    }

    #[tokio::test]
    async fn errors_in_window_block_decay() {
        let limiter = limiter(100);
        limiter
            .record_outcome(Chain::Btc, Duration::from_millis(10), QueryOutcome::RateLimited)
            .await;
        let inflated = limiter.current_delay(Chain::Btc).await;

        // Window of 4 still contains the failed sample: no decay yet.
        for _ in 0..3 {
            limiter
                .record_outcome(Chain::Btc, Duration::from_millis(5), QueryOutcome::Success)
                .await;
        }
        assert_eq!(limiter.current_delay(Chain::Btc).await, inflated);
    }
}
