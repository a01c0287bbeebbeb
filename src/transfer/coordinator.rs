//! Pending Transfer Coordinator
//!
//! Bridges the synchronous transfer call and the asynchronous settlement
//! notification. The registry is keyed by end-to-end id; whoever removes an
//! entry owns its completion, so webhook, polling, timeout, duplicate
//! eviction and shutdown can race freely and exactly one of them wins.
//!
//! # Timeline (defaults)
//!
//! ```text
//! 0s            30s      35s                 50s
//! |-- webhook grace --|-- poll --|-- poll --|-- timeout
//! ```
//!
//! Every entry carries a generation number. Timers and polling only act on
//! the entry generation they were started for, so a stale timer can never
//! complete a later transfer that reuses the same end-to-end id.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::ConfirmationError;
use super::settlement::outcome_from_status;
use super::types::{ConfirmationSource, TransferResponse};
use crate::config::TransferTimingConfig;
use crate::providers::{PaymentProvider, PaymentStatusQuery};

type Outcome = Result<TransferResponse, ConfirmationError>;

/// Registry entry for one in-flight transfer
struct PendingTransfer {
    transaction_id: String,
    generation: u64,
    /// When the transfer call arrived (budget base)
    started_at: Instant,
    /// When the entry was registered
    created_at: Instant,
    polling_attempts: u32,
    responder: oneshot::Sender<Outcome>,
    timeout_timer: Option<JoinHandle<()>>,
    polling_timer: Option<JoinHandle<()>>,
}

impl PendingTransfer {
    fn cancel_timers(&self) {
        if let Some(timer) = &self.timeout_timer {
            timer.abort();
        }
        if let Some(timer) = &self.polling_timer {
            timer.abort();
        }
    }

    /// Cancel timers and hand the outcome to the waiter.
    /// Returns false if the waiter already went away.
    fn complete(self, outcome: Outcome) -> bool {
        self.cancel_timers();
        self.responder.send(outcome).is_ok()
    }
}

struct CoordinatorInner {
    timing: TransferTimingConfig,
    payment_provider: Arc<dyn PaymentProvider>,
    registry: DashMap<String, PendingTransfer>,
    next_generation: AtomicU64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinatorInner {
    /// Remove and complete the entry for `end_to_end_id`. With a
    /// `generation`, only that registration may be completed.
    fn resolve(
        &self,
        end_to_end_id: &str,
        generation: Option<u64>,
        mut response: TransferResponse,
        source: ConfirmationSource,
    ) -> bool {
        let removed = match generation {
            Some(generation) => self
                .registry
                .remove_if(end_to_end_id, |_, entry| entry.generation == generation),
            None => self.registry.remove(end_to_end_id),
        };
        let Some((_, entry)) = removed else {
            warn!(
                end_to_end_id,
                source = %source,
                "No pending transfer found (already resolved, timed out or unknown)"
            );
            return false;
        };

        let resolved_at = Instant::now();
        info!(
            end_to_end_id,
            transaction_id = %entry.transaction_id,
            source = %source,
            response_code = %response.response_code,
            polling_attempts = entry.polling_attempts,
            total_duration_ms = resolved_at.saturating_duration_since(entry.started_at).as_millis() as u64,
            registration_delay_ms = entry.created_at.saturating_duration_since(entry.started_at).as_millis() as u64,
            waiting_duration_ms = resolved_at.saturating_duration_since(entry.created_at).as_millis() as u64,
            "Transfer confirmation resolved"
        );

        if response.transaction_id.is_empty() {
            response.transaction_id = entry.transaction_id.clone();
        }
        if response.end_to_end_id.is_none() {
            response.end_to_end_id = Some(end_to_end_id.to_string());
        }
        if !entry.complete(Ok(response)) {
            debug!(end_to_end_id, "Waiter dropped before the outcome was delivered");
        }
        true
    }

    /// Count a polling attempt for the live registration, if still there
    fn record_polling_attempt(&self, end_to_end_id: &str, generation: u64) -> Option<u32> {
        let mut entry = self.registry.get_mut(end_to_end_id)?;
        if entry.generation != generation {
            return None;
        }
        entry.polling_attempts += 1;
        Some(entry.polling_attempts)
    }

    fn clear_all(&self) -> usize {
        let keys: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        let mut cleared = 0;
        for key in keys {
            if let Some((_, entry)) = self.registry.remove(&key) {
                entry.complete(Err(ConfirmationError::ShuttingDown));
                cleared += 1;
            }
        }
        if cleared > 0 {
            info!(cleared, "Cleared pending transfers");
        }
        cleared
    }

    fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let stale_after = self.timing.stale_after();
        let stale: Vec<(String, u64)> = self
            .registry
            .iter()
            .filter(|e| now.saturating_duration_since(e.created_at) > stale_after)
            .map(|e| (e.key().clone(), e.generation))
            .collect();

        let mut evicted = 0;
        for (key, generation) in stale {
            if let Some((_, entry)) = self
                .registry
                .remove_if(&key, |_, e| e.generation == generation)
            {
                warn!(
                    end_to_end_id = %key,
                    transaction_id = %entry.transaction_id,
                    age_ms = now.saturating_duration_since(entry.created_at).as_millis() as u64,
                    "Evicting stale pending transfer"
                );
                // Dropping the sender wakes the waiter with `Abandoned`.
                entry.cancel_timers();
                evicted += 1;
            }
        }
        evicted
    }
}

/// Polling attempts that fit into `remaining`.
///
/// An attempt needs a full query timeout; a further attempt is only made
/// while more than one interval plus one query timeout is left.
pub(crate) fn max_polling_attempts(
    remaining: Duration,
    interval: Duration,
    query_timeout: Duration,
) -> u32 {
    if remaining.is_zero() || remaining < query_timeout {
        return 0;
    }
    let slack = (remaining - query_timeout).as_millis();
    let step = interval.as_millis().max(1);
    let attempts = slack.div_ceil(step).max(1);
    u32::try_from(attempts).unwrap_or(u32::MAX)
}

async fn run_timeout(
    inner: Arc<CoordinatorInner>,
    end_to_end_id: String,
    generation: u64,
    after: Duration,
) {
    tokio::time::sleep(after).await;

    let Some((_, entry)) = inner
        .registry
        .remove_if(&end_to_end_id, |_, e| e.generation == generation)
    else {
        return;
    };
    warn!(
        end_to_end_id = %end_to_end_id,
        transaction_id = %entry.transaction_id,
        polling_attempts = entry.polling_attempts,
        total_duration_ms = Instant::now().saturating_duration_since(entry.started_at).as_millis() as u64,
        "Final response from the provider was never received"
    );
    entry.complete(Err(ConfirmationError::Timeout(end_to_end_id)));
}

async fn run_polling(
    inner: Arc<CoordinatorInner>,
    end_to_end_id: String,
    transaction_id: String,
    generation: u64,
    deadline: Instant,
    start_delay: Duration,
) {
    tokio::time::sleep(start_delay).await;

    if !inner.timing.polling_enabled {
        debug!(end_to_end_id = %end_to_end_id, "Polling disabled, waiting for webhook or timeout");
        return;
    }

    let interval = inner.timing.polling_interval();
    let query_timeout = inner.timing.query_timeout();
    let max_attempts = max_polling_attempts(
        deadline.saturating_duration_since(Instant::now()),
        interval,
        query_timeout,
    );
    if max_attempts == 0 {
        debug!(end_to_end_id = %end_to_end_id, "No budget left for status polling");
        return;
    }
    debug!(end_to_end_id = %end_to_end_id, max_attempts, "Webhook grace elapsed, starting status polling");

    let query = PaymentStatusQuery::by_end_to_end_id(end_to_end_id.as_str());

    for _ in 0..max_attempts {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || remaining < query_timeout {
            debug!(
                end_to_end_id = %end_to_end_id,
                remaining_ms = remaining.as_millis() as u64,
                "Not enough time left for another status query"
            );
            return;
        }

        let Some(attempt) = inner.record_polling_attempt(&end_to_end_id, generation) else {
            return;
        };
        debug!(
            end_to_end_id = %end_to_end_id,
            attempt,
            remaining_ms = remaining.as_millis() as u64,
            "Querying payment status"
        );

        let result = tokio::time::timeout(
            query_timeout,
            inner.payment_provider.query_payment_status(&query, query_timeout),
        )
        .await;

        match result {
            Ok(Ok(status)) => {
                if let Some(outcome) = outcome_from_status(&transaction_id, &end_to_end_id, &status) {
                    inner.resolve(&end_to_end_id, Some(generation), outcome, ConfirmationSource::Polling);
                    return;
                }
                debug!(end_to_end_id = %end_to_end_id, attempt, "Payment not settled yet");
            }
            Ok(Err(e)) => {
                warn!(end_to_end_id = %end_to_end_id, attempt, error = %e, "Payment status query failed");
            }
            Err(_) => {
                warn!(
                    end_to_end_id = %end_to_end_id,
                    attempt,
                    query_timeout_ms = query_timeout.as_millis() as u64,
                    "Payment status query timed out"
                );
            }
        }

        // Measured after the query: a slow query eats into the next attempt's budget
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining <= interval + query_timeout {
            debug!(
                end_to_end_id = %end_to_end_id,
                attempt,
                remaining_ms = remaining.as_millis() as u64,
                "Polling budget exhausted"
            );
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Registry of transfers waiting for a settlement outcome
#[derive(Clone)]
pub struct PendingTransferCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl PendingTransferCoordinator {
    pub fn new(timing: TransferTimingConfig, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                timing,
                payment_provider,
                registry: DashMap::new(),
                next_generation: AtomicU64::new(1),
                sweeper: Mutex::new(None),
            }),
        }
    }

    pub fn timing(&self) -> &TransferTimingConfig {
        &self.inner.timing
    }

    /// Wait for the settlement outcome of `end_to_end_id`.
    ///
    /// `started_at` is when the transfer call arrived (defaults to now); time
    /// already spent is deducted from both the timeout and the webhook grace.
    pub async fn wait_for_confirmation(
        &self,
        transaction_id: &str,
        end_to_end_id: &str,
        started_at: Option<Instant>,
    ) -> Result<TransferResponse, ConfirmationError> {
        let end_to_end_id = end_to_end_id.trim();
        let receiver = self.register(transaction_id, end_to_end_id, started_at)?;
        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConfirmationError::Abandoned(end_to_end_id.to_string())),
        }
    }

    fn register(
        &self,
        transaction_id: &str,
        end_to_end_id: &str,
        started_at: Option<Instant>,
    ) -> Result<oneshot::Receiver<Outcome>, ConfirmationError> {
        if end_to_end_id.is_empty() {
            return Err(ConfirmationError::InvalidEndToEndId);
        }
        let inner = &self.inner;

        if let Some((_, previous)) = inner.registry.remove(end_to_end_id) {
            warn!(
                end_to_end_id,
                previous_transaction_id = %previous.transaction_id,
                transaction_id,
                "Duplicate request detected, rejecting previous waiter"
            );
            previous.complete(Err(ConfirmationError::Duplicate(end_to_end_id.to_string())));
        }

        let now = Instant::now();
        let base = started_at.unwrap_or(now);
        let elapsed = now.saturating_duration_since(base);
        let remaining = inner.timing.timeout().saturating_sub(elapsed);
        let polling_delay = inner.timing.polling_start_delay().saturating_sub(elapsed);

        if remaining.is_zero() {
            warn!(
                end_to_end_id,
                transaction_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Confirmation budget already spent before registration"
            );
            return Err(ConfirmationError::Timeout(end_to_end_id.to_string()));
        }

        let generation = inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (responder, receiver) = oneshot::channel();
        let entry = PendingTransfer {
            transaction_id: transaction_id.to_string(),
            generation,
            started_at: base,
            created_at: now,
            polling_attempts: 0,
            responder,
            timeout_timer: None,
            polling_timer: None,
        };
        if let Some(displaced) = inner.registry.insert(end_to_end_id.to_string(), entry) {
            // Concurrent registration for the same id landed in between.
            displaced.complete(Err(ConfirmationError::Duplicate(end_to_end_id.to_string())));
        }

        let timeout_timer = tokio::spawn(run_timeout(
            inner.clone(),
            end_to_end_id.to_string(),
            generation,
            remaining,
        ));
        let polling_timer = tokio::spawn(run_polling(
            inner.clone(),
            end_to_end_id.to_string(),
            transaction_id.to_string(),
            generation,
            now + remaining,
            polling_delay,
        ));

        match inner.registry.get_mut(end_to_end_id) {
            Some(mut entry) if entry.generation == generation => {
                entry.timeout_timer = Some(timeout_timer);
                entry.polling_timer = Some(polling_timer);
            }
            _ => {
                // Completed before the timers could be attached.
                timeout_timer.abort();
                polling_timer.abort();
            }
        }

        info!(
            end_to_end_id,
            transaction_id,
            remaining_timeout_ms = remaining.as_millis() as u64,
            polling_delay_ms = polling_delay.as_millis() as u64,
            registration_delay_ms = elapsed.as_millis() as u64,
            "Waiting for transfer confirmation"
        );
        Ok(receiver)
    }

    /// Deliver a settlement outcome. Returns true only for the call that
    /// actually completed the waiter.
    pub fn resolve_confirmation(
        &self,
        end_to_end_id: &str,
        response: TransferResponse,
        source: ConfirmationSource,
    ) -> bool {
        self.inner
            .resolve(end_to_end_id.trim(), None, response, source)
    }

    /// Reject every pending waiter with `ShuttingDown`
    pub fn clear_all(&self) -> usize {
        self.inner.clear_all()
    }

    /// Evict entries older than timeout + grace. Their waiters observe
    /// `Abandoned`.
    pub fn sweep_stale(&self) -> usize {
        self.inner.sweep_stale()
    }

    /// Start the periodic stale sweep, replacing a previous one
    pub fn start_cleanup(&self) {
        let mut sweeper = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = sweeper.take() {
            previous.abort();
            self.inner.clear_all();
        }

        let interval = self.inner.timing.cleanup_interval();
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let evicted = inner.sweep_stale();
                if evicted > 0 {
                    info!(evicted, "Stale pending transfers swept");
                }
            }
        }));
        info!(
            cleanup_interval_ms = interval.as_millis() as u64,
            "Pending transfer cleanup started"
        );
    }

    /// Stop the sweep and reject all waiters
    pub fn shutdown(&self) {
        if let Some(sweeper) = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            sweeper.abort();
        }
        let cleared = self.inner.clear_all();
        info!(cleared, "Pending transfer coordinator shut down");
    }

    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_pending(&self, end_to_end_id: &str) -> bool {
        self.inner.registry.contains_key(end_to_end_id)
    }

    pub fn polling_attempts(&self, end_to_end_id: &str) -> Option<u32> {
        self.inner
            .registry
            .get(end_to_end_id)
            .map(|e| e.polling_attempts)
    }

    /// Simulate an entry whose timers were lost
    #[cfg(test)]
    fn detach_timers(&self, end_to_end_id: &str) {
        if let Some(mut entry) = self.inner.registry.get_mut(end_to_end_id) {
            entry.cancel_timers();
            entry.timeout_timer = None;
            entry.polling_timer = None;
        }
    }
}
