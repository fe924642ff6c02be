//! Round clock and the periodic task driving it.
//!
//! [`RoundClock`] owns the live [`RoundState`]. Ticks, resets and overrides
//! all take the same lock and keep it until their store writes finish, so a
//! manual reset can never interleave with a tick. [`Ticker`] is the single
//! background task calling [`RoundClock::tick`], each tick on the blocking
//! pool since it writes to the store.

use colorclock_types::{Result, RoundState, Transition};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics::{ClockMetrics, ClockMetricsSnapshot};
use crate::store::{Store, COUNTDOWN_KEY, ROUND_KEY};

pub struct RoundClock {
    window: u32,
    state: Mutex<RoundState>,
    store: Arc<dyn Store>,
    metrics: ClockMetrics,
}

impl RoundClock {
    /// Restore the clock from the store, defaulting each missing key.
    pub fn load(store: Arc<dyn Store>, window: u32) -> Result<Self> {
        let initial = RoundState::initial(window);
        let countdown = store
            .get(COUNTDOWN_KEY)?
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
            .unwrap_or(initial.countdown_seconds_remaining);
        let round = store
            .get(ROUND_KEY)?
            .unwrap_or(initial.current_round_number);
        let persisted = RoundState {
            countdown_seconds_remaining: countdown,
            current_round_number: round,
        };
        let (state, clamped) = persisted.clamp(window);
        if clamped {
            warn!(
                persisted_countdown = persisted.countdown_seconds_remaining,
                persisted_round = persisted.current_round_number,
                window,
                "persisted round state out of range; clamped"
            );
        }
        info!(
            countdown = state.countdown_seconds_remaining,
            round = state.current_round_number,
            window,
            "round clock loaded"
        );

        Ok(Self {
            window,
            state: Mutex::new(state),
            store,
            metrics: ClockMetrics::default(),
        })
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn state(&self) -> RoundState {
        *self.lock()
    }

    pub fn metrics(&self) -> ClockMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Advance one tick.
    ///
    /// A failed write is logged and counted; memory stays authoritative and
    /// the next tick writes the then-current state again.
    pub fn tick(&self) -> RoundState {
        let mut state = self.lock();
        let (next, transition) = state.tick(self.window);
        *state = next;
        self.metrics.inc_tick();
        if transition == Transition::Advanced {
            self.metrics.inc_round_advanced();
            info!(round = next.current_round_number, "round advanced");
        }
        if let Err(err) = self.persist(&next) {
            self.metrics.inc_persist_failure();
            error!(
                %err,
                countdown = next.countdown_seconds_remaining,
                round = next.current_round_number,
                "failed to persist round state"
            );
        }
        next
    }

    /// Close the current round now and open the next one with a full window.
    pub fn reset(&self) -> Result<RoundState> {
        self.replace(|state, window| Ok(state.next_round(window)), "round reset")
            .inspect(|_| self.metrics.inc_manual_reset())
    }

    /// Overwrite both fields; last writer wins.
    pub fn force_set(&self, countdown: u32, round: u64) -> Result<RoundState> {
        self.replace(
            |_, window| RoundState::force(countdown, round, window),
            "round state forced",
        )
        .inspect(|_| self.metrics.inc_force_set())
    }

    /// Overwrite only the round number, keeping the running countdown.
    pub fn set_round_number(&self, round: u64) -> Result<RoundState> {
        self.replace(
            |state, window| RoundState::force(state.countdown_seconds_remaining, round, window),
            "round number forced",
        )
        .inspect(|_| self.metrics.inc_force_set())
    }

    /// Apply an administrative change under the tick lock.
    ///
    /// Invalid input leaves the state untouched. A store failure keeps the
    /// in-memory change and is reported to the caller.
    fn replace<F>(&self, change: F, what: &'static str) -> Result<RoundState>
    where
        F: FnOnce(&RoundState, u32) -> Result<RoundState>,
    {
        let mut state = self.lock();
        let next = change(&state, self.window)?;
        *state = next;
        info!(
            countdown = next.countdown_seconds_remaining,
            round = next.current_round_number,
            "{what}"
        );
        if let Err(err) = self.persist(&next) {
            self.metrics.inc_persist_failure();
            error!(%err, "{what}: failed to persist round state");
            return Err(err);
        }
        Ok(next)
    }

    fn persist(&self, state: &RoundState) -> Result<()> {
        self.store
            .upsert(COUNTDOWN_KEY, u64::from(state.countdown_seconds_remaining))?;
        self.store.upsert(ROUND_KEY, state.current_round_number)
    }

    fn lock(&self) -> MutexGuard<'_, RoundState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owner of the background tick task.
pub struct Ticker {
    clock: Arc<RoundClock>,
    period: Duration,
    running: AsyncMutex<Option<Running>>,
}

impl Ticker {
    pub fn new(clock: Arc<RoundClock>, period: Duration) -> Self {
        Self {
            clock,
            period,
            running: AsyncMutex::new(None),
        }
    }

    /// Spawn the tick task unless one is already running.
    ///
    /// Returns `true` when a task was spawned.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            debug!("round clock already running");
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let clock = self.clock.clone();
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        let clock = clock.clone();
                        if let Err(err) = task::spawn_blocking(move || clock.tick()).await {
                            error!(?err, "round clock tick task failed");
                        }
                    }
                }
            }
            debug!("round clock task exited");
        });
        *running = Some(Running { shutdown, handle });
        info!(period_ms = period.as_millis() as u64, "round clock started");
        true
    }

    /// Stop the tick task after its current tick. Returns `false` if idle.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(Running { shutdown, handle }) = running.take() else {
            return false;
        };
        let _ = shutdown.send(true);
        if let Err(err) = handle.await {
            warn!(?err, "round clock task ended abnormally");
        }
        info!("round clock stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }
}
