//! Timer-driven entry points: the draw cycle and the weekly counter reset.
//!
//! Each job runs in its own tokio task. A job's run is awaited to completion
//! before its next tick is taken, and ticks missed while a run is in flight
//! are skipped, so runs of the same job never overlap. The two jobs share no
//! lock; one failing or stalling does not delay the other.
//!
//! Only one scheduler process may run against a given ledger. Running more
//! than one needs a distributed lock keyed on the draw date.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::ledger::LedgerStore;
use crate::service::{DrawCoordinator, DrawOutcome};

/// Timer cadence for the two scheduled jobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Period between draw cycle attempts.
    pub draw_interval: Duration,
    /// Period between weekly counter resets.
    pub counter_reset_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            draw_interval: Duration::from_secs(60 * 60),
            counter_reset_interval: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// When a periodic job runs for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    /// Run as soon as the job starts.
    Immediately,
    /// Wait one full period before the first run.
    AfterPeriod,
}

/// Spawns `job` on a fixed period until `shutdown` flips to `true`.
///
/// A zero period is raised to one second.
pub fn spawn_periodic_job<F, Fut>(
    name: &'static str,
    period: Duration,
    first_run: FirstRun,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let start = match first_run {
            FirstRun::Immediately => Instant::now(),
            FirstRun::AfterPeriod => Instant::now() + period,
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(job = name, period_secs = period.as_secs(), "scheduled job started");

        loop {
            tokio::select! {
                _ = ticker.tick() => job().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(job = name, "scheduled job stopped");
    })
}

/// Owns the two scheduled jobs.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler with the given cadence.
    #[must_use]
    pub const fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Starts the draw job and the counter reset job.
    ///
    /// The draw job runs right away since a draw cycle is idempotent. The
    /// counter reset first runs one full cadence after start, so a restart
    /// never clears the running week's tallies.
    pub fn start<S: LedgerStore>(
        &self,
        coordinator: Arc<DrawCoordinator<S>>,
        ledger: S,
    ) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let draw = spawn_periodic_job(
            "draw_cycle",
            self.config.draw_interval,
            FirstRun::Immediately,
            shutdown_rx.clone(),
            move || {
                let coordinator = Arc::clone(&coordinator);
                async move { run_draw_tick(&coordinator).await }
            },
        );

        let counter_reset = spawn_periodic_job(
            "weekly_counter_reset",
            self.config.counter_reset_interval,
            FirstRun::AfterPeriod,
            shutdown_rx,
            move || {
                let ledger = ledger.clone();
                async move { run_counter_reset_tick(&ledger).await }
            },
        );

        SchedulerHandle {
            shutdown_tx,
            draw,
            counter_reset,
        }
    }
}

/// Handle to running scheduler jobs.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    draw: JoinHandle<()>,
    counter_reset: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Returns `true` while both jobs are still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.draw.is_finished() && !self.counter_reset.is_finished()
    }

    /// Signals both jobs to stop and waits for any in-flight run to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(error) = self.draw.await {
            tracing::error!(%error, "draw job terminated abnormally");
        }
        if let Err(error) = self.counter_reset.await {
            tracing::error!(%error, "counter reset job terminated abnormally");
        }
    }
}

async fn run_draw_tick<S: LedgerStore>(coordinator: &DrawCoordinator<S>) {
    match coordinator.run_draw_cycle(Utc::now()).await {
        Ok(DrawOutcome::Committed(report)) => {
            tracing::info!(
                history_id = report.history.id,
                winners = report.winners.len(),
                "draw tick committed a draw"
            );
        }
        Ok(outcome) => tracing::debug!(?outcome, "draw tick: nothing to do"),
        Err(error) => {
            tracing::warn!(%error, retry = error.is_transient(), "draw tick failed");
        }
    }
}

async fn run_counter_reset_tick<S: LedgerStore>(ledger: &S) {
    match ledger.reset_weekly_points().await {
        Ok(users_reset) => tracing::info!(users_reset, "weekly point counters reset"),
        Err(error) => tracing::error!(%error, "weekly point counter reset failed"),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{User, UserId};
    use crate::ledger::InMemoryLedger;
    use crate::service::DrawSettings;

    #[tokio::test(start_paused = true)]
    async fn runs_of_one_job_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let (active, max_active, runs) =
                (Arc::clone(&active), Arc::clone(&max_active), Arc::clone(&runs));
            let job = move || {
                let (active, max_active, runs) =
                    (Arc::clone(&active), Arc::clone(&max_active), Arc::clone(&runs));
                async move {
                    let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now_active, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(90)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            };
            spawn_periodic_job("slow", Duration::from_secs(60), FirstRun::Immediately, rx, job)
        };

        tokio::time::sleep(Duration::from_secs(300)).await;
        let _ = tx.send(true);
        let _ = handle.await;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_draw_job_does_not_block_counter_reset() {
        // No draw configuration: every draw tick fails.
        let ledger = InMemoryLedger::new();
        let mut user = User::new(UserId::new());
        user.weekly_point_balance = 640;
        let id = user.id;
        ledger.register_user(user).await;

        let coordinator = Arc::new(DrawCoordinator::new(
            ledger.clone(),
            DrawSettings::default(),
            StdRng::seed_from_u64(3),
        ));
        let scheduler = Scheduler::new(SchedulerConfig {
            draw_interval: Duration::from_secs(10),
            counter_reset_interval: Duration::from_secs(60),
        });
        let handle = scheduler.start(coordinator, ledger.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        let balance = ledger.user(id).await.map(|u| u.weekly_point_balance);
        assert_eq!(balance, Some(640));

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(handle.is_running());
        let Some(user) = ledger.user(id).await else {
            panic!("user missing");
        };
        assert_eq!(user.weekly_point_balance, 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_both_jobs() {
        let ledger = InMemoryLedger::new();
        let coordinator = Arc::new(DrawCoordinator::new(
            ledger.clone(),
            DrawSettings::default(),
            StdRng::seed_from_u64(5),
        ));
        let handle = Scheduler::new(SchedulerConfig::default()).start(coordinator, ledger);
        tokio::time::sleep(Duration::from_secs(1)).await;

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .unwrap_or_else(|_| panic!("scheduler did not stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_reset_waits_a_full_cadence_after_start() {
        let ledger = InMemoryLedger::new();
        let mut user = User::new(UserId::new());
        user.weekly_point_balance = 640;
        let id = user.id;
        ledger.register_user(user).await;

        let coordinator = Arc::new(DrawCoordinator::new(
            ledger.clone(),
            DrawSettings::default(),
            StdRng::seed_from_u64(9),
        ));
        let handle = Scheduler::new(SchedulerConfig::default()).start(coordinator, ledger.clone());

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        let balance = ledger.user(id).await.map(|u| u.weekly_point_balance);
        assert_eq!(balance, Some(640));

        tokio::time::sleep(Duration::from_secs(7 * 24 * 60 * 60)).await;
        let balance = ledger.user(id).await.map(|u| u.weekly_point_balance);
        assert_eq!(balance, Some(0));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_job_skips_the_start_tick() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);
        let handle = {
            let runs = Arc::clone(&runs);
            let job = move || {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            };
            spawn_periodic_job("delayed", Duration::from_secs(60), FirstRun::AfterPeriod, rx, job)
        };

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let _ = tx.send(true);
        let _ = handle.await;
    }
}
