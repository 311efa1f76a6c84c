//! Draw coordinator: runs one complete draw cycle.
//!
//! A cycle moves through window check → idempotency check → resolve →
//! sample → commit. Everything the draw writes goes through a single
//! [`LedgerStore::commit_draw`] call bounded by a commit timeout, so a
//! failed attempt leaves no trace and the next tick on the same day retries
//! it. A timed-out attempt whose commit landed anyway is seen by that next
//! tick as already drawn.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use tokio::sync::Mutex;

use crate::domain::{
    DrawConfiguration, DrawHistory, EligibilityResolver, NotificationKind, sample_winners,
};
use crate::error::LotteryError;
use crate::ledger::{CommitOutcome, DrawCommit, LedgerStore, NewNotification, WinnerEntry};

/// Tunables for the draw cycle.
#[derive(Debug, Clone, Copy)]
pub struct DrawSettings {
    /// Length of one accrual period; `period_start = now - period_length`.
    pub period_length: chrono::Duration,
    /// Upper bound on the commit transaction.
    pub commit_timeout: Duration,
    /// Tickets per weighted unit.
    pub weight_unit: i64,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            period_length: chrono::Duration::days(7),
            commit_timeout: Duration::from_secs(30),
            weight_unit: crate::domain::eligibility::DEFAULT_WEIGHT_UNIT,
        }
    }
}

/// Summary of a committed draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawReport {
    /// The history row written.
    pub history: DrawHistory,
    /// Winners in announcement order.
    pub winners: Vec<WinnerEntry>,
    /// How many users were eligible.
    pub eligible_count: usize,
}

/// Result of one draw cycle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// `now` is not on the configured deadline day.
    OutsideWindow,
    /// A draw for the deadline day is already committed.
    AlreadyDrawn,
    /// A draw was committed by this invocation.
    Committed(DrawReport),
}

impl DrawOutcome {
    /// Returns `true` if this invocation committed a draw.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Orchestrates draw cycles against a ledger.
#[derive(Debug)]
pub struct DrawCoordinator<S> {
    store: S,
    resolver: EligibilityResolver<S>,
    settings: DrawSettings,
    rng: Mutex<StdRng>,
}

impl<S: LedgerStore> DrawCoordinator<S> {
    /// Creates a coordinator drawing randomness from `rng`.
    #[must_use]
    pub fn new(store: S, settings: DrawSettings, rng: StdRng) -> Self {
        Self {
            resolver: EligibilityResolver::new(store.clone(), settings.weight_unit),
            store,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Runs one draw cycle as of `now`.
    ///
    /// Returns [`DrawOutcome::OutsideWindow`] or [`DrawOutcome::AlreadyDrawn`]
    /// when there is nothing to do. Only the UTC calendar day of `now` and of
    /// the configured deadline are compared; the time of day is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Configuration`] when the configuration is
    /// missing or invalid, [`LotteryError::Store`] on ledger failures and
    /// [`LotteryError::Timeout`] when the commit exceeds its deadline. Other
    /// than a timeout, an error means nothing was committed. A timeout that
    /// races the final commit may still have landed; the next cycle then
    /// reports [`DrawOutcome::AlreadyDrawn`].
    #[tracing::instrument(level = "debug", skip_all, fields(attempt = %now))]
    pub async fn run_draw_cycle(&self, now: DateTime<Utc>) -> Result<DrawOutcome, LotteryError> {
        let config = match self.load_config().await {
            Ok(config) => config,
            Err(error) => {
                tracing::error!(attempt = %now, %error, "draw cycle skipped: configuration unavailable");
                return Err(error);
            }
        };
        let deadline = config.deadline_date();

        match self.draw(&config, deadline, now).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                tracing::error!(
                    %deadline,
                    attempt = %now,
                    transient = error.is_transient(),
                    %error,
                    "{}",
                    failure_summary(&error)
                );
                Err(error)
            }
        }
    }

    async fn load_config(&self) -> Result<DrawConfiguration, LotteryError> {
        let config = self
            .store
            .load_draw_config()
            .await?
            .ok_or_else(|| LotteryError::Configuration("draw configuration is missing".to_string()))?;
        config.validate()?;
        Ok(config)
    }

    async fn draw(
        &self,
        config: &DrawConfiguration,
        deadline: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DrawOutcome, LotteryError> {
        if now.date_naive() != deadline {
            tracing::debug!(%deadline, "outside draw window");
            return Ok(DrawOutcome::OutsideWindow);
        }

        if self.store.draw_exists_for(deadline).await? {
            tracing::debug!(%deadline, "draw already committed for deadline");
            return Ok(DrawOutcome::AlreadyDrawn);
        }

        let eligible = self.resolver.resolve(config).await?;
        let selected = {
            let mut rng = self.rng.lock().await;
            sample_winners(&eligible.weights(), config.winners_limit(), &mut *rng)
        };

        let winners: Vec<WinnerEntry> = selected
            .into_iter()
            .filter_map(|user_id| {
                eligible.get(&user_id).map(|entry| WinnerEntry {
                    user_id,
                    ticket_balance_at_draw: entry.ticket_balance,
                })
            })
            .collect();
        let notifications = winners
            .iter()
            .map(|w| NewNotification {
                user_id: w.user_id,
                kind: NotificationKind::LotteryWin,
                message: win_message(deadline),
            })
            .collect();

        let commit = DrawCommit {
            draw_date: deadline,
            period_start: now - self.settings.period_length,
            period_end: now,
            winners_count: config.winners_count,
            min_ticket_threshold_snapshot: config.min_ticket_threshold,
            winners: winners.clone(),
            notifications,
        };

        let committed = tokio::time::timeout(self.settings.commit_timeout, self.store.commit_draw(commit))
            .await
            .map_err(|_| LotteryError::Timeout(self.settings.commit_timeout))??;

        match committed {
            CommitOutcome::AlreadyDrawn => {
                tracing::info!(%deadline, "concurrent attempt already committed this draw");
                Ok(DrawOutcome::AlreadyDrawn)
            }
            CommitOutcome::Committed(history) => {
                tracing::info!(
                    %deadline,
                    history_id = history.id,
                    eligible = eligible.len(),
                    winners = winners.len(),
                    "draw committed"
                );
                Ok(DrawOutcome::Committed(DrawReport {
                    history,
                    winners,
                    eligible_count: eligible.len(),
                }))
            }
        }
    }
}

fn failure_summary(error: &LotteryError) -> &'static str {
    match error {
        LotteryError::Timeout(_) => {
            "draw commit timed out; outcome unknown until the next cycle checks the draw date"
        }
        _ => "draw cycle failed; nothing committed",
    }
}

fn win_message(draw_date: NaiveDate) -> String {
    format!("Congratulations! You won the prize draw of {draw_date}.")
}
