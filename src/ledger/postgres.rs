//! PostgreSQL implementation of the ledger store.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CommitOutcome, DrawCommit, DrawRecord, GrantOutcome, LedgerStore, NewTicketGrant,
};
use crate::domain::{DrawConfiguration, DrawHistory, DrawWinner, TicketHolder, UserId};
use crate::error::LotteryError;

/// PostgreSQL-backed ledger using `sqlx::PgPool`.
///
/// Schema is defined in `migrations/`. The `draw_history.draw_date` unique
/// constraint is the persisted guard against committing two draws for the
/// same day, and `converted_awards.source_ref` the guard against minting
/// tickets twice for one award.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

type HistoryRow = (i64, NaiveDate, DateTime<Utc>, DateTime<Utc>, i32, i64);

fn history_from_row(
    (id, draw_date, period_start, period_end, winners_count, min_ticket_threshold_snapshot): HistoryRow,
) -> DrawHistory {
    DrawHistory {
        id,
        draw_date,
        period_start,
        period_end,
        winners_count,
        min_ticket_threshold_snapshot,
    }
}

impl PostgresLedger {
    /// Creates a new ledger over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Store`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), LotteryError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| LotteryError::Store(e.to_string()))
    }
}

impl LedgerStore for PostgresLedger {
    async fn load_draw_config(&self) -> Result<Option<DrawConfiguration>, LotteryError> {
        let row = sqlx::query_as::<_, (i64, i32, i64, DateTime<Utc>)>(
            "SELECT min_ticket_threshold, winners_count, min_points, next_deadline \
             FROM draw_configuration WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(min_ticket_threshold, winners_count, min_points, next_deadline)| DrawConfiguration {
                min_ticket_threshold,
                winners_count,
                min_points,
                next_deadline,
            },
        ))
    }

    async fn draw_exists_for(&self, draw_date: NaiveDate) -> Result<bool, LotteryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM draw_history WHERE draw_date = $1)",
        )
        .bind(draw_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn ticket_holders(
        &self,
        min_ticket_threshold: i64,
    ) -> Result<Vec<TicketHolder>, LotteryError> {
        let rows = sqlx::query_as::<_, (Uuid, i64, bool)>(
            "SELECT u.id, u.ticket_balance, \
                    EXISTS (SELECT 1 FROM wallets w \
                            WHERE w.user_id = u.id AND btrim(w.address) <> '') \
             FROM users u WHERE u.ticket_balance > $1",
        )
        .bind(min_ticket_threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, ticket_balance, has_wallet)| TicketHolder {
                user_id: UserId::from_uuid(id),
                ticket_balance,
                has_wallet,
            })
            .collect())
    }

    async fn commit_draw(&self, commit: DrawCommit) -> Result<CommitOutcome, LotteryError> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, HistoryRow>(
            "INSERT INTO draw_history \
                 (draw_date, period_start, period_end, winners_count, min_ticket_threshold_snapshot) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (draw_date) DO NOTHING \
             RETURNING id, draw_date, period_start, period_end, winners_count, min_ticket_threshold_snapshot",
        )
        .bind(commit.draw_date)
        .bind(commit.period_start)
        .bind(commit.period_end)
        .bind(commit.winners_count)
        .bind(commit.min_ticket_threshold_snapshot)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            tx.rollback().await?;
            return Ok(CommitOutcome::AlreadyDrawn);
        };
        let history = history_from_row(row);

        let (winner_ids, balances): (Vec<Uuid>, Vec<i64>) = commit
            .winners
            .iter()
            .map(|w| (*w.user_id.as_uuid(), w.ticket_balance_at_draw))
            .unzip();
        sqlx::query(
            "INSERT INTO draw_winners (history_id, user_id, ticket_balance_at_draw) \
             SELECT $1, t.user_id, t.balance FROM UNNEST($2::uuid[], $3::bigint[]) AS t(user_id, balance)",
        )
        .bind(history.id)
        .bind(winner_ids)
        .bind(balances)
        .execute(&mut *tx)
        .await?;

        let mut recipients = Vec::with_capacity(commit.notifications.len());
        let mut kinds = Vec::with_capacity(commit.notifications.len());
        let mut messages = Vec::with_capacity(commit.notifications.len());
        for n in commit.notifications {
            recipients.push(*n.user_id.as_uuid());
            kinds.push(n.kind.as_str().to_string());
            messages.push(n.message);
        }
        sqlx::query(
            "INSERT INTO notifications (user_id, kind, message) \
             SELECT t.user_id, t.kind, t.message \
             FROM UNNEST($1::uuid[], $2::text[], $3::text[]) AS t(user_id, kind, message)",
        )
        .bind(recipients)
        .bind(kinds)
        .bind(messages)
        .execute(&mut *tx)
        .await?;

        let reset = sqlx::query("UPDATE users SET ticket_balance = 0 WHERE ticket_balance <> 0")
            .execute(&mut *tx)
            .await?;

        let purged = sqlx::query("DELETE FROM ticket_grants")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            history_id = history.id,
            balances_reset = reset.rows_affected(),
            grants_purged = purged.rows_affected(),
            "draw transaction committed"
        );
        Ok(CommitOutcome::Committed(history))
    }

    async fn record_ticket_grant(
        &self,
        grant: NewTicketGrant,
    ) -> Result<GrantOutcome, LotteryError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(*grant.user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if user.is_none() {
            return Err(LotteryError::UserNotFound(grant.user_id));
        }

        // `converted_awards` outlives draw resets, unlike `ticket_grants`.
        let converted = sqlx::query_scalar::<_, String>(
            "INSERT INTO converted_awards (source_ref, user_id, tickets, converted_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (source_ref) DO NOTHING RETURNING source_ref",
        )
        .bind(&grant.source_ref)
        .bind(*grant.user_id.as_uuid())
        .bind(grant.amount)
        .bind(grant.created_at)
        .fetch_optional(&mut *tx)
        .await?;
        if converted.is_none() {
            tx.rollback().await?;
            return Ok(GrantOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO ticket_grants (user_id, amount, source_ref, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(*grant.user_id.as_uuid())
        .bind(grant.amount)
        .bind(&grant.source_ref)
        .bind(grant.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET ticket_balance = ticket_balance + $2 WHERE id = $1")
            .bind(*grant.user_id.as_uuid())
            .bind(grant.amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(GrantOutcome::Minted {
            tickets: grant.amount,
        })
    }

    async fn reset_weekly_points(&self) -> Result<u64, LotteryError> {
        let result =
            sqlx::query("UPDATE users SET weekly_point_balance = 0 WHERE weekly_point_balance <> 0")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn latest_draw(&self) -> Result<Option<DrawRecord>, LotteryError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, draw_date, period_start, period_end, winners_count, min_ticket_threshold_snapshot \
             FROM draw_history ORDER BY period_end DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let history = history_from_row(row);

        let winners = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT user_id, ticket_balance_at_draw FROM draw_winners \
             WHERE history_id = $1 ORDER BY id ASC",
        )
        .bind(history.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(user_id, ticket_balance_at_draw)| DrawWinner {
            history_id: history.id,
            user_id: UserId::from_uuid(user_id),
            ticket_balance_at_draw,
        })
        .collect();

        Ok(Some(DrawRecord { history, winners }))
    }
}
