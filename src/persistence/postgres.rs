//! PostgreSQL implementation of the [`Store`].
//!
//! Schema lives in `migrations/`. Session read-modify-write steps use a
//! row lock (`SELECT ... FOR UPDATE`) or a single conditional `UPDATE`,
//! so concurrent message posts and closes on one session never lose an
//! update.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{CloseOutcome, Store, dedup_preserving_order};
use crate::config::GatewayConfig;
use crate::domain::{
    Currency, CurrencyId, Message, MessageId, NewCurrency, NewMessage, Offer, OfferDraft, OfferId,
    Session, SessionId, SessionState, User, UserId, timestamp,
};
use crate::error::{Entity, MarketError};

type UserRow = (i64, String, f64);
type CurrencyRow = (i64, String, String, String, String);
type OfferRow = (i64, i64, i64, f64, f64, f64, i64);
type SessionRow = (i64, i16, i64, i64, DateTime<Utc>);
type MessageRow = (i64, i64, DateTime<Utc>, i64, String);

const OFFER_COLUMNS: &str = "offer_id, from_currency_id, to_currency_id, from_amount, to_amount, exchange_rate, user_id";
const SESSION_COLUMNS: &str = "session_id, session_state, offer_id, session_owner_id, last_message_date";

fn currency_from_row((id, name, capital_name, unicode_symbol, color_hex): CurrencyRow) -> Currency {
    Currency {
        currency_id: CurrencyId::new(id),
        name,
        capital_name,
        unicode_symbol,
        color_hex,
    }
}

fn offer_from_row(
    (id, from_currency, to_currency, from_amount, to_amount, exchange_rate, creator): OfferRow,
) -> Offer {
    Offer {
        offer_id: OfferId::new(id),
        from_currency: CurrencyId::new(from_currency),
        to_currency: CurrencyId::new(to_currency),
        from_amount,
        to_amount,
        exchange_rate,
        creator: UserId::new(creator),
    }
}

fn session_from_row((id, state, offer_id, owner_id, last_message_date): SessionRow) -> Session {
    Session {
        session_id: SessionId::new(id),
        state: SessionState::from_code(state),
        offer_id: OfferId::new(offer_id),
        owner_id: UserId::new(owner_id),
        last_message_date,
    }
}

fn message_from_row((id, sender, date, session, text): MessageRow) -> Message {
    Message {
        message_id: MessageId::new(id),
        sender_id: UserId::new(sender),
        session_id: SessionId::new(session),
        message_date: date,
        text,
    }
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and applies
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] if the database is unreachable
    /// or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, MarketError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(Self::new(pool))
    }

    async fn exists(&self, sql: &str, id: i64) -> Result<bool, MarketError> {
        let found: Option<i64> = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), MarketError> {
        if self
            .exists("SELECT user_id FROM market_user WHERE user_id = $1", user_id.get())
            .await?
        {
            Ok(())
        } else {
            Err(MarketError::not_found(Entity::User, user_id))
        }
    }

    async fn ensure_offer(&self, offer_id: OfferId) -> Result<(), MarketError> {
        if self
            .exists("SELECT offer_id FROM offer WHERE offer_id = $1", offer_id.get())
            .await?
        {
            Ok(())
        } else {
            Err(MarketError::not_found(Entity::Offer, offer_id))
        }
    }

    async fn ensure_session(&self, session_id: SessionId) -> Result<(), MarketError> {
        if self
            .exists("SELECT session_id FROM session WHERE session_id = $1", session_id.get())
            .await?
        {
            Ok(())
        } else {
            Err(MarketError::not_found(Entity::Session, session_id))
        }
    }

    async fn check_draft(&self, draft: &OfferDraft) -> Result<(), MarketError> {
        self.ensure_user(draft.creator).await?;
        for id in [draft.from_currency, draft.to_currency] {
            if !self
                .exists("SELECT currency_id FROM currency WHERE currency_id = $1", id.get())
                .await?
            {
                return Err(MarketError::not_found(Entity::Currency, id));
            }
        }
        Ok(())
    }

    async fn user_with_watchlist(&self, row: UserRow) -> Result<User, MarketError> {
        let (id, user_name, user_rating) = row;
        let watchlist: Vec<i64> =
            sqlx::query_scalar("SELECT offer_id FROM watchlist WHERE user_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok(User {
            user_id: UserId::new(id),
            user_name,
            user_rating,
            watchlist: watchlist.into_iter().map(OfferId::new).collect(),
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_user(&self) -> Result<User, MarketError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO market_user (user_id, user_name) \
             SELECT id, 'New user ' || id \
             FROM (SELECT nextval(pg_get_serial_sequence('market_user', 'user_id')) AS id) s \
             RETURNING user_id, user_name, user_rating",
        )
        .fetch_one(&self.pool)
        .await?;
        self.user_with_watchlist(row).await
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, MarketError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, user_name, user_rating FROM market_user WHERE user_id = $1",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        self.user_with_watchlist(row).await
    }

    async fn rename_user(&self, user_id: UserId, name: &str) -> Result<User, MarketError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE market_user SET user_name = $2 WHERE user_id = $1 \
             RETURNING user_id, user_name, user_rating",
        )
        .bind(user_id.get())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        self.user_with_watchlist(row).await
    }

    async fn add_rating(&self, user_id: UserId, rating: f64) -> Result<User, MarketError> {
        self.ensure_user(user_id).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO user_rating (user_id, rating) VALUES ($1, $2)")
            .bind(user_id.get())
            .bind(rating)
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE market_user \
             SET user_rating = (SELECT AVG(rating) FROM user_rating WHERE user_id = $1) \
             WHERE user_id = $1 RETURNING user_id, user_name, user_rating",
        )
        .bind(user_id.get())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        self.user_with_watchlist(row).await
    }

    async fn add_to_watchlist(
        &self,
        user_id: UserId,
        offer_id: OfferId,
    ) -> Result<(), MarketError> {
        self.ensure_user(user_id).await?;
        self.ensure_offer(offer_id).await?;
        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, offer_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id.get())
        .bind(offer_id.get())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(MarketError::PermissionDenied(
                "this offer is already in watchlist".to_string(),
            ));
        }
        Ok(())
    }

    async fn remove_from_watchlist(
        &self,
        user_id: UserId,
        offer_id: OfferId,
    ) -> Result<(), MarketError> {
        self.ensure_user(user_id).await?;
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND offer_id = $2")
            .bind(user_id.get())
            .bind(offer_id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MarketError::PermissionDenied(
                "this offer is not in watchlist".to_string(),
            ));
        }
        Ok(())
    }

    async fn closed_session_count(&self, user_id: UserId) -> Result<u64, MarketError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM session_user su \
             JOIN session s ON s.session_id = su.session_id \
             WHERE su.user_id = $1 AND s.session_state = 0",
        )
        .bind(user_id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn add_currencies(&self, batch: Vec<NewCurrency>) -> Result<Vec<Currency>, MarketError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(batch.len());
        for new in batch {
            let row = sqlx::query_as::<_, CurrencyRow>(
                "INSERT INTO currency (name, capital_name, unicode_symbol, color_hex) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING currency_id, name, capital_name, unicode_symbol, color_hex",
            )
            .bind(new.name)
            .bind(new.capital_name)
            .bind(new.unicode_symbol)
            .bind(new.color_hex)
            .fetch_one(&mut *tx)
            .await?;
            created.push(currency_from_row(row));
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, MarketError> {
        let rows = sqlx::query_as::<_, CurrencyRow>(
            "SELECT currency_id, name, capital_name, unicode_symbol, color_hex \
             FROM currency ORDER BY currency_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(currency_from_row).collect())
    }

    async fn create_offer(&self, draft: OfferDraft) -> Result<Offer, MarketError> {
        self.check_draft(&draft).await?;
        let sql = format!(
            "INSERT INTO offer (from_currency_id, to_currency_id, from_amount, to_amount, exchange_rate, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {OFFER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(draft.from_currency.get())
            .bind(draft.to_currency.get())
            .bind(draft.from_amount)
            .bind(draft.to_amount)
            .bind(draft.exchange_rate)
            .bind(draft.creator.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(offer_from_row(row))
    }

    async fn update_offer(
        &self,
        offer_id: OfferId,
        draft: OfferDraft,
    ) -> Result<Offer, MarketError> {
        self.check_draft(&draft).await?;
        let sql = format!(
            "UPDATE offer SET from_currency_id = $2, to_currency_id = $3, from_amount = $4, \
             to_amount = $5, exchange_rate = $6, user_id = $7 \
             WHERE offer_id = $1 RETURNING {OFFER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(offer_id.get())
            .bind(draft.from_currency.get())
            .bind(draft.to_currency.get())
            .bind(draft.from_amount)
            .bind(draft.to_amount)
            .bind(draft.exchange_rate)
            .bind(draft.creator.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketError::not_found(Entity::Offer, offer_id))?;
        Ok(offer_from_row(row))
    }

    async fn get_offer(&self, offer_id: OfferId) -> Result<Offer, MarketError> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offer WHERE offer_id = $1");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(offer_id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketError::not_found(Entity::Offer, offer_id))?;
        Ok(offer_from_row(row))
    }

    async fn list_offers(&self) -> Result<Vec<Offer>, MarketError> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offer ORDER BY offer_id");
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(offer_from_row).collect())
    }

    async fn offers_by_creator(&self, user_id: UserId) -> Result<Vec<Offer>, MarketError> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offer WHERE user_id = $1 ORDER BY offer_id");
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(offer_from_row).collect())
    }

    async fn create_session(
        &self,
        owner_id: UserId,
        offer_id: OfferId,
        participants: &[UserId],
    ) -> Result<Session, MarketError> {
        self.ensure_user(owner_id).await?;
        for &user_id in participants {
            self.ensure_user(user_id).await?;
        }
        self.ensure_offer(offer_id).await?;

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO session (session_state, offer_id, session_owner_id, last_message_date) \
             VALUES ($1, $2, $3, $4) RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(SessionState::Open.code())
            .bind(offer_id.get())
            .bind(owner_id.get())
            .bind(timestamp::far_past())
            .fetch_one(&mut *tx)
            .await?;
        let session = session_from_row(row);
        for user_id in dedup_preserving_order(participants) {
            sqlx::query("INSERT INTO session_user (session_id, user_id) VALUES ($1, $2)")
                .bind(session.session_id.get())
                .bind(user_id.get())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(session)
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session, MarketError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM session WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketError::not_found(Entity::Session, session_id))?;
        Ok(session_from_row(row))
    }

    async fn session_participants(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<UserId>, MarketError> {
        self.ensure_session(session_id).await?;
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM session_user WHERE session_id = $1 ORDER BY session_user_id",
        )
        .bind(session_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, MarketError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT s.session_id, s.session_state, s.offer_id, s.session_owner_id, s.last_message_date \
             FROM session s \
             WHERE s.session_owner_id = $1 \
                OR EXISTS (SELECT 1 FROM session_user su \
                           WHERE su.session_id = s.session_id AND su.user_id = $1) \
             ORDER BY s.session_id",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(session_from_row).collect())
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message, MarketError> {
        self.ensure_user(new.sender_id).await?;

        let mut tx = self.pool.begin().await?;
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT session_id FROM session WHERE session_id = $1 FOR UPDATE")
                .bind(new.session_id.get())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(MarketError::not_found(Entity::Session, new.session_id));
        }

        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO message (message_sender_id, message_date, session_id, message_text) \
             VALUES ($1, $2, $3, $4) \
             RETURNING message_id, message_sender_id, message_date, session_id, message_text",
        )
        .bind(new.sender_id.get())
        .bind(new.message_date)
        .bind(new.session_id.get())
        .bind(&new.text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE session SET last_message_date = $2 \
             WHERE session_id = $1 AND last_message_date < $2",
        )
        .bind(new.session_id.get())
        .bind(new.message_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message_from_row(row))
    }

    async fn session_messages(&self, session_id: SessionId) -> Result<Vec<Message>, MarketError> {
        self.ensure_session(session_id).await?;
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT message_id, message_sender_id, message_date, session_id, message_text \
             FROM message WHERE session_id = $1 ORDER BY message_date, message_id",
        )
        .bind(session_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn close_session(&self, session_id: SessionId) -> Result<CloseOutcome, MarketError> {
        let sql = format!(
            "UPDATE session SET session_state = $2 \
             WHERE session_id = $1 AND session_state <> $2 RETURNING {SESSION_COLUMNS}"
        );
        let closed = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id.get())
            .bind(SessionState::Closed.code())
            .fetch_optional(&self.pool)
            .await?;
        match closed {
            Some(row) => Ok(CloseOutcome::Closed(session_from_row(row))),
            None => self
                .get_session(session_id)
                .await
                .map(CloseOutcome::AlreadyClosed),
        }
    }
}
