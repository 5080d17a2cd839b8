//! In-memory [`Store`] backend.
//!
//! Record tables live behind `tokio::sync::RwLock`s. Sessions use the
//! same two-level layout as a pool registry: an outer map of
//! `Arc<RwLock<SessionRecord>>`, so message appends and closes on one
//! session are serialized while different sessions proceed in parallel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CloseOutcome, Store, dedup_preserving_order};
use crate::domain::{
    Currency, CurrencyId, Message, MessageId, NewCurrency, NewMessage, Offer, OfferDraft, OfferId,
    Session, SessionId, SessionState, User, UserId, timestamp,
};
use crate::error::{Entity, MarketError};

#[derive(Debug)]
struct UserRecord {
    user: User,
    ratings: Vec<f64>,
}

#[derive(Debug)]
struct SessionRecord {
    session: Session,
    participants: Vec<UserId>,
    messages: Vec<Message>,
}

/// Monotonic id source starting at 1.
#[derive(Debug)]
struct Sequence(AtomicI64);

impl Sequence {
    const fn new() -> Self {
        Self(AtomicI64::new(1))
    }

    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
    currencies: RwLock<BTreeMap<CurrencyId, Currency>>,
    offers: RwLock<BTreeMap<OfferId, Offer>>,
    sessions: RwLock<HashMap<SessionId, Arc<RwLock<SessionRecord>>>>,
    user_ids: Sequence,
    currency_ids: Sequence,
    offer_ids: Sequence,
    session_ids: Sequence,
    message_ids: Sequence,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            currencies: RwLock::new(BTreeMap::new()),
            offers: RwLock::new(BTreeMap::new()),
            sessions: RwLock::new(HashMap::new()),
            user_ids: Sequence::new(),
            currency_ids: Sequence::new(),
            offer_ids: Sequence::new(),
            session_ids: Sequence::new(),
            message_ids: Sequence::new(),
        }
    }

    async fn session_record(
        &self,
        session_id: SessionId,
    ) -> Result<Arc<RwLock<SessionRecord>>, MarketError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(Arc::clone)
            .ok_or_else(|| MarketError::not_found(Entity::Session, session_id))
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), MarketError> {
        if self.users.read().await.contains_key(&user_id) {
            Ok(())
        } else {
            Err(MarketError::not_found(Entity::User, user_id))
        }
    }

    async fn check_draft(&self, draft: &OfferDraft) -> Result<(), MarketError> {
        self.ensure_user(draft.creator).await?;
        let currencies = self.currencies.read().await;
        for id in [draft.from_currency, draft.to_currency] {
            if !currencies.contains_key(&id) {
                return Err(MarketError::not_found(Entity::Currency, id));
            }
        }
        Ok(())
    }

    async fn all_session_records(&self) -> Vec<Arc<RwLock<SessionRecord>>> {
        self.sessions.read().await.values().map(Arc::clone).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn offer_from_draft(offer_id: OfferId, draft: OfferDraft) -> Offer {
    Offer {
        offer_id,
        from_currency: draft.from_currency,
        to_currency: draft.to_currency,
        from_amount: draft.from_amount,
        to_amount: draft.to_amount,
        exchange_rate: draft.exchange_rate,
        creator: draft.creator,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self) -> Result<User, MarketError> {
        let user_id = UserId::new(self.user_ids.next());
        let user = User {
            user_id,
            user_name: format!("New user {user_id}"),
            user_rating: 0.0,
            watchlist: Default::default(),
        };
        self.users.write().await.insert(
            user_id,
            UserRecord {
                user: user.clone(),
                ratings: Vec::new(),
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, MarketError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|r| r.user.clone())
            .ok_or_else(|| MarketError::not_found(Entity::User, user_id))
    }

    async fn rename_user(&self, user_id: UserId, name: &str) -> Result<User, MarketError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&user_id)
            .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        record.user.user_name = name.to_string();
        Ok(record.user.clone())
    }

    async fn add_rating(&self, user_id: UserId, rating: f64) -> Result<User, MarketError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&user_id)
            .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        record.ratings.push(rating);
        #[allow(clippy::cast_precision_loss)]
        let mean = record.ratings.iter().sum::<f64>() / record.ratings.len() as f64;
        record.user.user_rating = mean;
        Ok(record.user.clone())
    }

    async fn add_to_watchlist(
        &self,
        user_id: UserId,
        offer_id: OfferId,
    ) -> Result<(), MarketError> {
        if !self.offers.read().await.contains_key(&offer_id) {
            return Err(MarketError::not_found(Entity::Offer, offer_id));
        }
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&user_id)
            .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        if !record.user.watchlist.insert(offer_id) {
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
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&user_id)
            .ok_or_else(|| MarketError::not_found(Entity::User, user_id))?;
        if !record.user.watchlist.remove(&offer_id) {
            return Err(MarketError::PermissionDenied(
                "this offer is not in watchlist".to_string(),
            ));
        }
        Ok(())
    }

    async fn closed_session_count(&self, user_id: UserId) -> Result<u64, MarketError> {
        let mut count = 0;
        for record in self.all_session_records().await {
            let record = record.read().await;
            if record.session.state == SessionState::Closed
                && record.participants.contains(&user_id)
            {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn add_currencies(&self, batch: Vec<NewCurrency>) -> Result<Vec<Currency>, MarketError> {
        let mut currencies = self.currencies.write().await;
        let mut created = Vec::with_capacity(batch.len());
        for new in batch {
            let currency = Currency {
                currency_id: CurrencyId::new(self.currency_ids.next()),
                name: new.name,
                capital_name: new.capital_name,
                unicode_symbol: new.unicode_symbol,
                color_hex: new.color_hex,
            };
            currencies.insert(currency.currency_id, currency.clone());
            created.push(currency);
        }
        Ok(created)
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, MarketError> {
        Ok(self.currencies.read().await.values().cloned().collect())
    }

    async fn create_offer(&self, draft: OfferDraft) -> Result<Offer, MarketError> {
        self.check_draft(&draft).await?;
        let offer = offer_from_draft(OfferId::new(self.offer_ids.next()), draft);
        self.offers.write().await.insert(offer.offer_id, offer.clone());
        Ok(offer)
    }

    async fn update_offer(
        &self,
        offer_id: OfferId,
        draft: OfferDraft,
    ) -> Result<Offer, MarketError> {
        self.check_draft(&draft).await?;
        let mut offers = self.offers.write().await;
        let slot = offers
            .get_mut(&offer_id)
            .ok_or_else(|| MarketError::not_found(Entity::Offer, offer_id))?;
        *slot = offer_from_draft(offer_id, draft);
        Ok(slot.clone())
    }

    async fn get_offer(&self, offer_id: OfferId) -> Result<Offer, MarketError> {
        self.offers
            .read()
            .await
            .get(&offer_id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(Entity::Offer, offer_id))
    }

    async fn list_offers(&self) -> Result<Vec<Offer>, MarketError> {
        Ok(self.offers.read().await.values().cloned().collect())
    }

    async fn offers_by_creator(&self, user_id: UserId) -> Result<Vec<Offer>, MarketError> {
        Ok(self
            .offers
            .read()
            .await
            .values()
            .filter(|o| o.creator == user_id)
            .cloned()
            .collect())
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
        if !self.offers.read().await.contains_key(&offer_id) {
            return Err(MarketError::not_found(Entity::Offer, offer_id));
        }

        let session = Session {
            session_id: SessionId::new(self.session_ids.next()),
            state: SessionState::Open,
            offer_id,
            owner_id,
            last_message_date: timestamp::far_past(),
        };
        let record = SessionRecord {
            session: session.clone(),
            participants: dedup_preserving_order(participants),
            messages: Vec::new(),
        };
        self.sessions
            .write()
            .await
            .insert(session.session_id, Arc::new(RwLock::new(record)));
        Ok(session)
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session, MarketError> {
        let record = self.session_record(session_id).await?;
        let session = record.read().await.session.clone();
        Ok(session)
    }

    async fn session_participants(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<UserId>, MarketError> {
        let record = self.session_record(session_id).await?;
        let participants = record.read().await.participants.clone();
        Ok(participants)
    }

    async fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, MarketError> {
        let mut sessions = Vec::new();
        for record in self.all_session_records().await {
            let record = record.read().await;
            if record.session.owner_id == user_id || record.participants.contains(&user_id) {
                sessions.push(record.session.clone());
            }
        }
        sessions.sort_by_key(|s| s.session_id);
        Ok(sessions)
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message, MarketError> {
        self.ensure_user(new.sender_id).await?;
        let record = self.session_record(new.session_id).await?;
        let mut record = record.write().await;

        let message = Message {
            message_id: MessageId::new(self.message_ids.next()),
            sender_id: new.sender_id,
            session_id: new.session_id,
            message_date: new.message_date,
            text: new.text,
        };
        if message.message_date > record.session.last_message_date {
            record.session.last_message_date = message.message_date;
        }
        record.messages.push(message.clone());
        Ok(message)
    }

    async fn session_messages(&self, session_id: SessionId) -> Result<Vec<Message>, MarketError> {
        let record = self.session_record(session_id).await?;
        let mut messages = record.read().await.messages.clone();
        messages.sort_by(|a, b| {
            a.message_date
                .cmp(&b.message_date)
                .then(a.message_id.cmp(&b.message_id))
        });
        Ok(messages)
    }

    async fn close_session(&self, session_id: SessionId) -> Result<CloseOutcome, MarketError> {
        let record = self.session_record(session_id).await?;
        let mut record = record.write().await;
        if record.session.state == SessionState::Closed {
            return Ok(CloseOutcome::AlreadyClosed(record.session.clone()));
        }
        record.session.state = SessionState::Closed;
        Ok(CloseOutcome::Closed(record.session.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, UserId, UserId, OfferId) {
        let store = MemoryStore::new();
        let (Ok(a), Ok(b)) = (store.create_user().await, store.create_user().await) else {
            panic!("users");
        };
        let Ok(currencies) = store
            .add_currencies(vec![
                NewCurrency {
                    name: "dollar".to_string(),
                    capital_name: "USD".to_string(),
                    unicode_symbol: "$".to_string(),
                    color_hex: "#00ff00".to_string(),
                },
                NewCurrency {
                    name: "euro".to_string(),
                    capital_name: "EUR".to_string(),
                    unicode_symbol: "€".to_string(),
                    color_hex: "#0000ff".to_string(),
                },
            ])
            .await
        else {
            panic!("currencies");
        };
        let (Some(from), Some(to)) = (currencies.first(), currencies.get(1)) else {
            panic!("two currencies");
        };
        let Ok(offer) = store
            .create_offer(OfferDraft {
                creator: a.user_id,
                from_currency: from.currency_id,
                to_currency: to.currency_id,
                from_amount: 100.0,
                to_amount: 92.0,
                exchange_rate: 0.92,
            })
            .await
        else {
            panic!("offer");
        };
        (store, a.user_id, b.user_id, offer.offer_id)
    }

    fn at(raw: &str) -> chrono::DateTime<chrono::Utc> {
        let Ok(ts) = timestamp::parse(raw) else {
            panic!("valid timestamp");
        };
        ts
    }

    #[tokio::test]
    async fn new_user_is_named_after_id() {
        let store = MemoryStore::new();
        let Ok(user) = store.create_user().await else {
            panic!("create user");
        };
        assert_eq!(user.user_name, format!("New user {}", user.user_id));
        assert!(user.user_rating.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn rating_is_running_mean() {
        let (store, a, _, _) = seeded().await;
        let _ = store.add_rating(a, 4.0).await;
        let Ok(user) = store.add_rating(a, 5.0).await else {
            panic!("rating");
        };
        assert!((user.user_rating - 4.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn watchlist_duplicate_add_and_absent_remove_are_denied() {
        let (store, a, _, offer) = seeded().await;
        assert!(store.add_to_watchlist(a, offer).await.is_ok());
        assert!(matches!(
            store.add_to_watchlist(a, offer).await,
            Err(MarketError::PermissionDenied(_))
        ));
        assert!(store.remove_from_watchlist(a, offer).await.is_ok());
        assert!(matches!(
            store.remove_from_watchlist(a, offer).await,
            Err(MarketError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn create_session_rejects_unknown_references() {
        let (store, a, _, offer) = seeded().await;
        let missing = UserId::new(999);
        assert!(matches!(
            store.create_session(a, offer, &[missing]).await,
            Err(MarketError::NotFound { entity: Entity::User, id: 999 })
        ));
        assert!(matches!(
            store.create_session(a, OfferId::new(999), &[a]).await,
            Err(MarketError::NotFound { entity: Entity::Offer, .. })
        ));
    }

    #[tokio::test]
    async fn new_session_starts_open_at_far_past() {
        let (store, a, b, offer) = seeded().await;
        let Ok(session) = store.create_session(a, offer, &[a, b, b]).await else {
            panic!("session");
        };
        assert_eq!(session.state, SessionState::Open);
        assert_eq!(session.last_message_date, timestamp::far_past());
        let participants = store.session_participants(session.session_id).await;
        assert_eq!(participants.ok(), Some(vec![a, b]));
    }

    #[tokio::test]
    async fn last_message_date_never_decreases() {
        let (store, a, b, offer) = seeded().await;
        let Ok(session) = store.create_session(a, offer, &[a, b]).await else {
            panic!("session");
        };
        let sid = session.session_id;
        for raw in ["2024-01-01 10:00:00", "2023-06-01 08:00:00"] {
            let appended = store
                .append_message(NewMessage {
                    sender_id: b,
                    session_id: sid,
                    message_date: at(raw),
                    text: raw.to_string(),
                })
                .await;
            assert!(appended.is_ok());
        }
        let Ok(session) = store.get_session(sid).await else {
            panic!("session");
        };
        assert_eq!(session.last_message_date, at("2024-01-01 10:00:00"));

        let Ok(messages) = store.session_messages(sid).await else {
            panic!("messages");
        };
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["2023-06-01 08:00:00", "2024-01-01 10:00:00"]);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_the_maximum() {
        let (store, a, b, offer) = seeded().await;
        let store = Arc::new(store);
        let Ok(session) = store.create_session(a, offer, &[a, b]).await else {
            panic!("session");
        };
        let sid = session.session_id;

        let mut tasks = Vec::new();
        for hour in 0..24 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .append_message(NewMessage {
                        sender_id: b,
                        session_id: sid,
                        message_date: at(&format!("2024-01-01 {hour:02}:00:00")),
                        text: "x".to_string(),
                    })
                    .await
                    .is_ok()
            }));
        }
        for task in tasks {
            assert!(matches!(task.await, Ok(true)));
        }

        let Ok(session) = store.get_session(sid).await else {
            panic!("session");
        };
        assert_eq!(session.last_message_date, at("2024-01-01 23:00:00"));
        assert_eq!(store.session_messages(sid).await.map(|m| m.len()).ok(), Some(24));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_counted() {
        let (store, a, b, offer) = seeded().await;
        let Ok(session) = store.create_session(a, offer, &[a, b]).await else {
            panic!("session");
        };
        let sid = session.session_id;
        assert!(matches!(store.close_session(sid).await, Ok(CloseOutcome::Closed(_))));
        assert!(matches!(
            store.close_session(sid).await,
            Ok(CloseOutcome::AlreadyClosed(_))
        ));
        assert_eq!(store.closed_session_count(b).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn sessions_for_user_includes_owner_and_participants() {
        let (store, a, b, offer) = seeded().await;
        let Ok(c) = store.create_user().await else {
            panic!("user");
        };
        let Ok(first) = store.create_session(a, offer, &[b]).await else {
            panic!("session");
        };
        let Ok(second) = store.create_session(b, offer, &[b, c.user_id]).await else {
            panic!("session");
        };

        let ids = |sessions: Vec<Session>| sessions.iter().map(|s| s.session_id).collect::<Vec<_>>();
        assert_eq!(store.sessions_for_user(a).await.map(ids).ok(), Some(vec![first.session_id]));
        assert_eq!(
            store.sessions_for_user(b).await.map(ids).ok(),
            Some(vec![first.session_id, second.session_id])
        );
        assert_eq!(
            store.sessions_for_user(c.user_id).await.map(ids).ok(),
            Some(vec![second.session_id])
        );
    }
}
