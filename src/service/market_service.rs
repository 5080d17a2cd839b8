//! Marketplace records: users, watchlists, currencies and offers.
//!
//! Thin coordination over the [`Store`]; nothing here produces real-time
//! events.

use std::sync::Arc;

use super::render::Renderer;
use crate::domain::view::{CurrencyView, OfferView, UserView};
use crate::domain::{NewCurrency, OfferDraft, OfferId, UserId};
use crate::error::MarketError;
use crate::persistence::Store;

/// Record operations on users, currencies and offers.
#[derive(Debug, Clone)]
pub struct MarketService {
    store: Arc<dyn Store>,
    renderer: Renderer,
}

impl MarketService {
    /// Creates a new `MarketService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        let renderer = Renderer::new(Arc::clone(&store));
        Self { store, renderer }
    }

    /// Creates a user named after their id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn create_user(&self) -> Result<UserView, MarketError> {
        let user = self.store.create_user().await?;
        tracing::info!(user_id = %user.user_id, "user created");
        self.renderer.user(&user).await
    }

    /// Returns a user's public profile.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for an unknown user.
    pub async fn user_info(&self, user_id: UserId) -> Result<UserView, MarketError> {
        self.renderer.user_by_id(user_id).await
    }

    /// Changes a user's display name.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] for a blank name and
    /// [`MarketError::NotFound`] for an unknown user.
    pub async fn rename_user(&self, user_id: UserId, name: &str) -> Result<UserView, MarketError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MarketError::Validation("name must not be blank".to_string()));
        }
        let user = self.store.rename_user(user_id, name).await?;
        self.renderer.user(&user).await
    }

    /// Records a rating; the user's rating becomes the mean of all ratings.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] for a non-finite rating and
    /// [`MarketError::NotFound`] for an unknown user.
    pub async fn update_rating(&self, user_id: UserId, rating: f64) -> Result<UserView, MarketError> {
        if !rating.is_finite() {
            return Err(MarketError::Validation(format!("invalid rating: {rating}")));
        }
        let user = self.store.add_rating(user_id, rating).await?;
        self.renderer.user(&user).await
    }

    /// Offers on a user's watchlist, rendered for that user.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for an unknown user.
    pub async fn watchlist(&self, user_id: UserId) -> Result<Vec<OfferView>, MarketError> {
        let user = self.store.get_user(user_id).await?;
        let mut views = Vec::with_capacity(user.watchlist.len());
        for &offer_id in &user.watchlist {
            let offer = self.store.get_offer(offer_id).await?;
            views.push(self.renderer.offer(&offer, &user).await?);
        }
        Ok(views)
    }

    /// Adds an offer to a watchlist.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::PermissionDenied`] if it is already there and
    /// [`MarketError::NotFound`] for an unknown user or offer.
    pub async fn add_watchlist(&self, user_id: UserId, offer_id: OfferId) -> Result<(), MarketError> {
        self.store.add_to_watchlist(user_id, offer_id).await?;
        tracing::debug!(%user_id, %offer_id, "offer added to watchlist");
        Ok(())
    }

    /// Removes an offer from a watchlist.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::PermissionDenied`] if it is not there and
    /// [`MarketError::NotFound`] for an unknown user.
    pub async fn remove_watchlist(
        &self,
        user_id: UserId,
        offer_id: OfferId,
    ) -> Result<(), MarketError> {
        self.store.remove_from_watchlist(user_id, offer_id).await?;
        tracing::debug!(%user_id, %offer_id, "offer removed from watchlist");
        Ok(())
    }

    /// Offers posted by a user, rendered for that user.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for an unknown user.
    pub async fn user_offers(&self, user_id: UserId) -> Result<Vec<OfferView>, MarketError> {
        let user = self.store.get_user(user_id).await?;
        let offers = self.store.offers_by_creator(user_id).await?;
        let mut views = Vec::with_capacity(offers.len());
        for offer in &offers {
            views.push(self.renderer.offer(offer, &user).await?);
        }
        Ok(views)
    }

    /// Registers a batch of currencies.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn add_currencies(
        &self,
        batch: Vec<NewCurrency>,
    ) -> Result<Vec<CurrencyView>, MarketError> {
        let created = self.store.add_currencies(batch).await?;
        tracing::info!(count = created.len(), "currencies added");
        Ok(created.iter().map(CurrencyView::from).collect())
    }

    /// Lists all currencies.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_currencies(&self) -> Result<Vec<CurrencyView>, MarketError> {
        let currencies = self.store.list_currencies().await?;
        Ok(currencies.iter().map(CurrencyView::from).collect())
    }

    /// Posts an offer, rendered for its creator.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the creator or a currency does
    /// not resolve.
    pub async fn create_offer(&self, draft: OfferDraft) -> Result<OfferView, MarketError> {
        let offer = self.store.create_offer(draft).await?;
        tracing::info!(offer_id = %offer.offer_id, creator = %offer.creator, "offer created");
        let creator = self.store.get_user(offer.creator).await?;
        self.renderer.offer(&offer, &creator).await
    }

    /// Replaces an offer's fields, rendered for the (possibly new) creator.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the offer, creator or a
    /// currency does not resolve.
    pub async fn edit_offer(
        &self,
        offer_id: OfferId,
        draft: OfferDraft,
    ) -> Result<OfferView, MarketError> {
        let offer = self.store.update_offer(offer_id, draft).await?;
        let creator = self.store.get_user(offer.creator).await?;
        self.renderer.offer(&offer, &creator).await
    }

    /// Lists every offer, rendered for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for an unknown viewer.
    pub async fn list_offers(&self, viewer_id: UserId) -> Result<Vec<OfferView>, MarketError> {
        let viewer = self.store.get_user(viewer_id).await?;
        let offers = self.store.list_offers().await?;
        let mut views = Vec::with_capacity(offers.len());
        for offer in &offers {
            views.push(self.renderer.offer(offer, &viewer).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::test_support::Fixture;

    #[tokio::test]
    async fn watchlist_flag_follows_live_watchlist() {
        let fx = Fixture::new().await;
        let listed = fx.markets.list_offers(fx.p2).await.unwrap_or_default();
        assert!(listed.iter().all(|o| !o.is_on_watchlist));

        assert!(fx.markets.add_watchlist(fx.p2, fx.offer).await.is_ok());
        let listed = fx.markets.list_offers(fx.p2).await.unwrap_or_default();
        assert!(listed.iter().any(|o| o.offer_id == fx.offer && o.is_on_watchlist));

        // Another viewer's rendering is unaffected.
        let listed = fx.markets.list_offers(fx.p3).await.unwrap_or_default();
        assert!(listed.iter().all(|o| !o.is_on_watchlist));

        let watchlist = fx.markets.watchlist(fx.p2).await.unwrap_or_default();
        assert_eq!(watchlist.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_watchlist_add_is_denied() {
        let fx = Fixture::new().await;
        assert!(fx.markets.add_watchlist(fx.p2, fx.offer).await.is_ok());
        assert!(matches!(
            fx.markets.add_watchlist(fx.p2, fx.offer).await,
            Err(MarketError::PermissionDenied(_))
        ));
        assert!(matches!(
            fx.markets.remove_watchlist(fx.p3, fx.offer).await,
            Err(MarketError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn rename_and_rate() {
        let fx = Fixture::new().await;
        let Ok(renamed) = fx.markets.rename_user(fx.p2, "Trader").await else {
            panic!("rename");
        };
        assert_eq!(renamed.user_name, "Trader");
        assert!(matches!(
            fx.markets.rename_user(fx.p2, "   ").await,
            Err(MarketError::Validation(_))
        ));

        let _ = fx.markets.update_rating(fx.p2, 3.0).await;
        let Ok(rated) = fx.markets.update_rating(fx.p2, 4.0).await else {
            panic!("rate");
        };
        assert!((rated.user_rating - 3.5).abs() < f64::EPSILON);
        assert!(matches!(
            fx.markets.update_rating(fx.p2, f64::NAN).await,
            Err(MarketError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn user_offers_lists_only_own() {
        let fx = Fixture::new().await;
        let own = fx.markets.user_offers(fx.owner).await.unwrap_or_default();
        assert_eq!(own.len(), 1);
        let none = fx.markets.user_offers(fx.p2).await.unwrap_or_default();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn edit_offer_replaces_fields() {
        let fx = Fixture::new().await;
        let currencies = fx.markets.list_currencies().await.unwrap_or_default();
        let (Some(a), Some(b)) = (currencies.first(), currencies.get(1)) else {
            panic!("two currencies");
        };
        let Ok(edited) = fx
            .markets
            .edit_offer(
                fx.offer,
                OfferDraft {
                    creator: fx.p2,
                    from_currency: b.currency_id,
                    to_currency: a.currency_id,
                    from_amount: 50.0,
                    to_amount: 55.0,
                    exchange_rate: 1.1,
                },
            )
            .await
        else {
            panic!("edit");
        };
        assert_eq!(edited.creator.user_id, fx.p2);
        assert_eq!(edited.from_currency_id, b.currency_id);
        assert!(matches!(
            fx.markets
                .edit_offer(
                    OfferId::new(404),
                    OfferDraft {
                        creator: fx.p2,
                        from_currency: a.currency_id,
                        to_currency: b.currency_id,
                        from_amount: 1.0,
                        to_amount: 1.0,
                        exchange_rate: 1.0,
                    },
                )
                .await,
            Err(MarketError::NotFound { .. })
        ));
    }
}
