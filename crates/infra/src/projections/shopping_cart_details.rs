//! `ShoppingCartDetails` read model: one document per cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartledger_cart::{CartError, CartStatus, ClientId, LineItems, ProductItem, ShoppingCartEvent, ShoppingCartOpened};
use cartledger_core::AggregateId;

use crate::read_model::Document;

/// Table backing the Postgres document store for this read model.
pub const TABLE: &str = "shopping_cart_details";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartDetails {
    pub shopping_cart_id: AggregateId,
    pub client_id: ClientId,
    pub status: CartStatus,
    pub product_items: Vec<ProductItem>,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Stream revision of the last event reflected in this document.
    pub revision: u64,
}

impl Document for ShoppingCartDetails {
    fn id(&self) -> AggregateId {
        self.shopping_cart_id
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

impl ShoppingCartDetails {
    pub fn opened(event: &ShoppingCartOpened, revision: u64) -> Self {
        Self {
            shopping_cart_id: event.shopping_cart_id,
            client_id: event.client_id.clone(),
            status: CartStatus::Opened,
            product_items: Vec::new(),
            opened_at: event.opened_at,
            confirmed_at: None,
            revision,
        }
    }

    /// Document after `event`, stamped with `revision`.
    ///
    /// Item arithmetic goes through [`LineItems`], the same rules the
    /// aggregate replays with, so the two cannot drift.
    pub fn apply(&self, event: &ShoppingCartEvent, revision: u64) -> Result<Self, CartError> {
        let mut next = self.clone();
        next.revision = revision;

        match event {
            ShoppingCartEvent::Opened(_) => return Err(CartError::AlreadyOpened),
            ShoppingCartEvent::ItemAdded(e) => {
                let mut lines = self.line_items();
                lines.add(&e.product_item)?;
                next.product_items = lines.to_product_items();
            }
            ShoppingCartEvent::ItemRemoved(e) => {
                let mut lines = self.line_items();
                lines.remove(&e.product_item)?;
                next.product_items = lines.to_product_items();
            }
            ShoppingCartEvent::Confirmed(e) => {
                next.status = CartStatus::Confirmed;
                next.confirmed_at = Some(e.confirmed_at);
            }
        }

        Ok(next)
    }

    pub fn line_items(&self) -> LineItems {
        self.product_items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartledger_cart::{ProductItemAddedToShoppingCart, ProductItemRemovedFromShoppingCart, ShoppingCartConfirmed};
    use chrono::TimeZone;
    use serde_json::json;

    fn opened() -> ShoppingCartDetails {
        ShoppingCartDetails::opened(
            &ShoppingCartOpened {
                shopping_cart_id: "0190b5a4-2f6a-7cc2-8d36-6a1f0e2a4b10".parse().unwrap(),
                client_id: ClientId::new("C1"),
                opened_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            },
            0,
        )
    }

    fn added(doc: &ShoppingCartDetails, product: &str, qty: u32) -> ShoppingCartEvent {
        ShoppingCartEvent::ItemAdded(ProductItemAddedToShoppingCart {
            shopping_cart_id: doc.shopping_cart_id,
            product_item: ProductItem::new(product, qty),
        })
    }

    #[test]
    fn items_merge_and_stay_sorted() {
        let doc = opened();
        let doc = doc.apply(&added(&doc, "shoes", 2), 1).unwrap();
        let doc = doc.apply(&added(&doc, "hat", 1), 2).unwrap();
        let doc = doc.apply(&added(&doc, "shoes", 3), 3).unwrap();

        assert_eq!(doc.revision, 3);
        assert_eq!(
            doc.product_items,
            vec![ProductItem::new("hat", 1), ProductItem::new("shoes", 5)]
        );
    }

    #[test]
    fn removing_everything_empties_the_list() {
        let doc = opened();
        let doc = doc.apply(&added(&doc, "shoes", 2), 1).unwrap();
        let removed = ShoppingCartEvent::ItemRemoved(ProductItemRemovedFromShoppingCart {
            shopping_cart_id: doc.shopping_cart_id,
            product_item: ProductItem::new("shoes", 2),
        });

        let doc = doc.apply(&removed, 2).unwrap();
        assert!(doc.product_items.is_empty());
    }

    #[test]
    fn confirmation_sets_status_and_timestamp() {
        let doc = opened();
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let confirmed = ShoppingCartEvent::Confirmed(ShoppingCartConfirmed {
            shopping_cart_id: doc.shopping_cart_id,
            confirmed_at: at,
        });

        let doc = doc.apply(&confirmed, 1).unwrap();
        assert_eq!(doc.status, CartStatus::Confirmed);
        assert_eq!(doc.confirmed_at, Some(at));
    }

    #[test]
    fn document_shape_is_camel_case() {
        let doc = opened();
        let doc = doc.apply(&added(&doc, "shoes", 2), 1).unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "shoppingCartId": "0190b5a4-2f6a-7cc2-8d36-6a1f0e2a4b10",
                "clientId": "C1",
                "status": "Opened",
                "productItems": [{ "productId": "shoes", "quantity": 2 }],
                "openedAt": "2024-03-01T12:00:00Z",
                "revision": 1
            })
        );
    }
}
