use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartledger_core::{Aggregate, AggregateId};

use crate::error::CartError;
use crate::events::{ShoppingCartConfirmed, ShoppingCartEvent, ShoppingCartOpened};

/// Identifier of the client owning a cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Product identifier as supplied by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A product and a quantity, as carried by item events and commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ProductItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }
}

/// Cart lines keyed by product.
///
/// Every stored quantity is strictly positive; a line whose quantity drops to
/// zero is removed. Ordering is by product id so two replays of the same
/// stream produce identical values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItems(BTreeMap<ProductId, u32>);

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `item` into the lines: insert a new line or add to the existing one.
    pub fn add(&mut self, item: &ProductItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }

        let current = self.quantity_of(&item.product_id);
        let merged = current
            .checked_add(item.quantity)
            .ok_or_else(|| CartError::QuantityOverflow {
                product_id: item.product_id.clone(),
            })?;
        self.0.insert(item.product_id.clone(), merged);
        Ok(())
    }

    /// Subtract `item` from its line, deleting the line when it reaches zero.
    pub fn remove(&mut self, item: &ProductItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }

        let Some(available) = self.0.get(&item.product_id).copied() else {
            return Err(CartError::ItemNotInCart {
                product_id: item.product_id.clone(),
            });
        };

        match available.checked_sub(item.quantity) {
            None => Err(CartError::InsufficientQuantity {
                product_id: item.product_id.clone(),
                requested: item.quantity,
                available,
            }),
            Some(0) => {
                self.0.remove(&item.product_id);
                Ok(())
            }
            Some(left) => {
                self.0.insert(item.product_id.clone(), left);
                Ok(())
            }
        }
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.0.get(product_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Lines as product items, ordered by product id.
    pub fn to_product_items(&self) -> Vec<ProductItem> {
        self.0
            .iter()
            .map(|(product_id, quantity)| ProductItem {
                product_id: product_id.clone(),
                quantity: *quantity,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, u32)> {
        self.0.iter().map(|(id, qty)| (id, *qty))
    }
}

impl FromIterator<ProductItem> for LineItems {
    /// Build lines by merging every item; zero quantities are dropped.
    fn from_iter<T: IntoIterator<Item = ProductItem>>(iter: T) -> Self {
        let mut lines = BTreeMap::new();
        for item in iter.into_iter().filter(|i| i.quantity > 0) {
            let entry: &mut u32 = lines.entry(item.product_id).or_default();
            *entry = entry.saturating_add(item.quantity);
        }
        Self(lines)
    }
}

/// Cart status lifecycle. `Opened` is the only state that accepts changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartStatus {
    Opened,
    Confirmed,
    Cancelled,
}

impl CartStatus {
    pub fn is_closed(self) -> bool {
        self != CartStatus::Opened
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CartStatus::Opened => "Opened",
            CartStatus::Confirmed => "Confirmed",
            CartStatus::Cancelled => "Cancelled",
        }
    }
}

impl core::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Opened" => Ok(CartStatus::Opened),
            "Confirmed" => Ok(CartStatus::Confirmed),
            "Cancelled" => Ok(CartStatus::Cancelled),
            other => Err(format!("unknown cart status '{other}'")),
        }
    }
}

/// Aggregate root: ShoppingCart.
///
/// Only ever built by replaying the cart's stream; there is no persisted
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingCart {
    id: AggregateId,
    client_id: ClientId,
    status: CartStatus,
    line_items: LineItems,
    opened_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl ShoppingCart {
    fn opened(event: &ShoppingCartOpened) -> Self {
        Self {
            id: event.shopping_cart_id,
            client_id: event.client_id.clone(),
            status: CartStatus::Opened,
            line_items: LineItems::new(),
            opened_at: event.opened_at,
            confirmed_at: None,
        }
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn line_items(&self) -> &LineItems {
        &self.line_items
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.is_closed() {
            return Err(CartError::CartClosed {
                status: self.status,
            });
        }
        Ok(())
    }

    fn confirm(mut self, event: &ShoppingCartConfirmed) -> Self {
        self.status = CartStatus::Confirmed;
        self.confirmed_at = Some(event.confirmed_at);
        self
    }
}

impl Aggregate for ShoppingCart {
    type Event = ShoppingCartEvent;
    type Error = CartError;

    fn evolve(state: Option<Self>, event: &Self::Event) -> Result<Self, Self::Error> {
        let cart = match (state, event) {
            (None, ShoppingCartEvent::Opened(e)) => return Ok(ShoppingCart::opened(e)),
            (Some(_), ShoppingCartEvent::Opened(_)) => return Err(CartError::AlreadyOpened),
            (None, _) => return Err(CartError::CartNotFound),
            (Some(cart), _) => cart,
        };

        cart.ensure_open()?;

        match event {
            ShoppingCartEvent::Opened(_) => Err(CartError::AlreadyOpened),
            ShoppingCartEvent::ItemAdded(e) => {
                let mut cart = cart;
                cart.line_items.add(&e.product_item)?;
                Ok(cart)
            }
            ShoppingCartEvent::ItemRemoved(e) => {
                let mut cart = cart;
                cart.line_items.remove(&e.product_item)?;
                Ok(cart)
            }
            ShoppingCartEvent::Confirmed(e) => Ok(cart.confirm(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ProductItemAddedToShoppingCart, ProductItemRemovedFromShoppingCart};
    use cartledger_core::{FoldError, replay};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn opened(id: AggregateId) -> ShoppingCartEvent {
        ShoppingCartEvent::Opened(ShoppingCartOpened {
            shopping_cart_id: id,
            client_id: ClientId::new("C1"),
            opened_at: test_time(),
        })
    }

    fn added(id: AggregateId, product: &str, quantity: u32) -> ShoppingCartEvent {
        ShoppingCartEvent::ItemAdded(ProductItemAddedToShoppingCart {
            shopping_cart_id: id,
            product_item: ProductItem::new(product, quantity),
        })
    }

    fn removed(id: AggregateId, product: &str, quantity: u32) -> ShoppingCartEvent {
        ShoppingCartEvent::ItemRemoved(ProductItemRemovedFromShoppingCart {
            shopping_cart_id: id,
            product_item: ProductItem::new(product, quantity),
        })
    }

    fn confirmed(id: AggregateId) -> ShoppingCartEvent {
        ShoppingCartEvent::Confirmed(ShoppingCartConfirmed {
            shopping_cart_id: id,
            confirmed_at: test_time(),
        })
    }

    #[test]
    fn opened_cart_is_empty() {
        let id = AggregateId::new();
        let cart: ShoppingCart = replay::<ShoppingCart>(&[opened(id)]).unwrap();

        assert_eq!(cart.id(), id);
        assert_eq!(cart.client_id().as_str(), "C1");
        assert_eq!(cart.status(), CartStatus::Opened);
        assert!(cart.line_items().is_empty());
        assert_eq!(cart.confirmed_at(), None);
    }

    #[test]
    fn adding_same_product_twice_merges_the_line() {
        let id = AggregateId::new();
        let events = [opened(id), added(id, "shoes", 2), added(id, "shoes", 3)];
        let cart = replay::<ShoppingCart>(&events).unwrap();

        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.line_items().quantity_of(&ProductId::new("shoes")), 5);
    }

    #[test]
    fn removing_the_full_quantity_deletes_the_line() {
        let id = AggregateId::new();
        let events = [
            opened(id),
            added(id, "shoes", 2),
            added(id, "shoes", 3),
            removed(id, "shoes", 5),
        ];
        let cart = replay::<ShoppingCart>(&events).unwrap();

        assert!(cart.line_items().is_empty());
    }

    #[test]
    fn confirmed_cart_rejects_further_changes() {
        let id = AggregateId::new();
        let cart = replay::<ShoppingCart>(&[opened(id), added(id, "shoes", 1), confirmed(id)]).unwrap();
        assert_eq!(cart.status(), CartStatus::Confirmed);
        assert_eq!(cart.confirmed_at(), Some(test_time()));

        for next in [added(id, "hat", 1), removed(id, "shoes", 1), confirmed(id)] {
            let err = ShoppingCart::evolve(Some(cart.clone()), &next).unwrap_err();
            assert_eq!(
                err,
                CartError::CartClosed {
                    status: CartStatus::Confirmed
                }
            );
        }
    }

    #[test]
    fn events_before_open_fail_with_cart_not_found() {
        let id = AggregateId::new();
        let err = replay::<ShoppingCart>(&[added(id, "shoes", 1)]).unwrap_err();
        assert_eq!(err, FoldError::Transition(CartError::CartNotFound));
    }

    #[test]
    fn opening_twice_is_rejected() {
        let id = AggregateId::new();
        let err = replay::<ShoppingCart>(&[opened(id), opened(id)]).unwrap_err();
        assert_eq!(err, FoldError::Transition(CartError::AlreadyOpened));
    }

    #[test]
    fn empty_stream_is_not_found() {
        let err = replay::<ShoppingCart>(std::iter::empty()).unwrap_err();
        assert_eq!(err, FoldError::StreamNotFound);
    }

    #[test]
    fn removing_absent_product_fails() {
        let id = AggregateId::new();
        let err = replay::<ShoppingCart>(&[opened(id), removed(id, "shoes", 1)]).unwrap_err();
        assert_eq!(
            err,
            FoldError::Transition(CartError::ItemNotInCart {
                product_id: ProductId::new("shoes")
            })
        );
    }

    #[test]
    fn removing_more_than_held_fails() {
        let id = AggregateId::new();
        let err = replay::<ShoppingCart>(&[opened(id), added(id, "shoes", 2), removed(id, "shoes", 3)])
            .unwrap_err();
        assert_eq!(
            err,
            FoldError::Transition(CartError::InsufficientQuantity {
                product_id: ProductId::new("shoes"),
                requested: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn merge_overflow_is_reported() {
        let mut lines = LineItems::new();
        lines.add(&ProductItem::new("shoes", u32::MAX)).unwrap();
        let err = lines.add(&ProductItem::new("shoes", 1)).unwrap_err();
        assert!(matches!(err, CartError::QuantityOverflow { .. }));
        assert_eq!(lines.quantity_of(&ProductId::new("shoes")), u32::MAX);
    }

    #[test]
    fn line_items_serialize_as_a_product_map() {
        let lines: LineItems = [ProductItem::new("shoes", 2), ProductItem::new("hat", 1)]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&lines).unwrap();
        assert_eq!(json, serde_json::json!({ "hat": 1, "shoes": 2 }));
    }

    #[test]
    fn status_round_trips_through_its_name() {
        for status in [CartStatus::Opened, CartStatus::Confirmed, CartStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<CartStatus>(), Ok(status));
        }
        assert!("Closed".parse::<CartStatus>().is_err());
    }

    proptest! {
        #[test]
        fn merge_law(a in 1u32..1_000_000, b in 1u32..1_000_000) {
            let id = AggregateId::new();
            let cart = replay::<ShoppingCart>(&[opened(id), added(id, "P", a), added(id, "P", b)]).unwrap();
            prop_assert_eq!(cart.line_items().quantity_of(&ProductId::new("P")), a + b);
            prop_assert_eq!(cart.line_items().len(), 1);
        }

        #[test]
        fn removal_law(held in 1u32..10_000, extra in 1u32..10_000) {
            let id = AggregateId::new();
            let exact = replay::<ShoppingCart>(&[opened(id), added(id, "P", held), removed(id, "P", held)]).unwrap();
            prop_assert!(exact.line_items().is_empty());

            let too_many = replay::<ShoppingCart>(&[opened(id), added(id, "P", held), removed(id, "P", held + extra)]);
            let is_insufficient = matches!(
                too_many,
                Err(FoldError::Transition(CartError::InsufficientQuantity { .. }))
            );
            prop_assert!(is_insufficient);
        }

        #[test]
        fn replay_is_deterministic(quantities in proptest::collection::vec((0usize..4, 1u32..50), 0..20)) {
            let id = AggregateId::new();
            let products = ["a", "b", "c", "d"];
            let mut events = vec![opened(id)];
            events.extend(quantities.iter().map(|(p, q)| added(id, products[*p], *q)));

            let first = replay::<ShoppingCart>(&events).unwrap();
            let second = replay::<ShoppingCart>(&events).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
