//! Shopping cart events and their wire tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use cartledger_core::AggregateId;
use cartledger_events::{DecodeError, Event, EventData, decode_payload};

use crate::cart::{ClientId, ProductItem};

pub const SHOPPING_CART_OPENED: &str = "shopping-cart-opened";
pub const PRODUCT_ITEM_ADDED: &str = "product-item-added-to-shopping-cart";
pub const PRODUCT_ITEM_REMOVED: &str = "product-item-removed-from-shopping-cart";
pub const SHOPPING_CART_CONFIRMED: &str = "shopping-cart-confirmed";

/// Stream category shared by every cart stream (`shopping_cart-<id>`).
pub const STREAM_CATEGORY: &str = "shopping_cart";

/// Event: ShoppingCartOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartOpened {
    pub shopping_cart_id: AggregateId,
    pub client_id: ClientId,
    pub opened_at: DateTime<Utc>,
}

/// Event: ProductItemAddedToShoppingCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemAddedToShoppingCart {
    pub shopping_cart_id: AggregateId,
    pub product_item: ProductItem,
}

/// Event: ProductItemRemovedFromShoppingCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemRemovedFromShoppingCart {
    pub shopping_cart_id: AggregateId,
    pub product_item: ProductItem,
}

/// Event: ShoppingCartConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartConfirmed {
    pub shopping_cart_id: AggregateId,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoppingCartEvent {
    Opened(ShoppingCartOpened),
    ItemAdded(ProductItemAddedToShoppingCart),
    ItemRemoved(ProductItemRemovedFromShoppingCart),
    Confirmed(ShoppingCartConfirmed),
}

impl ShoppingCartEvent {
    pub fn shopping_cart_id(&self) -> AggregateId {
        match self {
            ShoppingCartEvent::Opened(e) => e.shopping_cart_id,
            ShoppingCartEvent::ItemAdded(e) => e.shopping_cart_id,
            ShoppingCartEvent::ItemRemoved(e) => e.shopping_cart_id,
            ShoppingCartEvent::Confirmed(e) => e.shopping_cart_id,
        }
    }
}

impl Event for ShoppingCartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShoppingCartEvent::Opened(_) => SHOPPING_CART_OPENED,
            ShoppingCartEvent::ItemAdded(_) => PRODUCT_ITEM_ADDED,
            ShoppingCartEvent::ItemRemoved(_) => PRODUCT_ITEM_REMOVED,
            ShoppingCartEvent::Confirmed(_) => SHOPPING_CART_CONFIRMED,
        }
    }

    fn to_data(&self) -> Result<EventData, serde_json::Error> {
        let tag = self.event_type();
        match self {
            ShoppingCartEvent::Opened(e) => EventData::new(tag, e),
            ShoppingCartEvent::ItemAdded(e) => EventData::new(tag, e),
            ShoppingCartEvent::ItemRemoved(e) => EventData::new(tag, e),
            ShoppingCartEvent::Confirmed(e) => EventData::new(tag, e),
        }
    }

    fn from_data(event_type: &str, data: &JsonValue) -> Result<Self, DecodeError> {
        match event_type {
            SHOPPING_CART_OPENED => decode_payload(event_type, data).map(ShoppingCartEvent::Opened),
            PRODUCT_ITEM_ADDED => decode_payload(event_type, data).map(ShoppingCartEvent::ItemAdded),
            PRODUCT_ITEM_REMOVED => decode_payload(event_type, data).map(ShoppingCartEvent::ItemRemoved),
            SHOPPING_CART_CONFIRMED => decode_payload(event_type, data).map(ShoppingCartEvent::Confirmed),
            other => Err(DecodeError::UnknownEventType(other.to_string())),
        }
    }
}
