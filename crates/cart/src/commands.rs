//! Cart commands and their handlers.
//!
//! Handlers are pure: they read the replayed cart, decide, and return exactly
//! one event. The candidate event is run through [`ShoppingCart::evolve`]
//! before it is returned, so a handler never emits an event that would make
//! the stream fail to replay.

use serde::{Deserialize, Serialize};

use cartledger_core::{Aggregate, AggregateId, Clock};

use crate::cart::{ClientId, ProductItem, ShoppingCart};
use crate::error::CartError;
use crate::events::{
    ProductItemAddedToShoppingCart, ProductItemRemovedFromShoppingCart, ShoppingCartConfirmed,
    ShoppingCartEvent, ShoppingCartOpened,
};

/// Command: OpenCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCart {
    pub shopping_cart_id: AggregateId,
    pub client_id: ClientId,
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_item: ProductItem,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItem {
    pub product_item: ProductItem,
}

/// Command: ConfirmCart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmCart;

/// Commands against an existing cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    RemoveItem(RemoveItem),
    ConfirmCart(ConfirmCart),
}

impl CartCommand {
    pub fn add_item(product_item: ProductItem) -> Self {
        CartCommand::AddItem(AddItem { product_item })
    }

    pub fn remove_item(product_item: ProductItem) -> Self {
        CartCommand::RemoveItem(RemoveItem { product_item })
    }

    pub fn confirm() -> Self {
        CartCommand::ConfirmCart(ConfirmCart)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CartCommand::AddItem(_) => "add_item",
            CartCommand::RemoveItem(_) => "remove_item",
            CartCommand::ConfirmCart(_) => "confirm_cart",
        }
    }
}

/// Opening performs no existence check; appending with a "no stream"
/// expectation rejects a second open.
pub fn open_cart<C: Clock + ?Sized>(cmd: &OpenCart, clock: &C) -> ShoppingCartEvent {
    ShoppingCartEvent::Opened(ShoppingCartOpened {
        shopping_cart_id: cmd.shopping_cart_id,
        client_id: cmd.client_id.clone(),
        opened_at: clock.now(),
    })
}

pub fn add_item(cart: &ShoppingCart, cmd: &AddItem) -> Result<ShoppingCartEvent, CartError> {
    ensure_positive(&cmd.product_item)?;
    validated(
        cart,
        ShoppingCartEvent::ItemAdded(ProductItemAddedToShoppingCart {
            shopping_cart_id: cart.id(),
            product_item: cmd.product_item.clone(),
        }),
    )
}

pub fn remove_item(cart: &ShoppingCart, cmd: &RemoveItem) -> Result<ShoppingCartEvent, CartError> {
    ensure_positive(&cmd.product_item)?;
    validated(
        cart,
        ShoppingCartEvent::ItemRemoved(ProductItemRemovedFromShoppingCart {
            shopping_cart_id: cart.id(),
            product_item: cmd.product_item.clone(),
        }),
    )
}

pub fn confirm_cart<C: Clock + ?Sized>(
    cart: &ShoppingCart,
    _cmd: &ConfirmCart,
    clock: &C,
) -> Result<ShoppingCartEvent, CartError> {
    validated(
        cart,
        ShoppingCartEvent::Confirmed(ShoppingCartConfirmed {
            shopping_cart_id: cart.id(),
            confirmed_at: clock.now(),
        }),
    )
}

/// Dispatch a command against the replayed cart.
pub fn decide<C: Clock + ?Sized>(
    cart: &ShoppingCart,
    command: &CartCommand,
    clock: &C,
) -> Result<ShoppingCartEvent, CartError> {
    match command {
        CartCommand::AddItem(cmd) => add_item(cart, cmd),
        CartCommand::RemoveItem(cmd) => remove_item(cart, cmd),
        CartCommand::ConfirmCart(cmd) => confirm_cart(cart, cmd, clock),
    }
}

fn ensure_positive(item: &ProductItem) -> Result<(), CartError> {
    if item.quantity == 0 {
        return Err(CartError::InvalidQuantity {
            product_id: item.product_id.clone(),
        });
    }
    Ok(())
}

fn validated(cart: &ShoppingCart, event: ShoppingCartEvent) -> Result<ShoppingCartEvent, CartError> {
    ShoppingCart::evolve(Some(cart.clone()), &event)?;
    Ok(event)
}
