//! Shopping cart domain: state machine, events, commands and handlers.

pub mod cart;
pub mod commands;
pub mod error;
pub mod events;

pub use cart::{CartStatus, ClientId, LineItems, ProductId, ProductItem, ShoppingCart};
pub use commands::{
    AddItem, CartCommand, ConfirmCart, OpenCart, RemoveItem, add_item, confirm_cart, decide, open_cart,
    remove_item,
};
pub use error::CartError;
pub use events::{
    ProductItemAddedToShoppingCart, ProductItemRemovedFromShoppingCart, STREAM_CATEGORY, ShoppingCartConfirmed,
    ShoppingCartEvent, ShoppingCartOpened,
};
