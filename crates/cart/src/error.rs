use thiserror::Error;

use crate::cart::{CartStatus, ProductId};

/// Business failures of the shopping cart.
///
/// Every variant is deterministic: retrying the same command against the same
/// state yields the same error, so none of these should be retried
/// automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("shopping cart not found")]
    CartNotFound,

    #[error("shopping cart was already opened")]
    AlreadyOpened,

    #[error("shopping cart is closed (status: {status:?})")]
    CartClosed { status: CartStatus },

    #[error("product '{product_id}' is not in the cart")]
    ItemNotInCart { product_id: ProductId },

    #[error("cannot remove {requested} of '{product_id}', only {available} in the cart")]
    InsufficientQuantity {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("quantity of '{product_id}' must be positive")]
    InvalidQuantity { product_id: ProductId },

    #[error("quantity of '{product_id}' overflows")]
    QuantityOverflow { product_id: ProductId },
}
