//! Cart operations exposed to the request layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cartledger_cart::{CartCommand, CartError, ClientId, OpenCart, STREAM_CATEGORY, ShoppingCart, decide, open_cart};
use cartledger_core::{AggregateId, Clock, SystemClock};
use cartledger_events::StreamId;

use crate::event_log::EventLog;
use crate::gateway::{CommandGateway, GatewayError};

pub type CartResult<T> = Result<T, GatewayError<CartError>>;

/// Response of [`CartService::open_cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedCart {
    pub id: AggregateId,
    pub next_expected_revision: u64,
}

/// Response of [`CartService::update_cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCart {
    pub next_expected_revision: u64,
}

/// Stream holding the events of one cart.
pub fn cart_stream(id: AggregateId) -> StreamId {
    StreamId::for_aggregate(STREAM_CATEGORY, id)
}

/// Write-side cart operations over a [`CommandGateway`].
pub struct CartService<L> {
    gateway: CommandGateway<L>,
    clock: Arc<dyn Clock>,
}

impl<L> core::fmt::Debug for CartService<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartService").finish_non_exhaustive()
    }
}

impl<L: EventLog> CartService<L> {
    pub fn new(log: L) -> Self {
        Self::with_clock(log, Arc::new(SystemClock))
    }

    pub fn with_clock(log: L, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway: CommandGateway::new(log),
            clock,
        }
    }

    pub fn gateway(&self) -> &CommandGateway<L> {
        &self.gateway
    }

    /// Open a new cart under a fresh id.
    pub fn open_cart(&self, client_id: ClientId) -> CartResult<OpenedCart> {
        let id = AggregateId::new();
        let event = open_cart(
            &OpenCart {
                shopping_cart_id: id,
                client_id,
            },
            self.clock.as_ref(),
        );

        let result = self.gateway.create::<ShoppingCart>(&cart_stream(id), &event)?;
        Ok(OpenedCart {
            id,
            next_expected_revision: result.next_expected_revision,
        })
    }

    /// Run a command against a cart the caller last saw at `expected_revision`.
    pub fn update_cart(&self, id: AggregateId, command: &CartCommand, expected_revision: u64) -> CartResult<UpdatedCart> {
        tracing::debug!(cart_id = %id, command = command.name(), expected_revision, "updating cart");

        let clock = self.clock.as_ref();
        let result = self
            .gateway
            .update::<ShoppingCart, _>(&cart_stream(id), expected_revision, |cart| decide(cart, command, clock))?;

        Ok(UpdatedCart {
            next_expected_revision: result.next_expected_revision,
        })
    }

    /// Current state of a cart, rebuilt from its stream.
    pub fn get_cart(&self, id: AggregateId) -> CartResult<ShoppingCart> {
        Ok(self.gateway.load::<ShoppingCart>(&cart_stream(id))?.state)
    }

    /// Current state of a cart together with its revision.
    pub fn get_cart_with_revision(&self, id: AggregateId) -> CartResult<(ShoppingCart, u64)> {
        let loaded = self.gateway.load::<ShoppingCart>(&cart_stream(id))?;
        Ok((loaded.state, loaded.revision))
    }
}
