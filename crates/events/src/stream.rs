use serde::{Deserialize, Serialize};

use cartledger_core::AggregateId;

/// Name of an event stream.
///
/// One stream per aggregate instance, named `<category>-<aggregate id>`, so
/// the log's native per-stream order equals per-aggregate order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Deterministic stream name for an aggregate instance.
    pub fn for_aggregate(category: &str, id: AggregateId) -> Self {
        Self(format!("{category}-{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category prefix (everything before the first `-`).
    pub fn category(&self) -> &str {
        self.0.split_once('-').map(|(c, _)| c).unwrap_or(&self.0)
    }

    /// Aggregate id encoded after the category prefix, if it parses.
    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.0.split_once('-').and_then(|(_, id)| id.parse().ok())
    }
}

impl core::fmt::Display for StreamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_round_trips_category_and_id() {
        let id = AggregateId::new();
        let stream = StreamId::for_aggregate("shopping_cart", id);

        assert_eq!(stream.as_str(), format!("shopping_cart-{id}"));
        assert_eq!(stream.category(), "shopping_cart");
        assert_eq!(stream.aggregate_id(), Some(id));
    }

    #[test]
    fn foreign_stream_names_have_no_aggregate_id() {
        let stream = StreamId::new("$settings");
        assert_eq!(stream.category(), "$settings");
        assert_eq!(stream.aggregate_id(), None);
    }
}
