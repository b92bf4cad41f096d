//! Stream folding: rebuild entity state from an ordered event sequence.
//!
//! The aggregator never reorders: ordering is the event log's job. It starts
//! from "no state", feeds every event through the transition, and stops at the
//! first rejected event without returning partial state.

use crate::aggregate::Aggregate;
use crate::error::FoldError;

/// Generic fold engine over a caller-supplied transition function.
#[derive(Debug, Clone, Copy)]
pub struct StreamAggregator<F> {
    apply: F,
}

impl<F> StreamAggregator<F> {
    pub fn new(apply: F) -> Self {
        Self { apply }
    }

    /// Fold `events` into a final state.
    ///
    /// Fails with [`FoldError::StreamNotFound`] when `events` is empty and
    /// with [`FoldError::Transition`] on the first rejected event.
    pub fn aggregate<S, Ev, E, I>(&self, events: I) -> Result<S, FoldError<E>>
    where
        F: Fn(Option<S>, Ev) -> Result<S, E>,
        I: IntoIterator<Item = Ev>,
    {
        let mut state: Option<S> = None;
        for event in events {
            state = Some((self.apply)(state, event).map_err(FoldError::Transition)?);
        }
        state.ok_or(FoldError::StreamNotFound)
    }
}

/// Fold a stream of events using the aggregate's own `evolve` as transition.
pub fn replay<'a, A>(events: impl IntoIterator<Item = &'a A::Event>) -> Result<A, FoldError<A::Error>>
where
    A: Aggregate,
    A::Event: 'a,
{
    StreamAggregator::new(|state: Option<A>, event: &'a A::Event| A::evolve(state, event))
        .aggregate(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Counter {
        total: i64,
        applied: u32,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum CounterEvent {
        Started,
        Added(i64),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum CounterError {
        NotStarted,
        AlreadyStarted,
        Negative,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = CounterError;

        fn evolve(state: Option<Self>, event: &CounterEvent) -> Result<Self, CounterError> {
            match (state, event) {
                (None, CounterEvent::Started) => Ok(Counter { total: 0, applied: 1 }),
                (Some(_), CounterEvent::Started) => Err(CounterError::AlreadyStarted),
                (None, CounterEvent::Added(_)) => Err(CounterError::NotStarted),
                (Some(c), CounterEvent::Added(n)) => {
                    let total = c.total + n;
                    if total < 0 {
                        return Err(CounterError::Negative);
                    }
                    Ok(Counter {
                        total,
                        applied: c.applied + 1,
                    })
                }
            }
        }
    }

    #[test]
    fn empty_sequence_fails_with_stream_not_found() {
        let result = replay::<Counter>(std::iter::empty());
        assert_eq!(result, Err(FoldError::StreamNotFound));
    }

    #[test]
    fn folds_events_in_delivery_order() {
        let events = [
            CounterEvent::Started,
            CounterEvent::Added(3),
            CounterEvent::Added(-1),
        ];
        let state = replay::<Counter>(&events).unwrap();
        assert_eq!(state, Counter { total: 2, applied: 3 });
    }

    #[test]
    fn first_failing_transition_aborts_the_fold() {
        let events = [
            CounterEvent::Started,
            CounterEvent::Added(-5),
            CounterEvent::Added(10),
        ];
        let result = replay::<Counter>(&events);
        assert_eq!(result, Err(FoldError::Transition(CounterError::Negative)));
    }

    #[test]
    fn closure_transitions_can_consume_owned_events() {
        let aggregator = StreamAggregator::new(|state: Option<Vec<u8>>, byte: u8| {
            let mut acc = state.unwrap_or_default();
            acc.push(byte);
            Ok::<_, ()>(acc)
        });
        assert_eq!(aggregator.aggregate(vec![1, 2, 3]), Ok(vec![1, 2, 3]));
    }

    proptest! {
        #[test]
        fn replaying_the_same_sequence_is_deterministic(
            deltas in prop::collection::vec(0i64..1_000, 0..50)
        ) {
            let mut events = vec![CounterEvent::Started];
            events.extend(deltas.into_iter().map(CounterEvent::Added));

            let first = replay::<Counter>(&events);
            let second = replay::<Counter>(&events);
            prop_assert_eq!(first, second);
        }
    }
}
