//! The unit of data that flows through a pipeline.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A single event collected, processed, and eventually forwarded by a pipeline.
///
/// `data` is a free-form structured mapping — collectors and processors own the
/// keys they write. `timestamp` is always a UTC instant; collectors that observe
/// no natural timestamp stamp the event at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEvent {
    data: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

impl CollectedEvent {
    /// Builds an event stamped with the current time.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Builds an event with an explicit timestamp, e.g. one carried over the wire.
    pub fn with_timestamp(data: Map<String, Value>, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// The event's structured payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Mutable access to the payload, for processors that rewrite events in place.
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    /// The UTC instant this event was collected.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Produces the defensive copy handed to each forwarder during fan-out, so that
    /// one forwarder mutating `data` can never be observed by another.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_independent_of_the_original() {
        let mut data = Map::new();
        data.insert("n".into(), Value::from(1));
        let original = CollectedEvent::new(data);

        let mut copy = original.copy();
        copy.data_mut().insert("n".into(), Value::from(2));

        assert_eq!(original.data().get("n"), Some(&Value::from(1)));
        assert_eq!(copy.data().get("n"), Some(&Value::from(2)));
    }
}
