//! Broker Publisher and Consumer (spec §4.4, §4.5): the durable pub/sub
//! layer between the Shipper and the Aggregator.

mod consumer;
mod error;
mod publisher;
mod queue;
mod reconnect;
mod topology;

pub use consumer::{EnrichedConsumer, EnrichmentSink, EnrichmentUpdate, HubNotifier, RawLogsConsumer, RecordSink};
pub use error::{ConsumeError, PublishError};
pub use publisher::Publisher;
pub use queue::PublishQueue;
pub use reconnect::Reconnector;
pub use topology::{
    DEAD_LETTER_EXCHANGE, DEAD_LETTER_ROUTING_KEY, ENRICHED_BINDING, ENRICHED_QUEUE, EXCHANGE,
    RAW_LOGS_BINDING, RAW_LOGS_QUEUE,
};
