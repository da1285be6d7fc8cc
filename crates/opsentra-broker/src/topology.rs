//! Broker wire topology (spec §6): one durable topic exchange, two durable
//! queues.

pub const EXCHANGE: &str = "opsentra.logs";
pub const RAW_LOGS_QUEUE: &str = "raw-logs";
pub const RAW_LOGS_BINDING: &str = "logs.#";
pub const ENRICHED_QUEUE: &str = "enriched";
pub const ENRICHED_BINDING: &str = "enrichment.#";
pub const DEAD_LETTER_EXCHANGE: &str = "opsentra.logs.deadletter";
pub const DEAD_LETTER_ROUTING_KEY: &str = "logs.deadletter";
