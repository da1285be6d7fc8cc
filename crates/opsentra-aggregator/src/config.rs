//! Environment-variable configuration for the Aggregator binary (spec §1:
//! "environment loading" and "CLI argument parsing" are explicitly out of
//! scope, so this stays a small, direct `std::env` reader).

pub struct AggregatorConfig {
    pub mongo_uri: String,
    pub mongo_max_pool_size: u32,
    pub broker_url: String,
    pub s3_bucket_prefix: String,
    pub http_addr: std::net::SocketAddr,
}

impl AggregatorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mongo_uri =
            std::env::var("OPSENTRA_MONGO_URI").unwrap_or_else(|_| "mongodb://127.0.0.1:27017".to_string());
        let mongo_max_pool_size = std::env::var("OPSENTRA_MONGO_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let broker_url = std::env::var("OPSENTRA_BROKER_URL")
            .map_err(|_| anyhow::anyhow!("OPSENTRA_BROKER_URL is required and has no default"))?;
        let s3_bucket_prefix =
            std::env::var("OPSENTRA_S3_BUCKET_PREFIX").unwrap_or_else(|_| "opsentra".to_string());
        let http_addr = std::env::var("OPSENTRA_HTTP_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| ([0, 0, 0, 0], 8080).into());

        Ok(AggregatorConfig {
            mongo_uri,
            mongo_max_pool_size,
            broker_url,
            s3_bucket_prefix,
            http_addr,
        })
    }
}
