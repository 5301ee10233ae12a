use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub oracle_base_url: String,
    pub oracle_api_key: Option<String>,
    pub oracle_request_timeout_secs: u64,
    pub pinner_base_url: String,
    pub pinner_api_key: Option<String>,
    pub pinner_request_timeout_secs: u64,
    pub job_batch_size: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("oracle_base_url", &self.oracle_base_url)
            .field(
                "oracle_api_key",
                &self.oracle_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "oracle_request_timeout_secs",
                &self.oracle_request_timeout_secs,
            )
            .field("pinner_base_url", &self.pinner_base_url)
            .field(
                "pinner_api_key",
                &self.pinner_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "pinner_request_timeout_secs",
                &self.pinner_request_timeout_secs,
            )
            .field("job_batch_size", &self.job_batch_size)
            .finish()
    }
}
