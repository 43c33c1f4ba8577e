use serde::{Deserialize, Serialize};

/// What a worker sends the master to announce itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistration {
    pub hostname: String,
    pub port: u16,
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}

/// The master's reply to a registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistered {
    pub node_id: String,
}
