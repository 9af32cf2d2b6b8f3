//! Server configuration.

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of mutations accepted in one push.
    pub max_push_batch: usize,
    /// Maximum size of a JSON request body in bytes.
    pub max_body_bytes: usize,
    /// Schema version clients must declare; `None` accepts any.
    pub schema_version: Option<String>,
    /// Whether a schema-invalid mutation advances its client's
    /// `last_mutation_id` when it is next in line.
    pub consume_invalid_mutations: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new() -> Self {
        Self {
            max_push_batch: 100,
            max_body_bytes: 4 * 1024 * 1024,
            schema_version: None,
            consume_invalid_mutations: false,
        }
    }

    /// Sets the maximum push batch size.
    pub fn with_max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, size: usize) -> Self {
        self.max_body_bytes = size;
        self
    }

    /// Requires clients to declare the given schema version.
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Sets whether schema-invalid mutations advance `last_mutation_id`.
    pub fn with_consume_invalid_mutations(mut self, value: bool) -> Self {
        self.consume_invalid_mutations = value;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
