use std::{collections::BTreeMap, sync::Arc, time::Duration};

use crate::{
    Error, Result, WithContext,
    query::QueryBuilder,
    services::{AuthProvider, RealtimeProvider, StorageProvider, Unimplemented},
    transport::{HttpTransport, Transport},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the HTTP transport.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            headers: BTreeMap::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: format!("rillquery/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Reads `RILLQUERY_URL` (required), `RILLQUERY_API_KEY` and
    /// `RILLQUERY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("RILLQUERY_URL")
            .map_err(|_| Error::Config("RILLQUERY_URL is not set".into()))?;
        let mut config = Self::new(url);
        config.api_key = std::env::var("RILLQUERY_API_KEY").ok();
        if let Ok(raw) = std::env::var("RILLQUERY_TIMEOUT_MS") {
            let ms: u64 = raw
                .parse()
                .map_err(|_| Error::Config(format!("RILLQUERY_TIMEOUT_MS is not a number: {raw}")))?;
            config.timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Config("url must not be empty".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "url must start with http:// or https://, got `{}`",
                self.url
            )));
        }
        Ok(())
    }
}

/// Entry point: hands out query builders bound to a collection and carries
/// the injected collaborators.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    storage: Arc<dyn StorageProvider>,
    realtime: Arc<dyn RealtimeProvider>,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth: Arc::new(Unimplemented),
            storage: Arc::new(Unimplemented),
            realtime: Arc::new(Unimplemented),
        }
    }

    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Start a query against `collection`.
    pub fn from(&self, collection: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(self.transport.clone(), collection.into())
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn storage(&self) -> &dyn StorageProvider {
        self.storage.as_ref()
    }

    pub fn realtime(&self) -> &dyn RealtimeProvider {
        self.realtime.as_ref()
    }
}

pub struct ClientBuilder {
    config: ClientConfig,
    auth: Option<Arc<dyn AuthProvider>>,
    storage: Option<Arc<dyn StorageProvider>>,
    realtime: Option<Arc<dyn RealtimeProvider>>,
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(url))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            auth: None,
            storage: None,
            realtime: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Per-request timeout applied by the HTTP transport. `None` disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn auth(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(provider));
        self
    }

    pub fn storage(mut self, provider: impl StorageProvider + 'static) -> Self {
        self.storage = Some(Arc::new(provider));
        self
    }

    pub fn realtime(mut self, provider: impl RealtimeProvider + 'static) -> Self {
        self.realtime = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<Client> {
        self.config.validate()?;
        let transport = HttpTransport::from_config(&self.config)
            .context(format!("building http transport for {}", self.config.url))?;
        tracing::debug!(endpoint = %self.config.url, "rillquery client configured");

        let mut client = Client::new(transport);
        if let Some(auth) = self.auth {
            client.auth = auth;
        }
        if let Some(storage) = self.storage {
            client.storage = storage;
        }
        if let Some(realtime) = self.realtime {
            client.realtime = realtime;
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let err = Client::builder("postgres://localhost").build().err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn builds_with_headers_and_key() {
        let client = Client::builder("http://localhost:3000/query")
            .api_key("secret")
            .header("x-tenant", "acme")
            .timeout(Some(Duration::from_secs(5)))
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn rejects_invalid_header_names() {
        let err = Client::builder("http://localhost")
            .header("bad header", "x")
            .build()
            .err()
            .unwrap();
        match err {
            Error::Context { context, source } => {
                assert!(context.contains("http://localhost"));
                assert!(matches!(*source, Error::Config(_)));
            }
            other => panic!("wrong error: {other:?}"),
        }
    }
}
