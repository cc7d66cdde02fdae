//! Network transfer of missing artifacts
//!
//! Provides the [`Transport`] seam and [`HttpFetcher`], its blocking HTTP
//! implementation. Bodies are buffered in memory in full so the caller can
//! verify them before anything touches the cache.

use crate::error::FetchError;
use crate::io::read_fully;
use crate::settings::FetchSettings;
use cairn_artifact::ArtifactRef;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Retrieves artifact bytes from the artifact's origin
///
/// Implementations block the calling thread.
pub trait Transport: Send + Sync {
    /// Fetch the complete content of `artifact`
    ///
    /// # Errors
    /// Returns error if the origin is unreachable, answers with a failure
    /// status, or the body cannot be read in full
    fn fetch(&self, artifact: &ArtifactRef, settings: &FetchSettings)
        -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) transport
///
/// One GET per artifact at `origin + cache_path`, with the configured
/// timeouts and user agent, and basic auth when the origin has credentials.
/// Clients are built once per distinct set of settings and reused, so
/// connections to an origin are pooled across fetches.
#[derive(Debug, Default)]
pub struct HttpFetcher {
    clients: Mutex<HashMap<ClientKey, Client>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    connect_timeout: Duration,
    read_timeout: Duration,
    user_agent: String,
}

impl ClientKey {
    fn of(settings: &FetchSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            read_timeout: settings.read_timeout,
            user_agent: settings.user_agent.clone(),
        }
    }
}

impl HttpFetcher {
    /// Create new fetcher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct clients built so far
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    fn client(&self, settings: &FetchSettings) -> Result<Client, FetchError> {
        let key = ClientKey::of(settings);
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        tracing::debug!(user_agent = %key.user_agent, "built http client");
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl Transport for HttpFetcher {
    fn fetch(
        &self,
        artifact: &ArtifactRef,
        settings: &FetchSettings,
    ) -> Result<Vec<u8>, FetchError> {
        let url = artifact.fetch_url();
        let client = self.client(settings)?;

        let mut request = client.get(url.clone());
        let origin = artifact.origin();
        if let (Some(username), Some(password)) = (origin.username(), origin.password()) {
            request = request.basic_auth(username, Some(password));
        }

        tracing::debug!(artifact = %artifact, url = %url, "fetching artifact");
        let response = request.send().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = read_fully(response, settings.buffer_size).map_err(|source| FetchError::Read {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!(artifact = %artifact, bytes = bytes.len(), "fetched artifact");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_settings() {
        let settings = FetchSettings::new()
            .with_connect_timeout(Duration::from_millis(100))
            .with_read_timeout(Duration::from_millis(100))
            .with_user_agent("test-agent/0.1");
        let fetcher = HttpFetcher::new();
        assert!(fetcher.client(&settings).is_ok());
        assert_eq!(fetcher.client_count(), 1);
    }

    #[test]
    fn clients_are_reused_per_settings() {
        let fetcher = HttpFetcher::new();
        let settings = FetchSettings::new();

        fetcher.client(&settings).unwrap();
        fetcher.client(&settings.clone()).unwrap();
        assert_eq!(fetcher.client_count(), 1);

        fetcher
            .client(&settings.clone().with_user_agent("other/1"))
            .unwrap();
        fetcher
            .client(&settings.with_read_timeout(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(fetcher.client_count(), 3);
    }

    #[test]
    fn status_accessor() {
        let err = FetchError::Status {
            url: "https://repo.example.org/x.jar".to_string(),
            status: 404,
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));
    }
}
