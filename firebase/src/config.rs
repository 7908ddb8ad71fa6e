//! Connection settings for the Realtime Database.

use std::fmt;
use std::time::Duration;

/// Where and how to reach the database.
#[derive(Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    /// Database root, e.g. `https://<project>.firebaseio.com`
    pub database_url: String,
    /// Project identifier
    pub project_id: String,
    /// Explicit `ns` query parameter
    pub namespace: Option<String>,
    /// Database secret or ID token sent as `auth`
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Compare-and-set attempts for counter increments
    pub cas_attempts: u32,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            database_url: "http://127.0.0.1:9000".to_string(),
            project_id: "spotbook-local".to_string(),
            namespace: None,
            auth_token: None,
            timeout: Duration::from_secs(10),
            cas_attempts: 8,
        }
    }
}

impl FirebaseConfig {
    /// Settings for `database_url` in `project_id` with default tunables.
    #[must_use]
    pub fn new(database_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Set the `ns` query parameter.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Authenticate every request with `token`.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the compare-and-set attempt budget.
    #[must_use]
    pub const fn with_cas_attempts(mut self, attempts: u32) -> Self {
        self.cas_attempts = attempts;
        self
    }

    /// Namespace sent as `ns`.
    ///
    /// The emulator serves every project from one host and needs the
    /// namespace to pick a database, so a local URL falls back to the
    /// project id. Hosted databases are addressed by URL alone.
    #[must_use]
    pub fn effective_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().or_else(|| {
            self.is_emulator()
                .then_some(self.project_id.as_str())
                .filter(|id| !id.is_empty())
        })
    }

    /// Whether the URL points at a local emulator.
    #[must_use]
    pub fn is_emulator(&self) -> bool {
        let url = self.database_url.to_ascii_lowercase();
        ["://127.0.0.1", "://localhost", "://0.0.0.0", "://[::1]"]
            .iter()
            .any(|host| url.contains(host))
    }
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("database_url", &self.database_url)
            .field("project_id", &self.project_id)
            .field("namespace", &self.namespace)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("cas_attempts", &self.cas_attempts)
            .finish()
    }
}
