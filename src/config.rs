//! Client configuration and caller context
//!
//! The host application supplies credentials and tuning values through
//! [`ClientConfig`]. The configuration is read once when a client is built and
//! never mutated afterwards.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::eds::query::DetailLevel;

/// Default EDS REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://eds-api.ebscohost.com/EDSAPI/rest";

/// Default authentication endpoint
pub const DEFAULT_AUTH_URL: &str = "https://eds-api.ebscohost.com/AuthService/rest";

/// Configuration for the EDS client
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API user id
    #[serde(default)]
    pub user_id: String,
    /// API password
    #[serde(default)]
    pub password: String,
    /// Profile id used when creating sessions
    #[serde(default)]
    pub profile_id: String,
    /// Interface id
    #[serde(default)]
    pub interface_id: String,
    /// Organization (customer) id
    #[serde(default)]
    pub organization_id: String,
    /// Request autocomplete credentials during authentication
    #[serde(default)]
    pub autocomplete: bool,
    /// Comma separated list of IP prefixes treated as on-campus (non guest)
    #[serde(default)]
    pub local_ip_addresses: String,
    /// Log every API request/response pair
    #[serde(default)]
    pub log_requests: bool,
    /// Results per page when the request does not say otherwise
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Detail level when the request does not say otherwise
    #[serde(default)]
    pub default_detail_level: DetailLevel,
    /// Per-call HTTP timeout
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    /// EDS REST endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Authentication endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Attempt budget for token-refresh retries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// How long a cached Info payload stays valid (`None` keeps it for the session)
    #[serde(default = "default_info_ttl", with = "option_duration_secs")]
    pub info_ttl: Option<Duration>,
    /// Path of the host's result page, used to build author search links
    #[serde(default = "default_results_path")]
    pub results_path: String,
    /// Item groups whose search links become real anchors
    #[serde(default = "default_search_link_groups")]
    pub search_link_groups: Vec<String>,
    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_page_size() -> u32 {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_info_ttl() -> Option<Duration> {
    Some(Duration::from_secs(24 * 60 * 60))
}

fn default_results_path() -> String {
    "/ebsco/results".to_string()
}

fn default_search_link_groups() -> Vec<String> {
    vec!["au".to_string()]
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            password: String::new(),
            profile_id: String::new(),
            interface_id: String::new(),
            organization_id: String::new(),
            autocomplete: false,
            local_ip_addresses: String::new(),
            log_requests: false,
            default_page_size: default_page_size(),
            default_detail_level: DetailLevel::default(),
            timeout: default_timeout(),
            base_url: default_base_url(),
            auth_url: default_auth_url(),
            max_attempts: default_max_attempts(),
            info_ttl: default_info_ttl(),
            results_path: default_results_path(),
            search_link_groups: default_search_link_groups(),
            user_agent: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("profile_id", &self.profile_id)
            .field("interface_id", &self.interface_id)
            .field("organization_id", &self.organization_id)
            .field("autocomplete", &self.autocomplete)
            .field("local_ip_addresses", &self.local_ip_addresses)
            .field("log_requests", &self.log_requests)
            .field("default_page_size", &self.default_page_size)
            .field("default_detail_level", &self.default_detail_level)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("max_attempts", &self.max_attempts)
            .field("info_ttl", &self.info_ttl)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Create a configuration with default values
    ///
    /// # Example
    ///
    /// ```
    /// use eds_client_rs::ClientConfig;
    ///
    /// let config = ClientConfig::new()
    ///     .with_credentials("user", "secret")
    ///     .with_profile("edsapi")
    ///     .with_organization("ACME University");
    /// assert_eq!(config.default_page_size, 10);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.password = password.into();
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = profile_id.into();
        self
    }

    pub fn with_interface(mut self, interface_id: impl Into<String>) -> Self {
        self.interface_id = interface_id.into();
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = organization_id.into();
        self
    }

    pub fn with_autocomplete(mut self, enabled: bool) -> Self {
        self.autocomplete = enabled;
        self
    }

    /// Set the comma separated IP prefix allow-list
    pub fn with_local_ip_addresses(mut self, prefixes: impl Into<String>) -> Self {
        self.local_ip_addresses = prefixes.into();
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn with_default_detail_level(mut self, level: DetailLevel) -> Self {
        self.default_detail_level = level;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the EDS REST endpoint (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the authentication endpoint (useful for testing)
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_info_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.info_ttl = ttl;
        self
    }

    pub fn with_results_path(mut self, path: impl Into<String>) -> Self {
        self.results_path = path.into();
        self
    }

    pub fn with_search_link_groups<S: AsRef<str>>(mut self, groups: &[S]) -> Self {
        self.search_link_groups = groups
            .iter()
            .map(|g| g.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("eds-client-rs/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Whether `remote_addr` starts with one of the configured IP prefixes
    ///
    /// The address usually comes from a request header, so this check is only
    /// as trustworthy as the proxy chain in front of the host application.
    pub fn is_local_ip(&self, remote_addr: &str) -> bool {
        self.local_ip_addresses
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .any(|prefix| remote_addr.starts_with(prefix))
    }
}

/// What the host application knows about the current caller
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    /// Caller is logged into the host application
    pub authenticated: bool,
    /// Caller's IP address as seen by the host
    pub remote_addr: Option<String>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

/// Whether the remote API should treat the caller as a guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestState {
    Guest,
    Member,
}

impl GuestState {
    /// A caller is a member when logged in or connecting from an allow-listed address
    pub fn detect(config: &ClientConfig, caller: &CallerContext) -> Self {
        let on_campus = caller
            .remote_addr
            .as_deref()
            .is_some_and(|addr| config.is_local_ip(addr));

        if caller.authenticated || on_campus {
            GuestState::Member
        } else {
            GuestState::Guest
        }
    }

    /// Wire value of the `guest` parameter
    pub fn as_flag(&self) -> &'static str {
        match self {
            GuestState::Guest => "y",
            GuestState::Member => "n",
        }
    }

    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "y" => Some(GuestState::Guest),
            "n" => Some(GuestState::Member),
            _ => None,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}
