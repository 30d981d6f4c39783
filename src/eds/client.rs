use std::sync::Arc;

use quick_xml::escape::escape;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{CallerContext, ClientConfig, GuestState};
use crate::eds::markup::MarkupOptions;
use crate::eds::models::{
    ApiResponse, AuthenticationResult, AutocompleteSettings, Citation, ExportPayload, Info,
    Record, RecordId, SearchResults,
};
use crate::eds::parser::parse_response;
use crate::eds::query::{AppliedFilters, QueryPlan, SearchRequest};
use crate::error::{EdsError, Recovery, Result};
use crate::session::{SessionStore, TokenCache};
use crate::transport::{Method, Payload, Transport};

/// Header carrying the authentication token
pub const AUTH_HEADER: &str = "x-authenticationToken";
/// Header carrying the session token
pub const SESSION_HEADER: &str = "x-sessionToken";

const AUTH_NAMESPACE: &str =
    "http://www.ebscohost.com/services/public/AuthService/Response/2012/06/01";
const DEFAULT_INTERFACE: &str = "wsapi";

/// Session-scoped EDS operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Search,
    Retrieve,
    ExportFormat,
    CitationStyles,
    Info,
}

impl Action {
    pub fn path(&self) -> &'static str {
        match self {
            Action::Search => "Search",
            Action::Retrieve => "Retrieve",
            Action::ExportFormat => "ExportFormat",
            Action::CitationStyles => "CitationStyles",
            Action::Info => "Info",
        }
    }
}

/// Optional payloads of a Retrieve call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    pub image_quick_view: bool,
    pub illustration_info: bool,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    terms: Vec<AutocompleteTerm>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteTerm {
    term: String,
}

fn mismatch(expected: &str, got: &ApiResponse) -> EdsError {
    EdsError::UnexpectedResponse {
        root: got.kind().to_string(),
        payload: format!("expected a {} response", expected),
    }
}

/// Client for the EBSCO Discovery Service API
///
/// Owns the token lifecycle: tokens are read from and written to the session
/// store handed in at construction, so clients built per request for the same
/// caller session share authentication and session tokens.
#[derive(Clone)]
pub struct EdsClient {
    config: ClientConfig,
    transport: Transport,
    tokens: TokenCache,
    guest: GuestState,
    markup: MarkupOptions,
}

impl EdsClient {
    /// Create a client for one caller
    ///
    /// # Arguments
    ///
    /// * `config` - Credentials and tuning values
    /// * `store` - Session-scoped key/value store for tokens
    /// * `caller` - What the host knows about the caller (guest detection)
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore};
    ///
    /// let config = ClientConfig::new().with_credentials("user", "secret").with_profile("edsapi");
    /// let store = Arc::new(MemorySessionStore::new());
    /// let client = EdsClient::new(config, store, &CallerContext::anonymous()).unwrap();
    /// assert!(client.is_guest());
    /// ```
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        caller: &CallerContext,
    ) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self::with_transport(config, transport, store, caller))
    }

    /// Create a client around an existing transport
    pub fn with_transport(
        config: ClientConfig,
        transport: Transport,
        store: Arc<dyn SessionStore>,
        caller: &CallerContext,
    ) -> Self {
        let guest = GuestState::detect(&config, caller);
        let markup = MarkupOptions {
            results_path: config.results_path.clone(),
            search_link_groups: config.search_link_groups.clone(),
        };
        Self {
            config,
            transport,
            tokens: TokenCache::new(store),
            guest,
            markup,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn guest_state(&self) -> GuestState {
        self.guest
    }

    pub fn is_guest(&self) -> bool {
        self.guest == GuestState::Guest
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Exchange the configured credentials for an authentication token
    ///
    /// The token is not cached; see [`EdsClient::request`] for the managed path.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<AuthenticationResult> {
        let interface = if self.config.interface_id.is_empty() {
            DEFAULT_INTERFACE
        } else {
            self.config.interface_id.as_str()
        };
        let options = if self.config.autocomplete {
            "<Options><Option>autocomplete</Option></Options>"
        } else {
            ""
        };
        let body = format!(
            "<UIDAuthRequestMessage xmlns=\"{}\"><UserId>{}</UserId><Password>{}</Password><InterfaceId>{}</InterfaceId>{}</UIDAuthRequestMessage>",
            AUTH_NAMESPACE,
            escape(self.config.user_id.as_str()),
            escape(self.config.password.as_str()),
            escape(interface),
            options
        );

        let url = format!("{}/uidauth", self.config.auth_url);
        let root = self
            .transport
            .send(&url, &Payload::Body(body), &[], Method::Post)
            .await?;

        match parse_response(&root, &self.markup) {
            Ok(ApiResponse::Authentication(auth)) => Ok(auth),
            Ok(_) | Err(EdsError::UnexpectedResponse { .. }) => Err(EdsError::MissingToken {
                token: "authentication",
            }),
            Err(e) => Err(e),
        }
    }

    /// Create a session for the current profile, organization and guest state
    #[instrument(skip(self, auth_token))]
    pub async fn create_session(&self, auth_token: &str) -> Result<String> {
        let plan = QueryPlan::new()
            .with("profile", self.config.profile_id.as_str())
            .with("org", self.config.organization_id.as_str())
            .with("guest", self.guest.as_flag());

        let url = self.endpoint("CreateSession");
        let root = self
            .transport
            .send(
                &url,
                &Payload::Query(plan),
                &[(AUTH_HEADER, auth_token)],
                Method::Get,
            )
            .await?;

        match parse_response(&root, &self.markup) {
            Ok(ApiResponse::Session(token)) => Ok(token),
            Ok(_) | Err(EdsError::UnexpectedResponse { .. }) => {
                Err(EdsError::MissingToken { token: "session" })
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch and cache a new authentication token
    async fn refresh_auth(&self) -> Result<String> {
        let auth = self.authenticate().await?;
        self.tokens.set_auth_token(&auth.token, auth.timeout);
        if let Some(settings) = &auth.autocomplete {
            self.tokens.set_autocomplete(settings)?;
        }
        info!(timeout_secs = auth.timeout, "Acquired authentication token");
        Ok(auth.token)
    }

    /// Fetch and cache a new session token with the cached authentication token
    async fn refresh_session(&self) -> Result<()> {
        let auth_token = match self.tokens.auth_token() {
            Some(token) => token,
            None => self.refresh_auth().await?,
        };
        let session = self.create_session(&auth_token).await?;
        self.tokens.set_session_token(&session, self.guest);
        info!(guest = self.guest.as_flag(), "Acquired session token");
        Ok(())
    }

    /// Acquire both tokens in sequence, failing on the first error
    async fn acquire_auth_and_session(&self) -> Result<()> {
        let auth_token = self.refresh_auth().await?;
        let session = self.create_session(&auth_token).await?;
        self.tokens.set_session_token(&session, self.guest);
        info!(guest = self.guest.as_flag(), "Acquired session token");
        Ok(())
    }

    /// One call with the cached tokens, no recovery
    async fn call(&self, action: Action, plan: &QueryPlan) -> Result<ApiResponse> {
        let auth_token = self.tokens.auth_token().unwrap_or_default();
        let session_token = self.tokens.session_token().unwrap_or_default();
        let headers = [
            (AUTH_HEADER, auth_token.as_str()),
            (SESSION_HEADER, session_token.as_str()),
        ];

        debug!(action = action.path(), params = plan.len(), "Calling EDS");
        let root = self
            .transport
            .send(
                &self.endpoint(action.path()),
                &Payload::Query(plan.clone()),
                &headers,
                Method::Get,
            )
            .await?;
        parse_response(&root, &self.markup)
    }

    /// Run a session-scoped call, managing the tokens around it
    ///
    /// Missing tokens are acquired first. A cached session created for a
    /// different guest state is replaced before the call. Token errors reported
    /// by the remote trigger a refresh and another call, at most `attempts`
    /// times; every other error is returned as is.
    ///
    /// # Errors
    ///
    /// * Any error from acquiring tokens, immediately
    /// * The last token error once the attempt budget is spent
    /// * Any non-token error from the call
    #[instrument(skip(self, plan), fields(action = action.path()))]
    pub async fn request(
        &self,
        action: Action,
        plan: &QueryPlan,
        attempts: u32,
    ) -> Result<ApiResponse> {
        if self.tokens.auth_token().is_none() || self.tokens.session_token().is_none() {
            debug!("No cached tokens, acquiring authentication and session");
            self.acquire_auth_and_session().await?;
        } else if self.tokens.guest_state() != Some(self.guest) {
            debug!("Guest state changed, recreating session");
            if let Err(e) = self.refresh_session().await {
                warn!(error = %e, "Session refresh after guest change failed, keeping cached session");
            }
        }

        let mut remaining = attempts;
        loop {
            let err = match self.call(action, plan).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let recovery = err.code().map(|c| c.recovery());
            if !matches!(recovery, Some(Recovery::RefreshAuth | Recovery::RefreshSession)) {
                return Err(err);
            }
            if remaining == 0 {
                warn!(error = %err, attempts, "Token refresh budget exhausted");
                return Err(err);
            }

            if recovery == Some(Recovery::RefreshAuth) {
                debug!(remaining, "Authentication token rejected, refreshing");
                self.refresh_auth().await?;
            } else {
                debug!(remaining, "Session token rejected, refreshing both tokens");
                self.acquire_auth_and_session().await?;
            }
            remaining -= 1;
        }
    }

    /// Run a search
    ///
    /// A request with no search terms returns an empty result set without
    /// contacting the remote. Remote errors other than token errors come back
    /// as a zero-result object whose `error` carries the message for the user.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore};
    /// use eds_client_rs::eds::query::SearchRequest;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = ClientConfig::new().with_credentials("user", "secret").with_profile("edsapi");
    ///     let client = EdsClient::new(config, Arc::new(MemorySessionStore::new()), &CallerContext::authenticated())?;
    ///
    ///     let request = SearchRequest::new().lookfor("climate change", "TI").page_size(20);
    ///     let results = client.search(&request).await?;
    ///     for record in &results.records {
    ///         println!("{}", record.title());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self, request), fields(page = request.page))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let Some(plan) =
            request.compile(self.config.default_page_size, self.config.default_detail_level)
        else {
            debug!("Empty search, returning empty results");
            return Ok(SearchResults::empty());
        };

        match self
            .request(Action::Search, &plan, self.config.max_attempts)
            .await
        {
            Ok(ApiResponse::Search(results)) => {
                let mut results = *results;
                let page_size = request.page_size.unwrap_or(self.config.default_page_size);
                results.start = u64::from(request.page.max(1) - 1) * u64::from(page_size);
                AppliedFilters::new(&request.filters, None).mark_facets(&mut results.facets);
                info!(
                    total = results.record_count,
                    returned = results.records.len(),
                    "Search completed successfully"
                );
                Ok(results)
            }
            Ok(other) => Err(mismatch("search", &other)),
            Err(err @ EdsError::ApiError { .. }) if !err.is_retryable() => {
                warn!(error = %err, "Search failed remotely");
                Ok(SearchResults::with_error(err.user_message()))
            }
            Err(err) => Err(err),
        }
    }

    /// Search with the optional payloads the profile enables by default
    pub async fn search_with_info_defaults(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResults> {
        let info = self.info().await?;
        let request = request.clone().with_info_defaults(&info);
        self.search(&request).await
    }

    /// Retrieve one record in detail
    #[instrument(skip(self, options), fields(id = %id))]
    pub async fn retrieve(&self, id: &RecordId, options: &RetrieveOptions) -> Result<Record> {
        let mut plan = QueryPlan::new()
            .with("an", id.an.as_str())
            .with("dbid", id.db_id.as_str())
            .with("highlight", "y");
        if options.image_quick_view {
            plan.push("includeimagequickview", "y");
        }
        if options.illustration_info {
            plan.push("IllustrationInfo", "y");
        }

        match self
            .request(Action::Retrieve, &plan, self.config.max_attempts)
            .await?
        {
            ApiResponse::Record(record) => {
                debug!(items = record.items.len(), "Record retrieved");
                Ok(*record)
            }
            other => Err(mismatch("record", &other)),
        }
    }

    /// Export one record as RIS
    #[instrument(skip(self), fields(id = %id))]
    pub async fn export(&self, id: &RecordId) -> Result<ExportPayload> {
        let plan = QueryPlan::new()
            .with("an", id.an.as_str())
            .with("dbid", id.db_id.as_str())
            .with("format", "ris");

        match self
            .request(Action::ExportFormat, &plan, self.config.max_attempts)
            .await?
        {
            ApiResponse::Export(payload) => Ok(payload),
            other => Err(mismatch("export", &other)),
        }
    }

    /// Formatted citations of one record
    ///
    /// `styles` is a comma separated style list; `None` or empty asks for all.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn citation_styles(
        &self,
        id: &RecordId,
        styles: Option<&str>,
    ) -> Result<Vec<Citation>> {
        let styles = styles.filter(|s| !s.trim().is_empty()).unwrap_or("all");
        let plan = QueryPlan::new()
            .with("an", id.an.as_str())
            .with("dbid", id.db_id.as_str())
            .with("styles", styles);

        match self
            .request(Action::CitationStyles, &plan, self.config.max_attempts)
            .await?
        {
            ApiResponse::Citations(citations) => {
                debug!(count = citations.len(), "Citations retrieved");
                Ok(citations)
            }
            other => Err(mismatch("citations", &other)),
        }
    }

    /// Capabilities of the profile
    ///
    /// Served from the session store while younger than the configured TTL.
    #[instrument(skip(self))]
    pub async fn info(&self) -> Result<Info> {
        if let Some(info) = self.tokens.info(self.config.info_ttl) {
            debug!("Using cached info");
            return Ok(info);
        }

        match self
            .request(Action::Info, &QueryPlan::new(), self.config.max_attempts)
            .await?
        {
            ApiResponse::Info(info) => {
                if let Err(e) = self.tokens.set_info(&info) {
                    warn!(error = %e, "Failed to cache info");
                }
                info!(
                    sorts = info.sorts.len(),
                    limiters = info.limiters.len(),
                    "Fetched info"
                );
                Ok(*info)
            }
            other => Err(mismatch("info", &other)),
        }
    }

    /// Drop the cached capabilities so the next [`EdsClient::info`] refetches
    pub fn invalidate_info(&self) {
        self.tokens.invalidate_info();
    }

    /// Suggested search terms for a partial query
    ///
    /// Returns an empty list when autocomplete was not enabled at
    /// authentication time.
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, term: &str) -> Result<Vec<String>> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        let Some(settings) = self
            .tokens
            .autocomplete()
            .filter(AutocompleteSettings::is_configured)
        else {
            debug!("Autocomplete is not configured");
            return Ok(Vec::new());
        };

        let filters = serde_json::json!([{ "name": "custid", "values": [settings.customer_id] }]);
        let plan = QueryPlan::new()
            .with("token", settings.token.as_str())
            .with("term", term)
            .with("idx", "rawqueries")
            .with("filters", filters.to_string());

        let response: AutocompleteResponse = self.transport.get_json(&settings.url, &plan).await?;
        let terms: Vec<String> = response.terms.into_iter().map(|t| t.term).collect();
        debug!(count = terms.len(), "Autocomplete terms received");
        Ok(terms)
    }
}
