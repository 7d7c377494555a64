//! Authenticated HTTP client for the Shiprocket REST API.
//!
//! Owns the bearer token cache and the service-wide enabled flag. Every
//! request goes through [`ShiprocketClient::request`], which attaches the
//! token, re-authenticates once on 401 and retries transport failures with
//! exponential backoff. Rate limiting (429) and validation failures (400)
//! are surfaced immediately.

use crate::clock::{Clock, SystemClock};
use crate::retry::RetryPolicy;
use backoff::backoff::Backoff;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shipment_config::ShiprocketSettings;
use shipment_types::wire::{LoginRequest, LoginResponse};
use shipment_types::{Result, ShipmentError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

const DEFAULT_RETRIES: u32 = 3;

/// Cached bearer token.
#[derive(Clone)]
pub struct AuthToken {
	value: String,
	expires_at: DateTime<Utc>,
}

impl AuthToken {
	pub fn expires_at(&self) -> DateTime<Utc> {
		self.expires_at
	}

	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}
}

impl fmt::Debug for AuthToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AuthToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Per-call request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
	/// Total attempts for transient failures
	pub retries: u32,
	/// Attach the bearer token
	pub requires_auth: bool,
	pub method: Method,
	/// Order the call is made for, used only for logging
	pub order_id: Option<String>,
}

impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			retries: DEFAULT_RETRIES,
			requires_auth: true,
			method: Method::POST,
			order_id: None,
		}
	}
}

impl RequestOptions {
	pub fn get() -> Self {
		Self::default().with_method(Method::GET)
	}

	pub fn post() -> Self {
		Self::default()
	}

	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn with_retries(mut self, retries: u32) -> Self {
		self.retries = retries;
		self
	}

	pub fn without_auth(mut self) -> Self {
		self.requires_auth = false;
		self
	}

	pub fn for_order(mut self, order_id: impl Into<String>) -> Self {
		self.order_id = Some(order_id.into());
		self
	}
}

/// Why a single attempt did not produce a response body.
enum AttemptError {
	Unauthorized,
	Failed(ShipmentError),
}

/// Shiprocket API client.
///
/// Construct one per process and share it behind an `Arc`.
pub struct ShiprocketClient {
	http: reqwest::Client,
	settings: ShiprocketSettings,
	retry: RetryPolicy,
	timeout: Duration,
	clock: Arc<dyn Clock>,
	token: RwLock<Option<AuthToken>>,
	enabled: AtomicBool,
}

impl fmt::Debug for ShiprocketClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ShiprocketClient")
			.field("base_url", &self.settings.base_url)
			.field("enabled", &self.is_enabled())
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl ShiprocketClient {
	pub fn new(settings: ShiprocketSettings) -> Result<Self> {
		ShiprocketClientBuilder::new(settings).build()
	}

	pub fn builder(settings: ShiprocketSettings) -> ShiprocketClientBuilder {
		ShiprocketClientBuilder::new(settings)
	}

	pub fn settings(&self) -> &ShiprocketSettings {
		&self.settings
	}

	/// False once a login has failed, or when credentials were never set.
	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::SeqCst)
	}

	/// Options carrying the configured retry budget.
	pub fn options(&self) -> RequestOptions {
		RequestOptions::default().with_retries(self.settings.max_retries)
	}

	fn ensure_enabled(&self) -> Result<()> {
		if !self.settings.has_credentials() {
			return Err(ShipmentError::Configuration(
				"Shiprocket credentials are not configured".to_string(),
			));
		}
		if !self.is_enabled() {
			return Err(ShipmentError::Disabled);
		}
		Ok(())
	}

	fn disable(&self, reason: &str) {
		if self.enabled.swap(false, Ordering::SeqCst) {
			error!(
				"Shiprocket authentication failed, disabling shipping integration: {}",
				reason
			);
		}
	}

	fn url(&self, path: &str) -> String {
		format!(
			"{}/{}",
			self.settings.base_url.trim_end_matches('/'),
			path.trim_start_matches('/')
		)
	}

	/// Log in and cache a fresh token.
	///
	/// Any failure disables the client for the rest of its lifetime.
	pub async fn authenticate(&self) -> Result<AuthToken> {
		self.ensure_enabled()?;

		let request = LoginRequest {
			email: self.settings.email.clone().unwrap_or_default(),
			password: self.settings.password.clone().unwrap_or_default(),
		};

		debug!("Authenticating with Shiprocket as {}", request.email);

		let response = match self
			.http
			.post(self.url("/auth/login"))
			.json(&request)
			.send()
			.await
		{
			Ok(response) => response,
			Err(e) => {
				let reason = format!("login request failed: {}", self.transport_error(e));
				self.disable(&reason);
				return Err(ShipmentError::Authentication(reason));
			}
		};

		let status = response.status();
		if !status.is_success() {
			let reason = format!("login rejected with status {}", status.as_u16());
			self.disable(&reason);
			return Err(ShipmentError::Authentication(reason));
		}

		let token = match response.json::<LoginResponse>().await {
			Ok(LoginResponse {
				token: Some(value),
			}) if !value.is_empty() => value,
			_ => {
				let reason = "login response did not contain a token".to_string();
				self.disable(&reason);
				return Err(ShipmentError::Authentication(reason));
			}
		};

		let token = AuthToken {
			value: token,
			expires_at: self.clock.now() + ChronoDuration::days(self.settings.token_ttl_days),
		};
		*self.token.write().await = Some(token.clone());

		info!(
			"Authenticated with Shiprocket, token valid until {}",
			token.expires_at
		);
		Ok(token)
	}

	/// Cached token, logging in again when it is missing or expired.
	pub async fn get_token(&self) -> Result<String> {
		self.ensure_enabled()?;

		{
			let cached = self.token.read().await;
			if let Some(token) = cached.as_ref() {
				if !token.is_expired(self.clock.now()) {
					return Ok(token.value.clone());
				}
				debug!("Shiprocket token expired at {}", token.expires_at);
			}
		}

		self.authenticate().await.map(|token| token.value)
	}

	async fn invalidate_token(&self) {
		*self.token.write().await = None;
	}

	/// Issue a request and decode the JSON response.
	pub async fn request<R: DeserializeOwned>(
		&self,
		path: &str,
		body: Option<&Value>,
		options: RequestOptions,
	) -> Result<R> {
		self.ensure_enabled()?;

		let url = self.url(path);
		let max_attempts = options.retries.max(1);
		let order_id = options.order_id.as_deref().unwrap_or("-");
		let mut backoff = self.retry.backoff();
		let mut attempt = 0;
		let mut reauthenticated = false;

		loop {
			attempt += 1;

			let token = if options.requires_auth {
				Some(self.get_token().await?)
			} else {
				None
			};

			debug!(
				"{} {} (order {}, attempt {}/{})",
				options.method, path, order_id, attempt, max_attempts
			);

			match self
				.send_once(&url, body, &options, token.as_deref())
				.await
			{
				Ok(value) => return Ok(value),
				Err(AttemptError::Unauthorized) => {
					self.invalidate_token().await;

					if !options.requires_auth || reauthenticated {
						error!(
							"Shiprocket rejected credentials for {} (order {})",
							path, order_id
						);
						return Err(ShipmentError::Authentication(format!(
							"request to {} unauthorized after re-authentication",
							path
						)));
					}

					warn!(
						"Shiprocket returned 401 for {} (order {}), re-authenticating",
						path, order_id
					);
					reauthenticated = true;
					self.authenticate().await?;
					// The immediate retry after re-authentication is free
					attempt -= 1;
				}
				Err(AttemptError::Failed(err)) if err.is_retryable() && attempt < max_attempts => {
					let delay = backoff.next_backoff().unwrap_or(self.retry.initial_backoff());
					warn!(
						"Request to {} failed (order {}, attempt {}/{}): {}. Retrying in {:?}",
						path, order_id, attempt, max_attempts, err, delay
					);
					tokio::time::sleep(delay).await;
				}
				Err(AttemptError::Failed(err)) => {
					if err.is_retryable() {
						error!(
							"Request to {} failed after {} attempts (order {}): {}",
							path, attempt, order_id, err
						);
					}
					return Err(err);
				}
			}
		}
	}

	/// `GET` a path and decode the response.
	pub async fn get<R: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<R> {
		self.request(path, None, options.with_method(Method::GET))
			.await
	}

	/// Serialize `body` and `POST` it.
	pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
		options: RequestOptions,
	) -> Result<R> {
		let body = serde_json::to_value(body)
			.map_err(|e| ShipmentError::Decode(format!("failed to encode request: {}", e)))?;
		self.request(path, Some(&body), options.with_method(Method::POST))
			.await
	}

	async fn send_once<R: DeserializeOwned>(
		&self,
		url: &str,
		body: Option<&Value>,
		options: &RequestOptions,
		token: Option<&str>,
	) -> std::result::Result<R, AttemptError> {
		let mut request = self.http.request(options.method.clone(), url);
		if let Some(token) = token {
			request = request.bearer_auth(token);
		}
		if let Some(body) = body {
			request = request.json(body);
		}

		let response = request
			.send()
			.await
			.map_err(|e| AttemptError::Failed(self.transport_error(e)))?;

		let status = response.status();
		if status == StatusCode::UNAUTHORIZED {
			return Err(AttemptError::Unauthorized);
		}

		let text = response
			.text()
			.await
			.map_err(|e| AttemptError::Failed(self.transport_error(e)))?;
		let details = serde_json::from_str::<Value>(&text).ok();
		let order_id = options.order_id.as_deref().unwrap_or("-");

		match status {
			StatusCode::TOO_MANY_REQUESTS => {
				warn!("Shiprocket rate limit hit (order {})", order_id);
				Err(AttemptError::Failed(ShipmentError::RateLimited { details }))
			}
			StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
				warn!(
					"Shiprocket rejected request data (order {}): {}",
					order_id, text
				);
				let message = details
					.as_ref()
					.and_then(|d| d.get("message"))
					.and_then(Value::as_str)
					.unwrap_or("invalid request data")
					.to_string();
				Err(AttemptError::Failed(ShipmentError::Validation {
					message,
					details,
				}))
			}
			s if !s.is_success() => {
				warn!(
					"Shiprocket returned {} (order {}): {}",
					s.as_u16(),
					order_id,
					text
				);
				Err(AttemptError::Failed(ShipmentError::Vendor {
					status: s.as_u16(),
					details,
				}))
			}
			_ => {
				let value = if text.trim().is_empty() {
					Value::Null
				} else {
					serde_json::from_str(&text).map_err(|e| {
						AttemptError::Failed(ShipmentError::Decode(format!(
							"invalid JSON from Shiprocket: {}",
							e
						)))
					})?
				};
				serde_json::from_value(value).map_err(|e| {
					AttemptError::Failed(ShipmentError::Decode(format!(
						"unexpected response shape: {}",
						e
					)))
				})
			}
		}
	}

	fn transport_error(&self, e: reqwest::Error) -> ShipmentError {
		if e.is_timeout() {
			ShipmentError::Timeout(self.timeout.as_secs())
		} else {
			ShipmentError::Network(e.without_url().to_string())
		}
	}
}

/// Builder for [`ShiprocketClient`].
pub struct ShiprocketClientBuilder {
	settings: ShiprocketSettings,
	clock: Arc<dyn Clock>,
	timeout: Option<Duration>,
	retry: Option<RetryPolicy>,
}

impl ShiprocketClientBuilder {
	pub fn new(settings: ShiprocketSettings) -> Self {
		Self {
			settings,
			clock: Arc::new(SystemClock),
			timeout: None,
			retry: None,
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	/// Override the per-request timeout from the settings.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Override the backoff schedule from the settings.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = Some(retry);
		self
	}

	pub fn build(self) -> Result<ShiprocketClient> {
		let timeout = self.timeout.unwrap_or_else(|| self.settings.request_timeout());
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				ShipmentError::Configuration(format!("Failed to create HTTP client: {}", e))
			})?;

		let enabled = self.settings.has_credentials();
		if !enabled {
			warn!("Shiprocket credentials missing, shipping integration disabled");
		}

		Ok(ShiprocketClient {
			http,
			retry: self
				.retry
				.unwrap_or_else(|| RetryPolicy::new(self.settings.initial_backoff())),
			settings: self.settings,
			timeout,
			clock: self.clock,
			token: RwLock::new(None),
			enabled: AtomicBool::new(enabled),
		})
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use serde_json::json;
	use std::sync::atomic::AtomicUsize;
	use std::time::Instant;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	pub(crate) fn settings_for(server: &MockServer) -> ShiprocketSettings {
		ShiprocketSettings {
			email: Some("ops@example.com".to_string()),
			password: Some("secret".to_string()),
			base_url: server.uri(),
			initial_backoff_ms: 10,
			assignment_delay_ms: 0,
			awb_poll_delay_ms: 10,
			..Default::default()
		}
	}

	pub(crate) async fn mount_login(server: &MockServer, expected: u64) {
		Mock::given(method("POST"))
			.and(path("/auth/login"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
			.expect(expected)
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn test_token_is_cached() {
		let server = MockServer::start().await;
		mount_login(&server, 1).await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		assert_eq!(client.get_token().await.unwrap(), "tok-1");
		assert_eq!(client.get_token().await.unwrap(), "tok-1");
	}

	#[tokio::test]
	async fn test_token_refreshed_after_expiry() {
		let server = MockServer::start().await;
		mount_login(&server, 2).await;

		let clock = ManualClock::default();
		let client = ShiprocketClient::builder(settings_for(&server))
			.with_clock(Arc::new(clock.clone()))
			.build()
			.unwrap();

		client.get_token().await.unwrap();
		clock.advance(ChronoDuration::days(8));
		client.get_token().await.unwrap();
		clock.advance(ChronoDuration::days(1) + ChronoDuration::minutes(1));
		client.get_token().await.unwrap();
	}

	#[tokio::test]
	async fn test_bearer_token_attached() {
		let server = MockServer::start().await;
		mount_login(&server, 1).await;
		Mock::given(method("GET"))
			.and(path("/settings/company/pickup"))
			.and(header("authorization", "Bearer tok-1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let value: Value = client
			.get("/settings/company/pickup", client.options())
			.await
			.unwrap();
		assert_eq!(value["ok"], true);
	}

	#[tokio::test]
	async fn test_single_reauthentication_per_call() {
		let server = MockServer::start().await;
		mount_login(&server, 2).await;
		Mock::given(method("POST"))
			.and(path("/orders/create/adhoc"))
			.respond_with(ResponseTemplate::new(401))
			.expect(2)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let result: Result<Value> = client
			.post("/orders/create/adhoc", &json!({}), client.options())
			.await;

		assert!(matches!(result, Err(ShipmentError::Authentication(_))));
	}

	#[tokio::test]
	async fn test_retry_after_reauthentication_succeeds() {
		let server = MockServer::start().await;
		mount_login(&server, 2).await;
		Mock::given(method("POST"))
			.and(path("/orders/cancel"))
			.respond_with(ResponseTemplate::new(401))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/orders/cancel"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let value: Value = client
			.post("/orders/cancel", &json!({"ids": [1]}), client.options())
			.await
			.unwrap();
		assert_eq!(value["message"], "ok");
	}

	#[tokio::test]
	async fn test_rate_limit_not_retried() {
		let server = MockServer::start().await;
		mount_login(&server, 1).await;
		Mock::given(method("GET"))
			.and(path("/courier/track/shipment/42"))
			.respond_with(ResponseTemplate::new(429))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let result: Result<Value> = client
			.get("/courier/track/shipment/42", client.options())
			.await;
		assert!(matches!(result, Err(ShipmentError::RateLimited { .. })));
	}

	#[tokio::test]
	async fn test_validation_error_not_retried() {
		let server = MockServer::start().await;
		mount_login(&server, 1).await;
		Mock::given(method("POST"))
			.and(path("/orders/create/adhoc"))
			.respond_with(ResponseTemplate::new(400).set_body_json(json!({
				"message": "Oops! Invalid Data.",
				"errors": {"billing_pincode": ["The billing pincode must be 6 digits."]}
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let err = client
			.post::<_, Value>("/orders/create/adhoc", &json!({}), client.options())
			.await
			.unwrap_err();

		match err {
			ShipmentError::Validation { message, details } => {
				assert_eq!(message, "Oops! Invalid Data.");
				assert!(details.unwrap()["errors"]["billing_pincode"].is_array());
			}
			other => panic!("expected validation error, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_timeouts_retried_with_backoff() {
		let server = MockServer::start().await;
		mount_login(&server, 1).await;
		Mock::given(method("GET"))
			.and(path("/courier/track/shipment/7"))
			.respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
			.expect(3)
			.mount(&server)
			.await;

		let client = ShiprocketClient::builder(settings_for(&server))
			.with_timeout(Duration::from_millis(100))
			.with_retry_policy(RetryPolicy::new(Duration::from_millis(50)))
			.build()
			.unwrap();

		let started = Instant::now();
		let result: Result<Value> = client
			.get("/courier/track/shipment/7", client.options().with_retries(3))
			.await;
		let elapsed = started.elapsed();

		assert!(matches!(result, Err(ShipmentError::Timeout(_))));
		// Three timeouts plus 50ms and 100ms of backoff, no sleep after the last
		assert!(elapsed >= Duration::from_millis(450), "{:?}", elapsed);
		assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);
	}

	#[tokio::test]
	async fn test_connection_failures_retried() {
		// Accept and immediately drop every connection
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let accepted = Arc::new(AtomicUsize::new(0));
		let counter = accepted.clone();
		tokio::spawn(async move {
			while let Ok((socket, _)) = listener.accept().await {
				counter.fetch_add(1, Ordering::SeqCst);
				drop(socket);
			}
		});

		let settings = ShiprocketSettings {
			email: Some("ops@example.com".to_string()),
			password: Some("secret".to_string()),
			base_url: format!("http://{}", addr),
			..Default::default()
		};
		let client = ShiprocketClient::builder(settings)
			.with_retry_policy(RetryPolicy::new(Duration::from_millis(40)))
			.build()
			.unwrap();

		let started = Instant::now();
		let result: Result<Value> = client
			.get("/health", RequestOptions::get().without_auth().with_retries(3))
			.await;

		assert!(matches!(result, Err(ShipmentError::Network(_))));
		assert_eq!(accepted.load(Ordering::SeqCst), 3);
		// 40ms and 80ms of backoff between the three attempts
		assert!(started.elapsed() >= Duration::from_millis(120));
	}

	#[tokio::test]
	async fn test_failed_reauthentication_stops_request() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/auth/login"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/auth/login"))
			.respond_with(ResponseTemplate::new(403))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/courier/assign/awb"))
			.respond_with(ResponseTemplate::new(401))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		let result: Result<Value> = client
			.post("/courier/assign/awb", &json!({"shipment_id": 7702}), client.options())
			.await;

		assert!(matches!(result, Err(ShipmentError::Authentication(_))));
		assert!(!client.is_enabled());
	}

	#[tokio::test]
	async fn test_missing_credentials_disable_client() {
		let client = ShiprocketClient::new(ShiprocketSettings::default()).unwrap();
		assert!(!client.is_enabled());

		let result: Result<Value> = client.get("/anything", client.options()).await;
		assert!(matches!(result, Err(ShipmentError::Configuration(_))));
	}

	#[tokio::test]
	async fn test_failed_login_disables_client() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/auth/login"))
			.respond_with(ResponseTemplate::new(403))
			.expect(1)
			.mount(&server)
			.await;

		let client = ShiprocketClient::new(settings_for(&server)).unwrap();
		assert!(matches!(
			client.get_token().await,
			Err(ShipmentError::Authentication(_))
		));
		assert!(!client.is_enabled());

		// Sticky: no second login attempt
		assert!(matches!(
			client.get_token().await,
			Err(ShipmentError::Disabled)
		));
	}
}
