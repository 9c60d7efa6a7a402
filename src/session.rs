//! Authenticated session against the Argus web service.
//!
//! A [`Session`] owns the transport, the credentials and the current access
//! token. Every collection borrows the session and routes its requests through
//! `Session::execute`, which enforces the authentication gate and maps HTTP
//! status codes onto [`Error`] variants.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::transport::{HttpTransport, Request, Response, Transport};

/// Username and password used by [`Session::login`].
///
/// The password is write-once and never printed.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials for `username`.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair returned by the login endpoint.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// An authenticated context for talking to the web service.
///
/// A session starts out unauthenticated. [`login`](Session::login) stores an
/// access token; [`logout`](Session::logout) or a `401` from the service
/// clears it again. The session never renews a token on its own.
///
/// # Example
///
/// ```ignore
/// use argus_client::{ClientConfig, Credentials, Session};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::new("http://localhost:8080/argusws");
///     let session = Session::new(&config, Credentials::new("user", "secret"))?;
///     session.login().await?;
///
///     for dashboard in session.dashboards().values().await? {
///         println!("{:?}: {}", dashboard.id, dashboard.name);
///     }
///
///     session.logout().await?;
///     Ok(())
/// }
/// ```
pub struct Session<T: Transport = HttpTransport> {
    transport: T,
    credentials: Option<Credentials>,
    login_path: String,
    logout_path: String,
    token: RwLock<Option<String>>,
}

impl Session<HttpTransport> {
    /// Create an unauthenticated session using the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured endpoint is invalid.
    pub fn new(config: &ClientConfig, credentials: Credentials) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(transport, credentials)
            .with_auth_paths(config.login_path.clone(), config.logout_path.clone()))
    }
}

impl<T: Transport> Session<T> {
    /// Create an unauthenticated session over a custom transport.
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        let defaults = ClientConfig::new("");
        Self {
            transport,
            credentials: Some(credentials),
            login_path: defaults.login_path,
            logout_path: defaults.logout_path,
            token: RwLock::new(None),
        }
    }

    /// Create a session that is already authenticated with a token obtained
    /// out of band, e.g. from a separate token service.
    ///
    /// Such a session has no credentials, so [`login`](Session::login) fails
    /// once the token is gone.
    pub fn with_access_token(transport: T, token: impl Into<String>) -> Self {
        let defaults = ClientConfig::new("");
        Self {
            transport,
            credentials: None,
            login_path: defaults.login_path,
            logout_path: defaults.logout_path,
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Overrides the login and logout paths.
    #[must_use]
    pub fn with_auth_paths(mut self, login: impl Into<String>, logout: impl Into<String>) -> Self {
        self.login_path = login.into();
        self.logout_path = logout.into();
        self
    }

    /// The user this session logs in as, if it was built with credentials.
    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::username)
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the session currently holds an access token.
    pub fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }

    /// Log in with the session's credentials.
    ///
    /// Replaces any token already held.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if the service rejects the credentials or
    ///   the session has none; the session is unauthenticated afterwards.
    /// - A transport error if the service cannot be reached.
    pub async fn login(&self) -> Result<()> {
        let Some(credentials) = &self.credentials else {
            self.set_token(None);
            return Err(Error::Authentication {
                message: "session has no credentials to log in with".to_string(),
            });
        };

        let request = Request::new(Method::POST, self.login_path.clone()).with_body(json!({
            "username": credentials.username,
            "password": credentials.password,
        }));
        tracing::debug!(path = %request.path, user = %credentials.username, "logging in");

        let response = self.transport.send(request).await?;
        if matches!(response.status, 401 | 403) {
            self.set_token(None);
            return Err(Error::Authentication {
                message: response.message(),
            });
        }

        let body = check_response(&self.login_path, response)?
            .ok_or_else(|| Error::Protocol("login returned an empty body".to_string()))?;
        let tokens: LoginResponse = serde_json::from_value(body)?;
        let token = tokens
            .access_token
            .ok_or_else(|| Error::Protocol("login response has no accessToken".to_string()))?;

        self.set_token(Some(token));
        tracing::info!(user = %credentials.username, "logged in");
        Ok(())
    }

    /// Log out and drop the access token.
    ///
    /// Does nothing on an unauthenticated session. The local token is cleared
    /// even if the logout request itself fails.
    ///
    /// # Errors
    ///
    /// Returns the transport or service error of the logout request.
    pub async fn logout(&self) -> Result<()> {
        let Some(token) = self.take_token() else {
            return Ok(());
        };

        let mut request = Request::new(Method::GET, self.logout_path.clone());
        request.token = Some(token);

        let response = self.transport.send(request).await?;
        // An already expired token is as good as logged out.
        if response.status != 401 {
            check_response(&self.logout_path, response)?;
        }
        tracing::info!(user = self.username().unwrap_or_default(), "logged out");
        Ok(())
    }

    /// Fail with [`Error::NotAuthenticated`] unless a token is held.
    pub(crate) fn ensure_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    /// Send an authenticated request and return the decoded body.
    ///
    /// Fails with [`Error::NotAuthenticated`] before touching the transport
    /// when no token is held. A `401` from the service clears the token.
    pub(crate) async fn execute(&self, mut request: Request) -> Result<Option<Value>> {
        let token = self.current_token().ok_or(Error::NotAuthenticated)?;
        request.token = Some(token);

        let path = request.path.clone();
        tracing::debug!(
            method = %request.method,
            path = %path,
            params = ?request.query,
            body_len = request.body.as_ref().map_or(0, |b| b.to_string().len()),
            "sending request"
        );

        let response = self.transport.send(request).await?;
        if response.status == 401 {
            tracing::warn!(path = %path, "access token rejected, session invalidated");
            self.set_token(None);
            return Err(Error::NotAuthenticated);
        }

        check_response(&path, response)
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_token(&self) -> Option<String> {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// Map a response status onto the crate's error kinds.
fn check_response(path: &str, response: Response) -> Result<Option<Value>> {
    match response.status {
        200..=299 => {
            // Some endpoints report failures inside a 200 body.
            if let Some(Value::Object(map)) = &response.body {
                if let Some(status) = map.get("status").and_then(Value::as_u64) {
                    if status != 200 {
                        return Err(Error::Service {
                            status: u16::try_from(status).unwrap_or(u16::MAX),
                            message: response.message(),
                        });
                    }
                }
            }
            Ok(response.body)
        }
        404 => Err(Error::NotFound {
            path: path.to_string(),
            message: response.message(),
        }),
        400 | 409 | 422 => Err(Error::Validation {
            message: response.message(),
        }),
        status => Err(Error::Service {
            status,
            message: response.message(),
        }),
    }
}
