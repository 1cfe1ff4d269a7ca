//! Application constants
//!
//! Centralized location for endpoint paths, storage names and defaults.

/// Default API server when no config or env override is present
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Credential exchange endpoint (form-encoded POST)
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Current-user endpoint (bearer GET)
pub const ME_PATH: &str = "/api/v1/auth/me";

/// Directory under the home directory holding config and the token slot
pub const CONFIG_DIR_NAME: &str = ".portal-auth";

/// File name of the persisted bearer token
pub const TOKEN_FILE_NAME: &str = "access_token";

/// Optional YAML config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Log file written by the terminal binary
pub const LOG_FILE_NAME: &str = "portal-auth.log";

/// Shown when a login fails without a server-provided detail
pub const GENERIC_LOGIN_FAILURE: &str = "Login failed";

/// Shown when the login form is submitted with an empty field
pub const MISSING_CREDENTIALS: &str = "Username and password are required";

/// Request deadline applied to every API call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application name
pub const APP_NAME: &str = "Portal Auth";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
