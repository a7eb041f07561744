//! Request contexts and the ordered step tables they select.

use std::fmt;

/// Header value browsers send on script-initiated requests.
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Kind of request being bootstrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Full page request from a browser.
    Normal,
    /// Script-initiated browser request expecting a fragment or data.
    Ajax,
    /// Command-line invocation.
    Cli,
}

impl Context {
    /// Selects the context for an incoming request.
    ///
    /// Command-line runs are always [`Context::Cli`]; a browser request is
    /// [`Context::Ajax`] when it carries `X-Requested-With: XMLHttpRequest`.
    #[must_use]
    pub fn detect(request: &RequestEnvironment) -> Self {
        if request.is_cli() {
            return Self::Cli;
        }
        match request.requested_with() {
            Some(value) if value.eq_ignore_ascii_case(XML_HTTP_REQUEST) => Self::Ajax,
            _ => Self::Normal,
        }
    }

    /// Steps run for this context, in execution order.
    #[must_use]
    pub const fn steps(self) -> &'static [Step] {
        match self {
            Self::Normal => NORMAL_STEPS,
            Self::Ajax => AJAX_STEPS,
            Self::Cli => CLI_STEPS,
        }
    }

    /// Returns `true` for browser requests.
    #[must_use]
    pub const fn is_http(self) -> bool {
        !matches!(self, Self::Cli)
    }

    /// Lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Ajax => "ajax",
            Self::Cli => "cli",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One initialization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Error visibility from the debug flag.
    DisplayErrors,
    /// Session directory check and session start.
    Session,
    /// Key material, password decryption and connection.
    Database,
    /// Database configuration overlay.
    LoadConfig,
    /// Internal string encoding.
    Encoding,
    /// Default response charset.
    Charset,
    /// Default timezone.
    Timezone,
    /// Language and theme of the logged-in user.
    UserGuiProperties,
    /// Locale resolution and message catalog.
    Localization,
    /// Layout colour listener.
    Layout,
    /// Navigation listener.
    Navigation,
    /// Compressed output filter.
    OutputBuffering,
    /// Database update check listener.
    DatabaseUpdateCheck,
    /// Plugin discovery and loading.
    Plugins,
}

impl Step {
    /// Lowercase label used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisplayErrors => "display_errors",
            Self::Session => "session",
            Self::Database => "database",
            Self::LoadConfig => "load_config",
            Self::Encoding => "encoding",
            Self::Charset => "charset",
            Self::Timezone => "timezone",
            Self::UserGuiProperties => "user_gui_properties",
            Self::Localization => "localization",
            Self::Layout => "layout",
            Self::Navigation => "navigation",
            Self::OutputBuffering => "output_buffering",
            Self::DatabaseUpdateCheck => "database_update_check",
            Self::Plugins => "plugins",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

const NORMAL_STEPS: &[Step] = &[
    Step::DisplayErrors,
    Step::Session,
    Step::Database,
    Step::LoadConfig,
    Step::Encoding,
    Step::Charset,
    Step::Timezone,
    Step::UserGuiProperties,
    Step::Localization,
    Step::Layout,
    Step::Navigation,
    Step::OutputBuffering,
    Step::DatabaseUpdateCheck,
    Step::Plugins,
];

const AJAX_STEPS: &[Step] = &[
    Step::DisplayErrors,
    Step::Session,
    Step::Database,
    Step::LoadConfig,
    Step::Encoding,
    Step::Charset,
    Step::Timezone,
    Step::UserGuiProperties,
    Step::Localization,
    Step::Plugins,
];

const CLI_STEPS: &[Step] = &[
    Step::Database,
    Step::LoadConfig,
    Step::Encoding,
    Step::Charset,
    Step::Timezone,
    Step::Localization,
];

/// What the initializer needs to know about the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestEnvironment {
    cli: bool,
    requested_with: Option<String>,
    session_cookie: Option<String>,
    accept_language: Option<String>,
    accept_encoding: Option<String>,
}

impl RequestEnvironment {
    /// Environment of a browser request without any headers.
    #[must_use]
    pub fn http() -> Self {
        Self::default()
    }

    /// Environment of a command-line invocation.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            cli: true,
            ..Self::default()
        }
    }

    /// Sets the `X-Requested-With` header value.
    #[must_use]
    pub fn with_requested_with(mut self, value: impl Into<String>) -> Self {
        self.requested_with = Some(value.into());
        self
    }

    /// Sets the session cookie value presented by the client.
    #[must_use]
    pub fn with_session_cookie(mut self, value: impl Into<String>) -> Self {
        self.session_cookie = Some(value.into());
        self
    }

    /// Sets the `Accept-Language` header value.
    #[must_use]
    pub fn with_accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    /// Sets the `Accept-Encoding` header value.
    #[must_use]
    pub fn with_accept_encoding(mut self, value: impl Into<String>) -> Self {
        self.accept_encoding = Some(value.into());
        self
    }

    /// Returns `true` for command-line invocations.
    #[must_use]
    pub const fn is_cli(&self) -> bool {
        self.cli
    }

    /// `X-Requested-With` header value.
    #[must_use]
    pub fn requested_with(&self) -> Option<&str> {
        self.requested_with.as_deref()
    }

    /// Session cookie value.
    #[must_use]
    pub fn session_cookie(&self) -> Option<&str> {
        self.session_cookie.as_deref()
    }

    /// `Accept-Language` header value.
    #[must_use]
    pub fn accept_language(&self) -> Option<&str> {
        self.accept_language.as_deref()
    }

    /// `Accept-Encoding` header value.
    #[must_use]
    pub fn accept_encoding(&self) -> Option<&str> {
        self.accept_encoding.as_deref()
    }
}
