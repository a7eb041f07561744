//! Per-request response defaults.

use chrono_tz::Tz;
use hostpanel_config::FALLBACK_TIMEZONE;
use tracing::warn;

const RESPONSE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::response");

/// Encoding used for strings and responses.
pub const UTF_8: &str = "UTF-8";

/// Whether error details reach the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorDisplay {
    /// Errors are rendered in responses.
    Shown,
    /// Errors are only logged.
    #[default]
    Hidden,
}

impl ErrorDisplay {
    /// Display mode for the given debug flag.
    #[must_use]
    pub const fn for_debug(debug: bool) -> Self {
        if debug { Self::Shown } else { Self::Hidden }
    }
}

/// Encoding, charset and timezone applied to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDefaults {
    internal_encoding: Option<&'static str>,
    charset: Option<&'static str>,
    timezone: Tz,
}

impl Default for ResponseDefaults {
    fn default() -> Self {
        Self {
            internal_encoding: None,
            charset: None,
            timezone: Tz::UTC,
        }
    }
}

impl ResponseDefaults {
    /// Internal string encoding, once set.
    #[must_use]
    pub const fn internal_encoding(&self) -> Option<&'static str> {
        self.internal_encoding
    }

    /// Default response charset, once set.
    #[must_use]
    pub const fn charset(&self) -> Option<&'static str> {
        self.charset
    }

    /// Effective timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub(crate) const fn set_internal_encoding(&mut self, encoding: &'static str) {
        self.internal_encoding = Some(encoding);
    }

    pub(crate) const fn set_charset(&mut self, charset: &'static str) {
        self.charset = Some(charset);
    }

    pub(crate) const fn set_timezone(&mut self, timezone: Tz) {
        self.timezone = timezone;
    }
}

/// Parses the configured timezone, falling back to UTC.
///
/// An empty setting silently selects UTC; an unknown identifier selects UTC
/// and logs a warning.
#[must_use]
pub fn resolve_timezone(configured: Option<&str>) -> Tz {
    let name = configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_TIMEZONE);
    name.parse::<Tz>().unwrap_or_else(|error| {
        warn!(
            target: RESPONSE_TARGET,
            timezone = name,
            %error,
            "invalid timezone; using UTC"
        );
        Tz::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Europe/Paris"), Tz::Europe__Paris)]
    #[case(Some(" America/New_York "), Tz::America__New_York)]
    #[case(Some("Mars/Olympus_Mons"), Tz::UTC)]
    #[case(Some(""), Tz::UTC)]
    #[case(None, Tz::UTC)]
    fn timezone_never_fails(#[case] configured: Option<&str>, #[case] expected: Tz) {
        assert_eq!(resolve_timezone(configured), expected);
    }

    #[test]
    fn debug_shows_errors() {
        assert_eq!(ErrorDisplay::for_debug(true), ErrorDisplay::Shown);
        assert_eq!(ErrorDisplay::for_debug(false), ErrorDisplay::Hidden);
    }
}
