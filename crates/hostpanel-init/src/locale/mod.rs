//! Locale resolution.
//!
//! Resolution never fails: every path that cannot produce a usable locale
//! ends at [`FALLBACK_LOCALE`]. A locale is only usable when its message
//! catalog is installed, which callers express through the `has_catalog`
//! predicate so the rules stay independent of the filesystem.

mod catalog;

use std::fmt;

use hostpanel_config::FALLBACK_LOCALE;
use tracing::debug;

use crate::context::Context;

pub use catalog::{Catalog, CatalogCache, CatalogError, Translator, load_translator};

const LOCALE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::locale");

/// Language setting asking for browser negotiation.
pub const AUTO: &str = "auto";

/// Validated `xx` or `xx_YY` locale code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(String);

impl Locale {
    /// Parses and normalises a locale code.
    ///
    /// The language part is two or three ASCII letters and is lower-cased;
    /// the optional region is two ASCII letters, upper-cased, separated by
    /// `_` or `-`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut parts = raw.split(['_', '-']);
        let language = parts.next()?;
        let region = parts.next();
        if parts.next().is_some() || !is_letters(language, 2..=3) {
            return None;
        }
        let mut code = language.to_ascii_lowercase();
        if let Some(region) = region {
            if !is_letters(region, 2..=2) {
                return None;
            }
            code.push('_');
            code.push_str(&region.to_ascii_uppercase());
        }
        Some(Self(code))
    }

    /// The fallback locale.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_LOCALE.to_owned())
    }

    /// Locale code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language part without the region.
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

fn is_letters(part: &str, lengths: std::ops::RangeInclusive<usize>) -> bool {
    lengths.contains(&part.len()) && part.bytes().all(|byte| byte.is_ascii_alphabetic())
}

/// Languages accepted by the browser, best first.
///
/// Entries are ordered by descending quality; equal qualities keep header
/// order. A regional entry such as `fr-CA` is followed by its bare language
/// at the same quality. Wildcards, malformed tags and `q=0` are dropped.
#[must_use]
pub fn negotiate(accept_language: &str) -> Vec<Locale> {
    let mut ranked: Vec<(u16, Locale)> = Vec::new();
    for item in accept_language.split(',') {
        let mut fields = item.split(';');
        let Some(locale) = fields.next().and_then(Locale::parse) else {
            continue;
        };
        let quality = fields
            .find_map(|field| field.trim().strip_prefix("q="))
            .map_or(Some(1000), parse_quality);
        let Some(quality) = quality.filter(|quality| *quality > 0) else {
            continue;
        };
        let bare = Locale(locale.language().to_owned());
        let has_region = bare != locale;
        push_unique(&mut ranked, quality, locale);
        if has_region {
            push_unique(&mut ranked, quality, bare);
        }
    }
    ranked.sort_by(|left, right| right.0.cmp(&left.0));
    ranked.into_iter().map(|(_, locale)| locale).collect()
}

fn push_unique(ranked: &mut Vec<(u16, Locale)>, quality: u16, locale: Locale) {
    if !ranked.iter().any(|(_, known)| *known == locale) {
        ranked.push((quality, locale));
    }
}

/// Parses a quality value into thousandths.
fn parse_quality(raw: &str) -> Option<u16> {
    let (whole, fraction) = raw.trim().split_once('.').unwrap_or((raw.trim(), ""));
    if fraction.len() > 3 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let whole: u16 = match whole {
        "0" => 0,
        "1" => 1000,
        _ => return None,
    };
    let thousandths: u16 = format!("{fraction:0<3}").parse().ok()?;
    let quality = whole.saturating_add(thousandths);
    (quality <= 1000).then_some(quality)
}

/// Inputs to locale resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleRequest<'a> {
    /// Language stored in the session.
    pub session_lang: Option<&'a str>,
    /// Configured `user_initial_lang`.
    pub initial_lang: Option<&'a str>,
    /// `Accept-Language` header.
    pub accept_language: Option<&'a str>,
}

/// Resolves the locale for a request.
///
/// Command-line runs always use the fallback. Otherwise a session language,
/// even an empty one, wins over the configured initial language, and `auto`
/// (the default) negotiates with the browser. The chosen locale must have a
/// catalog; anything else resolves to the fallback.
#[must_use]
pub fn resolve(
    context: Context,
    request: LocaleRequest<'_>,
    has_catalog: impl Fn(&Locale) -> bool,
) -> Locale {
    if context == Context::Cli {
        return Locale::fallback();
    }
    let lang = request
        .session_lang
        .or(request.initial_lang)
        .map_or(AUTO, str::trim);

    let resolved = if lang.eq_ignore_ascii_case(AUTO) {
        request
            .accept_language
            .map(negotiate)
            .unwrap_or_default()
            .into_iter()
            .find(|locale| has_catalog(locale))
    } else {
        Locale::parse(lang).filter(|locale| has_catalog(locale))
    };

    resolved.unwrap_or_else(|| {
        debug!(
            target: LOCALE_TARGET,
            requested = lang,
            "no usable catalog; using the fallback locale"
        );
        Locale::fallback()
    })
}
