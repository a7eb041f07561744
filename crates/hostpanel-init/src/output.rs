//! Compressed response output.

use std::io::{self, Write as _};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Compression level used for rendered pages.
pub const DEFAULT_LEVEL: u32 = 6;

/// Response body after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredBody {
    /// Bytes to send.
    pub bytes: Vec<u8>,
    /// `Content-Encoding` header value, when the body was compressed.
    pub content_encoding: Option<&'static str>,
}

/// Gzip filter applied to rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipFilter {
    level: u32,
    show_statistics: bool,
}

impl Default for GzipFilter {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl GzipFilter {
    /// Filter compressing at `level` (clamped to 0..=9), with statistics.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
            show_statistics: true,
        }
    }

    /// Enables or disables the statistics comment.
    #[must_use]
    pub const fn with_statistics(mut self, show_statistics: bool) -> Self {
        self.show_statistics = show_statistics;
        self
    }

    /// Compression level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Returns `true` when the statistics comment is appended.
    #[must_use]
    pub const fn shows_statistics(&self) -> bool {
        self.show_statistics
    }

    /// Compresses `body` when the client accepts gzip.
    ///
    /// With statistics enabled, an HTML comment reporting the original and
    /// compressed sizes is appended before the final compression.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the encoder fails.
    pub fn apply(&self, body: &[u8], accept_encoding: Option<&str>) -> io::Result<FilteredBody> {
        if !accept_encoding.is_some_and(accepts_gzip) {
            return Ok(FilteredBody {
                bytes: body.to_vec(),
                content_encoding: None,
            });
        }
        let bytes = if self.show_statistics {
            let compressed_size = self.compress(body)?.len();
            let mut annotated = body.to_vec();
            annotated.extend_from_slice(
                format!(
                    "\n<!--\n\tCompression level: {}\n\tOriginal size: {} bytes\n\tCompressed size: {} bytes\n-->\n",
                    self.level,
                    body.len(),
                    compressed_size
                )
                .as_bytes(),
            );
            self.compress(&annotated)?
        } else {
            self.compress(body)?
        };
        Ok(FilteredBody {
            bytes,
            content_encoding: Some("gzip"),
        })
    }

    fn compress(&self, body: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(body)?;
        encoder.finish()
    }
}

/// Returns `true` when an `Accept-Encoding` header admits gzip.
fn accepts_gzip(header: &str) -> bool {
    header.split(',').any(|coding| {
        let mut fields = coding.split(';').map(str::trim);
        let name = fields.next().unwrap_or_default();
        let refused = fields.any(|field| {
            field
                .strip_prefix("q=")
                .is_some_and(|quality| quality.trim_end_matches(['0', '.']).is_empty())
        });
        (name.eq_ignore_ascii_case("gzip") || name.eq_ignore_ascii_case("x-gzip")) && !refused
    })
}
