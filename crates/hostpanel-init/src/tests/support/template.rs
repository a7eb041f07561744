//! Minimal template engine substituting `{NAME}` placeholders.

use std::collections::BTreeMap;

use crate::pages::Template;

/// Template that renders blocks by plain placeholder substitution.
#[derive(Debug, Default)]
pub struct RecordingTemplate {
    blocks: BTreeMap<String, String>,
    vars: BTreeMap<String, String>,
}

impl RecordingTemplate {
    /// Blocks shaped like the reseller IP usage page.
    #[must_use]
    pub fn ip_usage() -> Self {
        Self::default()
            .with_block("domain_row", "{DOMAIN_NAME};")
            .with_block("ip_row", "{IP} ({RECORD_COUNT}): {DOMAIN_ROW}\n")
            .with_block("page", "{IP_ROW}")
    }

    /// Defines a block.
    #[must_use]
    pub fn with_block(mut self, name: &str, body: &str) -> Self {
        self.blocks.insert(name.to_owned(), body.to_owned());
        self
    }

    /// Current value of a variable, empty when unset.
    #[must_use]
    pub fn var(&self, name: &str) -> &str {
        self.vars.get(name).map_or("", String::as_str)
    }

    fn render(&self, block: &str) -> String {
        let body = self.blocks.get(block).cloned().unwrap_or_default();
        self.vars.iter().fold(body, |rendered, (name, value)| {
            rendered.replace(&format!("{{{name}}}"), value)
        })
    }
}

impl Template for RecordingTemplate {
    fn assign(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_owned(), value.to_owned());
    }

    fn parse(&mut self, target: &str, block: &str) {
        let rendered = self.render(block);
        self.vars.insert(target.to_owned(), rendered);
    }

    fn append(&mut self, target: &str, block: &str) {
        let rendered = self.render(block);
        self.vars.entry(target.to_owned()).or_default().push_str(&rendered);
    }
}
