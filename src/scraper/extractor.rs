//! Release extraction from the installer database page
//!
//! The page lists installers in tables, one release per row, grouped under
//! headings such as "macOS Sequoia 15.2 BETA". Each row links to an
//! `InstallAssistant.pkg` and mentions the version and the build number:
//!
//! ```text
//! <h2>macOS Sequoia Full Installers</h2>
//! <table>
//!   <tr><td>macOS Sequoia 15.1 (24B83)</td><td><a href=".../InstallAssistant.pkg">Download</a></td></tr>
//! </table>
//! ```
//!
//! Rows that do not fit this shape are skipped one by one.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};
use tree_sitter::Node;

use crate::release::{Channel, Release, ReleaseKey};
use crate::scraper::error::ExtractError;
use crate::scraper::html::{
    CONTEXT_TAGS, attribute_value, classify_channel, count_cells, elements_in_order, is_element,
    locate_row, parse_html, tag_name, text_content,
};

/// Everything read from one page in a single parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Candidates in document order of first occurrence
    pub releases: Vec<Release>,
    /// Date following the "UPDATED:" marker, as written on the page
    pub page_updated: Option<String>,
}

/// Extractor for installer releases
pub struct ReleaseExtractor {
    /// Case-sensitive suffix of installer links (e.g. "InstallAssistant.pkg")
    link_suffix: String,
    /// Dotted version with 2 or 3 components: `15.1`, `15.2.1`
    version_re: Regex,
    /// Apple build number: `24B83`, `24C5057p`
    build_re: Regex,
    /// Page update marker: `UPDATED: 10/15/24`
    updated_re: Regex,
}

impl ReleaseExtractor {
    pub fn new(link_suffix: &str) -> Self {
        Self {
            link_suffix: link_suffix.to_string(),
            version_re: Regex::new(r"\d+\.\d+(?:\.\d+)?").unwrap(),
            build_re: Regex::new(r"\b([0-9]{2}[A-Z][0-9]{2,}[a-z]?)\b").unwrap(),
            updated_re: Regex::new(r"UPDATED:\s*(\d{1,2}/\d{1,2}/(?:\d{4}|\d{2}))\b").unwrap(),
        }
    }

    /// Extract candidate releases from the page markup
    pub fn extract(&self, markup: &str) -> Result<Vec<Release>, ExtractError> {
        Ok(self.extract_page(markup)?.releases)
    }

    /// Date of the last page update, if the page states one
    pub fn page_update_date(&self, markup: &str) -> Option<String> {
        let tree = parse_html(markup).ok()?;
        self.update_date(tree.root_node(), markup)
    }

    /// Extract releases and the page update date from one parse of the markup
    pub fn extract_page(&self, markup: &str) -> Result<ExtractedPage, ExtractError> {
        let tree = parse_html(markup)?;
        let root = tree.root_node();
        let elements = elements_in_order(root);

        let mut seen: HashSet<ReleaseKey> = HashSet::new();
        let mut releases = Vec::new();

        for (index, element) in elements.iter().enumerate() {
            let Some(download_url) = self.installer_link(*element, markup) else {
                continue;
            };

            let Some(release) =
                self.release_from_link(*element, &elements[..index], download_url, markup)
            else {
                continue;
            };

            if seen.insert(release.key()) {
                debug!(
                    "Found release: {} ({}) - {}",
                    release.version, release.build, release.channel
                );
                releases.push(release);
            }
        }

        info!("Extracted {} releases from page", releases.len());

        Ok(ExtractedPage {
            releases,
            page_updated: self.update_date(root, markup),
        })
    }

    /// Href of `element` if it is a link to an installer package
    fn installer_link(&self, element: Node, source: &str) -> Option<String> {
        if !is_element(element, source, "a") {
            return None;
        }

        attribute_value(element, source, "href")
            .filter(|href| !href.is_empty() && href.ends_with(&self.link_suffix))
    }

    /// Build a release from an installer link, or None if its row does not describe one
    fn release_from_link(
        &self,
        link: Node,
        preceding: &[Node],
        download_url: String,
        source: &str,
    ) -> Option<Release> {
        let channel = Self::channel_for(preceding, source);

        let Some(row) = locate_row(link, source) else {
            debug!("Link not inside a table row, skipping: {}", download_url);
            return None;
        };

        if count_cells(row, source) < 2 {
            debug!("Not enough cells in row, skipping: {}", download_url);
            return None;
        }

        let row_text = text_content(row, source);

        let Some(version) = self.version_re.find(&row_text) else {
            debug!("No version in row: {}", preview(&row_text));
            return None;
        };

        let Some(build) = self.build_re.captures(&row_text).and_then(|caps| caps.get(1)) else {
            debug!("No build in row: {}", preview(&row_text));
            return None;
        };

        Some(Release {
            version: version.as_str().to_string(),
            build: build.as_str().to_string(),
            channel,
            date_published: String::new(),
            download_url,
        })
    }

    /// Channel from the nearest preceding heading, paragraph or strong block with text
    fn channel_for(preceding: &[Node], source: &str) -> Channel {
        let blocks = preceding
            .iter()
            .rev()
            .filter(|element| {
                tag_name(**element, source)
                    .is_some_and(|tag| CONTEXT_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)))
            })
            .map(|element| text_content(*element, source));

        classify_channel(blocks)
    }

    fn update_date(&self, root: Node, source: &str) -> Option<String> {
        let text = text_content(root, source);
        self.updated_re
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// First 50 characters of a row, for log messages
fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
