//! Greedy, order-preserving packing of cleaned pages into size-bounded
//! text files.
//!
//! Each page becomes one section:
//!
//! ```text
//! ## <title>
//! Source: <url>
//!
//! <text>
//!
//! ---
//!
//! ```
//!
//! Sections are appended to the current file until the next one would push
//! it past the byte cap, at which point the file is closed and a new one
//! started. A page whose section alone exceeds the cap is first split on line
//! boundaries (then char boundaries) into `(part i/n)` sections, so every
//! file is within the cap.

use sha2::{Digest, Sha256};

use crate::types::ScrapedPage;

/// 300 KiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 300 * 1024;

/// Smallest cap the packer accepts; headers alone need some room.
pub const MIN_FILE_BYTES: usize = 1024;

/// Header pieces are capped in bytes so a section header always fits in
/// [`MIN_FILE_BYTES`] with room left for text.
const MAX_TITLE_BYTES: usize = 200;
const MAX_HEADER_URL_BYTES: usize = 400;
/// Widest part label we reserve room for when splitting a page.
const PART_LABEL_RESERVE: &str = " (part 99999/99999)";

#[derive(Debug, Clone, Copy)]
pub struct ContentPacker {
    max_file_bytes: usize,
}

/// One file's content before sequence numbers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub content: String,
    /// Distinct source URLs in the order their sections appear.
    pub source_urls: Vec<String>,
}

/// The result of packing, independent of persisted sequence state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackPlan {
    files: Vec<PlannedFile>,
}

/// A finished file ready for upload and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFile {
    pub sequence_number: i32,
    pub file_name: String,
    pub content: String,
    pub byte_size: usize,
    pub content_sha256: String,
    pub source_urls: Vec<String>,
}

impl Default for ContentPacker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl ContentPacker {
    /// Caps below [`MIN_FILE_BYTES`] are raised to it.
    #[must_use]
    pub fn new(max_file_bytes: usize) -> Self {
        Self {
            max_file_bytes: max_file_bytes.max(MIN_FILE_BYTES),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Self {
        Self::new(config.knowledge_max_file_bytes)
    }

    #[must_use]
    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Pack `pages` in order. Pages with empty text are skipped.
    #[must_use]
    pub fn plan(&self, pages: &[ScrapedPage]) -> PackPlan {
        let cap = self.max_file_bytes;
        let mut files = Vec::new();
        let mut current = PlannedFile {
            content: String::new(),
            source_urls: Vec::new(),
        };

        for page in pages {
            let text = page.extracted_text.trim();
            if text.is_empty() {
                continue;
            }
            for section in self.sections_for(page, text) {
                if !current.content.is_empty() && current.content.len() + section.len() > cap {
                    files.push(std::mem::replace(
                        &mut current,
                        PlannedFile {
                            content: String::new(),
                            source_urls: Vec::new(),
                        },
                    ));
                }
                current.content.push_str(&section);
                if current.source_urls.last() != Some(&page.url) {
                    current.source_urls.push(page.url.clone());
                }
            }
        }

        if !current.content.is_empty() {
            files.push(current);
        }
        PackPlan { files }
    }

    /// Pack and number in one step.
    #[must_use]
    pub fn pack(
        &self,
        pages: &[ScrapedPage],
        business_name: &str,
        first_sequence: i32,
    ) -> Vec<PackedFile> {
        self.plan(pages).into_files(business_name, first_sequence)
    }

    fn sections_for(&self, page: &ScrapedPage, text: &str) -> Vec<String> {
        let title = display_title(page);
        let url = display_url(&page.url);

        let whole = format_section(&title, &url, text);
        if whole.len() <= self.max_file_bytes {
            return vec![whole];
        }

        let reserved = format_section(&format!("{title}{PART_LABEL_RESERVE}"), &url, "").len();
        let budget = self.max_file_bytes.saturating_sub(reserved).max(1);
        let chunks = split_to_budget(text, budget);
        let total = chunks.len();
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let part_title = format!("{title} (part {}/{total})", i + 1);
                format_section(&part_title, &url, chunk.trim_end_matches('\n'))
            })
            .collect()
    }
}

impl PackPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }

    /// Assign consecutive sequence numbers starting at `first_sequence` and
    /// name each file `<business-slug>-knowledge-<NNN>.txt`.
    #[must_use]
    pub fn into_files(self, business_name: &str, first_sequence: i32) -> Vec<PackedFile> {
        let slug = business_slug(business_name);
        self.files
            .into_iter()
            .zip(first_sequence..)
            .map(|(file, sequence_number)| PackedFile {
                sequence_number,
                file_name: format!("{slug}-knowledge-{sequence_number:03}.txt"),
                byte_size: file.content.len(),
                content_sha256: format!("{:x}", Sha256::digest(file.content.as_bytes())),
                content: file.content,
                source_urls: file.source_urls,
            })
            .collect()
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to a
/// single `-`. Falls back to `business` when nothing is left.
#[must_use]
pub fn business_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(60).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "business".to_owned()
    } else {
        slug.to_owned()
    }
}

fn format_section(title: &str, url: &str, text: &str) -> String {
    format!("## {title}\nSource: {url}\n\n{text}\n\n---\n\n")
}

fn display_title(page: &ScrapedPage) -> String {
    let title = page.title.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = if title.is_empty() {
        page.url.clone()
    } else {
        title
    };
    truncate_bytes(&title, MAX_TITLE_BYTES).to_owned()
}

fn display_url(url: &str) -> String {
    truncate_bytes(url, MAX_HEADER_URL_BYTES).to_owned()
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split `text` into chunks of at most `budget` bytes, preferring line
/// boundaries and never splitting inside a UTF-8 char.
fn split_to_budget(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if line.len() > budget {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            for ch in line.chars() {
                if current.len() + ch.len_utf8() > budget && !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                current.push(ch);
            }
            continue;
        }
        if current.len() + line.len() > budget {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
