//! Progressive-disclosure synthesis.
//!
//! Each detail level adds to the one below it: `summary` is a preview,
//! `pattern` adds key points, `example` adds trimmed code blocks and
//! `full-context` is the complete document. Gap-fill splices are appended
//! after the primary drafts and never rewrite them.

use crate::config::SynthesisConfig;
use crate::document::{Document, ExternalResult};
use crate::response::DetailLevel;
use crate::text;

/// Lines scanned for key points.
const KEY_POINT_SCAN_LINES: usize = 20;

const KEY_POINT_LABELS: &[&str] = &["Problem:", "Solution:", "Key Points:"];

/// Content fetched by a gap-filling call.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    /// Collaborator that supplied it.
    pub source_name: String,
    /// Gap terms the call asked about.
    pub terms: Vec<String>,
    /// Rendered content.
    pub content: String,
    /// Match quality against the gap terms.
    pub quality: f32,
}

/// A rendered draft attributed to one collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSection {
    /// Collaborator name.
    pub source_name: String,
    /// Rendered body.
    pub body: String,
}

impl DraftSection {
    /// Creates a section.
    #[must_use]
    pub fn new(source_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            body: body.into(),
        }
    }
}

/// Renders drafts for a detail level.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesisConfig,
}

impl Synthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Renders up to the level's document limit, in store order.
    #[must_use]
    pub fn render_documents(&self, documents: &[Document], level: DetailLevel) -> String {
        documents
            .iter()
            .take(level.document_limit())
            .map(|doc| self.render_document(doc, level))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Renders one document.
    #[must_use]
    pub fn render_document(&self, doc: &Document, level: DetailLevel) -> String {
        let mut out = format!("## {}", doc.title);
        if level == DetailLevel::FullContext {
            out.push('\n');
            out.push_str(doc.content.trim());
            return out;
        }

        let preview = self.preview(&doc.content);
        if !preview.is_empty() {
            out.push('\n');
            out.push_str(&preview);
        }

        if level >= DetailLevel::Pattern {
            let points = self.key_points(&doc.content);
            if !points.is_empty() {
                out.push_str("\n\nKey points:");
                for point in points {
                    out.push('\n');
                    out.push_str(&point);
                }
            }
        }

        if level >= DetailLevel::Example {
            for block in self.code_examples(&doc.content) {
                out.push_str("\n\n```swift\n");
                out.push_str(&block);
                out.push_str("\n```");
            }
        }
        out
    }

    /// Renders an external answer with its citations.
    #[must_use]
    pub fn render_external(&self, result: &ExternalResult, level: DetailLevel) -> String {
        let mut out = if level == DetailLevel::Summary {
            self.preview(&result.content)
        } else {
            result.content.trim().to_string()
        };
        if !result.citations.is_empty() {
            out.push_str("\n\nSources:");
            for citation in &result.citations {
                out.push_str(&format!("\n- {} ({})", citation.title, citation.url));
            }
        }
        out
    }

    /// First prose paragraph, without code or heading markers, cut at
    /// `preview_chars`.
    #[must_use]
    pub fn preview(&self, content: &str) -> String {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut in_code = false;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code {
                continue;
            }
            let text = trimmed.trim_start_matches('#').trim();
            if text.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join(" "));
                    current.clear();
                }
            } else {
                current.push(text);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
        }

        let Some(first) = paragraphs.into_iter().next() else {
            return String::new();
        };
        if first.chars().count() > self.config.preview_chars {
            let mut cut: String = first.chars().take(self.config.preview_chars).collect();
            cut.push_str("...");
            cut
        } else {
            first
        }
    }

    /// List items and labelled lines from the start of the content.
    #[must_use]
    pub fn key_points(&self, content: &str) -> Vec<String> {
        let mut points = Vec::new();
        let mut in_code = false;

        for line in content.lines().take(KEY_POINT_SCAN_LINES) {
            let line = line.trim();
            if line.starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code {
                continue;
            }
            if is_list_item(line) {
                points.push(text::truncate_chars(line, self.config.key_point_chars));
            } else if KEY_POINT_LABELS.iter().any(|label| line.starts_with(label)) {
                points.push(line.to_string());
            }
            if points.len() == self.config.max_key_points {
                break;
            }
        }
        points
    }

    /// Fenced code blocks, long ones cut to their first lines.
    #[must_use]
    pub fn code_examples(&self, content: &str) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut current: Option<Vec<&str>> = None;

        for line in content.lines() {
            if line.trim_start().starts_with("```") {
                match current.take() {
                    Some(lines) => blocks.push(lines.join("\n")),
                    None => current = Some(Vec::new()),
                }
                continue;
            }
            if let Some(lines) = current.as_mut() {
                lines.push(line);
            }
        }

        blocks
            .into_iter()
            .filter(|b| !b.trim().is_empty())
            .take(self.config.max_code_examples)
            .map(|block| {
                if block.chars().count() > self.config.code_block_chars {
                    let head: Vec<&str> = block.lines().take(self.config.code_block_lines).collect();
                    format!("{}\n...", head.join("\n"))
                } else {
                    block
                }
            })
            .collect()
    }

    /// Joins drafts and appends splices.
    #[must_use]
    pub fn compose(&self, sections: &[DraftSection], splices: &[Splice]) -> String {
        let mut parts: Vec<String> = sections
            .iter()
            .filter(|s| !s.body.trim().is_empty())
            .map(|s| format!("### From {}\n{}", s.source_name, s.body.trim()))
            .collect();

        for splice in splices.iter().filter(|s| !s.content.trim().is_empty()) {
            parts.push(format!(
                "### Gap fill from {} ({})\n{}",
                splice.source_name,
                splice.terms.join(", "),
                splice.content.trim()
            ));
        }
        parts.join("\n\n")
    }
}

fn is_list_item(line: &str) -> bool {
    if line.starts_with("- ") || line.starts_with("* ") || line.starts_with('•') {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Citation;

    const DOC: &str = "# Sharing state\n\
        Use @Shared to keep one source of truth across features.\n\
        \n\
        Problem: two features mutate the same value.\n\
        Solution: share it.\n\
        1. Declare the shared key\n\
        2. Read it in each reducer\n\
        - Never copy shared values into local state because the copies drift apart from the source of truth over time\n\
        \n\
        ```swift\n\
        @Shared(.appStorage(\"count\")) var count = 0\n\
        ```\n";

    fn synth() -> Synthesizer {
        Synthesizer::new(SynthesisConfig::default())
    }

    #[test]
    fn test_preview_skips_headings_and_code() {
        let preview = synth().preview("```swift\nlet x = 1\n```\n## Title\nFirst line\nsecond line\n\nLater.");
        assert_eq!(preview, "Title First line second line");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(60);
        let preview = synth().preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 153);
    }

    #[test]
    fn test_key_points_limited_and_truncated() {
        let points = synth().key_points(DOC);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], "Problem: two features mutate the same value.");
        assert_eq!(points[2], "1. Declare the shared key");
        assert!(points[4].ends_with("..."));
        assert_eq!(points[4].chars().count(), 80);
    }

    #[test]
    fn test_code_examples_trim_long_blocks() {
        let long_block = (0..12).map(|i| format!("let value{i} = {i} // padding text")).collect::<Vec<_>>().join("\n");
        let content = format!("```swift\n{long_block}\n```\n\n```\nshort()\n```");
        let blocks = synth().code_examples(&content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines().count(), 4);
        assert!(blocks[0].ends_with("\n..."));
        assert_eq!(blocks[1], "short()");
    }

    #[test]
    fn test_levels_are_progressive() {
        let doc = Document::new("d", "Sharing state", DOC, "tca");
        let s = synth();
        let summary = s.render_document(&doc, DetailLevel::Summary);
        let pattern = s.render_document(&doc, DetailLevel::Pattern);
        let example = s.render_document(&doc, DetailLevel::Example);
        let full = s.render_document(&doc, DetailLevel::FullContext);

        assert!(!summary.contains("Key points"));
        assert!(pattern.starts_with(&summary));
        assert!(pattern.contains("Key points"));
        assert!(!pattern.contains("```"));
        assert!(example.starts_with(&pattern));
        assert!(example.contains("appStorage"));
        assert!(full.contains("Never copy shared values into local state because"));
    }

    #[test]
    fn test_document_limit_per_level() {
        let docs: Vec<Document> = (0..6)
            .map(|i| Document::new(format!("d{i}"), format!("Doc {i}"), "Body.", "tca"))
            .collect();
        let s = synth();
        assert_eq!(s.render_documents(&docs, DetailLevel::Summary).matches("## ").count(), 1);
        assert_eq!(s.render_documents(&docs, DetailLevel::Pattern).matches("## ").count(), 2);
        assert_eq!(s.render_documents(&docs, DetailLevel::FullContext).matches("## ").count(), 5);
    }

    #[test]
    fn test_external_includes_citations() {
        let result = ExternalResult::new("GroupSession syncs participants.")
            .with_citation(Citation::new("GroupSession", "https://developer.apple.com/documentation/groupactivities"));
        let rendered = synth().render_external(&result, DetailLevel::Pattern);
        assert!(rendered.contains("Sources:"));
        assert!(rendered.contains("developer.apple.com"));
    }

    #[test]
    fn test_compose_appends_splices_after_drafts() {
        let sections = vec![DraftSection::new("docs", "Primary."), DraftSection::new("empty", "  ")];
        let splices = vec![Splice {
            source_name: "external".to_string(),
            terms: vec!["groupsession".to_string()],
            content: "GroupSession detail.".to_string(),
            quality: 1.0,
        }];
        let out = synth().compose(&sections, &splices);
        assert!(out.starts_with("### From docs\nPrimary."));
        assert!(out.ends_with("### Gap fill from external (groupsession)\nGroupSession detail."));
        assert!(!out.contains("empty"));
    }
}
