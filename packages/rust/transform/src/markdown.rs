//! HTML-to-Markdown conversion with a small cleanup pipeline.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use materializer_shared::{MaterializerError, Result};

/// Convert an HTML document or fragment to Markdown.
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    let raw = converter
        .convert(html)
        .map_err(|e| MaterializerError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), "htmd conversion complete");
    Ok(run_cleanup(&raw))
}

/// Each pass is `&str -> String`, applied in order.
fn run_cleanup(md: &str) -> String {
    let mut result = strip_container_tags(md);
    result = fix_code_block_languages(&result);
    result = clean_blank_lines(&result);
    ensure_trailing_newline(result.trim())
}

/// Remove layout tags that survived conversion, keeping their text.
/// Fenced code blocks are left alone.
fn strip_container_tags(md: &str) -> String {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut in_code_block = false;
    let lines: Vec<String> = md
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                line.to_string()
            } else {
                TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect();

    lines.join("\n")
}

/// `language-js`, `lang-python` and `highlight-rust` fence hints become bare names.
fn fix_code_block_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").into_owned()
}

/// Collapse runs of 3+ blank lines into 2.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").into_owned()
}

fn ensure_trailing_newline(md: &str) -> String {
    format!("{md}\n")
}
