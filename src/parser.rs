//! Prompt construction and LLM response parsing.
//!
//! The translation prompt instructs the model to answer with a labelled
//! two-part layout: the translated title, a blank line, then the translated
//! abstract. Models follow the layout loosely at best, so [`parse_translation`]
//! is deliberately forgiving: it strips the label markers the prompt
//! introduces, normalizes runs of blank lines, and then only requires that
//! at least two non-empty segments remain.
//!
//! When even that fails the caller falls back to storing the original
//! English text, so a `None` here never loses a paper.

use itertools::Itertools;
use once_cell::sync::OnceCell;
use regex::Regex;

/// System prompt sent with every translation request.
pub const SYSTEM_PROMPT: &str = "你是一个专业的学术论文翻译和摘要助手。严格遵守用户的要求，提供准确且流畅的中文翻译,内容精炼简洁，返回正确的格式。";

/// Label the model is asked to put above the translated title.
const TITLE_MARKER: &str = "翻译后的标题";
/// Label the model is asked to put above the translated abstract.
const SUMMARY_MARKER: &str = "翻译后的摘要";
/// Label some models substitute for [`SUMMARY_MARKER`] on their own.
const STRAY_SUMMARY_MARKER: &str = "中文摘要";

/// Build the user prompt for one paper.
pub fn build_user_prompt(title: &str, summary: &str) -> String {
    format!(
        "请将以下论文标题和摘要翻译成中文。\n\n标题: {title}\n摘要: {summary}\n\n请提供翻译后的标题、翻译后的摘要。返回格式为：\n{TITLE_MARKER}\n<{TITLE_MARKER}>\n\n{SUMMARY_MARKER}\n<{SUMMARY_MARKER}>。"
    )
}

/// Split a raw model response into a translated title and abstract.
///
/// Returns `None` when fewer than two non-empty segments survive
/// normalization; the caller then keeps the original English text.
///
/// The first surviving segment becomes the title. Everything after it is
/// rejoined with blank lines, so multi-paragraph abstracts stay intact.
pub fn parse_translation(raw: &str) -> Option<(String, String)> {
    let stripped = raw
        .replace(TITLE_MARKER, "")
        .replace(SUMMARY_MARKER, "")
        .replace(STRAY_SUMMARY_MARKER, "")
        .replace(['<', '>'], "");
    let collapsed = collapse_blank_runs(&stripped);

    let segments: Vec<&str> = collapsed
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }

    let title = segments[0].to_string();
    let summary = segments[1..].iter().join("\n\n");
    Some((title, summary))
}

/// Collapse runs of three or more newlines down to exactly two.
///
/// Stripping the markers leaves empty lines behind; without this step a
/// response like `"标题\n\n\n\n摘要"` would split into empty segments.
fn collapse_blank_runs(s: &str) -> String {
    static BLANK_RUN: OnceCell<Regex> = OnceCell::new();
    let re = BLANK_RUN.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    re.replace_all(s, "\n\n").into_owned()
}
