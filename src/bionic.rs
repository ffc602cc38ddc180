//! The bionic-reading transform: plain text → emphasis markup.
//!
//! ## What "bionic reading" means here
//!
//! The leading portion of each word is wrapped in `<strong>` so the eye can
//! anchor on word starts and skim the rest. The transform is pure and
//! deterministic: same input, same output, no I/O, no hidden state.
//!
//! ## The round-trip law
//!
//! Stripping the markup this module adds (and undoing its escaping) must
//! reproduce the input byte-for-byte — [`strip_emphasis`]`(`[`transform`]`(s))
//! == s` for every `s`, including empty input, whitespace-only input, runs of
//! consecutive spaces, and multi-byte text. The splitting rules are chosen to
//! make that hold: lines split on `'\n'` and words on a single `' '`, so
//! empty tokens survive and nothing is collapsed.
//!
//! ## Escaping is not optional
//!
//! Output is destined for an HTML sink. Any `& < > " '` already present in
//! the input is escaped *before* the markup is attached; otherwise the
//! transform would be an injection vector. Emphasis length is computed on the
//! raw characters first, then prefix and remainder are escaped separately, so
//! entity expansion can never shift the split point.

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening tag attached to each word's emphasised prefix.
pub const EMPHASIS_OPEN: &str = "<strong>";
/// Closing tag.
pub const EMPHASIS_CLOSE: &str = "</strong>";

/// How many leading characters of a word to emphasise.
///
/// Counts characters, not bytes. Words of 3 characters or fewer get exactly
/// one; longer words get 40% of their length, rounded up. A single-character
/// word is emphasised in full (length 1), matching the product's
/// character-reading intent.
pub fn emphasis_len(char_count: usize) -> usize {
    match char_count {
        0 => 0,
        1 => 1,
        2..=3 => 1,
        n => (2 * n).div_ceil(5), // ceil(n * 0.4)
    }
}

/// Transform plain text into bionic-reading markup.
///
/// Total: no input fails. Empty input maps to empty output.
pub fn transform(text: &str) -> String {
    text.split('\n')
        .map(transform_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn transform_line(line: &str) -> String {
    line.split(' ')
        .map(transform_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn transform_word(word: &str) -> String {
    let char_count = word.chars().count();
    let bold = emphasis_len(char_count);
    if bold == 0 {
        return String::new();
    }

    // Split at a character boundary; the byte offset of the bold'th char.
    let split_at = word
        .char_indices()
        .nth(bold)
        .map(|(i, _)| i)
        .unwrap_or(word.len());
    let (prefix, rest) = word.split_at(split_at);

    let mut out = String::with_capacity(word.len() + EMPHASIS_OPEN.len() + EMPHASIS_CLOSE.len());
    out.push_str(EMPHASIS_OPEN);
    push_escaped(&mut out, prefix);
    out.push_str(EMPHASIS_CLOSE);
    push_escaped(&mut out, rest);
    out
}

/// Escape the five HTML-significant characters.
fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escape a string for embedding in HTML. Exposed for callers that need to
/// render untransformed text next to transformed output.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    push_escaped(&mut out, s);
    out
}

static RE_EMPHASIS_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?strong>").unwrap());

/// Invert [`transform`]: remove the emphasis markup and undo the escaping.
///
/// This is the verification half of the round-trip law. It only understands
/// the markup this module emits; feeding it arbitrary HTML is unsupported.
pub fn strip_emphasis(html: &str) -> String {
    let without_tags = RE_EMPHASIS_TAGS.replace_all(html, "");
    unescape(&without_tags)
}

/// Undo [`escape_html`]. `&amp;` is handled last so that escaped entity
/// text (e.g. `&amp;lt;`) decodes to its source form `&lt;`, not to `<`.
fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_maps_to_empty_output() {
        assert_eq!(transform(""), "");
    }

    #[test]
    fn single_char_word_is_fully_emphasised() {
        assert_eq!(transform("a"), "<strong>a</strong>");
    }

    #[test]
    fn short_word_emphasises_first_char_only() {
        assert_eq!(transform("cat"), "<strong>c</strong>at");
        assert_eq!(transform("of"), "<strong>o</strong>f");
    }

    #[test]
    fn long_word_emphasises_ceil_40_percent() {
        // 8 chars × 0.4 = 3.2 → 4
        assert_eq!(transform("elephant"), "<strong>elep</strong>hant");
    }

    #[test]
    fn emphasis_len_table() {
        assert_eq!(emphasis_len(0), 0);
        assert_eq!(emphasis_len(1), 1);
        assert_eq!(emphasis_len(2), 1);
        assert_eq!(emphasis_len(3), 1);
        assert_eq!(emphasis_len(4), 2); // ceil(1.6)
        assert_eq!(emphasis_len(5), 2); // ceil(2.0)
        assert_eq!(emphasis_len(8), 4); // ceil(3.2)
        assert_eq!(emphasis_len(10), 4); // ceil(4.0)
        assert_eq!(emphasis_len(11), 5); // ceil(4.4)
    }

    #[test]
    fn emphasis_len_is_pure() {
        for n in 0..64 {
            assert_eq!(emphasis_len(n), emphasis_len(n));
        }
    }

    #[test]
    fn lines_and_empty_lines_are_preserved() {
        let input = "one two\n\nthree";
        let out = transform(input);
        assert_eq!(out.matches('\n').count(), 2);
        assert_eq!(strip_emphasis(&out), input);
    }

    #[test]
    fn consecutive_spaces_survive_round_trip() {
        let input = "a  b   c";
        assert_eq!(strip_emphasis(&transform(input)), input);
    }

    #[test]
    fn whitespace_only_input_round_trips() {
        for input in ["   ", "\n", " \n ", "\n\n\n"] {
            assert_eq!(strip_emphasis(&transform(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn round_trip_printable_ascii() {
        let inputs = [
            "The quick brown fox jumps over the lazy dog",
            "line one\nline two\nline three",
            "trailing space \nand  double",
            "punctuation, too! (really?) [yes]",
        ];
        for input in inputs {
            assert_eq!(strip_emphasis(&transform(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn round_trip_multibyte_text() {
        let inputs = ["héllo wörld", "日本語のテキスト", "naïve café crème", "emoji 🚀 word"];
        for input in inputs {
            assert_eq!(strip_emphasis(&transform(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn emphasis_counts_characters_not_bytes() {
        // "héllo" is 5 characters (6 bytes); emphasis_len(5) = 2 → "hé".
        assert_eq!(transform("héllo"), "<strong>hé</strong>llo");
        // 4-char CJK word → 2 emphasised characters.
        assert_eq!(transform("日本語だ"), "<strong>日本</strong>だ");
    }

    #[test]
    fn html_input_is_escaped_before_markup() {
        let out = transform("<script>alert(1)</script>");
        assert!(!out.contains("<script>"), "raw script tag survived: {out}");
        assert!(out.contains("&lt;script&gt;"), "got: {out}");
        // Only our own markup may remain as tags.
        for tag_start in out.match_indices('<') {
            let rest = &out[tag_start.0..];
            assert!(
                rest.starts_with(EMPHASIS_OPEN) || rest.starts_with(EMPHASIS_CLOSE),
                "unexpected raw '<' in output: {out}"
            );
        }
    }

    #[test]
    fn escaped_html_round_trips() {
        let inputs = ["<b>bold</b>", "a & b", "\"quoted\" 'single'", "&amp; pre-escaped"];
        for input in inputs {
            assert_eq!(strip_emphasis(&transform(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn ampersand_entity_split_across_emphasis_boundary_round_trips() {
        // 4-char word "a&b&" splits after 2 chars: prefix "a&" escapes inside
        // the tag, remainder "b&" escapes outside it.
        let input = "a&b&";
        let out = transform(input);
        assert_eq!(out, "<strong>a&amp;</strong>b&amp;");
        assert_eq!(strip_emphasis(&out), input);
    }

    #[test]
    fn transform_is_deterministic() {
        let input = "some reasonably long input\nwith two lines";
        assert_eq!(transform(input), transform(input));
    }
}
