/*!
 * Line reflow for narrow screens.
 *
 * Paragraph lines are greedily re-wrapped so that no segment exceeds a target
 * number of letters, while Markdown structure (headings, list items, code
 * fences, rules, table rows, blank lines) is passed through untouched.
 * Lengths are counted in characters, so a Hangul syllable is one letter.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

/// Default number of letters per wrapped line
pub const DEFAULT_TARGET_LENGTH: usize = 20;

/// Punctuation that makes an early break acceptable
const CLAUSE_MARKS: [char; 6] = [',', '.', '?', '!', ':', ';'];

/// Ordered and unordered list markers
static LIST_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-\s|\*\s|\d+\.\s)").unwrap()
});

/// `<br>`, `<br/>`, `<br />` in any case
static LINE_BREAK_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>").unwrap()
});

/// One emitted line of a reflowed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// Line text, without the trailing newline
    pub text: String,

    /// True for lines that bypass reflow
    pub is_structural: bool,
}

impl TextBlock {
    fn structural(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_structural: true,
        }
    }

    fn wrapped(text: String) -> Self {
        Self {
            text,
            is_structural: false,
        }
    }
}

/// Words accumulated for the line being built
#[derive(Debug, Default)]
struct Chunk {
    text: String,
    letters: usize,
}

impl Chunk {
    fn seed(word: &str) -> Self {
        Self {
            text: word.to_string(),
            letters: word.chars().count(),
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn push_word(&mut self, word: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.letters = self.text.chars().filter(|c| !c.is_whitespace()).count();
    }

    fn ends_with_clause_mark(&self) -> bool {
        self.text.chars().last().is_some_and(|c| CLAUSE_MARKS.contains(&c))
    }

    fn take(&mut self) -> String {
        self.letters = 0;
        std::mem::take(&mut self.text)
    }
}

/// Reflows text for mobile display
#[derive(Debug, Clone, Copy)]
pub struct MobileFormatter {
    target_length: usize,
}

impl Default for MobileFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_LENGTH)
    }
}

impl MobileFormatter {
    /// Create a formatter wrapping at `target_length` letters (at least 1)
    pub fn new(target_length: usize) -> Self {
        Self {
            target_length: target_length.max(1),
        }
    }

    /// Target letters per line
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// Whether a line is Markdown structure that must not be reflowed
    pub fn is_structural(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty()
            || trimmed.starts_with('#')
            || LIST_MARKER_REGEX.is_match(trimmed)
            || trimmed.starts_with("```")
            || trimmed.starts_with("---")
            || trimmed.starts_with('|')
    }

    /// Reflow `content` and return every emitted line with its classification
    pub fn reflow_blocks(&self, content: &str) -> Vec<TextBlock> {
        let mut blocks = Vec::new();
        if content.is_empty() {
            return blocks;
        }

        for line in content.split('\n') {
            if Self::is_structural(line) {
                blocks.push(TextBlock::structural(line));
                continue;
            }
            blocks.extend(self.wrap_line(line).into_iter().map(TextBlock::wrapped));
        }

        blocks
    }

    /// Reflow Markdown-ish text; structural lines are kept verbatim
    pub fn format_for_mobile(&self, content: &str) -> String {
        self.reflow_blocks(content)
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reflow HTML content.
    ///
    /// Line-break tags become newlines, every other tag is stripped to its
    /// text, the text is reflowed, and newlines are emitted as `<br>`. Markup
    /// other than line breaks does not survive.
    pub fn format_html_for_mobile(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let with_newlines = LINE_BREAK_TAG_REGEX.replace_all(html, "\n");
        let fragment = Html::parse_fragment(&with_newlines);
        let text: String = fragment.root_element().text().collect();

        self.format_for_mobile(&text).replace('\n', "<br>")
    }

    /// Greedy word wrap of a single paragraph line
    fn wrap_line(&self, line: &str) -> Vec<String> {
        let target = self.target_length;
        let mut lines = Vec::new();
        let mut chunk = Chunk::default();

        for word in line.split_whitespace() {
            let word_len = word.chars().count();

            // Longer than 1.5x target: hard split
            if word_len * 2 > target * 3 {
                if !chunk.is_empty() {
                    lines.push(chunk.take());
                }

                let chars: Vec<char> = word.chars().collect();
                let mut rest = chars.as_slice();
                while rest.len() > target {
                    lines.push(rest[..target].iter().collect());
                    rest = &rest[target..];
                }
                if !rest.is_empty() {
                    chunk = Chunk::seed(&rest.iter().collect::<String>());
                }
                continue;
            }

            let new_len = chunk.letters + usize::from(!chunk.is_empty()) + word_len;
            let should_break = new_len > target
                || (new_len * 10 > target * 7 && chunk.ends_with_clause_mark());

            if should_break && !chunk.is_empty() {
                lines.push(chunk.take());
                chunk = Chunk::seed(word);
            } else {
                chunk.push_word(word);
            }
        }

        if !chunk.is_empty() {
            lines.push(chunk.take());
        }

        lines
    }
}

/// Reflow with the default target length
pub fn format_for_mobile(content: &str) -> String {
    MobileFormatter::default().format_for_mobile(content)
}

/// Reflow HTML with the default target length
pub fn format_html_for_mobile(html: &str) -> String {
    MobileFormatter::default().format_html_for_mobile(html)
}
