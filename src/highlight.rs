use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::error::{Error, Result};

/// Turns a body into ANSI-coloured text.
pub trait Highlight {
    /// `token` is a content category such as `json` or `html`; `style` is
    /// one of [`Highlight::styles`].
    fn highlight(&self, text: &str, token: &str, style: &str) -> Result<String>;

    fn styles(&self) -> Vec<String>;

    fn has_style(&self, style: &str) -> bool {
        self.styles().iter().any(|name| name == style)
    }
}

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    fn syntax_for(&self, token: &str) -> &SyntaxReference {
        // structured syntax suffixes: problem+json, atom+xml
        self.syntaxes
            .find_syntax_by_token(token)
            .or_else(|| {
                let (_, suffix) = token.rsplit_once('+')?;
                self.syntaxes.find_syntax_by_token(suffix)
            })
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlight for SyntectHighlighter {
    fn highlight(&self, text: &str, token: &str, style: &str) -> Result<String> {
        let theme = self
            .themes
            .themes
            .get(style)
            .ok_or_else(|| Error::UnknownStyle(style.to_string()))?;

        let mut lines = HighlightLines::new(self.syntax_for(token), theme);
        let mut out = String::with_capacity(text.len() * 2);
        for line in LinesWithEndings::from(text) {
            let ranges = lines
                .highlight_line(line, &self.syntaxes)
                .map_err(|err| Error::Highlight(err.to_string().into()))?;
            out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        }
        out.push_str("\x1b[0m");

        Ok(out)
    }

    fn styles(&self) -> Vec<String> {
        self.themes.themes.keys().cloned().collect()
    }
}


#[cfg(test)]
mod highlight_tests {
    use super::*;

    #[test]
    fn test_bundled_styles() {
        let highlighter = SyntectHighlighter::new();

        assert!(highlighter.has_style("base16-ocean.dark"));
        assert!(highlighter.has_style("InspiredGitHub"));
        assert!(!highlighter.has_style("no-such-style"));
    }

    #[test]
    fn test_json_is_coloured() {
        let highlighter = SyntectHighlighter::new();
        let out = highlighter
            .highlight("{\"ok\": true}", "json", "base16-ocean.dark")
            .unwrap();

        assert!(out.contains("\x1b[38;2;"));
        assert!(out.contains("true"));
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn test_syntax_lookup() {
        let highlighter = SyntectHighlighter::new();

        assert_eq!(highlighter.syntax_for("json").name, "JSON");
        assert_eq!(highlighter.syntax_for("problem+json").name, "JSON");
        assert_eq!(highlighter.syntax_for("x-unheard-of").name, "Plain Text");
    }

    #[test]
    fn test_unknown_style() {
        let highlighter = SyntectHighlighter::new();
        let err = highlighter.highlight("text", "plain", "no-such-style").unwrap_err();

        assert!(matches!(err, Error::UnknownStyle(name) if name == "no-such-style"));
    }
}
