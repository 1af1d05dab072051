//! Semantic color theme for terminal output
//!
//! - `active` => blue, module paths and headings
//! - `success` => green, clean results
//! - `warning` => yellow, validation warnings
//! - `fail` => red, errors

use std::sync::LazyLock;

use owo_colors::{OwoColorize, Style};

/// Semantic color definitions for terminal output
pub struct SemanticColors {
    pub active: Style,
    pub success: Style,
    pub warning: Style,
    pub fail: Style,
    /// Secondary details such as line numbers
    pub dim: Style,
}

impl Default for SemanticColors {
    fn default() -> Self {
        Self {
            active: Style::new().blue().bold(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            fail: Style::new().red(),
            dim: Style::new().dimmed(),
        }
    }
}

/// Global default theme
pub static COLORS: LazyLock<SemanticColors> = LazyLock::new(SemanticColors::default);

/// Style `text` unless stdout is redirected
pub fn paint(text: &str, style: Style) -> String {
    if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_plain_when_redirected() {
        // Test harness output is captured, never a terminal
        if !std::io::IsTerminal::is_terminal(&std::io::stdout()) {
            assert_eq!(paint("tests/test_x.py", COLORS.active), "tests/test_x.py");
        }
    }
}
