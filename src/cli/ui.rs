//! Shared UI primitives for ideacanvas
//!
//! Conventions:
//! - Prompts: lowercase with colon and space: `title: `
//! - Key hints: key in brackets followed by the rest of the word: `[n]ote`
//! - Feedback: single word when possible: `Deleted.`

use anyhow::Result;
use inquire::{ui::RenderConfig, Confirm, Editor, Select, Text};

use crate::store::Notice;

// ============================================================================
// Layout Primitives
// ============================================================================

/// Builder for the key hint line, e.g. "[n]ote [i]dea [q]uit"
#[derive(Default)]
pub struct StatusBar<'a> {
    actions: Vec<(&'a str, &'a str)>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `.action("e", "dit")` produces `[e]dit`
    pub fn action(mut self, key: &'a str, label: &'a str) -> Self {
        self.actions.push((key, label));
        self
    }

    pub fn separator(mut self) -> Self {
        self.actions.push(("|", ""));
        self
    }

    pub fn render(&self) -> String {
        let mut result = String::new();
        for (key, label) in &self.actions {
            if *key == "|" {
                result.push_str(" | ");
                continue;
            }
            if !result.is_empty() && !result.ends_with(" | ") {
                result.push(' ');
            }
            result.push('[');
            result.push_str(key);
            result.push(']');
            result.push_str(label);
        }
        result
    }
}

/// Truncate a string to max_chars, adding ellipsis if needed.
/// Result will be at most max_chars characters (including ellipsis if truncated).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars - 1).collect();
    format!("{}…", kept)
}

/// First id characters shown in listings
pub fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

// ============================================================================
// Message Functions
// ============================================================================

/// Print a status message to stdout
#[inline]
pub fn status(msg: &str) {
    println!("{}", msg);
}

/// Print an error message to stderr
#[inline]
pub fn error(msg: &str) {
    eprintln!("Error: {}", msg);
}

/// Print a warning message to stderr
#[inline]
pub fn warning(msg: &str) {
    eprintln!("Warning: {}", msg);
}

/// Print every persistence notice as an error line
pub fn report(notices: &[Notice]) {
    for notice in notices {
        error(&notice.message);
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Get terminal dimensions, defaulting to 80x24 if unavailable
pub fn term_size() -> (u16, u16) {
    crossterm::terminal::size().unwrap_or((80, 24))
}

/// Get a minimal render config for inquire prompts
pub fn minimal_render_config() -> RenderConfig<'static> {
    RenderConfig::default_colored()
        .with_prompt_prefix(inquire::ui::Styled::new(""))
        .with_answered_prompt_prefix(inquire::ui::Styled::new(""))
}

/// Display a selection menu and return the chosen index
pub fn select(prompt: &str, options: &[String]) -> Result<Option<usize>> {
    if options.is_empty() {
        return Ok(None);
    }

    let page_size = (term_size().1 as usize).saturating_sub(4).max(5);
    let result = Select::new(prompt, options.to_vec())
        .with_render_config(minimal_render_config())
        .with_page_size(page_size)
        .with_vim_mode(true)
        .raw_prompt_skippable()?;

    Ok(result.map(|choice| choice.index))
}

/// Prompt for text input with optional default value
pub fn text_input(prompt: &str, default: Option<&str>) -> Result<Option<String>> {
    let mut builder = Text::new(prompt).with_render_config(minimal_render_config());

    if let Some(d) = default {
        if !d.is_empty() {
            builder = builder.with_initial_value(d);
        }
    }

    let result = builder.prompt_skippable()?;
    Ok(result)
}

/// Open $VISUAL/$EDITOR on `current` for multi-line text
pub fn editor_input(prompt: &str, current: &str) -> Result<Option<String>> {
    let result = Editor::new(prompt)
        .with_render_config(minimal_render_config())
        .with_predefined_text(current)
        .with_file_extension(".md")
        .prompt_skippable()?;
    Ok(result.map(strip_final_newline))
}

/// Editors end the file with a newline the user did not type
fn strip_final_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Prompt for yes/no confirmation (default: no). `None` when skipped with Esc.
pub fn confirm_skippable(prompt: &str) -> Result<Option<bool>> {
    let result = Confirm::new(prompt)
        .with_render_config(minimal_render_config())
        .with_default(false)
        .prompt_skippable()?;
    Ok(result)
}

/// Prompt for yes/no confirmation. Skipping counts as no.
pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(confirm_skippable(prompt)?.unwrap_or(false))
}
