// ABOUTME: Operator prompts behind a trait so CI and terminal runs share one code path.
// ABOUTME: Interactive uses dialoguer; NonInteractive never blocks and answers from flags.

use dialoguer::theme::ColorfulTheme;
use std::io::IsTerminal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    /// Input was required but the session cannot ask for it.
    #[error("cannot prompt for '{0}' in a non-interactive session")]
    NotInteractive(String),

    #[error("prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

/// Source of operator decisions.
pub trait Prompter: Send + Sync {
    /// Whether prompts may block waiting for the operator.
    fn is_interactive(&self) -> bool;

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Index of the chosen item.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError>;
}

/// Prompts on the controlling terminal.
pub struct Interactive {
    theme: ColorfulTheme,
}

impl std::fmt::Debug for Interactive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactive").field("theme", &"ColorfulTheme").finish()
    }
}

impl Default for Interactive {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for Interactive {
    fn is_interactive(&self) -> bool {
        true
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = dialoguer::Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Ok(dialoguer::Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        Ok(dialoguer::Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }
}

/// Never blocks. Confirmations are answered by `assume_yes`; input is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive {
    pub assume_yes: bool,
}

impl Prompter for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        default
            .map(str::to_string)
            .ok_or_else(|| PromptError::NotInteractive(prompt.to_string()))
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        if self.assume_yes {
            tracing::debug!(prompt, "confirmation assumed");
        }
        Ok(self.assume_yes)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        if default < items.len() {
            Ok(default)
        } else {
            Err(PromptError::NotInteractive(prompt.to_string()))
        }
    }
}

/// Interactive prompts when stdin is a terminal and `--yes` was not given.
pub fn for_session(assume_yes: bool) -> Box<dyn Prompter> {
    if !assume_yes && std::io::stdin().is_terminal() {
        Box::new(Interactive::default())
    } else {
        Box::new(NonInteractive { assume_yes })
    }
}
