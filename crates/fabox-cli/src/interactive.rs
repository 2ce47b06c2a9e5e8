//! Interactive prompts for build, deploy and rollback.
//!
//! Missing arguments are asked for until the answer matches one of the
//! offered items. Typing `exit` at any prompt aborts the command.

use std::io::{self, Write};

use anyhow::Result;
use chrono::NaiveDate;
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};

use fabox_core::bundle::{BundleTag, TagSummary};
use fabox_core::select::{self, Selection};

/// Source of raw answers to prompts.
pub trait Prompter {
    /// One line of input in answer to `prompt`.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// Reads answers from the terminal.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Prompter for DialoguerPrompter {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

pub struct InteractiveFlow<P: Prompter, W: Write = io::Stdout> {
    prompter: P,
    /// Output writer (for testing)
    writer: W,
}

impl<P: Prompter> InteractiveFlow<P, io::Stdout> {
    pub fn new(prompter: P) -> Self {
        Self {
            prompter,
            writer: io::stdout(),
        }
    }
}

impl<P: Prompter, W: Write> InteractiveFlow<P, W> {
    /// Create a flow with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(prompter: P, writer: W) -> Self {
        Self { prompter, writer }
    }

    /// Pick a product, starting from `prefilled` when given.
    pub fn choose_product(
        &mut self,
        products: &[String],
        prefilled: Option<&str>,
        question: &str,
    ) -> Result<String> {
        if products.is_empty() {
            anyhow::bail!("No products available");
        }

        let mut answer = prefilled.map(str::to_string);
        loop {
            if let Some(raw) = answer.take() {
                match select::select_one(products, &raw)? {
                    Selection::Picked(index) => return Ok(products[index].clone()),
                    Selection::NoMatch if !raw.trim().is_empty() => {
                        writeln!(self.writer, "Unknown product '{}'", raw.trim())?;
                    }
                    Selection::NoMatch => {}
                }
            }

            writeln!(self.writer, "{}", style("Available products are:").bold())?;
            for (i, product) in products.iter().enumerate() {
                writeln!(self.writer, "\t{}. {}", i + 1, product)?;
            }
            answer = Some(self.prompter.ask(question)?);
        }
    }

    /// Pick a tag from the archived bundles, starting from `prefilled`.
    pub fn choose_bundle_tag(
        &mut self,
        tags: &[TagSummary],
        prefilled: Option<&str>,
    ) -> Result<BundleTag> {
        if tags.is_empty() {
            anyhow::bail!("No bundles available");
        }
        let names: Vec<String> = tags.iter().map(|summary| summary.tag.to_string()).collect();

        let mut answer = prefilled.map(str::to_string);
        loop {
            if let Some(raw) = answer.take()
                && let Selection::Picked(index) = select::select_one(&names, &raw)?
            {
                return Ok(tags[index].tag.clone());
            }

            writeln!(self.writer, "{}", style("Available bundles are:").bold())?;
            for (i, summary) in tags.iter().enumerate() {
                writeln!(
                    self.writer,
                    "\t{}. {}  Bundles: {} (latest {})",
                    i + 1,
                    summary.tag,
                    summary.builds,
                    summary.latest
                )?;
            }
            answer = Some(self.prompter.ask("Which bundle do you want to deploy?")?);
        }
    }

    /// Name for a new tag: `prefilled`, the date default, or typed in.
    pub fn choose_tag_name(&mut self, today: NaiveDate, prefilled: Option<&str>) -> Result<String> {
        if let Some(raw) = prefilled
            && let Some(name) = select::free_form(raw)?
        {
            return Ok(name);
        }

        let default = select::default_tag_name(today);
        let answer = self
            .prompter
            .ask(&format!("Do you want to use default tag '{default}'? (y/N)"))?;
        if select::confirm(&answer)? {
            return Ok(default);
        }

        loop {
            let answer = self.prompter.ask("Name the tag you want to create")?;
            if let Some(name) = select::free_form(&answer)? {
                return Ok(name);
            }
        }
    }

    /// Ask a y/N question; `yes` answers it without prompting.
    pub fn confirm(&mut self, question: &str, yes: bool) -> Result<bool> {
        if yes {
            return Ok(true);
        }
        let answer = self.prompter.ask(&format!("{question} (y/N)"))?;
        Ok(select::confirm(&answer)?)
    }
}
