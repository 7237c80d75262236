//! Prompt assembly: instructions, retrieved context, and the question in one text.

use std::collections::BTreeMap;

use crate::chunks::Chunk;
use crate::config::PromptConfig;

/// Joins retrieved chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Instruction text with `{name}` placeholders and the values to fill them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub instructions: String,
    pub variables: BTreeMap<String, String>,
}

impl PromptTemplate {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Instructions with every known `{name}` replaced. Unknown placeholders stay as written.
    pub fn render_instructions(&self) -> String {
        let mut out = String::with_capacity(self.instructions.len());
        let mut rest = self.instructions.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if self.variables.contains_key(&after[..close]) => {
                    out.push_str(&self.variables[&after[..close]]);
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl From<&PromptConfig> for PromptTemplate {
    fn from(config: &PromptConfig) -> Self {
        Self {
            instructions: config.instructions.clone(),
            variables: config.variables.clone(),
        }
    }
}

/// Builds the full prompt. Context chunks appear in the order given (retrieval order).
pub fn assemble(template: &PromptTemplate, context: &[Chunk], question: &str) -> String {
    let context_block = context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    format!(
        "{}\n\nContext: {}\n\nQuestion: {}\nAnswer:",
        template.render_instructions(),
        context_block,
        question
    )
}
