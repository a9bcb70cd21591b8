//! Prompt templates keyed by generation operation.
//!
//! Templates are loaded once at startup and never mutated afterwards; share
//! them as `Arc<PromptTemplates>`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use parley_core::config::LlmConfig;
use regex::Regex;
use tracing::info;

use crate::error::ChatError;
use crate::generator::{Operation, TemplateArgs};

/// File holding the prompt inside each operation directory.
pub const PROMPT_FILE_NAME: &str = "skprompt.txt";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid placeholder regex")
});

const SUMMARIZE_PROMPT: &str = "\
Summarize the following conversation between a user and a bot in a few sentences.
Keep names, facts and open questions. If the conversation is empty, reply with nothing.

[CONVERSATION]
{{$input}}
[END CONVERSATION]

Summary:";

const INTENT_PROMPT: &str = "\
Given the conversation summary and the latest user message, state in a short phrase
what the user is looking for. The phrase will be used as a search query.

Summary: {{$summary}}
User: {{$input}}

Intent:";

const CHAT_PROMPT: &str = "\
You are a helpful assistant. Answer the user using the memories below when they are relevant.
If the memories do not contain the answer, say so.

Conversation summary:
{{$summary}}

Memories:
{{$memories}}

User: {{$input}}
Bot:";

/// Immutable mapping from operation to prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    templates: HashMap<Operation, String>,
}

impl PromptTemplates {
    /// Templates compiled into the binary.
    pub fn builtin() -> Self {
        let templates = HashMap::from([
            (Operation::Summarize, SUMMARIZE_PROMPT.to_string()),
            (Operation::ClassifyIntent, INTENT_PROMPT.to_string()),
            (Operation::Respond, CHAT_PROMPT.to_string()),
        ]);
        Self { templates }
    }

    /// Load `<dir>/<operation>/skprompt.txt` for every operation.
    ///
    /// Fails if any operation lacks a template.
    pub fn load_dir(dir: &Path) -> Result<Self, ChatError> {
        let mut templates = HashMap::new();
        for op in Operation::ALL {
            let path = dir.join(op.as_str()).join(PROMPT_FILE_NAME);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                ChatError::Template(format!("cannot read {}: {}", path.display(), e))
            })?;
            templates.insert(op, text);
        }
        info!(dir = %dir.display(), "Prompt templates loaded");
        Ok(Self { templates })
    }

    /// Built-ins when `prompt_dir` is empty, the directory otherwise.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        if config.prompt_dir.trim().is_empty() {
            Ok(Self::builtin())
        } else {
            Self::load_dir(Path::new(&config.prompt_dir))
        }
    }

    #[cfg(test)]
    pub(crate) fn from_texts(
        summarize: impl Into<String>,
        intent: impl Into<String>,
        chat: impl Into<String>,
    ) -> Self {
        let templates = HashMap::from([
            (Operation::Summarize, summarize.into()),
            (Operation::ClassifyIntent, intent.into()),
            (Operation::Respond, chat.into()),
        ]);
        Self { templates }
    }

    pub fn template(&self, operation: Operation) -> &str {
        self.templates
            .get(&operation)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Render the operation's template with `args`.
    pub fn render(&self, operation: Operation, args: &TemplateArgs) -> String {
        render_template(self.template(operation), args)
    }
}

/// Replace every `{{$name}}` with the named argument.
///
/// Unknown names render as empty text.
pub fn render_template(template: &str, args: &TemplateArgs) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            args.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_named_args() {
        let args = TemplateArgs::new()
            .with("input", "hi")
            .with("summary", "greeting");
        let out = render_template("S={{$summary}} I={{ $input }}", &args);
        assert_eq!(out, "S=greeting I=hi");
    }

    #[test]
    fn test_render_unknown_placeholder_is_empty() {
        let out = render_template("[{{$memories}}]", &TemplateArgs::new());
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_render_does_not_recurse_into_values() {
        let args = TemplateArgs::new().with("input", "{{$summary}}").with("summary", "x");
        assert_eq!(render_template("{{$input}}", &args), "{{$summary}}");
    }

    #[test]
    fn test_builtin_templates_cover_every_operation() {
        let templates = PromptTemplates::builtin();
        assert!(templates.template(Operation::Summarize).contains("{{$input}}"));
        assert!(templates.template(Operation::ClassifyIntent).contains("{{$summary}}"));
        let chat = templates.template(Operation::Respond);
        assert!(chat.contains("{{$memories}}"));
        assert!(chat.contains("{{$input}}"));
    }

    #[test]
    fn test_load_dir_reads_each_operation() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("summarize", "sum {{$input}}"),
            ("intent", "int {{$input}}"),
            ("chat", "chat {{$memories}}"),
        ] {
            let sub = dir.path().join(name);
            std::fs::create_dir_all(&sub).unwrap();
            std::fs::write(sub.join(PROMPT_FILE_NAME), body).unwrap();
        }

        let templates = PromptTemplates::load_dir(dir.path()).unwrap();
        let args = TemplateArgs::new().with("memories", "m");
        assert_eq!(templates.render(Operation::Respond, &args), "chat m");
        assert_eq!(templates.template(Operation::Summarize), "sum {{$input}}");
    }

    #[test]
    fn test_load_dir_missing_operation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("summarize");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join(PROMPT_FILE_NAME), "x").unwrap();

        let err = PromptTemplates::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ChatError::Template(_)));
        assert!(err.to_string().contains("intent"));
    }

    #[test]
    fn test_from_config_empty_dir_uses_builtin() {
        let templates = PromptTemplates::from_config(&LlmConfig::default()).unwrap();
        assert_eq!(
            templates.template(Operation::Respond),
            PromptTemplates::builtin().template(Operation::Respond)
        );
    }
}
