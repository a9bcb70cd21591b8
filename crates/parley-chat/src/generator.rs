//! Text generation contract.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::ChatError;

/// The generation operations a turn needs.
///
/// Each maps to one prompt template; the string form is the template's
/// directory name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Condense the conversation transcript.
    Summarize,
    /// Turn the user text plus summary into a retrieval query.
    ClassifyIntent,
    /// Produce the bot reply grounded in memories.
    Respond,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::Summarize,
        Operation::ClassifyIntent,
        Operation::Respond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Summarize => "summarize",
            Operation::ClassifyIntent => "intent",
            Operation::Respond => "chat",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" => Ok(Operation::Summarize),
            "intent" | "classify-intent" => Ok(Operation::ClassifyIntent),
            "chat" | "respond" => Ok(Operation::Respond),
            other => Err(ChatError::Template(format!("unknown operation: {}", other))),
        }
    }
}

/// Named string arguments substituted into a prompt template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateArgs(BTreeMap<String, String>);

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Produces text for a named operation.
///
/// Implementations own their timeouts and any retry policy; the turn
/// pipeline treats every error as a failed step.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, operation: Operation, args: &TemplateArgs)
        -> Result<String, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Summarize.as_str(), "summarize");
        assert_eq!(Operation::ClassifyIntent.as_str(), "intent");
        assert_eq!(Operation::Respond.as_str(), "chat");
    }

    #[test]
    fn test_operation_parse_aliases() {
        assert_eq!("SUMMARIZE".parse::<Operation>().unwrap(), Operation::Summarize);
        assert_eq!(
            "classify-intent".parse::<Operation>().unwrap(),
            Operation::ClassifyIntent
        );
        assert_eq!("respond".parse::<Operation>().unwrap(), Operation::Respond);
        assert!(matches!(
            "translate".parse::<Operation>(),
            Err(ChatError::Template(_))
        ));
    }

    #[test]
    fn test_template_args_builder() {
        let args = TemplateArgs::new()
            .with("input", "hello")
            .with("summary", "");
        assert_eq!(args.len(), 2);
        assert_eq!(args.get("input"), Some("hello"));
        assert_eq!(args.get("summary"), Some(""));
        assert_eq!(args.get("memories"), None);

        let names: Vec<&str> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["input", "summary"]);
    }
}
