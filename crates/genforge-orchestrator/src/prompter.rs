use genforge_config::GenerationConfig;
use genforge_llm::{Message, RequestEnvelope};
use genforge_planner::Artifact;

/// What a [`Prompter`] sees when building the request for one artifact.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub artifact: &'a Artifact,
    /// Completed dependencies as `(path, content)`, in dependency order.
    /// Dependencies that failed or were outside the batch are absent.
    pub dependencies: Vec<(&'a str, &'a str)>,
}

/// Builds the request envelope for one artifact.
pub trait Prompter: Send + Sync {
    fn envelope(&self, context: &GenerationContext<'_>) -> RequestEnvelope;
}

/// Prompter that asks for one file at a time, quoting completed dependencies.
#[derive(Debug, Clone)]
pub struct BasicPrompter {
    instruction: String,
    system: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

const DEFAULT_SYSTEM_PROMPT: &str =
    "You generate source files. Reply with the complete file contents only, without commentary.";

impl BasicPrompter {
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Take temperature and token limit from the `[generation]` section.
    #[must_use]
    pub fn with_generation(mut self, generation: &GenerationConfig) -> Self {
        self.temperature = generation.temperature;
        self.max_tokens = generation.max_tokens;
        self
    }
}

impl Prompter for BasicPrompter {
    fn envelope(&self, context: &GenerationContext<'_>) -> RequestEnvelope {
        let mut user = format!(
            "{}\n\nWrite the file `{}` ({}).",
            self.instruction, context.artifact.path, context.artifact.category
        );
        for (path, content) in &context.dependencies {
            user.push_str(&format!("\n\nIt depends on `{path}`:\n{content}"));
        }

        let mut envelope =
            RequestEnvelope::new(vec![Message::system(self.system.clone()), Message::user(user)]);
        if let Some(temperature) = self.temperature {
            envelope = envelope.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            envelope = envelope.with_max_tokens(max_tokens);
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genforge_llm::Role;

    #[test]
    fn test_prompt_mentions_path_and_dependencies() {
        let artifact = Artifact::new("style.css");
        let context = GenerationContext {
            artifact: &artifact,
            dependencies: vec![("index.html", "<html></html>")],
        };
        let envelope = BasicPrompter::new("Build a landing page").envelope(&context);

        assert_eq!(envelope.messages[0].role, Role::System);
        let user = envelope.last_user_message().unwrap();
        assert!(user.starts_with("Build a landing page"));
        assert!(user.contains("`style.css` (stylesheet)"));
        assert!(user.contains("`index.html`:\n<html></html>"));
    }

    #[test]
    fn test_generation_settings_applied() {
        let artifact = Artifact::new("a.py");
        let context = GenerationContext {
            artifact: &artifact,
            dependencies: Vec::new(),
        };
        let generation = GenerationConfig {
            temperature: Some(0.7),
            max_tokens: Some(2048),
            max_concurrency: None,
        };
        let envelope = BasicPrompter::new("x")
            .with_generation(&generation)
            .envelope(&context);
        assert_eq!(envelope.temperature, 0.7);
        assert_eq!(envelope.max_tokens, Some(2048));
    }
}
