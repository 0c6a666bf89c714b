//! Model catalog and per-turn provider construction.

use std::fmt;
use std::str::FromStr;

use agent_provider::{ProviderInitError, RunProvider};
use agent_provider_chat_api::{ChatApiProvider, ChatApiProviderConfig};
use agent_provider_mock::MockProvider;

pub const MODEL_MENU: &str = "Select model: 1) GPT-5  2) Claude 4.5 Sonnet  3) Grok Code Fast";
pub const NO_KEYS_MESSAGE: &str = "No API keys found. Set at least one of OPENAI_API_KEY, ANTHROPIC_API_KEY, OPENROUTER_API_KEY in .env";

const OPENROUTER_DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENROUTER_BASE_URL_ENV_VAR: &str = "OPENROUTER_BASE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModelName {
    #[default]
    Gpt5,
    Claude45Sonnet,
    GrokCodeFast1,
}

impl ModelName {
    /// Catalog order, which is also the numbering of the selection menu.
    pub const ALL: [ModelName; 3] = [Self::Gpt5, Self::Claude45Sonnet, Self::GrokCodeFast1];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt5 => "gpt-5",
            Self::Claude45Sonnet => "claude-4.5-sonnet",
            Self::GrokCodeFast1 => "grok-code-fast-1",
        }
    }

    pub fn provider_id(self) -> &'static str {
        match self {
            Self::Gpt5 => "openai",
            Self::Claude45Sonnet => "anthropic",
            Self::GrokCodeFast1 => "openrouter",
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Self::Gpt5 => "OPENAI_API_KEY",
            Self::Claude45Sonnet => "ANTHROPIC_API_KEY",
            Self::GrokCodeFast1 => "OPENROUTER_API_KEY",
        }
    }

    /// Model id sent on the wire.
    pub fn wire_model_id(self) -> &'static str {
        match self {
            Self::Gpt5 => "gpt-5",
            Self::Claude45Sonnet => "claude-sonnet-4-5",
            Self::GrokCodeFast1 => "x-ai/grok-code-fast-1",
        }
    }

    fn base_url(self, env: &dyn Fn(&str) -> Option<String>) -> String {
        match self {
            Self::Gpt5 => "https://api.openai.com/v1".to_string(),
            Self::Claude45Sonnet => "https://api.anthropic.com/v1".to_string(),
            Self::GrokCodeFast1 => non_blank(env(OPENROUTER_BASE_URL_ENV_VAR))
                .unwrap_or_else(|| OPENROUTER_DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Maps a menu answer (`1`..`3`) to a model.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Gpt5),
            "2" => Some(Self::Claude45Sonnet),
            "3" => Some(Self::GrokCodeFast1),
            _ => None,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!(
                    "unknown model '{value}' (expected one of: {})",
                    Self::ALL.map(ModelName::as_str).join(", ")
                )
            })
    }
}

/// Where providers come from: the model catalog or the offline mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderSource {
    #[default]
    Catalog,
    Mock,
}

impl FromStr for ProviderSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "catalog" => Ok(Self::Catalog),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown provider '{other}' (expected 'mock')")),
        }
    }
}

/// Models whose API key is set to a non-blank value.
pub fn available_models(env: &dyn Fn(&str) -> Option<String>) -> Vec<ModelName> {
    ModelName::ALL
        .into_iter()
        .filter(|model| non_blank(env(model.api_key_env_var())).is_some())
        .collect()
}

/// Default model if its key is present, else the first available one.
///
/// With no keys at all the default is returned; building its provider fails
/// later and the user gets the selection menu.
pub fn auto_pick_model(available: &[ModelName]) -> ModelName {
    if available.contains(&ModelName::default()) {
        return ModelName::default();
    }
    available.first().copied().unwrap_or_default()
}

pub fn available_models_line(available: &[ModelName]) -> String {
    if available.is_empty() {
        return NO_KEYS_MESSAGE.to_string();
    }

    let names: Vec<&str> = available.iter().map(|model| model.as_str()).collect();
    format!("Available with keys: {}", names.join(", "))
}

/// Builds the provider for one turn.
pub fn build_provider(
    source: ProviderSource,
    model: ModelName,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Box<dyn RunProvider>, ProviderInitError> {
    match source {
        ProviderSource::Mock => Ok(Box::new(MockProvider::with_model_id(
            model.as_str(),
            vec![agent_provider_mock::MockStep::EchoPrompt],
        ))),
        ProviderSource::Catalog => {
            let key_var = model.api_key_env_var();
            let Some(api_key) = non_blank(env(key_var)) else {
                return Err(ProviderInitError::new(format!("{key_var} is not set")));
            };

            let config = ChatApiProviderConfig::new(api_key, model.wire_model_id())
                .with_provider_id(model.provider_id())
                .with_base_url(model.base_url(env));
            tracing::debug!(model = %model, base_url = ?config.base_url, "building chat provider");
            Ok(Box::new(ChatApiProvider::new(config)?))
        }
    }
}

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn model_names_parse_from_catalog_names() {
        assert_eq!("gpt-5".parse::<ModelName>(), Ok(ModelName::Gpt5));
        assert_eq!(
            "Claude-4.5-Sonnet".parse::<ModelName>(),
            Ok(ModelName::Claude45Sonnet)
        );
        assert!("gpt-4".parse::<ModelName>().is_err());
    }

    #[test]
    fn menu_choices_map_to_catalog_order() {
        assert_eq!(ModelName::from_menu_choice("1"), Some(ModelName::Gpt5));
        assert_eq!(ModelName::from_menu_choice(" 3 "), Some(ModelName::GrokCodeFast1));
        assert_eq!(ModelName::from_menu_choice("4"), None);
        assert_eq!(ModelName::from_menu_choice("gpt-5"), None);
    }

    #[test]
    fn blank_keys_do_not_count_as_available() {
        let env = env_from(&[("OPENAI_API_KEY", "  "), ("OPENROUTER_API_KEY", "sk-or")]);

        assert_eq!(available_models(&env), vec![ModelName::GrokCodeFast1]);
    }

    #[test]
    fn auto_pick_prefers_default_then_first_available() {
        assert_eq!(
            auto_pick_model(&[ModelName::Claude45Sonnet, ModelName::Gpt5]),
            ModelName::Gpt5
        );
        assert_eq!(
            auto_pick_model(&[ModelName::GrokCodeFast1]),
            ModelName::GrokCodeFast1
        );
        assert_eq!(auto_pick_model(&[]), ModelName::Gpt5);
    }

    #[test]
    fn available_line_names_models_or_explains_missing_keys() {
        assert_eq!(
            available_models_line(&[ModelName::Gpt5, ModelName::GrokCodeFast1]),
            "Available with keys: gpt-5, grok-code-fast-1"
        );
        assert_eq!(available_models_line(&[]), NO_KEYS_MESSAGE);
    }

    #[test]
    fn catalog_provider_requires_its_key() {
        let env = env_from(&[]);

        let error = match build_provider(ProviderSource::Catalog, ModelName::Claude45Sonnet, &env) {
            Ok(_) => panic!("missing key should fail"),
            Err(error) => error,
        };

        assert_eq!(error.message(), "ANTHROPIC_API_KEY is not set");
    }

    #[test]
    fn catalog_provider_reports_wire_model_and_provider() {
        let env = env_from(&[("OPENROUTER_API_KEY", "sk-or")]);

        let provider = build_provider(ProviderSource::Catalog, ModelName::GrokCodeFast1, &env)
            .expect("provider should build");
        let profile = provider.profile();

        assert_eq!(profile.provider_id, "openrouter");
        assert_eq!(profile.model_id, "x-ai/grok-code-fast-1");
    }

    #[test]
    fn openrouter_base_url_can_be_overridden() {
        let env = env_from(&[(OPENROUTER_BASE_URL_ENV_VAR, "http://localhost:9000/v1")]);

        assert_eq!(
            ModelName::GrokCodeFast1.base_url(&env),
            "http://localhost:9000/v1"
        );
        assert_eq!(
            ModelName::Gpt5.base_url(&env),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn mock_source_needs_no_keys() {
        let env = env_from(&[]);

        let provider = build_provider(ProviderSource::Mock, ModelName::Gpt5, &env)
            .expect("mock provider should build");

        assert_eq!(provider.profile().provider_id, "mock");
        assert_eq!(provider.profile().model_id, "gpt-5");
    }

    #[test]
    fn provider_source_parses_mock_and_rejects_unknown() {
        assert_eq!("".parse::<ProviderSource>(), Ok(ProviderSource::Catalog));
        assert_eq!("MOCK".parse::<ProviderSource>(), Ok(ProviderSource::Mock));
        assert!("openai".parse::<ProviderSource>().is_err());
    }
}
