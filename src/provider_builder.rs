//! Backend factory: picks the live or local variant of every text service once at startup.

use scribe_core::{
    config::Config,
    repair::TextRepairer,
    safety::SafetyGate,
    traits::{CompletionBackend, GrammarEngine, ModerationBackend},
};
use scribe_providers::{
    echo::EchoProvider, languagetool::LanguageTool, moderation::OpenAiModeration,
    openai::OpenAiProvider,
};
use std::sync::Arc;

/// The text services handed to the gateway.
pub struct Backends {
    pub completion: Arc<dyn CompletionBackend>,
    pub safety: SafetyGate,
    pub repairer: TextRepairer,
}

/// OpenAI when an API key is configured, otherwise the local echo variant.
pub fn build_completion(cfg: &Config) -> Arc<dyn CompletionBackend> {
    if cfg.openai.has_key() {
        Arc::new(OpenAiProvider::from_config(
            cfg.openai.base_url.clone(),
            cfg.openai.api_key.clone(),
            cfg.openai.model.clone(),
            cfg.openai.max_tokens,
        ))
    } else {
        Arc::new(EchoProvider)
    }
}

/// The moderation endpoint, when enabled and a key is present.
pub fn build_moderation(cfg: &Config) -> Option<Arc<dyn ModerationBackend>> {
    (cfg.openai.moderation && cfg.openai.has_key()).then(|| {
        Arc::new(OpenAiModeration::from_config(
            cfg.openai.base_url.clone(),
            cfg.openai.api_key.clone(),
        )) as Arc<dyn ModerationBackend>
    })
}

/// LanguageTool, when enabled.
pub fn build_grammar(cfg: &Config) -> Option<Arc<dyn GrammarEngine>> {
    cfg.grammar.enabled.then(|| {
        Arc::new(LanguageTool::from_config(
            cfg.grammar.base_url.clone(),
            cfg.grammar.language.clone(),
        )) as Arc<dyn GrammarEngine>
    })
}

pub fn build_backends(cfg: &Config) -> anyhow::Result<Backends> {
    Ok(Backends {
        completion: build_completion(cfg),
        safety: SafetyGate::new(&cfg.safety.denylist, build_moderation(cfg))?,
        repairer: TextRepairer::new(build_grammar(cfg)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_local_variants() {
        let backends = build_backends(&Config::default()).unwrap();
        assert_eq!(backends.completion.name(), "echo");
        assert!(!backends.completion.is_live());
        assert!(backends.safety.backend_name().is_none());
        assert!(backends.repairer.engine_name().is_none());
    }

    #[test]
    fn test_api_key_selects_live_variants() {
        let mut cfg = Config::default();
        cfg.openai.api_key = "sk-test".into();
        cfg.grammar.enabled = true;

        let backends = build_backends(&cfg).unwrap();
        assert_eq!(backends.completion.name(), "openai");
        assert_eq!(backends.safety.backend_name(), Some("openai-moderation"));
        assert_eq!(backends.repairer.engine_name(), Some("languagetool"));
    }

    #[test]
    fn test_moderation_can_be_disabled() {
        let mut cfg = Config::default();
        cfg.openai.api_key = "sk-test".into();
        cfg.openai.moderation = false;
        assert!(build_moderation(&cfg).is_none());
        assert_eq!(build_completion(&cfg).name(), "openai");
    }
}
