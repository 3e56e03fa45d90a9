use async_trait::async_trait;

use super::assistant_models::{AiConfig, AiError, AiMessage, AiProviderResponse};

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request. System messages are part of `messages`;
    /// providers that keep them separate pull them out themselves.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError>;
}

// Lets the service hold whichever provider was picked at startup.
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        (**self).chat_complete(messages, config).await
    }
}

pub struct AiService<P: AiProvider> {
    provider: P,
    system_prompt: String,
    config: AiConfig,
}

impl<P: AiProvider> AiService<P> {
    pub fn new(provider: P, system_prompt: String, config: AiConfig) -> Self {
        Self {
            provider,
            system_prompt,
            config,
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// One-shot question: system prompt followed by the user's text.
    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        self.chat(&[AiMessage::user(prompt)]).await
    }

    pub async fn chat(&self, context_messages: &[AiMessage]) -> Result<String, AiError> {
        let mut messages = Vec::with_capacity(context_messages.len() + 1);
        messages.push(AiMessage::system(self.system_prompt.clone()));
        messages.extend(context_messages.iter().cloned());

        let response = self.provider.chat_complete(&messages, &self.config).await?;
        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AiError::Empty);
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use super::*;

    /// Echoes the last user message, remembering what it was sent.
    #[derive(Default)]
    pub struct EchoProvider {
        pub seen: Mutex<Vec<Vec<AiMessage>>>,
        pub reply: Option<String>,
        pub fail: bool,
    }

    #[async_trait]
    impl AiProvider for EchoProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, AiError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if self.fail {
                return Err(AiError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            let content = match &self.reply {
                Some(reply) => reply.clone(),
                None => messages
                    .last()
                    .map(|m| format!("echo: {}", m.content))
                    .unwrap_or_default(),
            };
            Ok(AiProviderResponse { content })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::EchoProvider;
    use super::*;

    #[tokio::test]
    async fn system_prompt_comes_first() {
        let service = AiService::new(
            EchoProvider::default(),
            "be brief".into(),
            AiConfig::new("test-model"),
        );

        let answer = service.ask("hello").await.unwrap();

        assert_eq!(answer, "echo: hello");
        let seen = service.provider.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![AiMessage::system("be brief"), AiMessage::user("hello")]
        );
    }

    #[tokio::test]
    async fn blank_answers_are_errors() {
        let provider = EchoProvider {
            reply: Some("   \n".into()),
            ..EchoProvider::default()
        };
        let service = AiService::new(provider, String::new(), AiConfig::new("m"));
        assert!(matches!(service.ask("hi").await, Err(AiError::Empty)));
    }

    #[tokio::test]
    async fn boxed_providers_delegate() {
        let provider: Box<dyn AiProvider> = Box::new(EchoProvider {
            fail: true,
            ..EchoProvider::default()
        });
        let service = AiService::new(provider, String::new(), AiConfig::new("m"));
        assert!(matches!(
            service.ask("hi").await,
            Err(AiError::Status { status: 500, .. })
        ));
    }
}
