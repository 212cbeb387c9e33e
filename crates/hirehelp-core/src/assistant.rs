use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hirehelp_bus::BusPublisher;
use hirehelp_provider::{
    GenerateRequest, GenerativeModel, InlineAudio, LiveSetup, ResponseFormat,
};
use hirehelp_schema::{AppEvent, CompanyConfig, GroundingLink, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::{build_adoption, AdoptError, AdoptRequest, AdoptionReport};
use crate::conversation::{Conversation, SendError, SendTicket};
use crate::prompt::{build_live_instruction, build_system_instruction};
use crate::sidebar::ChatCommand;

pub const NOT_FOUND_REPLY: &str = "I'm sorry, I couldn't find that information in our records. Let me know if there's anything else I can help with.";
pub const APOLOGY_REPLY: &str =
    "I encountered a technical issue reaching the knowledge base. Please try asking again.";

/// Model names and knobs resolved from `main.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantSettings {
    pub chat_model: String,
    pub speech_model: String,
    pub structuring_model: String,
    pub live_model: String,
    pub temperature: f32,
    pub speech_voice: String,
    pub live_voice: String,
    pub speech_max_chars: usize,
    pub default_holiday_year: i32,
    pub max_knowledge_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub grounding_links: Vec<GroundingLink>,
}

/// Both sides of one send. `reply` is `None` when the conversation was
/// reset before the answer arrived.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user: Message,
    pub reply: Option<Message>,
}

/// Base64 16-bit PCM ready to be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechClip {
    pub mime_type: String,
    pub data: String,
}

impl From<InlineAudio> for SpeechClip {
    fn from(audio: InlineAudio) -> Self {
        Self {
            mime_type: audio.mime_type,
            data: audio.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechTarget {
    Message(Uuid),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("message {0} not found")]
    NotFound(Uuid),
    #[error("speech is already playing")]
    Busy,
}

pub struct Assistant {
    model: Arc<dyn GenerativeModel>,
    store: Arc<crate::CompanyStore>,
    settings: AssistantSettings,
    conversation: Mutex<Conversation>,
    bus: BusPublisher,
}

impl Assistant {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        store: Arc<crate::CompanyStore>,
        settings: AssistantSettings,
        bus: BusPublisher,
    ) -> Self {
        let conversation = Conversation::new(&store.snapshot().name);
        Self {
            model,
            store,
            settings,
            conversation: Mutex::new(conversation),
            bus,
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    pub fn company(&self) -> Arc<CompanyConfig> {
        self.store.snapshot()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.lock_conversation().messages().to_vec()
    }

    pub async fn is_busy(&self) -> bool {
        self.lock_conversation().is_busy()
    }

    pub async fn is_speaking(&self) -> bool {
        self.lock_conversation().is_speaking()
    }

    /// The lock is only ever held for a synchronous step, never across an
    /// await, so slot guards can take it from `Drop`.
    fn lock_conversation(&self) -> MutexGuard<'_, Conversation> {
        lock(&self.conversation)
    }

    /// One model round-trip. Never fails: errors become the apology text.
    pub async fn chat_response(&self, text: &str, config: &CompanyConfig) -> ChatReply {
        let request = GenerateRequest::text(&self.settings.chat_model, text)
            .with_system(build_system_instruction(
                config,
                self.settings.max_knowledge_chars,
            ))
            .with_temperature(self.settings.temperature)
            .with_google_search();

        match self.model.generate(request).await {
            Ok(response) => {
                let text = if response.text.trim().is_empty() {
                    NOT_FOUND_REPLY.to_string()
                } else {
                    response.text
                };
                ChatReply {
                    text,
                    grounding_links: response.grounding_links,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat call failed");
                ChatReply {
                    text: APOLOGY_REPLY.to_string(),
                    grounding_links: Vec::new(),
                }
            }
        }
    }

    pub async fn send(&self, text: &str) -> Result<Exchange, SendError> {
        let (ticket, user) = self.lock_conversation().begin_send(text)?;
        let mut turn = TurnGuard {
            conversation: &self.conversation,
            ticket,
            finished: false,
        };
        self.publish(AppEvent::MessageAppended {
            message: user.clone(),
        })
        .await;

        let config = self.store.snapshot();
        let reply = self.chat_response(&user.content, &config).await;
        let message = Message::assistant_with_links(reply.text, reply.grounding_links);

        let accepted = self.lock_conversation().finish_send(ticket, message.clone());
        turn.finished = true;
        if !accepted {
            tracing::debug!("conversation reset while answering, reply dropped");
            return Ok(Exchange { user, reply: None });
        }

        self.publish(AppEvent::MessageAppended {
            message: message.clone(),
        })
        .await;
        Ok(Exchange {
            user,
            reply: Some(message),
        })
    }

    pub async fn dispatch(&self, command: ChatCommand) -> Result<Exchange, SendError> {
        let config = self.store.snapshot();
        let utterance = command.utterance(&config).ok_or(match command {
            ChatCommand::AskHandbook { index } => SendError::NoSuchSection(index),
            _ => SendError::Empty,
        })?;
        self.send(&utterance).await
    }

    /// Text-to-speech. `None` means there is nothing to play.
    pub async fn synthesize(&self, text: &str) -> Option<SpeechClip> {
        let clipped: String = text.chars().take(self.settings.speech_max_chars).collect();
        let request = GenerateRequest::text(
            &self.settings.speech_model,
            format!("Say clearly: {clipped}"),
        )
        .with_format(ResponseFormat::Audio {
            voice: self.settings.speech_voice.clone(),
        });

        match self.model.generate(request).await {
            Ok(response) => response
                .audio
                .filter(|a| !a.data.is_empty())
                .map(SpeechClip::from),
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                None
            }
        }
    }

    /// Synthesizes a message or free text while holding the single speaking
    /// slot.
    pub async fn speak(&self, target: SpeechTarget) -> Result<Option<SpeechClip>, SpeechError> {
        let text = {
            let mut convo = self.lock_conversation();
            let text = match target {
                SpeechTarget::Message(id) => convo
                    .find(id)
                    .map(|m| m.content.clone())
                    .ok_or(SpeechError::NotFound(id))?,
                SpeechTarget::Text(text) => text,
            };
            if !convo.try_start_speaking() {
                return Err(SpeechError::Busy);
            }
            text
        };

        let _speaking = SpeakingGuard {
            conversation: &self.conversation,
        };
        Ok(self.synthesize(&text).await)
    }

    pub async fn adopt(&self, request: &AdoptRequest) -> Result<AdoptionReport, AdoptError> {
        let current = self.store.snapshot();
        let report = build_adoption(self.model.as_ref(), &self.settings, &current, request).await?;
        self.replace_config(report.config.clone()).await;
        Ok(report)
    }

    /// Swaps the tenant and starts the conversation over.
    pub async fn replace_config(&self, config: CompanyConfig) -> Message {
        let name = config.name.clone();
        let handbook_sections = config.handbook_sections.len();
        let holidays = config.holidays.len();

        self.store.replace(config);
        let greeting = self.lock_conversation().reset(&name);

        self.publish(AppEvent::ConfigReplaced {
            name,
            handbook_sections,
            holidays,
        })
        .await;
        self.publish(AppEvent::ConversationReset {
            greeting: greeting.clone(),
        })
        .await;
        greeting
    }

    pub fn live_setup(&self) -> LiveSetup {
        let config = self.store.snapshot();
        LiveSetup {
            model: self.settings.live_model.clone(),
            system_instruction: build_live_instruction(&config, self.settings.max_knowledge_chars),
            voice: self.settings.live_voice.clone(),
        }
    }

    pub fn bus(&self) -> &BusPublisher {
        &self.bus
    }

    async fn publish(&self, event: AppEvent) {
        if let Err(e) = self.bus.publish(event).await {
            tracing::warn!(error = %e, "failed to publish event");
        }
    }
}

fn lock(conversation: &Mutex<Conversation>) -> MutexGuard<'_, Conversation> {
    conversation.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees the send slot if the turn is dropped before its reply lands, e.g.
/// when the HTTP client disconnects mid-call.
struct TurnGuard<'a> {
    conversation: &'a Mutex<Conversation>,
    ticket: SendTicket,
    finished: bool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("send abandoned before the reply arrived");
            lock(self.conversation).abandon_send(self.ticket);
        }
    }
}

struct SpeakingGuard<'a> {
    conversation: &'a Mutex<Conversation>,
}

impl Drop for SpeakingGuard<'_> {
    fn drop(&mut self) {
        lock(self.conversation).stop_speaking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompanyStore, HireHelpConfig};
    use hirehelp_bus::{EventBus, Topic};
    use hirehelp_provider::{GenerateResponse, StubProvider};
    use hirehelp_schema::{default_company, Role};

    struct Failing;

    #[async_trait::async_trait]
    impl GenerativeModel for Failing {
        async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Err(anyhow::anyhow!("gemini api error (503) [retryable]: overloaded"))
        }
    }

    struct Blank;

    #[async_trait::async_trait]
    impl GenerativeModel for Blank {
        async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Ok(GenerateResponse::default())
        }
    }

    /// Records every request and answers with default content.
    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<GenerateRequest>>,
    }

    #[async_trait::async_trait]
    impl GenerativeModel for Recording {
        async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(GenerateResponse::default())
        }
    }

    /// Never answers the first call; later calls answer at once.
    #[derive(Default)]
    struct HangsOnce {
        started: tokio::sync::Notify,
        hung: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl GenerativeModel for HangsOnce {
        async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
            if !self.hung.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.started.notify_one();
                std::future::pending::<()>().await;
            }
            Ok(GenerateResponse {
                text: "answered".into(),
                ..Default::default()
            })
        }
    }

    fn assistant_with(model: Arc<dyn GenerativeModel>, bus: &EventBus) -> Assistant {
        Assistant::new(
            model,
            Arc::new(CompanyStore::default()),
            HireHelpConfig::default().assistant_settings(),
            bus.publisher(),
        )
    }

    #[tokio::test]
    async fn send_appends_user_and_reply() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe(Topic::MessageAppended).await;
        let assistant = assistant_with(Arc::new(StubProvider), &bus);

        let exchange = assistant.send("How many leave days do I get?").await.unwrap();
        let reply = exchange.reply.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_ne!(reply.content, APOLOGY_REPLY);
        assert_ne!(reply.content, NOT_FOUND_REPLY);

        let messages = assistant.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "How many leave days do I get?");

        assert!(matches!(rx.recv().await, Some(AppEvent::MessageAppended { message }) if message.role == Role::User));
        assert!(matches!(rx.recv().await, Some(AppEvent::MessageAppended { message }) if message.role == Role::Assistant));
        assert!(!assistant.is_busy().await);
    }

    #[tokio::test]
    async fn failed_call_appends_exactly_one_apology() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(Failing), &bus);

        assistant.send("hello").await.unwrap();
        let messages = assistant.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, APOLOGY_REPLY);
        assert!(messages[2].grounding_links.is_empty());
    }

    #[tokio::test]
    async fn blank_reply_becomes_not_found() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(Blank), &bus);
        let reply = assistant.chat_response("x", &default_company()).await;
        assert_eq!(reply.text, NOT_FOUND_REPLY);
    }

    #[tokio::test]
    async fn empty_send_is_ignored() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        assert_eq!(assistant.send("  ").await.unwrap_err(), SendError::Empty);
        assert_eq!(assistant.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn replace_config_resets_to_single_greeting() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe_all().await;
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        assistant.send("hi").await.unwrap();
        while rx.try_recv().is_ok() {}

        assistant.replace_config(default_company().renamed("Globex")).await;

        let messages = assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("**Globex**"));
        assert_eq!(assistant.company().name, "Globex");
        assert!(matches!(rx.recv().await, Some(AppEvent::ConfigReplaced { name, .. }) if name == "Globex"));
        assert!(matches!(rx.recv().await, Some(AppEvent::ConversationReset { .. })));
    }

    #[tokio::test]
    async fn quick_action_sends_tenant_prompt() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let exchange = assistant
            .dispatch(ChatCommand::Quick(crate::QuickAction::Mentors))
            .await
            .unwrap();
        assert_eq!(exchange.user.content, "Who are the mentors for new hires at HireHelp?");
    }

    #[tokio::test]
    async fn ask_missing_section_is_an_error() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let err = assistant
            .dispatch(ChatCommand::AskHandbook { index: 42 })
            .await
            .unwrap_err();
        assert_eq!(err, SendError::NoSuchSection(42));
    }

    #[tokio::test]
    async fn speech_returns_stub_clip() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let clip = assistant.synthesize(&"a".repeat(800)).await.unwrap();
        assert_eq!(clip.mime_type, "audio/pcm;rate=24000");
    }

    #[tokio::test]
    async fn speech_truncates_by_chars_and_wraps_text() {
        let bus = EventBus::new(16);
        let model = Arc::new(Recording::default());
        let assistant = assistant_with(model.clone(), &bus);

        assert!(assistant.synthesize(&"a".repeat(800)).await.is_none());
        assert!(assistant.synthesize(&"é".repeat(800)).await.is_none());

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt, format!("Say clearly: {}", "a".repeat(500)));
        assert_eq!(requests[0].model, "gemini-2.5-flash-preview-tts");
        assert_eq!(
            requests[0].format,
            ResponseFormat::Audio {
                voice: "Kore".into()
            }
        );
        assert_eq!(requests[1].prompt, format!("Say clearly: {}", "é".repeat(500)));
    }

    #[tokio::test]
    async fn cancelled_send_frees_the_slot() {
        let bus = EventBus::new(16);
        let model = Arc::new(HangsOnce::default());
        let assistant = Arc::new(assistant_with(model.clone(), &bus));

        let pending = tokio::spawn({
            let assistant = assistant.clone();
            async move { assistant.send("hello").await }
        });
        model.started.notified().await;
        assert!(assistant.is_busy().await);

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert!(!assistant.is_busy().await);

        let exchange = assistant.send("again").await.unwrap();
        assert_eq!(exchange.reply.unwrap().content, "answered");
        let contents: Vec<_> = assistant
            .messages()
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents[1..], ["hello", "again", "answered"]);
    }

    #[tokio::test]
    async fn cancelled_speech_frees_the_slot() {
        let bus = EventBus::new(16);
        let model = Arc::new(HangsOnce::default());
        let assistant = Arc::new(assistant_with(model.clone(), &bus));

        let pending = tokio::spawn({
            let assistant = assistant.clone();
            async move { assistant.speak(SpeechTarget::Text("hello".into())).await }
        });
        model.started.notified().await;
        assert!(assistant.is_speaking().await);
        assert_eq!(
            assistant
                .speak(SpeechTarget::Text("too soon".into()))
                .await
                .unwrap_err(),
            SpeechError::Busy
        );

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert!(!assistant.is_speaking().await);
        assert!(assistant.speak(SpeechTarget::Text("again".into())).await.is_ok());
    }

    #[tokio::test]
    async fn speech_failure_is_nothing_to_play() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(Failing), &bus);
        assert!(assistant.synthesize("hello").await.is_none());
    }

    #[tokio::test]
    async fn speak_unknown_message_is_not_found() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let id = Uuid::new_v4();
        assert_eq!(
            assistant.speak(SpeechTarget::Message(id)).await.unwrap_err(),
            SpeechError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn speak_existing_message_releases_slot() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let id = assistant.messages().await[0].id;
        assert!(assistant.speak(SpeechTarget::Message(id)).await.unwrap().is_some());
        assert!(assistant.speak(SpeechTarget::Message(id)).await.is_ok());
    }

    #[test]
    fn live_setup_uses_voice_settings() {
        let bus = EventBus::new(16);
        let assistant = assistant_with(Arc::new(StubProvider), &bus);
        let setup = assistant.live_setup();
        assert_eq!(setup.voice, "Zephyr");
        assert_eq!(setup.model, "gemini-2.5-flash-native-audio-preview-09-2025");
        assert!(setup.system_instruction.ends_with("Keep answers extremely short."));
    }
}
