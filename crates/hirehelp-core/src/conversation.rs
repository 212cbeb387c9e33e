use hirehelp_schema::Message;
use uuid::Uuid;

pub fn welcome_greeting(company_name: &str) -> Message {
    Message::assistant(format!(
        "👋 Welcome to {company_name}! I'm your smart onboarding assistant. I've been configured with your company's latest knowledge base. How can I help you settle in?"
    ))
}

pub fn reset_greeting(company_name: &str) -> Message {
    Message::assistant(format!(
        "I am now updated with the knowledge base for **{company_name}**. You can ask me about policies, holidays, or use the quick action buttons."
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("message is empty")]
    Empty,
    #[error("a previous message is still being answered")]
    Busy,
    #[error("no handbook section at index {0}")]
    NoSuchSection(usize),
}

/// Ticket for an in-flight send. A reply is only accepted while the
/// conversation is still on the generation it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    generation: u64,
}

/// Append-only history plus the two single-occupancy slots the
/// presentation layer shows: "thinking" and "speaking".
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    generation: u64,
    busy: bool,
    speaking: bool,
}

impl Conversation {
    pub fn new(company_name: &str) -> Self {
        Self {
            messages: vec![welcome_greeting(company_name)],
            generation: 0,
            busy: false,
            speaking: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn find(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Claims the send slot and records the user's message.
    pub fn begin_send(&mut self, text: &str) -> Result<(SendTicket, Message), SendError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SendError::Empty);
        }
        if self.busy {
            return Err(SendError::Busy);
        }
        self.busy = true;
        let message = Message::user(trimmed);
        self.messages.push(message.clone());
        Ok((
            SendTicket {
                generation: self.generation,
            },
            message,
        ))
    }

    /// Releases the send slot. Returns `false` when the conversation was
    /// reset in the meantime and the reply was dropped.
    pub fn finish_send(&mut self, ticket: SendTicket, reply: Message) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.busy = false;
        self.messages.push(reply);
        true
    }

    /// Releases the send slot without a reply, for a send that was
    /// abandoned before the model answered.
    pub fn abandon_send(&mut self, ticket: SendTicket) {
        if ticket.generation == self.generation {
            self.busy = false;
        }
    }

    /// Starts over with a single greeting for the new tenant.
    pub fn reset(&mut self, company_name: &str) -> Message {
        let greeting = reset_greeting(company_name);
        self.messages = vec![greeting.clone()];
        self.generation += 1;
        self.busy = false;
        greeting
    }

    pub fn try_start_speaking(&mut self) -> bool {
        if self.speaking {
            return false;
        }
        self.speaking = true;
        true
    }

    pub fn stop_speaking(&mut self) {
        self.speaking = false;
    }
}
