//! 智能体通信消息
//! Agent communication messages (FIPA ACL)
//!
//! An [`AclMessage`] is built by its sender, handed to the router once and
//! never mutated afterwards: the router wraps it in an `Arc` and every
//! receiver's mailbox gets a read-only reference to the same value.

mod performative;

pub use performative::Performative;

use crate::aid::Aid;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclMessage {
    pub performative: Performative,
    pub sender: Option<Aid>,
    pub receivers: Vec<Aid>,
    pub reply_to: Option<Aid>,
    /// Opaque payload; the runtime never inspects it.
    pub content: Option<String>,
    pub language: Option<String>,
    pub encoding: Option<String>,
    pub ontology: Option<String>,
    pub protocol: Option<String>,
    pub conversation_id: Option<String>,
    pub reply_with: Option<String>,
    pub in_reply_to: Option<String>,
    pub reply_by: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_args: HashMap<String, String>,
}

impl AclMessage {
    pub fn new(performative: Performative) -> Self {
        Self {
            performative,
            sender: None,
            receivers: Vec::new(),
            reply_to: None,
            content: None,
            language: None,
            encoding: None,
            ontology: None,
            protocol: None,
            conversation_id: None,
            reply_with: None,
            in_reply_to: None,
            reply_by: None,
            user_args: HashMap::new(),
        }
    }

    pub fn with_sender(mut self, sender: Aid) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_receiver(mut self, receiver: Aid) -> Self {
        self.receivers.push(receiver);
        self
    }

    pub fn with_receivers(mut self, receivers: impl IntoIterator<Item = Aid>) -> Self {
        self.receivers.extend(receivers);
        self
    }

    pub fn with_reply_to(mut self, reply_to: Aid) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Serializes `value` as JSON content and sets the language accordingly.
    pub fn with_json_content<T: Serialize>(mut self, value: &T) -> serde_json::Result<Self> {
        self.content = Some(serde_json::to_string(value)?);
        self.language = Some("json".to_string());
        Ok(self)
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn with_ontology(mut self, ontology: &str) -> Self {
        self.ontology = Some(ontology.to_string());
        self
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = Some(protocol.to_string());
        self
    }

    pub fn with_conversation_id(mut self, id: &str) -> Self {
        self.conversation_id = Some(id.to_string());
        self
    }

    /// Starts a fresh conversation with a random identifier.
    pub fn with_new_conversation(mut self) -> Self {
        self.conversation_id = Some(uuid::Uuid::new_v4().to_string());
        self
    }

    pub fn with_reply_with(mut self, token: &str) -> Self {
        self.reply_with = Some(token.to_string());
        self
    }

    pub fn with_in_reply_to(mut self, token: &str) -> Self {
        self.in_reply_to = Some(token.to_string());
        self
    }

    pub fn with_reply_by(mut self, deadline: DateTime<Utc>) -> Self {
        self.reply_by = Some(deadline);
        self
    }

    pub fn with_user_arg(mut self, key: &str, value: &str) -> Self {
        self.user_args.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds a receiver while the message is still being assembled.
    pub fn add_receiver(&mut self, receiver: Aid) {
        self.receivers.push(receiver);
    }

    /// Deserializes JSON content. `None` when the message has no content.
    pub fn json_content<T: DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.content.as_deref().map(serde_json::from_str)
    }

    /// Whether [`make_reply`](Self::make_reply) has somebody to address.
    pub fn can_reply(&self) -> bool {
        self.reply_to.is_some() || self.sender.is_some()
    }

    /// Whether the `reply_by` deadline has passed.
    pub fn is_overdue(&self) -> bool {
        self.reply_by.is_some_and(|deadline| deadline < Utc::now())
    }

    /// Builds a reply addressed to `reply_to`, falling back to the sender.
    ///
    /// The conversation, protocol, language, ontology and encoding carry over,
    /// and `in_reply_to` echoes this message's `reply_with` token.
    pub fn make_reply(&self, performative: Performative) -> AclMessage {
        let mut reply = AclMessage::new(performative);
        if let Some(to) = self.reply_to.as_ref().or(self.sender.as_ref()) {
            reply.receivers.push(to.clone());
        }
        reply.conversation_id = self.conversation_id.clone();
        reply.protocol = self.protocol.clone();
        reply.language = self.language.clone();
        reply.ontology = self.ontology.clone();
        reply.encoding = self.encoding.clone();
        reply.in_reply_to = self.reply_with.clone();
        reply
    }
}
