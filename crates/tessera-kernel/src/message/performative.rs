use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FIPA 通信行为
/// FIPA communicative act of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Performative {
    AcceptProposal,
    Agree,
    Cancel,
    CallForProposal,
    Confirm,
    Disconfirm,
    Failure,
    Inform,
    InformIf,
    InformRef,
    NotUnderstood,
    Propagate,
    Propose,
    Proxy,
    QueryIf,
    QueryRef,
    Refuse,
    RejectProposal,
    Request,
    RequestWhen,
    RequestWhenever,
    Subscribe,
}

impl Performative {
    /// Every performative, in FIPA catalogue order.
    pub const ALL: [Performative; 22] = [
        Performative::AcceptProposal,
        Performative::Agree,
        Performative::Cancel,
        Performative::CallForProposal,
        Performative::Confirm,
        Performative::Disconfirm,
        Performative::Failure,
        Performative::Inform,
        Performative::InformIf,
        Performative::InformRef,
        Performative::NotUnderstood,
        Performative::Propagate,
        Performative::Propose,
        Performative::Proxy,
        Performative::QueryIf,
        Performative::QueryRef,
        Performative::Refuse,
        Performative::RejectProposal,
        Performative::Request,
        Performative::RequestWhen,
        Performative::RequestWhenever,
        Performative::Subscribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Performative::AcceptProposal => "ACCEPT_PROPOSAL",
            Performative::Agree => "AGREE",
            Performative::Cancel => "CANCEL",
            Performative::CallForProposal => "CALL_FOR_PROPOSAL",
            Performative::Confirm => "CONFIRM",
            Performative::Disconfirm => "DISCONFIRM",
            Performative::Failure => "FAILURE",
            Performative::Inform => "INFORM",
            Performative::InformIf => "INFORM_IF",
            Performative::InformRef => "INFORM_REF",
            Performative::NotUnderstood => "NOT_UNDERSTOOD",
            Performative::Propagate => "PROPAGATE",
            Performative::Propose => "PROPOSE",
            Performative::Proxy => "PROXY",
            Performative::QueryIf => "QUERY_IF",
            Performative::QueryRef => "QUERY_REF",
            Performative::Refuse => "REFUSE",
            Performative::RejectProposal => "REJECT_PROPOSAL",
            Performative::Request => "REQUEST",
            Performative::RequestWhen => "REQUEST_WHEN",
            Performative::RequestWhenever => "REQUEST_WHENEVER",
            Performative::Subscribe => "SUBSCRIBE",
        }
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Performative {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Performative::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("Unknown performative: {s}"))
    }
}
