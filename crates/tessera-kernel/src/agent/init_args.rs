use super::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Agent 初始化参数
/// Agent initialization arguments
///
/// Unique string keys mapped to string values. Handed to
/// [`Agent::init`](super::Agent::init) once; the runtime keeps no copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentInitArgs {
    args: HashMap<String, String>,
}

impl AgentInitArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` pairs. The value is everything after the first `=`.
    pub fn from_pairs<I, S>(pairs: I) -> AgentResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = HashMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                AgentError::InvalidInput(format!("expected key=value, got '{pair}'"))
            })?;
            if key.is_empty() {
                return Err(AgentError::InvalidInput(format!("empty key in '{pair}'")));
            }
            args.insert(key.to_string(), value.to_string());
        }
        Ok(Self { args })
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get) but reports the missing key as an init failure.
    pub fn require(&self, key: &str) -> AgentResult<&str> {
        self.get(key)
            .ok_or_else(|| AgentError::MissingArgument(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.args
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AgentInitArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            args: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
