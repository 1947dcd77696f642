//! User-facing diagnostics.
//!
//! Every recoverable failure ends up here instead of propagating: the
//! operation that failed pushes a Notice, logs it, and returns an empty
//! or unchanged result. Front ends decide how to draw them.

use crate::error::{FailureClass, RanchoError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level:   NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class:   Option<FailureClass>,
}

/// Ordered notices emitted during one interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.0.push(Notice { level: NoticeLevel::Info, message, class: None });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.0.push(Notice { level: NoticeLevel::Success, message, class: None });
    }

    pub fn warning(&mut self, class: Option<FailureClass>, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.0.push(Notice { level: NoticeLevel::Warning, message, class });
    }

    pub fn error(&mut self, class: FailureClass, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.0.push(Notice { level: NoticeLevel::Error, message, class: Some(class) });
    }

    /// Record `err` as an error notice, prefixed with what was being attempted.
    pub fn failure(&mut self, context: &str, err: &RanchoError) {
        self.error(err.class(), format!("{context}: {err}"));
    }

    /// Append already-logged notices without logging them again.
    pub fn replay(&mut self, notices: &Notices) {
        self.0.extend(notices.0.iter().cloned());
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|n| n.level == NoticeLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.0.iter()
    }

    pub fn contains_level(&self, level: NoticeLevel) -> bool {
        self.0.iter().any(|n| n.level == level)
    }

    pub fn into_vec(self) -> Vec<Notice> {
        self.0
    }
}
