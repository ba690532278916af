use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Source;

/// Rank label used when a source carries no rank, or rank 0.
pub const UNKNOWN_RANK: &str = "?";

/// Filename used when a source carries no filename.
pub const UNKNOWN_FILENAME: &str = "Unknown";

/// Excerpt used when a source carries no excerpt.
pub const MISSING_EXCERPT: &str = "Excerpt unavailable";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Typed by the person at the keyboard.
    User,
    /// Produced by the assistant or the client on its behalf.
    Bot,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::User => write!(f, "user"),
            MessageKind::Bot => write!(f, "bot"),
        }
    }
}

/// Identifier of a message, unique and increasing within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source citation, resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Rank label, `"?"` when unknown.
    pub rank: String,
    /// Document name, `"Unknown"` when missing.
    pub filename: String,
    /// Supporting passage, `"Excerpt unavailable"` when missing.
    pub excerpt: String,
}

impl Citation {
    /// Resolves a wire source, substituting placeholders for missing fields.
    ///
    /// Blank strings count as missing.
    pub fn from_source(source: &Source) -> Self {
        Self {
            rank: source
                .rank
                .as_ref()
                .and_then(|r| r.label())
                .unwrap_or_else(|| UNKNOWN_RANK.to_string()),
            filename: non_blank(source.filename.as_deref())
                .unwrap_or(UNKNOWN_FILENAME)
                .to_string(),
            excerpt: non_blank(source.excerpt.as_deref())
                .unwrap_or(MISSING_EXCERPT)
                .to_string(),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank {} - {}: {}", self.rank, self.filename, self.excerpt)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// The content of a message: text plus zero or more citations.
///
/// The body carries no markup; renderers decide how it looks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    /// The message text. May span several lines.
    pub text: String,
    /// Citations supporting the text, in the order the backend gave them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl MessageBody {
    /// Creates a body holding only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    /// Creates a body with citations.
    pub fn with_citations(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }

    /// Returns the header line shown above the citations, if there are any.
    pub fn sources_header(&self) -> Option<String> {
        if self.citations.is_empty() {
            None
        } else {
            Some(format!("Sources ({}):", self.citations.len()))
        }
    }

    /// Renders the body as plain text.
    ///
    /// Without citations this is exactly the text.  Otherwise a blank line,
    /// the sources header and one line per citation follow.
    pub fn plain_text(&self) -> String {
        let Some(header) = self.sources_header() else {
            return self.text.clone();
        };
        let mut out = String::with_capacity(self.text.len() + 64 * self.citations.len());
        out.push_str(&self.text);
        out.push_str("\n\n");
        out.push_str(&header);
        for citation in &self.citations {
            out.push('\n');
            out.push_str(&citation.to_string());
        }
        out
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        MessageBody::text(text)
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        MessageBody::text(text)
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique within the session.
    pub id: MessageId,
    /// Who wrote it.
    pub kind: MessageKind,
    /// What it says.
    pub body: MessageBody,
    /// When it was appended.
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(id: MessageId, kind: MessageKind, body: MessageBody) -> Self {
        Self {
            id,
            kind,
            body,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns the plain-text rendering of the body.
    pub fn text(&self) -> String {
        self.body.plain_text()
    }

    /// Returns true if the user wrote this message.
    pub fn is_user(&self) -> bool {
        self.kind == MessageKind::User
    }
}
