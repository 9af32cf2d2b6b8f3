//! `X-Replicache-RequestID` header parsing.

use std::fmt;

/// Components of the `X-Replicache-RequestID` header.
///
/// The header has the form `<clientID>-<sessionID>-<requestCount>`. Clients
/// are not required to send it, and any part may be missing; this type is
/// only used to annotate logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestId {
    /// Client that issued the request.
    pub client_id: Option<String>,
    /// Session of the client.
    pub session_id: Option<String>,
    /// Per-session request counter.
    pub request_count: Option<String>,
}

impl RequestId {
    /// Parses a header value.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut parts = header.splitn(3, '-').map(|part| {
            if part.is_empty() {
                None
            } else {
                Some(part.to_string())
            }
        });
        Self {
            client_id: parts.next().flatten(),
            session_id: parts.next().flatten(),
            request_count: parts.next().flatten(),
        }
    }

    /// Parses an optional header value; `None` yields an empty id.
    #[must_use]
    pub fn from_header(header: Option<&str>) -> Self {
        header.map(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |p: &Option<String>| p.clone().unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "{}-{}-{}",
            part(&self.client_id),
            part(&self.session_id),
            part(&self.request_count)
        )
    }
}
