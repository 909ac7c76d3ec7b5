//! Matrix room as a remote ordered log.
//!
//! A Matrix room is a shared append-only timeline, which is all the remote
//! transport needs: [`MatrixLog`] appends the collection as an `m.text`
//! message (with a `<pre>` formatted body so humans can read it in a
//! client) and reads the newest room messages back for import scanning.
//!
//! Uses the plain client-server REST API over blocking reqwest. No request
//! timeouts are set; a hung homeserver stalls that one transport
//! operation, never local mutation.

use std::sync::Mutex;

use serde_json::json;

use super::remote_log::RemoteLog;
use crate::error::{ReiseplanError, Result};
use crate::notify::{NotificationSink, Toast};

/// Authenticated Matrix session, obtained through [`login_to_matrix`].
///
/// Opaque to everything but the transport; the rest of the system only
/// stores and forwards it.
#[derive(Clone)]
pub struct Session {
    access_token: String,
    user_id: String,
}

impl Session {
    /// Reconstruct a session from stored credentials.
    pub fn new(access_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_id: user_id.into(),
        }
    }

    /// The fully-qualified Matrix user id (`@user:server`).
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The bearer token authenticating this session.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the access token
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Remote log backed by a Matrix room.
pub struct MatrixLog {
    homeserver_url: String,
    room_id: String,
    resolved: Mutex<Option<String>>,
    session: Session,
    client: reqwest::blocking::Client,
}

impl MatrixLog {
    /// Create a log over the given room on `homeserver_url`.
    ///
    /// `room_id` may be a `!room:server` id or a `#alias:server`; aliases
    /// are resolved through the directory on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(homeserver_url: &str, room_id: &str, session: Session) -> Result<Self> {
        // The blocking client defaults to a 30s timeout; transports impose none
        let client = reqwest::blocking::Client::builder().timeout(None).build()?;
        Ok(Self {
            homeserver_url: homeserver_url.trim_end_matches('/').to_string(),
            room_id: room_id.to_string(),
            resolved: Mutex::new(None),
            session,
            client,
        })
    }

    /// The room this log reads and writes, as configured.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/_matrix/client/v3/{}", self.homeserver_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.access_token)
    }

    /// The room id to use in `rooms/{roomId}/...` paths.
    ///
    /// Plain ids pass through; `#aliases` are looked up in the room
    /// directory once and cached for the lifetime of the log.
    fn resolved_room_id(&self) -> Result<String> {
        if !self.room_id.starts_with('#') {
            return Ok(self.room_id.clone());
        }
        if let Some(id) = self.resolved.lock().unwrap().clone() {
            return Ok(id);
        }

        let url = self.endpoint(&format!(
            "directory/room/{}",
            urlencoding::encode(&self.room_id)
        ));
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()?;
        let json = expect_json(response)?;
        let id = string_field(&json, "room_id")?;
        log::debug!("[Transport] Resolved {} to {}", self.room_id, id);
        *self.resolved.lock().unwrap() = Some(id.clone());
        Ok(id)
    }
}

impl RemoteLog for MatrixLog {
    fn display_name(&self) -> &str {
        "Matrix"
    }

    fn join(&self) -> Result<()> {
        // The join endpoint takes ids and #aliases alike, no resolution needed
        let url = self.endpoint(&format!("join/{}", urlencoding::encode(&self.room_id)));
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&json!({}))
            .send()?;
        expect_json(response)?;
        Ok(())
    }

    fn append(&self, body: &str) -> Result<()> {
        let room_id = self.resolved_room_id()?;
        // Unique transaction id makes retried sends idempotent server-side
        let url = self.endpoint(&format!(
            "rooms/{}/send/m.room.message/{}",
            urlencoding::encode(&room_id),
            uuid::Uuid::new_v4()
        ));
        let response = self
            .client
            .put(&url)
            .header("Authorization", self.bearer())
            .json(&message_payload(body))
            .send()?;
        expect_json(response)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let room_id = self.resolved_room_id()?;
        let url = self.endpoint(&format!(
            "rooms/{}/messages",
            urlencoding::encode(&room_id)
        ));
        let limit_str = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("dir", "b"), ("limit", limit_str.as_str())])
            .header("Authorization", self.bearer())
            .send()?;
        let json = expect_json(response)?;
        Ok(bodies_from_chunk(&json))
    }
}

impl std::fmt::Debug for MatrixLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixLog")
            .field("homeserver_url", &self.homeserver_url)
            .field("room_id", &self.room_id)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Log in with username and password, reporting the outcome through `sink`.
///
/// Returns the session on success, `None` otherwise.
pub fn login_to_matrix(
    homeserver_url: &str,
    username: &str,
    password: &str,
    sink: &dyn NotificationSink,
) -> Option<Session> {
    match request_login(homeserver_url, username, password) {
        Ok(session) => {
            sink.notify(Toast::success("Login successful", "Matrix login successful."));
            Some(session)
        }
        Err(e) => {
            sink.notify(Toast::error(
                "Login failed",
                format!("Matrix login failed. ({})", e),
            ));
            None
        }
    }
}

fn request_login(homeserver_url: &str, username: &str, password: &str) -> Result<Session> {
    let client = reqwest::blocking::Client::builder().timeout(None).build()?;
    let url = format!(
        "{}/_matrix/client/v3/login",
        homeserver_url.trim_end_matches('/')
    );
    let response = client
        .post(&url)
        .json(&json!({
            "type": "m.login.password",
            "user": username,
            "password": password,
        }))
        .send()?;
    let json = expect_json(response)?;

    let access_token = string_field(&json, "access_token")?;
    let user_id = string_field(&json, "user_id")?;
    Ok(Session::new(access_token, user_id))
}

/// The `m.room.message` content for a collection export.
fn message_payload(body: &str) -> serde_json::Value {
    json!({
        "msgtype": "m.text",
        "body": body,
        "format": "org.matrix.custom.html",
        "formatted_body": format!("<pre>{}</pre>", body),
    })
}

/// Message bodies from a `/messages` response, in response order
/// (newest first when fetched with `dir=b`). Non-message events and
/// events without a text body are skipped.
fn bodies_from_chunk(json: &serde_json::Value) -> Vec<String> {
    let Some(chunk) = json.get("chunk").and_then(|c| c.as_array()) else {
        return Vec::new();
    };
    chunk
        .iter()
        .filter(|event| event.get("type").and_then(|t| t.as_str()) == Some("m.room.message"))
        .filter_map(|event| {
            event
                .get("content")
                .and_then(|content| content.get("body"))
                .and_then(|body| body.as_str())
                .map(String::from)
        })
        .collect()
}

/// Parse a successful response as JSON, or surface status and error text.
fn expect_json(response: reqwest::blocking::Response) -> Result<serde_json::Value> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json()?)
    } else {
        Err(ReiseplanError::RemoteLog {
            status: status.as_u16(),
            message: error_message(&response.text().unwrap_or_default()),
        })
    }
}

/// The human-readable message of a Matrix error body.
///
/// Error bodies are `{"errcode": ..., "error": ...}`; non-JSON bodies are
/// passed through as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn string_field(json: &serde_json::Value, key: &str) -> Result<String> {
    json.get(key)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ReiseplanError::RemoteLog {
            status: 200,
            message: format!("response is missing '{}'", key),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_payload_embeds_preformatted_body() {
        let payload = message_payload(r#"[{"id":"1"}]"#);
        assert_eq!(payload["msgtype"], "m.text");
        assert_eq!(payload["body"], r#"[{"id":"1"}]"#);
        assert_eq!(payload["format"], "org.matrix.custom.html");
        assert_eq!(payload["formatted_body"], r#"<pre>[{"id":"1"}]</pre>"#);
    }

    #[test]
    fn test_bodies_from_chunk_skips_non_messages() {
        let response = json!({
            "chunk": [
                { "type": "m.room.message", "content": { "msgtype": "m.text", "body": "newest" } },
                { "type": "m.room.member", "content": { "membership": "join" } },
                { "type": "m.room.message", "content": { "msgtype": "m.image" } },
                { "type": "m.room.message", "content": { "msgtype": "m.text", "body": "older" } },
            ],
            "start": "t1",
            "end": "t0",
        });

        let bodies = bodies_from_chunk(&response);
        assert_eq!(bodies, vec!["newest", "older"]);
    }

    #[test]
    fn test_bodies_from_chunk_handles_missing_chunk() {
        assert!(bodies_from_chunk(&json!({})).is_empty());
    }

    #[test]
    fn test_error_message_prefers_the_matrix_error_field() {
        let body = r#"{"errcode":"M_FORBIDDEN","error":"Invalid password"}"#;
        assert_eq!(error_message(body), "Invalid password");

        // Proxies and gateways answer with plain text
        assert_eq!(error_message("502 Bad Gateway"), "502 Bad Gateway");
        assert_eq!(error_message(""), "");
    }

    #[test]
    fn test_session_debug_hides_access_token() {
        let session = Session::new("syt_secret_token", "@ann:matrix.org");
        let printed = format!("{:?}", session);
        assert!(printed.contains("@ann:matrix.org"));
        assert!(!printed.contains("syt_secret_token"));
    }

    #[test]
    fn test_plain_room_ids_skip_directory_lookup() {
        let session = Session::new("token", "@ann:matrix.org");
        let log = MatrixLog::new("https://matrix.example.org/", "!abc:example.org", session)
            .unwrap();

        // No request goes out for a non-alias id
        assert_eq!(log.resolved_room_id().unwrap(), "!abc:example.org");
        assert_eq!(log.room_id(), "!abc:example.org");
    }
}
