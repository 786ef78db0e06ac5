//! Message vocabulary shared with embedded story documents.
//!
//! Everything that crosses a messaging channel is typed here: outbound
//! [`Request`]s (host → document), inbound [`InboundMessage`]s
//! (document → host) and the state keys both sides agree on.  Payloads are
//! serialised to JSON at the channel boundary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ───────────────────────────────────────── shared states ─────

/// Visibility states communicated to embedded documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    Visible,
    Inactive,
    Paused,
    Prerender,
}

impl VisibilityState {
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::Inactive => "inactive",
            VisibilityState::Paused => "paused",
            VisibilityState::Prerender => "prerender",
        }
    }
}

/// Document-state keys used by `onDocumentState` / `getDocumentState` /
/// `setDocumentState` / `documentStateUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStateKind {
    #[serde(rename = "PAGE_ATTACHMENT_STATE")]
    PageAttachment,
    #[serde(rename = "UI_STATE")]
    Ui,
    #[serde(rename = "MUTED_STATE")]
    Muted,
    #[serde(rename = "CURRENT_PAGE_ID")]
    CurrentPageId,
    #[serde(rename = "STORY_PROGRESS")]
    StoryProgress,
    #[serde(rename = "ASPECT_RATIO")]
    AspectRatio,
}

impl DocumentStateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStateKind::PageAttachment => "PAGE_ATTACHMENT_STATE",
            DocumentStateKind::Ui => "UI_STATE",
            DocumentStateKind::Muted => "MUTED_STATE",
            DocumentStateKind::CurrentPageId => "CURRENT_PAGE_ID",
            DocumentStateKind::StoryProgress => "STORY_PROGRESS",
            DocumentStateKind::AspectRatio => "ASPECT_RATIO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PAGE_ATTACHMENT_STATE" => Some(DocumentStateKind::PageAttachment),
            "UI_STATE" => Some(DocumentStateKind::Ui),
            "MUTED_STATE" => Some(DocumentStateKind::Muted),
            "CURRENT_PAGE_ID" => Some(DocumentStateKind::CurrentPageId),
            "STORY_PROGRESS" => Some(DocumentStateKind::StoryProgress),
            "ASPECT_RATIO" => Some(DocumentStateKind::AspectRatio),
            _ => None,
        }
    }
}

/// State value pushed by an embedded document through `documentStateUpdate`.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    PageAttachment(bool),
    CurrentPageId(String),
    Muted(bool),
    Ui(i64),
    AspectRatio(f64),
    /// Free-form player event passthrough (`PLAYER_EVENT` state).
    PlayerEvent(String),
}

impl StateUpdate {
    /// Decode a raw `{state, value}` pair.  Unknown states or mismatched
    /// value shapes yield `None` and are dropped by the caller.
    pub fn decode(state: &str, value: &Value) -> Option<Self> {
        if state == "PLAYER_EVENT" {
            return value.as_str().map(|v| StateUpdate::PlayerEvent(v.to_owned()));
        }
        match DocumentStateKind::from_str(state)? {
            DocumentStateKind::PageAttachment => {
                value.as_bool().map(StateUpdate::PageAttachment)
            }
            DocumentStateKind::CurrentPageId => value
                .as_str()
                .map(|v| StateUpdate::CurrentPageId(v.to_owned())),
            DocumentStateKind::Muted => value.as_bool().map(StateUpdate::Muted),
            DocumentStateKind::Ui => value.as_i64().map(StateUpdate::Ui),
            DocumentStateKind::AspectRatio => value.as_f64().map(StateUpdate::AspectRatio),
            DocumentStateKind::StoryProgress => None,
        }
    }
}

// ───────────────────────────────────────── touch samples ─────

/// A single touch point, in both client and screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub client_x: f64,
    pub client_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

/// A raw touch event forwarded from an embedded document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    pub touches: Vec<TouchPoint>,
    pub timestamp_ms: f64,
}

impl TouchEvent {
    /// The tracked (first) touch, if any.  Multi-touch gestures follow the
    /// first finger; events without touches are ignored.
    pub fn primary(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }
}

// ───────────────────────────────────────── outbound ──────────

/// A request sent host → embedded document over a story channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Subscribe the embedded side to push updates for a state key.
    OnDocumentState { state: DocumentStateKind },
    GetDocumentState { state: DocumentStateKind },
    SetDocumentState {
        state: DocumentStateKind,
        value: Value,
    },
    VisibilityChange { state: VisibilityState },
    SelectPageById { id: String },
    SelectPageDelta { delta: i64 },
    Rewind,
    CustomDocumentUi { controls: Value },
}

impl Request {
    /// Wire name of the request.
    pub fn name(&self) -> &'static str {
        match self {
            Request::OnDocumentState { .. } => "onDocumentState",
            Request::GetDocumentState { .. } => "getDocumentState",
            Request::SetDocumentState { .. } => "setDocumentState",
            Request::VisibilityChange { .. } => "visibilitychange",
            Request::SelectPageById { .. } | Request::SelectPageDelta { .. } => "selectPage",
            Request::Rewind => "rewind",
            Request::CustomDocumentUi { .. } => "customDocumentUI",
        }
    }

    /// JSON payload of the request.
    pub fn payload(&self) -> Value {
        match self {
            Request::OnDocumentState { state } | Request::GetDocumentState { state } => {
                json!({ "state": state.as_str() })
            }
            Request::SetDocumentState { state, value } => {
                json!({ "state": state.as_str(), "value": value })
            }
            Request::VisibilityChange { state } => json!({ "state": state.as_str() }),
            Request::SelectPageById { id } => json!({ "id": id }),
            Request::SelectPageDelta { delta } => json!({ "delta": delta }),
            Request::Rewind => json!({}),
            Request::CustomDocumentUi { controls } => json!({ "controls": controls }),
        }
    }

    /// Whether the embedded side is expected to answer.
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            Request::GetDocumentState { .. } | Request::VisibilityChange { .. }
        )
    }
}

// ───────────────────────────────────────── inbound ───────────

/// Messages pushed embedded document → host.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    TouchStart(TouchEvent),
    TouchMove(TouchEvent),
    TouchEnd(TouchEvent),
    /// A tap on the document's edge asking for the next/previous story.
    SelectDocument { next: bool, previous: bool },
    /// The document finished its first meaningful paint.
    StoryContentLoaded,
    DocumentStateUpdate(StateUpdate),
}

impl InboundMessage {
    /// Decode a named message with a JSON payload, as received from a real
    /// transport.  Returns `None` for unknown names or malformed payloads.
    pub fn decode(name: &str, data: &Value) -> Option<Self> {
        match name {
            "touchstart" | "touchmove" | "touchend" => {
                let ev: TouchEvent = serde_json::from_value(data.clone()).ok()?;
                Some(match name {
                    "touchstart" => InboundMessage::TouchStart(ev),
                    "touchmove" => InboundMessage::TouchMove(ev),
                    _ => InboundMessage::TouchEnd(ev),
                })
            }
            "selectDocument" => Some(InboundMessage::SelectDocument {
                next: data.get("next").and_then(Value::as_bool).unwrap_or(false),
                previous: data
                    .get("previous")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            "storyContentLoaded" => Some(InboundMessage::StoryContentLoaded),
            "documentStateUpdate" => {
                let state = data.get("state")?.as_str()?;
                let value = data.get("value")?;
                StateUpdate::decode(state, value).map(InboundMessage::DocumentStateUpdate)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shapes() {
        let req = Request::OnDocumentState {
            state: DocumentStateKind::Muted,
        };
        assert_eq!(req.name(), "onDocumentState");
        assert_eq!(req.payload(), json!({"state": "MUTED_STATE"}));
        assert!(!req.expects_response());

        let req = Request::GetDocumentState {
            state: DocumentStateKind::StoryProgress,
        };
        assert_eq!(req.payload(), json!({"state": "STORY_PROGRESS"}));
        assert!(req.expects_response());

        let req = Request::SelectPageById { id: "page-2".into() };
        assert_eq!(req.name(), "selectPage");
        assert_eq!(req.payload(), json!({"id": "page-2"}));
    }

    #[test]
    fn decode_document_state_update() {
        let msg = InboundMessage::decode(
            "documentStateUpdate",
            &json!({"state": "PAGE_ATTACHMENT_STATE", "value": true}),
        );
        assert_eq!(
            msg,
            Some(InboundMessage::DocumentStateUpdate(
                StateUpdate::PageAttachment(true)
            ))
        );
        // Unknown state names are dropped, not errors.
        assert_eq!(
            InboundMessage::decode(
                "documentStateUpdate",
                &json!({"state": "NOT_A_STATE", "value": 1}),
            ),
            None
        );
    }

    #[test]
    fn decode_select_document() {
        let msg = InboundMessage::decode("selectDocument", &json!({"next": true}));
        assert_eq!(
            msg,
            Some(InboundMessage::SelectDocument {
                next: true,
                previous: false
            })
        );
    }
}
