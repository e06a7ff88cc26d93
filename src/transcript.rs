//! Chat transcript: an ordered log of turns plus change notifications.
//!
//! A [`Turn`] is created once per message and then mutated in place while a
//! response streams in, so a UI keyed by turn id never sees duplicates.
//! [`SharedTranscript`] wraps the log for the orchestrators and publishes a
//! [`TranscriptEvent`] for every change.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::store::ProductSummary;
use crate::tools::ToolCall;

/// Id prefix of turns built from live transcription deltas.
pub const LIVE_ID_PREFIX: &str = "live-";

/// Capacity of the transcript event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Who a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Diagnostic entries, such as a record of a tool call.
    Log,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_card: Option<ProductSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// New turn with a random id.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), role, text)
    }

    pub fn with_id(id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            function_call: None,
            product_card: None,
            image_data_url: None,
            created_at: Utc::now(),
        }
    }

    /// New turn whose id carries [`LIVE_ID_PREFIX`].
    pub fn live(role: Role, text: impl Into<String>) -> Self {
        Self::with_id(format!("{LIVE_ID_PREFIX}{}", uuid::Uuid::new_v4()), role, text)
    }

    pub fn with_function_call(mut self, call: ToolCall) -> Self {
        self.function_call = Some(call);
        self
    }

    pub fn with_product_card(mut self, card: ProductSummary) -> Self {
        self.product_card = Some(card);
        self
    }

    pub fn with_image_data_url(mut self, url: impl Into<String>) -> Self {
        self.image_data_url = Some(url.into());
        self
    }

    pub fn is_live(&self) -> bool {
        self.id.starts_with(LIVE_ID_PREFIX)
    }
}

/// Change notification for transcript observers.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    TurnAppended(Turn),
    /// A turn changed in place. Carries the full updated turn.
    TurnUpdated(Turn),
    Cleared,
}

/// Plain ordered transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, id: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Fold a transcription delta into the transcript.
    ///
    /// The delta extends the last turn when that turn has the same role and
    /// is a live turn; otherwise a new live turn starts. Returns the id of the
    /// affected turn and whether it was newly appended.
    pub fn coalesce_live(&mut self, role: Role, delta: &str) -> (String, bool) {
        if let Some(last) = self.turns.last_mut()
            && last.role == role
            && last.is_live()
        {
            last.text.push_str(delta);
            return (last.id.clone(), false);
        }
        let turn = Turn::live(role, delta);
        let id = turn.id.clone();
        self.turns.push(turn);
        (id, true)
    }
}

/// Transcript shared between an orchestrator and its observers.
#[derive(Debug, Clone)]
pub struct SharedTranscript {
    inner: Arc<Mutex<Transcript>>,
    events: broadcast::Sender<TranscriptEvent>,
}

impl Default for SharedTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTranscript {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Mutex::new(Transcript::new())),
            events,
        }
    }

    /// Receive every subsequent change.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    /// Ordered copy of all turns.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().turns().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<Turn> {
        self.lock().get(id).cloned()
    }

    pub fn last(&self) -> Option<Turn> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append a turn and return its id.
    pub fn append(&self, turn: Turn) -> String {
        let id = turn.id.clone();
        self.lock().push(turn.clone());
        self.publish(TranscriptEvent::TurnAppended(turn));
        id
    }

    /// Mutate a turn in place. Returns the updated turn, or `None` if the id
    /// is unknown (for example after a clear).
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Turn)) -> Option<Turn> {
        let updated = {
            let mut guard = self.lock();
            let turn = guard.get_mut(id)?;
            f(turn);
            turn.clone()
        };
        self.publish(TranscriptEvent::TurnUpdated(updated.clone()));
        Some(updated)
    }

    /// Append streamed text to a turn.
    pub fn append_text(&self, id: &str, delta: &str) -> Option<Turn> {
        self.update(id, |turn| turn.text.push_str(delta))
    }

    /// See [`Transcript::coalesce_live`].
    pub fn coalesce_live(&self, role: Role, delta: &str) -> String {
        let (id, appended, turn) = {
            let mut guard = self.lock();
            let (id, appended) = guard.coalesce_live(role, delta);
            let turn = guard.get(&id).cloned();
            (id, appended, turn)
        };
        if let Some(turn) = turn {
            self.publish(if appended {
                TranscriptEvent::TurnAppended(turn)
            } else {
                TranscriptEvent::TurnUpdated(turn)
            });
        }
        id
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.publish(TranscriptEvent::Cleared);
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: TranscriptEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn streamed_chunks_fill_one_turn() {
        let transcript = SharedTranscript::new();
        let id = transcript.append(Turn::new(Role::Assistant, ""));
        for chunk in ["Hel", "lo ", "world"] {
            transcript.append_text(&id, chunk);
        }
        let turns = transcript.snapshot();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "Hello world");
    }

    #[test]
    fn events_follow_mutations() {
        let transcript = SharedTranscript::new();
        let mut rx = transcript.subscribe();
        let id = transcript.append(Turn::new(Role::User, "hi"));
        transcript.append_text(&id, "!");
        transcript.clear();

        match rx.try_recv().unwrap() {
            TranscriptEvent::TurnAppended(turn) => assert_eq!(turn.text, "hi"),
            other => panic!("unexpected {other:?}"),
        }
        match rx.try_recv().unwrap() {
            TranscriptEvent::TurnUpdated(turn) => assert_eq!(turn.text, "hi!"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rx.try_recv().unwrap(), TranscriptEvent::Cleared);
        assert!(transcript.is_empty());
    }

    #[test]
    fn update_unknown_id_is_none() {
        let transcript = SharedTranscript::new();
        assert!(transcript.update("missing", |t| t.text.clear()).is_none());
    }

    #[test]
    fn live_deltas_coalesce_by_role() {
        let mut transcript = Transcript::new();
        let (a, new_a) = transcript.coalesce_live(Role::User, "Do you ");
        let (b, new_b) = transcript.coalesce_live(Role::User, "have mugs?");
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(a, b);
        assert!(a.starts_with(LIVE_ID_PREFIX));

        let (c, new_c) = transcript.coalesce_live(Role::Assistant, "Yes");
        assert!(new_c);
        assert_ne!(a, c);
        transcript.coalesce_live(Role::Assistant, ", we do.");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].text, "Do you have mugs?");
        assert_eq!(transcript.turns()[1].text, "Yes, we do.");
    }

    #[test]
    fn non_live_turn_breaks_coalescing() {
        let mut transcript = Transcript::new();
        transcript.coalesce_live(Role::Assistant, "One");
        transcript.push(Turn::new(Role::Assistant, "card"));
        transcript.coalesce_live(Role::Assistant, "Two");
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[2].text, "Two");
    }

    #[test]
    fn turn_serializes_role_lowercase() {
        let turn = Turn::with_id("t1", Role::Log, "called add_to_cart");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "log");
        assert!(value.get("product_card").is_none());
    }
}
