//! Text rendering of the synchronized player state.

use std::fmt::Write as _;

use remuco_core::{
    ConnectionEvent, Item, ItemList, MessageId, Payload, Playback, PlayerInfo, PlayerState,
    Progress, SyncId,
};
use serde::Serialize;
use serde_json::{Value, json};

/// Everything the server pushed so far, folded into one snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerView {
    pub player: Option<PlayerInfo>,
    pub state: PlayerState,
    pub progress: Progress,
    pub item: Option<Item>,
}

impl PlayerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&mut self, info: PlayerInfo) {
        self.player = Some(info);
    }

    /// Folds a pushed message into the view. Returns `false` for payloads
    /// the view does not track.
    pub fn apply(&mut self, id: MessageId, payload: Payload) -> bool {
        match (id, payload) {
            (MessageId::Sync(SyncId::State), Payload::State(state)) => self.state = state,
            (MessageId::Sync(SyncId::Progress), Payload::Progress(progress)) => {
                self.progress = progress
            }
            (MessageId::Sync(SyncId::Item), Payload::Item(item)) => {
                self.item = (!item.is_none()).then_some(item);
            }
            (_, Payload::PlayerInfo(info)) => self.player = Some(info),
            _ => return false,
        }
        true
    }

    /// One-line summary, e.g. `[play] Band - Song  1:05 / 3:20  vol 40%`.
    pub fn status_line(&self) -> String {
        let mut line = format!("[{}] ", playback_label(self.state.playback));
        match &self.item {
            Some(item) => line.push_str(&item_label(item)),
            None => line.push_str("(nothing playing)"),
        }
        let time = self.progress.display();
        if !time.is_empty() {
            let _ = write!(line, "  {time}");
        }
        let _ = write!(line, "  vol {}%", self.state.volume);
        if self.state.repeat {
            line.push_str("  repeat");
        }
        if self.state.shuffle {
            line.push_str("  shuffle");
        }
        line
    }

    /// Player header plus the status line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(player) = &self.player {
            let _ = writeln!(out, "{}", player.name);
        }
        out.push_str(&self.status_line());
        if let Some(item) = &self.item {
            let rating = item.rating();
            if rating > 0 {
                let max = self.player.as_ref().map_or(0, |p| p.max_rating);
                let _ = write!(out, "\nrating {rating}/{max}");
            }
            if let Some(album) = item.album() {
                let _ = write!(out, "\nalbum  {album}");
            }
        }
        out
    }
}

fn playback_label(playback: Playback) -> String {
    match playback {
        Playback::Stop => "stop".into(),
        Playback::Pause => "pause".into(),
        Playback::Play => "play".into(),
        Playback::Unknown(v) => format!("?{v}"),
    }
}

/// `Artist - Title`, falling back to whatever is known.
pub fn item_label(item: &Item) -> String {
    match (item.artist(), item.title()) {
        (Some(artist), Some(title)) => format!("{artist} - {title}"),
        (None, Some(title)) => title.to_string(),
        (Some(artist), None) => artist.to_string(),
        (None, None) => item.id.clone(),
    }
}

/// Item details as returned by `REQ_ITEM`.
pub fn render_item(item: &Item) -> String {
    let mut out = format!("item {}", item.id);
    for (key, value) in &item.meta {
        let _ = write!(out, "\n  {key:<8} {value}");
    }
    if !item.image.is_empty() {
        let _ = write!(out, "\n  image    {} bytes", item.image.len());
    }
    out
}

/// A browsable list: nested lists first, then numbered items.
pub fn render_list(title: &str, list: &ItemList) -> String {
    let mut out = String::from(title);
    if !list.path.is_empty() {
        let _ = write!(out, " /{}", list.path.join("/"));
    }
    if list.is_empty() {
        out.push_str("\n  (empty)");
        return out;
    }
    for nested in &list.nested {
        let _ = write!(out, "\n  + {nested}/");
    }
    for (n, (id, name)) in list.items().enumerate() {
        let _ = write!(out, "\n  {:>3}. {name}  [{id}]", n + 1);
    }
    out
}

// ── JSON ─────────────────────────────────────────────────────────

/// One JSON object per connection event, for `--json` output.
pub fn event_json(event: &ConnectionEvent) -> Value {
    match event {
        ConnectionEvent::Connected(info) => json!({ "event": "connected", "player": info }),
        ConnectionEvent::Message { id, payload } => json!({
            "event": "message",
            "id": id.as_raw(),
            "name": id.to_string(),
            "payload": payload,
        }),
        ConnectionEvent::Disconnected(reason) => json!({
            "event": "disconnected",
            "reason": reason.to_string(),
            "error": reason.is_error(),
        }),
    }
}

/// A request reply (or its failure) as JSON.
pub fn reply_json(what: &str, result: Result<&Payload, String>) -> Value {
    match result {
        Ok(payload) => json!({ "event": "reply", "request": what, "payload": payload }),
        Err(error) => json!({ "event": "reply", "request": what, "error": error }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remuco_core::Features;

    fn song() -> Item {
        Item::new("7")
            .with_meta("title", "Song")
            .with_meta("artist", "Band")
            .with_meta("album", "Record")
            .with_meta("rating", "3")
    }

    #[test]
    fn folds_sync_messages() {
        let mut view = PlayerView::new();
        assert!(view.apply(
            SyncId::State.into(),
            Payload::State(PlayerState {
                playback: Playback::Play,
                volume: 40,
                repeat: true,
                ..Default::default()
            }),
        ));
        assert!(view.apply(SyncId::Progress.into(), Payload::Progress(Progress::new(65, 200))));
        assert!(view.apply(SyncId::Item.into(), Payload::Item(song())));

        assert_eq!(
            view.status_line(),
            "[play] Band - Song  1:05 / 3:20  vol 40%  repeat"
        );
    }

    #[test]
    fn empty_item_clears_now_playing() {
        let mut view = PlayerView::new();
        view.apply(SyncId::Item.into(), Payload::Item(song()));
        view.apply(SyncId::Item.into(), Payload::Item(Item::default()));
        assert!(view.item.is_none());
        assert!(view.status_line().contains("(nothing playing)"));
    }

    #[test]
    fn ignores_untracked_payloads() {
        let mut view = PlayerView::new();
        assert!(!view.apply(SyncId::State.into(), Payload::Int(3)));
    }

    #[test]
    fn render_with_player_and_rating() {
        let mut view = PlayerView::new();
        view.connected(PlayerInfo::new("Amarok", Features::empty(), 5));
        view.apply(SyncId::Item.into(), Payload::Item(song()));
        let text = view.render();
        assert!(text.starts_with("Amarok\n"));
        assert!(text.contains("rating 3/5"));
        assert!(text.contains("album  Record"));
    }

    #[test]
    fn unknown_length_shows_elapsed_only() {
        let mut view = PlayerView::new();
        view.apply(SyncId::Progress.into(), Payload::Progress(Progress::new(5, -1)));
        assert!(view.status_line().contains("  0:05  vol"));
    }

    #[test]
    fn list_rendering() {
        let list = ItemList {
            path: vec!["Artists".into()],
            nested: vec!["Air".into()],
            ids: vec!["1".into()],
            names: vec!["La femme d'argent".into()],
        };
        let text = render_list("mlib", &list);
        assert_eq!(
            text,
            "mlib /Artists\n  + Air/\n    1. La femme d'argent  [1]"
        );
        assert_eq!(render_list("queue", &ItemList::default()), "queue\n  (empty)");
    }

    #[test]
    fn events_as_json() {
        let event = ConnectionEvent::Message {
            id: SyncId::Progress.into(),
            payload: Payload::Progress(Progress::new(1, 2)),
        };
        let value = event_json(&event);
        assert_eq!(value["event"], "message");
        assert_eq!(value["id"], 201);
        assert_eq!(value["payload"]["kind"], "progress");
        assert_eq!(value["payload"]["value"]["length"], 2);

        let event = ConnectionEvent::Disconnected(remuco_core::DisconnectReason::ServerClosed);
        let value = event_json(&event);
        assert_eq!(value["reason"], "server closed");
        assert_eq!(value["error"], false);
    }

    #[test]
    fn reply_errors_as_json() {
        let value = reply_json("playlist", Err("timeout after 30s".into()));
        assert_eq!(value["request"], "playlist");
        assert_eq!(value["error"], "timeout after 30s");
    }

    #[test]
    fn item_details() {
        let text = render_item(&song());
        assert!(text.starts_with("item 7"));
        assert!(text.contains("  title    Song"));
    }
}
