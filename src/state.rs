//! Remembered live status of the watched channel and the transitions that
//! trigger notifications.

use crate::twitch::StreamSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelState {
    /// Nothing observed yet in this process.
    #[default]
    Unknown,
    Offline,
    Live { game_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    GameSwitched,
}

impl ChannelState {
    /// Compares the first reported stream against the remembered state.
    ///
    /// Returns the next state and the event to announce, if any. The first
    /// observation only seeds the state, and any reported entry counts as
    /// streaming there. Leaving `Offline` needs an entry of type `live`;
    /// once live, the channel stays live until no entry is reported. Game
    /// switches are only reported when `track_games` is set, but the game id
    /// is remembered either way.
    #[must_use]
    pub fn observe(
        &self,
        stream: Option<&StreamSnapshot>,
        track_games: bool,
    ) -> (ChannelState, Option<StreamEvent>) {
        let Some(stream) = stream else {
            return (ChannelState::Offline, None);
        };
        let live = ChannelState::Live {
            game_id: stream.game_id.clone(),
        };

        match self {
            ChannelState::Unknown => (live, None),
            ChannelState::Offline if stream.is_live() => (live, Some(StreamEvent::Started)),
            ChannelState::Offline => (ChannelState::Offline, None),
            ChannelState::Live { game_id } => {
                let event = (track_games && *game_id != stream.game_id)
                    .then_some(StreamEvent::GameSwitched);
                (live, event)
            }
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, ChannelState::Live { .. })
    }
}
