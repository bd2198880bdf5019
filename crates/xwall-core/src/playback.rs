//! Playback state machine.
//!
//! Two inputs decide whether the video runs: the user's intent and the
//! auto-pause reason. [`PlaybackState::should_play`] is the only place they
//! meet, and the only path to a [`PlayerCommand::Play`] goes through it.

use std::time::Duration;

use tracing::debug;
use xwall_platform::MediaPlayer;

use crate::auto_pause::AutoPauseReason;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackIntent {
    #[default]
    Play,
    Pause,
}

/// What the player has to be told after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
}

impl PlayerCommand {
    pub fn apply(self, player: &mut dyn MediaPlayer) {
        match self {
            PlayerCommand::Play => player.play(),
            PlayerCommand::Pause => player.pause(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    intent: PlaybackIntent,
    reason: AutoPauseReason,
    ready: bool,
    playing: bool,
}

impl PlaybackState {
    pub fn intent(&self) -> PlaybackIntent {
        self.intent
    }

    pub fn reason(&self) -> AutoPauseReason {
        self.reason
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn should_play(&self) -> bool {
        self.ready && self.intent == PlaybackIntent::Play && !self.reason.is_active()
    }

    /// Brings `playing` in line with [`Self::should_play`].
    pub fn reconcile(&mut self) -> Option<PlayerCommand> {
        let wanted = self.should_play();
        if wanted == self.playing {
            return None;
        }
        self.playing = wanted;
        Some(if wanted {
            PlayerCommand::Play
        } else {
            PlayerCommand::Pause
        })
    }

    /// New evaluation result. Activating a reason pauses right away.
    pub fn set_reason(&mut self, reason: AutoPauseReason) -> Option<PlayerCommand> {
        if reason != self.reason {
            debug!("auto-pause reason: {} -> {}", self.reason, reason);
        }
        self.reason = reason;
        self.reconcile()
    }

    /// `ready` says whether a player is attached. A fresh player starts
    /// stopped; dropping one pauses it first if it was running.
    pub fn set_ready(&mut self, ready: bool) -> Option<PlayerCommand> {
        if ready {
            self.playing = false;
        }
        self.ready = ready;
        self.reconcile()
    }

    /// Explicit user play/pause.
    pub fn toggle(&mut self) -> Option<PlayerCommand> {
        if self.playing {
            self.intent = PlaybackIntent::Pause;
        } else {
            self.intent = PlaybackIntent::Play;
        }
        self.reconcile()
    }

    /// End of item: rewind, and keep going only if allowed.
    pub fn item_ended(&mut self, player: &mut dyn MediaPlayer) {
        player.seek(Duration::ZERO);
        if self.should_play() {
            player.play();
            self.playing = true;
        }
    }
}
