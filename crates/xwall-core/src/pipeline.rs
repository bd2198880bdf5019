//! Load pipeline: probe, resolve duration, optionally compose the bounce
//! loop, and build a player.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use xwall_platform::{CompositionSegment, MediaAsset, MediaBackend, MediaPlayer};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("cannot create a player for {}: {source}", .path.display())]
    Player {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub bounce: bool,
    pub muted: bool,
}

/// Two back-to-back copies of the source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BouncePlan {
    segments: Vec<CompositionSegment>,
}

impl BouncePlan {
    pub fn for_duration(duration: Duration) -> Self {
        let segment = |at| CompositionSegment {
            source_start: Duration::ZERO,
            duration,
            at,
        };
        Self {
            segments: vec![segment(Duration::ZERO), segment(duration)],
        }
    }

    pub fn segments(&self) -> &[CompositionSegment] {
        &self.segments
    }

    pub fn total_duration(&self) -> Duration {
        self.segments
            .iter()
            .map(|s| s.at + s.duration)
            .max()
            .unwrap_or_default()
    }
}

pub struct LoadedSource {
    pub path: PathBuf,
    pub file_name: String,
    pub duration: Duration,
    pub bounce: Option<BouncePlan>,
    pub player: Box<dyn MediaPlayer>,
}

/// Primary duration when positive, else the video track's, else zero.
pub fn resolve_duration(primary: Option<f64>, video_track: Option<f64>) -> Duration {
    let positive = |secs: f64| (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs));
    primary
        .and_then(positive)
        .or_else(|| video_track.and_then(positive))
        .unwrap_or_default()
}

fn asset_duration(asset: &dyn MediaAsset) -> Duration {
    let primary = match asset.duration_seconds() {
        Ok(secs) => Some(secs),
        Err(err) => {
            debug!("primary duration unavailable: {err}");
            None
        }
    };
    if primary.is_some_and(|secs| secs > 0.0) {
        return resolve_duration(primary, None);
    }
    let track = match asset.video_track_seconds() {
        Ok(secs) => secs,
        Err(err) => {
            debug!("video track range unavailable: {err}");
            None
        }
    };
    resolve_duration(primary, track)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs the whole pipeline for `path`. Only opening the file and building
/// the player can fail; everything in between degrades.
pub fn load_source(
    backend: &mut dyn MediaBackend,
    path: &Path,
    options: LoadOptions,
) -> Result<LoadedSource, LoadError> {
    let asset = backend.open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match asset.is_playable() {
        Ok(true) => {}
        Ok(false) => warn!("{} reports itself as not playable, trying anyway", path.display()),
        Err(err) => debug!("playability probe failed for {}: {err}", path.display()),
    }

    let duration = asset_duration(asset.as_ref());
    info!("loaded {} ({:.2}s)", path.display(), duration.as_secs_f64());

    let mut bounce = None;
    let mut composed: Option<Box<dyn MediaAsset>> = None;
    if options.bounce && !duration.is_zero() {
        let plan = BouncePlan::for_duration(duration);
        match backend.compose(asset.as_ref(), plan.segments()) {
            Ok(asset) => {
                composed = Some(asset);
                bounce = Some(plan);
            }
            Err(err) => warn!("bounce composition failed, playing the plain file: {err}"),
        }
    }
    let playable = composed.as_deref().unwrap_or(asset.as_ref());

    let player = backend
        .create_player(playable, options.muted)
        .map_err(|source| LoadError::Player {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(LoadedSource {
        path: path.to_path_buf(),
        file_name: file_name(path),
        duration,
        bounce,
        player,
    })
}
