//! AVFoundation-backed assets, compositions and players.

use std::path::Path;
use std::time::Duration;

use cocoa::base::{id, nil, BOOL, NO, YES};
use cocoa::foundation::NSInteger;
use objc::{class, msg_send, sel, sel_impl};
use tracing::{debug, warn};
use xwall_platform::{
    CompositionSegment, MediaAsset, MediaBackend, MediaPlayer, NativeHandle, Result,
};

use crate::ffi::{ns_string, to_string};
use crate::observers;

const PREFERRED_TIMESCALE: i32 = 600;
const INVALID_TRACK_ID: i32 = 0;
const ACTION_AT_ITEM_END_NONE: NSInteger = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct CMTime {
    value: i64,
    timescale: i32,
    flags: u32,
    epoch: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct CMTimeRange {
    start: CMTime,
    duration: CMTime,
}

#[link(name = "CoreMedia", kind = "framework")]
extern "C" {
    fn CMTimeMake(value: i64, timescale: i32) -> CMTime;
    fn CMTimeMakeWithSeconds(seconds: f64, preferred_timescale: i32) -> CMTime;
    fn CMTimeGetSeconds(time: CMTime) -> f64;
    fn CMTimeAdd(lhs: CMTime, rhs: CMTime) -> CMTime;
    fn CMTimeRangeGetIntersection(range: CMTimeRange, other: CMTimeRange) -> CMTimeRange;
}

#[link(name = "AVFoundation", kind = "framework")]
extern "C" {
    static AVMediaTypeVideo: id;
}

fn cm_time(duration: Duration) -> CMTime {
    unsafe { CMTimeMakeWithSeconds(duration.as_secs_f64(), PREFERRED_TIMESCALE) }
}

/// Source range for `segment`, clipped to the track. A full-length segment
/// takes the track's own range, since seconds at [`PREFERRED_TIMESCALE`]
/// can land a tick past its end.
unsafe fn source_range(segment: &CompositionSegment, track: CMTimeRange) -> CMTimeRange {
    let wanted = CMTimeRange {
        start: cm_time(segment.source_start),
        duration: cm_time(segment.duration),
    };
    let clipped = CMTimeRangeGetIntersection(wanted, track);
    let tick = 1.0 / f64::from(PREFERRED_TIMESCALE);
    let whole = segment.source_start.is_zero()
        && (CMTimeGetSeconds(wanted.duration) - CMTimeGetSeconds(track.duration)).abs() <= tick;
    if whole {
        track
    } else {
        clipped
    }
}

unsafe fn first_video_track(asset: id) -> id {
    let tracks: id = msg_send![asset, tracksWithMediaType: AVMediaTypeVideo];
    if tracks == nil {
        return nil;
    }
    msg_send![tracks, firstObject]
}

unsafe fn describe(error: id) -> String {
    if error == nil {
        return "unknown error".to_string();
    }
    let description: id = msg_send![error, localizedDescription];
    to_string(description).unwrap_or_else(|| "unknown error".to_string())
}

/// Retained `AVAsset` (a file or a composition).
pub struct MacAsset {
    asset: id,
}

impl MediaAsset for MacAsset {
    fn is_playable(&self) -> Result<bool> {
        let playable: BOOL = unsafe { msg_send![self.asset, isPlayable] };
        Ok(playable != NO)
    }

    fn duration_seconds(&self) -> Result<f64> {
        let duration: CMTime = unsafe { msg_send![self.asset, duration] };
        Ok(unsafe { CMTimeGetSeconds(duration) })
    }

    fn video_track_seconds(&self) -> Result<Option<f64>> {
        unsafe {
            let track = first_video_track(self.asset);
            if track == nil {
                return Ok(None);
            }
            let range: CMTimeRange = msg_send![track, timeRange];
            Ok(Some(CMTimeGetSeconds(range.duration)))
        }
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(NativeHandle(self.asset as usize))
    }
}

impl Drop for MacAsset {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![self.asset, release];
        }
    }
}

/// `AVPlayer` with its current item. End of item is reported through the
/// event queue.
pub struct MacPlayer {
    player: id,
    item: id,
}

impl MediaPlayer for MacPlayer {
    fn play(&mut self) {
        unsafe {
            let _: () = msg_send![self.player, play];
        }
    }

    fn pause(&mut self) {
        unsafe {
            let _: () = msg_send![self.player, pause];
        }
    }

    fn seek(&mut self, to: Duration) {
        unsafe {
            let _: () = msg_send![self.player, seekToTime: cm_time(to)];
        }
    }

    fn set_muted(&mut self, muted: bool) {
        let flag = if muted { YES } else { NO };
        unsafe {
            let _: () = msg_send![self.player, setMuted: flag];
        }
    }

    fn clear_source(&mut self) {
        unsafe {
            let _: () = msg_send![self.player, replaceCurrentItemWithPlayerItem: nil];
        }
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(NativeHandle(self.player as usize))
    }
}

impl Drop for MacPlayer {
    fn drop(&mut self) {
        unsafe {
            observers::forget_item_end(self.item);
            let _: () = msg_send![self.player, pause];
            let _: () = msg_send![self.player, release];
            let _: () = msg_send![self.item, release];
        }
    }
}

#[derive(Default)]
pub struct MacMedia;

fn asset_id(asset: &dyn MediaAsset) -> Result<id> {
    match asset.native_handle() {
        Some(handle) => Ok(handle.0 as id),
        None => Err("asset has no native handle".into()),
    }
}

impl MediaBackend for MacMedia {
    fn open(&mut self, path: &Path) -> Result<Box<dyn MediaAsset>> {
        if !path.is_file() {
            return Err(format!("{} is not a file", path.display()).into());
        }
        unsafe {
            let url: id = msg_send![class!(NSURL), fileURLWithPath: ns_string(&path.to_string_lossy())];
            let asset: id = msg_send![class!(AVURLAsset), URLAssetWithURL: url options: nil];
            if asset == nil {
                return Err(format!("AVFoundation cannot open {}", path.display()).into());
            }
            let asset: id = msg_send![asset, retain];
            Ok(Box::new(MacAsset { asset }))
        }
    }

    fn compose(
        &mut self,
        source: &dyn MediaAsset,
        segments: &[CompositionSegment],
    ) -> Result<Box<dyn MediaAsset>> {
        let source = asset_id(source)?;
        unsafe {
            let source_track = first_video_track(source);
            if source_track == nil {
                return Err("source has no video track".into());
            }
            let composition: id = msg_send![class!(AVMutableComposition), composition];
            let composition: id = msg_send![composition, retain];
            let owned = MacAsset { asset: composition };

            let track: id = msg_send![composition,
                addMutableTrackWithMediaType: AVMediaTypeVideo
                preferredTrackID: INVALID_TRACK_ID];
            if track == nil {
                return Err("cannot add a video track to the composition".into());
            }
            let track_range: CMTimeRange = msg_send![source_track, timeRange];
            // Segments placed back to back follow the exact end of the
            // previous insert rather than a rounded offset.
            let mut previous_end = Duration::ZERO;
            let mut inserted_end = CMTimeMake(0, PREFERRED_TIMESCALE);
            for segment in segments {
                let range = source_range(segment, track_range);
                let at = if segment.at == previous_end {
                    inserted_end
                } else {
                    cm_time(segment.at)
                };
                let mut error: id = nil;
                let inserted: BOOL = msg_send![track,
                    insertTimeRange: range
                    ofTrack: source_track
                    atTime: at
                    error: &mut error as *mut id];
                if inserted == NO {
                    return Err(format!("cannot insert segment: {}", describe(error)).into());
                }
                previous_end = segment.at + segment.duration;
                inserted_end = CMTimeAdd(at, range.duration);
            }
            debug!("composition built from {} segment(s)", segments.len());
            Ok(Box::new(owned))
        }
    }

    fn create_player(&mut self, asset: &dyn MediaAsset, muted: bool) -> Result<Box<dyn MediaPlayer>> {
        let asset = asset_id(asset)?;
        unsafe {
            let item: id = msg_send![class!(AVPlayerItem), playerItemWithAsset: asset];
            if item == nil {
                return Err("cannot create a player item".into());
            }
            let item: id = msg_send![item, retain];
            let player: id = msg_send![class!(AVPlayer), alloc];
            let player: id = msg_send![player, initWithPlayerItem: item];
            if player == nil {
                let _: () = msg_send![item, release];
                return Err("cannot create a player".into());
            }
            let flag = if muted { YES } else { NO };
            let _: () = msg_send![player, setMuted: flag];
            let _: () = msg_send![player, setActionAtItemEnd: ACTION_AT_ITEM_END_NONE];
            if !observers::watch_item_end(item) {
                warn!("end-of-item notifications unavailable; the video will not loop");
            }
            Ok(Box::new(MacPlayer { player, item }))
        }
    }
}
