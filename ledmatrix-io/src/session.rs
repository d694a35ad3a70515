//! Frame session: render, encode, deliver, pace
//!
//! # Loop
//!
//! ```text
//! for each frame (until the running flag clears):
//!     start = now
//!     render (resize, brightness, mirror, pack) -> encode -> device.send
//!     ack? -> FPS window += 1
//!     sleep(interval - elapsed)         unless MaxThroughput
//! ```
//!
//! The running flag is only checked between frames, so an in-flight write and
//! its acknowledgment read always complete. Whatever ends the loop, callers
//! finish with [`Session::shutdown`], which blanks the panel and disconnects.

use crate::config::AppConfig;
use crate::core::device::OutputDevice;
use crate::core::types::{BLACK, EncodedFrame, Encoding, Pixel};
use crate::encoding;
use crate::error::Result;
use crate::frame::Compositor;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Length of the rolling FPS window
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Longest frame slot; slower rates are clamped to it
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(3600);

// ============================================================================
// Pacing
// ============================================================================

/// Frame-rate policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacer {
    /// Target one frame per interval
    Interval(Duration),
    /// Never sleep; throughput is bounded by the link and ack round-trip
    MaxThroughput,
}

impl Pacer {
    /// Interval pacing for `fps`; non-positive or non-finite rates never sleep
    pub fn from_fps(fps: f32) -> Self {
        if fps.is_finite() && fps > 0.0 {
            let interval = Duration::try_from_secs_f64(1.0 / fps as f64)
                .map_or(MAX_FRAME_INTERVAL, |interval| interval.min(MAX_FRAME_INTERVAL));
            Pacer::Interval(interval)
        } else {
            Pacer::MaxThroughput
        }
    }

    /// Time still to wait after a frame took `elapsed`
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        match self {
            Pacer::Interval(interval) => interval.saturating_sub(elapsed),
            Pacer::MaxThroughput => Duration::ZERO,
        }
    }

    /// Sleep out the rest of the frame slot that began at `frame_start`
    pub fn wait(&self, frame_start: Instant) {
        let remaining = self.remaining(frame_start.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

// ============================================================================
// FPS measurement
// ============================================================================

/// Rolling frames-per-second estimate over [`FPS_WINDOW`]
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Counter whose first window opens at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: start,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one delivered frame now
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    /// Count one delivered frame at `now`
    ///
    /// Returns the new rate when the window closes.
    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
            Some(self.fps)
        } else {
            None
        }
    }

    /// Rate measured over the last closed window
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    /// Frames the device accepted
    pub sent: u64,
    /// Frames rejected, unacknowledged, or not written
    pub dropped: u64,
    /// Last rolling FPS
    pub fps: f32,
}

/// Drives one output device
pub struct Session {
    device: Box<dyn OutputDevice>,
    compositor: Compositor,
    encoding: Encoding,
    wait_ack: bool,
    pacer: Pacer,
    fps: FpsCounter,
    stats: SessionStats,
}

impl Session {
    pub fn new(
        device: Box<dyn OutputDevice>,
        compositor: Compositor,
        encoding: Encoding,
        wait_ack: bool,
        pacer: Pacer,
    ) -> Self {
        Self {
            device,
            compositor,
            encoding,
            wait_ack,
            pacer,
            fps: FpsCounter::new(),
            stats: SessionStats::default(),
        }
    }

    /// Session with display and delivery settings from `config`
    pub fn from_config(device: Box<dyn OutputDevice>, config: &AppConfig) -> Self {
        let compositor = Compositor::new(
            config.display.geometry(),
            config.display.fit,
            config.display.brightness,
        );
        Self::new(
            device,
            compositor,
            config.session.encoding,
            config.session.wait_ack,
            config.session.pacer(),
        )
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "Connecting {} device ({} {:?} at {:.2}, {} encoding, ack {})",
            self.device.name(),
            self.compositor.geometry(),
            self.compositor.fit_mode(),
            self.compositor.brightness(),
            self.encoding,
            if self.wait_ack { "sync" } else { "async" }
        );
        self.device.connect()
    }

    pub fn device(&self) -> &dyn OutputDevice {
        self.device.as_ref()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    /// Render `source` and deliver it
    ///
    /// `Ok(false)` is a dropped frame; the session carries on with the next.
    pub fn send_frame(&mut self, source: &RgbImage) -> Result<bool> {
        let packed = self.compositor.render(source);
        let frame = encoding::encode(&packed, self.encoding);
        self.deliver(&frame)
    }

    /// Fill the panel with one color (brightness still applies)
    pub fn fill(&mut self, color: Pixel) -> Result<bool> {
        let geometry = self.compositor.geometry();
        let source = RgbImage::from_pixel(geometry.width, geometry.height, color);
        self.send_frame(&source)
    }

    /// Turn every LED off
    pub fn blank(&mut self) -> Result<bool> {
        self.fill(BLACK)
    }

    fn deliver(&mut self, frame: &EncodedFrame) -> Result<bool> {
        let accepted = self.device.send(frame, self.wait_ack)?;
        if accepted {
            self.stats.sent += 1;
            if let Some(fps) = self.fps.tick() {
                self.stats.fps = fps;
                log::info!("FPS: {:.1}", fps);
            }
        } else {
            self.stats.dropped += 1;
            log::debug!("Frame dropped ({} so far)", self.stats.dropped);
        }
        Ok(accepted)
    }

    /// Play `frames` until they run out or `running` clears
    ///
    /// Frame source errors and device misuse abort the run; dropped frames do
    /// not.
    pub fn run<I>(&mut self, frames: I, running: &AtomicBool) -> Result<SessionStats>
    where
        I: IntoIterator<Item = Result<RgbImage>>,
    {
        log::info!("Playing at {}", describe_pacer(self.pacer));

        for frame in frames {
            if !running.load(Ordering::SeqCst) {
                log::info!("Playback interrupted");
                break;
            }
            let start = Instant::now();
            self.send_frame(&frame?)?;
            self.pacer.wait(start);
        }

        log::info!(
            "Playback finished: {} sent, {} dropped",
            self.stats.sent,
            self.stats.dropped
        );
        Ok(self.stats)
    }

    /// Blank the panel and disconnect
    ///
    /// Disconnects even when blanking fails.
    pub fn shutdown(&mut self) {
        if self.device.is_connected() {
            match self.blank() {
                Ok(true) => log::debug!("Display blanked"),
                Ok(false) => log::warn!("Blank frame was not acknowledged"),
                Err(e) => log::error!("Failed to blank display: {}", e),
            }
        }
        self.device.disconnect();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.device.disconnect();
    }
}

fn describe_pacer(pacer: Pacer) -> String {
    match pacer {
        Pacer::Interval(interval) => format!("{:.1} FPS", 1.0 / interval.as_secs_f64()),
        Pacer::MaxThroughput => "max FPS".to_string(),
    }
}
