//! ledmatrix-io - Send images to a HUB75 LED matrix
//!
//! ```text
//! ledmatrix-io --image logo.png --brightness 0.5
//! ledmatrix-io --frames clip/ --loop --fps 24 --encoding cobs
//! ledmatrix-io --fill 255,0,0 --device image --output-dir out/
//! ```
//!
//! Flags override values from `--config`. Static inputs stay on the panel
//! until Ctrl-C; every exit path blanks the panel and disconnects.

use clap::{ArgGroup, Parser};
use ledmatrix_io::config::AppConfig;
use ledmatrix_io::core::types::{Encoding, FitMode, Pixel};
use ledmatrix_io::devices::{DeviceKind, create_device};
use ledmatrix_io::error::Result;
use ledmatrix_io::input::{frame_sequence, list_frames, load_image, parse_color};
use ledmatrix_io::session::Session;
use ledmatrix_io::signal::setup_ctrl_c_handler;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// How often a held static frame checks for Ctrl-C
const HOLD_POLL: Duration = Duration::from_millis(100);

/// Send images to a HUB75 LED matrix
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["image", "frames", "fill"])))]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device
    #[arg(short, long, value_enum)]
    device: Option<DeviceKind>,

    /// Serial port (auto-detected if omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long = "baudrate")]
    baud_rate: Option<u32>,

    /// Directory for PNG output (image device)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Display a still image
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Play a directory of images in name order
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Fill the panel with a solid color
    #[arg(long, value_name = "R,G,B", value_parser = parse_color)]
    fill: Option<Pixel>,

    /// Restart the frame sequence when it ends
    #[arg(long = "loop")]
    loop_playback: bool,

    /// Target frame rate
    #[arg(long)]
    fps: Option<f32>,

    /// Send as fast as the link allows
    #[arg(long)]
    max_fps: bool,

    /// Brightness (0.0 - 1.0)
    #[arg(short, long)]
    brightness: Option<f32>,

    /// Resize mode
    #[arg(long, value_enum)]
    fit: Option<FitMode>,

    /// Wire encoding (must match the firmware)
    #[arg(short, long, value_enum)]
    encoding: Option<Encoding>,

    /// Panel height in pixels (32 or 64)
    #[arg(long)]
    height: Option<u32>,

    /// Do not wait for acknowledgments
    #[arg(long)]
    no_ack: bool,
}

impl Args {
    /// Overlay command-line flags on the loaded configuration
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = self.device {
            config.output.device = device;
        }
        if let Some(port) = &self.port {
            config.serial.port = Some(port.clone());
        }
        if let Some(baud_rate) = self.baud_rate {
            config.serial.baud_rate = baud_rate;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.loop_playback {
            config.session.loop_playback = true;
        }
        if let Some(fps) = self.fps {
            config.session.fps = fps;
        }
        if self.max_fps {
            config.session.max_fps = true;
        }
        if let Some(brightness) = self.brightness {
            config.display.brightness = brightness;
        }
        if let Some(fit) = self.fit {
            config.display.fit = fit;
        }
        if let Some(encoding) = self.encoding {
            config.session.encoding = encoding;
        }
        if let Some(height) = self.height {
            config.display.height = height;
        }
        if self.no_ack {
            config.session.wait_ack = false;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("ledmatrix-io v{} starting...", env!("CARGO_PKG_VERSION"));

    let running = setup_ctrl_c_handler()?;
    let device = create_device(config.output.device, &config)?;
    let mut session = Session::from_config(device, &config);

    let result = play(&mut session, &args, &config, &running);
    if let Err(e) = &result {
        log::error!("{}", e);
    }

    session.shutdown();
    let stats = session.stats();
    log::info!("{} frames sent, {} dropped", stats.sent, stats.dropped);
    result
}

fn play(session: &mut Session, args: &Args, config: &AppConfig, running: &AtomicBool) -> Result<()> {
    session.connect()?;

    if let Some(path) = &args.image {
        let image = load_image(path)?;
        if !session.send_frame(&image)? {
            log::warn!("Image was not acknowledged");
        }
        hold(running);
    } else if let Some(color) = args.fill {
        if !session.fill(color)? {
            log::warn!("Fill was not acknowledged");
        }
        hold(running);
    } else if let Some(dir) = &args.frames {
        let paths = list_frames(dir)?;
        session.run(frame_sequence(&paths, config.session.loop_playback), running)?;
    }

    Ok(())
}

/// Keep a static frame on the panel until Ctrl-C
fn hold(running: &AtomicBool) {
    log::info!("Press Ctrl+C to stop");
    while running.load(Ordering::SeqCst) {
        thread::sleep(HOLD_POLL);
    }
}
