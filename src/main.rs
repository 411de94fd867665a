//! Headless benchmark for the defocus cross-fade pipeline

use std::process::ExitCode;
use std::time::{Duration, Instant};

use fastblur::effects::{checkerboard, Plasma};
use fastblur::util::FpsCounter;
use fastblur::{Effect, EffectConfig, EffectSession, FrameWorker, MixClock, PixelBuffer, PixelFormat, Rgb};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FRAMES: u64 = 240;

// ============================================================================
// Logging
// ============================================================================

/// Minimal logger writing `level target: message` lines to stderr
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }
}

// ============================================================================
// Arguments
// ============================================================================

struct Options {
    width: u32,
    height: u32,
    frames: u64,
    format: Option<PixelFormat>,
    config: Option<String>,
    threaded: bool,
    verbose: bool,
}

fn parse_format(name: &str) -> Option<PixelFormat> {
    serde_json::from_value(serde_json::Value::String(name.to_lowercase())).ok()
}

fn print_help() {
    println!("Usage: fastblur-bench [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --width W, -w W           Frame width (default: {})", DEFAULT_WIDTH);
    println!("  --height H, -h H          Frame height (default: {})", DEFAULT_HEIGHT);
    println!("  --resolution WxH, -r WxH  Set resolution (e.g., 320x200)");
    println!("  --frames N, -n N          Frames to render (default: {})", DEFAULT_FRAMES);
    println!("  --format F, -f F          Output format (rgb32, rgb16, rgb15, indexed8, gray8, ...)");
    println!("  --config FILE, -c FILE    Load effect settings from a JSON file");
    println!("  --threaded                Render on a background worker thread");
    println!("  --verbose                 Log pipeline activity to stderr");
    println!("  --help                    Show this help message");
}

/// Parse command line arguments; unparsable values keep their defaults
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = Options {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        frames: DEFAULT_FRAMES,
        format: None,
        config: None,
        threaded: false,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--threaded" => opts.threaded = true,
            "--verbose" => opts.verbose = true,
            "--width" | "-w" => {
                if let Some(w) = value.and_then(|v| v.parse().ok()) {
                    opts.width = w;
                }
                i += 1;
            },
            "--height" | "-h" => {
                if let Some(h) = value.and_then(|v| v.parse().ok()) {
                    opts.height = h;
                }
                i += 1;
            },
            "--resolution" | "-r" => {
                if let Some((w, h)) = value.and_then(|v| v.split_once('x')) {
                    if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
                        opts.width = w;
                        opts.height = h;
                    }
                }
                i += 1;
            },
            "--frames" | "-n" => {
                if let Some(n) = value.and_then(|v| v.parse().ok()) {
                    opts.frames = n;
                }
                i += 1;
            },
            "--format" | "-f" => {
                match value.map(|v| (v, parse_format(v))) {
                    Some((_, Some(format))) => opts.format = Some(format),
                    Some((v, None)) => eprintln!("Unknown format '{}', keeping the configured one", v),
                    None => {},
                }
                i += 1;
            },
            "--config" | "-c" => {
                opts.config = value.cloned();
                i += 1;
            },
            "--help" => {
                print_help();
                std::process::exit(0);
            },
            other => eprintln!("Ignoring unknown argument '{}'", other),
        }
        i += 1;
    }

    opts
}

// ============================================================================
// Benchmark
// ============================================================================

fn sources(width: u32, height: u32) -> (PixelBuffer, PixelBuffer) {
    let cell = (width.min(height) / 8).max(1);
    (
        Plasma::new(0.0).render(width, height, PixelFormat::Rgb32),
        checkerboard(width, height, cell, Rgb::new(20, 20, 60), Rgb::new(240, 200, 80), PixelFormat::Rgb32),
    )
}

fn run_direct(mut session: EffectSession, clock: MixClock, frames: u64, fps: &mut FpsCounter) -> fastblur::Result<u64> {
    fps.reset();
    for n in 0..frames {
        session.render(clock.mix_at(n))?;
        fps.tick();
    }
    let stats = session.stats();
    println!("Blurs: {} computed, {} cached", stats.blurs, stats.cache_hits);
    Ok(frames)
}

fn run_threaded(session: EffectSession, clock: MixClock, frames: u64, fps: &mut FpsCounter) -> fastblur::Result<u64> {
    let worker = FrameWorker::spawn(session, clock)?;
    fps.reset();
    let mut seen = 0;
    while seen < frames {
        match worker.wait_frame(Duration::from_secs(5)) {
            Some(n) => {
                // frames published while we slept count against the same wait
                let dt = fps.tick().0 / (n - seen).max(1) as f32;
                for _ in seen..n {
                    fps.record(dt);
                }
                seen = n;
            },
            None if worker.is_finished() => break,
            None => log::warn!("no frame after 5s, still waiting"),
        }
    }
    worker.join()
}

fn run(opts: &Options) -> fastblur::Result<()> {
    let mut config = match &opts.config {
        Some(path) => EffectConfig::load(path)?,
        None => EffectConfig::default(),
    };
    if let Some(format) = opts.format {
        config.target_format = format;
    }

    println!("=== fastblur ===");
    println!("Resolution: {}x{}", opts.width, opts.height);
    println!("Output format: {:?}", config.target_format);
    println!("Max spread: {}", config.max_spread);

    let (first, second) = sources(opts.width, opts.height);
    let session = EffectSession::new(first, second, &config)?;
    let clock = MixClock::new(config.period_frames);
    log::debug!("running '{}' for {} frames", session.name(), opts.frames);

    let mut fps = FpsCounter::new(opts.frames.clamp(1, 10_000) as usize);
    let start = Instant::now();
    let rendered = if opts.threaded {
        run_threaded(session, clock, opts.frames, &mut fps)?
    } else {
        run_direct(session, clock, opts.frames, &mut fps)?
    };
    let elapsed = start.elapsed().as_secs_f32();

    let (min_fps, max_fps) = fps.min_max_fps();
    let (p1, p50, p99) = fps.percentiles_ms();
    println!("Frames: {} in {:.2}s", rendered, elapsed);
    println!("Average: {:.2} ms/frame", fps.avg_frame_time_ms());
    println!("FPS min/max: {:.1} / {:.1}", min_fps, max_fps);
    println!("Frame time p1/p50/p99: {:.2} / {:.2} / {:.2} ms", p1, p50, p99);
    Ok(())
}

fn main() -> ExitCode {
    let opts = parse_args();
    init_logging(opts.verbose);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fastblur-bench: {}", e);
            ExitCode::FAILURE
        },
    }
}
