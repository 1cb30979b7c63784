//! drishti-calibd - Camera mount calibration daemon
//!
//! Replays a recorded sample log (vehicle speed + visual odometry) through
//! the mount calibrator, checkpointing state to a parameter store and
//! optionally writing the published calibration stream to a JSONL file.
//!
//! The estimator itself is single-threaded; the daemon demonstrates the
//! intended host shape with a reader thread feeding a bounded channel whose
//! single consumer owns the calibrator.
//!
//! # Usage
//!
//! ```bash
//! # Replay a drive with defaults
//! drishti-calibd --log drive.jsonl
//!
//! # With a config file and explicit parameter directory
//! drishti-calibd --config drishti-calib.toml --params-dir /data/params
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use drishti_calib::{
    CalibratorConfig, FileStore, MountCalibrator, SampleLogReader, SampleRecord,
};

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct Config {
    calibrator: CalibratorConfig,
    params: ParamsConfig,
    input: InputConfig,
    output: OutputConfig,
}

/// Parameter store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct ParamsConfig {
    /// Warm-start from and checkpoint to the store
    enabled: bool,
    /// Store directory (one file per key)
    dir: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "./params".to_string(),
        }
    }
}

/// Input configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct InputConfig {
    /// Sample log to replay (JSONL)
    log: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct OutputConfig {
    /// Calibration stream output (JSONL, one line per completed block)
    log: Option<String>,
}

#[derive(Debug, Default)]
struct Args {
    config_path: Option<String>,
    input_log: Option<String>,
    params_dir: Option<String>,
    output_log: Option<String>,
    no_params: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut result = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--log" | "-l" => {
                if i + 1 < args.len() {
                    result.input_log = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--params-dir" | "-p" => {
                if i + 1 < args.len() {
                    result.params_dir = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    result.output_log = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--no-params" => {
                result.no_params = true;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("drishti-calibd - camera mount calibration daemon");
    println!();
    println!("USAGE:");
    println!("    drishti-calibd [OPTIONS] --log <FILE>");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>      Configuration file (drishti-calib.toml)");
    println!("    -l, --log <FILE>         Sample log to replay (JSONL)");
    println!("    -p, --params-dir <DIR>   Parameter store directory (./params)");
    println!("    -o, --out <FILE>         Write calibration stream to FILE (JSONL)");
    println!("        --no-params          Disable warm start and checkpointing");
    println!("    -h, --help               Print help information");
}

fn load_config(args: &Args) -> Config {
    let config = match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => {
                    eprintln!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    eprintln!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                eprintln!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            // Try default paths
            for path in &["drishti-calib.toml", "/etc/drishti-calib.toml"] {
                if let Ok(contents) = fs::read_to_string(path) {
                    if let Ok(cfg) = toml::from_str(&contents) {
                        eprintln!("Loaded config from {}", path);
                        return apply_overrides(cfg, args);
                    }
                }
            }
            Config::default()
        }
    };

    apply_overrides(config, args)
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(log) = &args.input_log {
        config.input.log = Some(log.clone());
    }
    if let Some(dir) = &args.params_dir {
        config.params.dir = dir.clone();
    }
    if let Some(out) = &args.output_log {
        config.output.log = Some(out.clone());
    }
    if args.no_params {
        config.params.enabled = false;
    }
    config
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);

    let Some(input_log) = config.input.log.clone() else {
        eprintln!("No sample log given (use --log or set input.log in the config)");
        print_help();
        std::process::exit(1);
    };

    log::info!("drishti-calibd starting...");
    log::info!("  Input log: {}", input_log);
    log::info!(
        "  Params: {}",
        if config.params.enabled {
            config.params.dir.as_str()
        } else {
            "disabled"
        }
    );

    if let Err(e) = run(&config, &input_log) {
        log::error!("Replay failed: {}", e);
        std::process::exit(1);
    }

    log::info!("drishti-calibd done");
}

fn run(config: &Config, input_log: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut calibrator = if config.params.enabled {
        let store = FileStore::new(Path::new(&config.params.dir))?;
        let calibrator =
            MountCalibrator::with_store(config.calibrator.clone(), Box::new(store));
        log::info!(
            "Warm start: {} valid blocks, status {:?}",
            calibrator.valid_blocks(),
            calibrator.cal_status()
        );
        calibrator
    } else {
        MountCalibrator::new(config.calibrator.clone())
    };

    let mut output = match &config.output.log {
        Some(path) => Some(std::io::BufWriter::new(fs::File::create(path)?)),
        None => None,
    };

    // Reader thread feeds the single consumer that owns the calibrator.
    let reader = SampleLogReader::open(Path::new(input_log))?;
    let (tx, rx) = crossbeam_channel::bounded::<SampleRecord>(256);
    let reader_handle = thread::spawn(move || {
        let mut malformed = 0u64;
        for record in reader {
            match record {
                Ok(record) => {
                    if tx.send(record).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    malformed += 1;
                    log::warn!("Skipping malformed record: {}", e);
                }
            }
        }
        malformed
    });

    let mut last_status = calibrator.cal_status();
    let mut records = 0u64;

    for record in rx {
        records += 1;
        match record {
            SampleRecord::Speed { speed, .. } => calibrator.update_speed(speed),
            SampleRecord::Odometry {
                trans,
                rot,
                trans_std,
                ..
            } => {
                let accepted = calibrator.update_odometry(trans, rot, trans_std).is_some();
                if accepted && calibrator.block_progress() == 0 {
                    // A block just completed.
                    let live = calibrator.live_calibration();
                    log::debug!(
                        "Block complete: {} valid, rpy [{:.5}, {:.5}, {:.5}]",
                        live.valid_blocks,
                        live.rpy_calib[0],
                        live.rpy_calib[1],
                        live.rpy_calib[2]
                    );
                    if let Some(out) = output.as_mut() {
                        serde_json::to_writer(&mut *out, &live)?;
                        out.write_all(b"\n")?;
                    }
                }
            }
        }

        let status = calibrator.cal_status();
        if status != last_status {
            log::info!(
                "Status {:?} -> {:?} ({} valid blocks, {}%)",
                last_status,
                status,
                calibrator.valid_blocks(),
                calibrator.progress_percent()
            );
            last_status = status;
        }
    }

    let malformed = reader_handle.join().unwrap_or_default();

    if let Some(out) = output.as_mut() {
        out.flush()?;
    }

    let rpy = calibrator.smoothed_rpy();
    log::info!(
        "Replayed {} records ({} malformed), {} accepted / {} rejected samples",
        records,
        malformed,
        calibrator.accepted_samples(),
        calibrator.rejected_samples()
    );
    log::info!(
        "Final: status {:?}, {} valid blocks, rpy [{:.5}, {:.5}, {:.5}]",
        calibrator.cal_status(),
        calibrator.valid_blocks(),
        rpy[0],
        rpy[1],
        rpy[2]
    );

    Ok(())
}
