use std::{
    io::BufRead,
    path::PathBuf,
    process::exit,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::Duration,
};

use log::{error, info, warn, LevelFilter};
use software_in_loop::{describe_event, logging::logger_init, SilConfig, SilHardware, TestStand};
use structopt::StructOpt;

/// Runs the ground station, relay and actuator controller against a simulated stand.
/// Operator commands are read from stdin, one per line.
#[derive(Debug, StructOpt)]
#[structopt(name = "test-stand-sil")]
struct Opt {
    /// JSON config file. Missing sections take their defaults.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Minimum log level written to stderr.
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,

    /// Overrides the probability that a radio packet is lost.
    #[structopt(long)]
    drop_probability: Option<f64>,

    /// Keeps simulating this long after stdin closes.
    #[structopt(long, default_value = "6000")]
    linger_ms: u32,
}

fn main() {
    let opt = Opt::from_args();

    if let Err(e) = logger_init(opt.log_level) {
        eprintln!("{}", e);
        exit(1);
    }

    let mut config = match &opt.config {
        Some(path) => match SilConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                exit(1);
            }
        },
        None => SilConfig::default(),
    };

    if let Some(drop_probability) = opt.drop_probability {
        config.simulation.drop_probability = drop_probability;

        if let Err(e) = config.validate() {
            error!("{}", e);
            exit(1);
        }
    }

    let mut hardware = SilHardware::new(&config);
    let mut stand = match TestStand::new(&config, &mut hardware) {
        Ok(stand) => stand,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    info!(
        "Simulating with a {} ms tick, packet loss {}",
        config.simulation.tick_ms, config.simulation.drop_probability
    );

    let operator_lines = spawn_stdin_reader();
    let tick = Duration::from_millis(config.simulation.tick_ms as u64);
    let mut stdin_closed_at: Option<u32> = None;

    loop {
        if stdin_closed_at.is_none() {
            loop {
                match operator_lines.try_recv() {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => {
                        if let Err(e) = stand.submit(&line) {
                            println!("REJECTED {}: {}", line.trim(), e);
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("Operator input closed");
                        stdin_closed_at = Some(stand.now_ms());
                        break;
                    }
                }
            }
        }

        stand.step();

        for event in stand.take_events() {
            println!("{}", describe_event(&event));
        }

        if let Some(closed_at) = stdin_closed_at {
            if stand.now_ms().wrapping_sub(closed_at) >= opt.linger_ms {
                break;
            }
        }

        thread::sleep(tick);
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let stdin = std::io::stdin();

        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read operator input: {}", e);
                    break;
                }
            }
        }
    });

    rx
}
