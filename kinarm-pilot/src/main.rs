// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::io::Write;

use clap::{Parser, ValueHint};

use kinarm_core::nalgebra::Point3;
use kinarm_core::{Chain, ForwardKinematics, Solution};

mod config;
mod pilot;
mod stepper;

use pilot::Pilot;
use stepper::StepperLink;

#[derive(Parser)]
#[command(author = "Copyright (C) 2024 Laixer Equipment B.V.")]
#[command(version, propagate_version = true)]
#[command(about = "Kinematic arm pilot", long_about = None)]
struct Args {
    /// Configuration file.
    #[arg(
        short = 'c',
        long = "config",
        alias = "conf",
        value_name = "FILE",
        value_hint = ValueHint::FilePath
    )]
    config: Option<std::path::PathBuf>,
    /// Stepper controller device, or '-' for standard output.
    #[arg(
        short = 'd',
        long = "device",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    device: Option<std::path::PathBuf>,
    /// Print results as JSON.
    #[arg(long)]
    json: bool,
    /// Quiet output (no logging).
    #[arg(short, long)]
    quiet: bool,
    /// Level of verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Commands.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the chain in its configured pose.
    Show,
    /// Solve for a target in the configured unit.
    #[command(allow_negative_numbers = true)]
    Solve { x: f32, y: f32, z: f32 },
    /// Follow the arc path.
    Arc {
        /// Duration in seconds.
        #[arg(long, default_value_t = 10.0)]
        duration: f32,
        /// Tick interval in milliseconds.
        #[arg(long, default_value_t = 20)]
        interval: u64,
        /// Sleep between ticks.
        #[arg(long)]
        realtime: bool,
    },
    /// Return the chain to its zero pose.
    Reset,
}

#[derive(serde_derive::Serialize)]
struct JointReport {
    name: String,
    kind: kinarm_core::JointKind,
    /// Angle in degrees.
    angle: f32,
    length: f32,
}

#[derive(serde_derive::Serialize)]
struct ChainReport {
    joints: Vec<JointReport>,
    points: Vec<[f32; 3]>,
    effector: [f32; 3],
}

impl ChainReport {
    fn new(chain: &Chain) -> Self {
        let fk = ForwardKinematics::new(chain);

        Self {
            joints: chain
                .iter()
                .map(|joint| JointReport {
                    name: joint.name().to_string(),
                    kind: joint.kind(),
                    angle: joint.angle().to_degrees(),
                    length: joint.length(),
                })
                .collect(),
            points: fk.joint_points().iter().map(|p| [p.x, p.y, p.z]).collect(),
            effector: fk.solve().into(),
        }
    }
}

#[derive(serde_derive::Serialize)]
struct SolveReport {
    target: [f32; 3],
    solution: Solution,
    chain: ChainReport,
}

#[derive(Default, serde_derive::Serialize)]
struct ArcReport {
    ticks: usize,
    converged: usize,
    large_errors: usize,
    large_error_events: usize,
    max_error: f32,
    mean_error: f32,
}

fn main() -> anyhow::Result<()> {
    use log::LevelFilter;

    let args = Args::parse();

    let mut log_config = simplelog::ConfigBuilder::new();
    log_config.set_time_level(LevelFilter::Off);
    log_config.set_thread_level(LevelFilter::Off);
    log_config.set_target_level(LevelFilter::Off);
    log_config.set_location_level(LevelFilter::Off);

    let log_level = if args.quiet {
        LevelFilter::Off
    } else {
        match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    simplelog::TermLogger::init(
        log_level,
        log_config.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let config = match &args.config {
        Some(path) => config::from_file(path)?,
        None => {
            log::debug!("No configuration file, using reference arm");
            config::Config::default()
        }
    };

    log::trace!("{:#?}", config);

    run(config, args)
}

fn open_device(path: &std::path::Path) -> anyhow::Result<Box<dyn Write>> {
    if path == std::path::Path::new("-") {
        return Ok(Box::new(std::io::stdout()));
    }

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    log::debug!("Opened stepper device {}", path.display());

    Ok(Box::new(std::io::BufWriter::new(file)))
}

fn print_chain(chain: &Chain) {
    println!("{}", chain);

    let fk = ForwardKinematics::new(chain);
    for (index, point) in fk.joint_points().iter().enumerate() {
        println!(
            "  P{} [{:8.2}, {:8.2}, {:8.2}]",
            index, point.x, point.y, point.z
        );
    }
}

/// Number of ticks needed to cover `duration` seconds.
fn arc_ticks(duration: f32, interval: std::time::Duration) -> anyhow::Result<usize> {
    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!("duration must be a positive number of seconds, got {}", duration);
    }

    Ok((duration / interval.as_secs_f32()).ceil() as usize)
}

fn run(config: config::Config, args: Args) -> anyhow::Result<()> {
    let chain = config.chain()?;
    let solver = config.solver();

    log::debug!(
        "Chain of {} joints with reach {:.2}mm",
        chain.len(),
        chain.reach()
    );

    let mut pilot = Pilot::new(chain, solver, config.target())
        .with_large_error_threshold(config.solver.large_error_threshold);

    if let Some(path) = &args.device {
        let link = StepperLink::new(open_device(path)?, config.stepper_profiles());
        pilot = pilot.with_link(link);
    }

    match args.command {
        Command::Show => {
            if args.json {
                println!("{}", serde_json::to_string(&ChainReport::new(pilot.chain()))?);
            } else {
                print_chain(pilot.chain());
            }
        }
        Command::Solve { x, y, z } => {
            pilot.update_target(config.point([x, y, z]));

            let solution = pilot.solve_target()?;

            if args.json {
                let report = SolveReport {
                    target: (*pilot.target()).into(),
                    solution,
                    chain: ChainReport::new(pilot.chain()),
                };
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("Solution: {}", solution);
                print_chain(pilot.chain());
            }
        }
        Command::Arc {
            duration,
            interval,
            realtime,
        } => {
            use std::time::Duration;

            let arc = config.arc();
            let interval = Duration::from_millis(interval.max(1));
            let ticks = arc_ticks(duration, interval)?;

            log::info!(
                "Following arc of {:.2}mm for {:.1}s in {} ticks",
                arc.radius(),
                duration,
                ticks
            );

            let mut report = ArcReport::default();
            let mut error_sum = 0.0;

            for tick in 0..ticks {
                let target: Point3<f32> = arc.point_at(tick as f32 * interval.as_secs_f32());
                pilot.update_target(target);

                let solution = pilot.solve_target()?;

                report.ticks += 1;
                if solution.is_converged() {
                    report.converged += 1;
                }
                if pilot.is_large_error() {
                    report.large_errors += 1;
                }
                report.max_error = report.max_error.max(solution.error);
                error_sum += solution.error;

                if realtime {
                    std::thread::sleep(interval);
                }
            }

            report.large_error_events = pilot.large_error_events();

            if report.ticks > 0 {
                report.mean_error = error_sum / report.ticks as f32;
            }

            if args.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!(
                    "Ticks: {} converged: {} large errors: {} ({} events) max error: {:.4} mean error: {:.4}",
                    report.ticks,
                    report.converged,
                    report.large_errors,
                    report.large_error_events,
                    report.max_error,
                    report.mean_error
                );
                print_chain(pilot.chain());
            }
        }
        Command::Reset => {
            pilot.reset()?;

            if args.json {
                println!("{}", serde_json::to_string(&ChainReport::new(pilot.chain()))?);
            } else {
                print_chain(pilot.chain());
            }
        }
    }

    if pilot.link().is_some() {
        log::debug!("Stepper commands sent");
    }

    log::debug!("{} done", env!("CARGO_BIN_NAME"));

    Ok(())
}
