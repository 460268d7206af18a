//! `armos-cli` – drive the arm from a terminal.
//!
//! Runs against a simulated rig (motor, wrist servo, flap servo) stepped by
//! a background physics thread, so the control code can be exercised and
//! tuned without a robot:
//!
//! - `armos hold --degrees D` (or `--preset P`) posts a target to the PID
//!   hold loop and prints the arm's progress.
//! - `armos move --arm-ticks T --wrist W` runs a combined move through the
//!   arm + wrist mover.
//! - `armos init-config` writes the default `~/.armos/config.toml`.
//!
//! **Ctrl-C** terminates the host lifecycle; the hold loop zeroes the motor
//! on its way out.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use armos_hal::sim::{SimHandles, SimMotor, SimRig, SimServo};
use armos_hal::{HardwareInterface, HardwareMap};
use armos_kernel::{ArmAndWristMover, HostLifecycle};
use armos_runtime::Arm;
use armos_types::{ArmConfig, ArmError, Pose};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

/// Physics integration step of the simulated rig.
const SIM_STEP: Duration = Duration::from_millis(1);

/// How often progress is printed while a command runs.
const REPORT_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "armos", version, about = "Arm and wrist motion control")]
struct Cli {
    /// Config file (default: ~/.armos/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hold the arm at an absolute angle with the PID loop.
    Hold {
        #[arg(
            long,
            allow_hyphen_values = true,
            required_unless_present = "preset",
            conflicts_with = "preset"
        )]
        degrees: Option<f64>,
        /// Named pose from the config presets, e.g. `deposit-on-backdrop`.
        #[arg(long)]
        preset: Option<Pose>,
        /// Counter-rotate the wrist so it keeps its orientation.
        #[arg(long)]
        preserve_wrist: bool,
        #[arg(long, default_value_t = 3.0)]
        seconds: f64,
    },
    /// Move arm and wrist together with the combined mover.
    Move {
        #[arg(long, allow_hyphen_values = true)]
        arm_ticks: i32,
        /// Wrist servo target in [0, 1].
        #[arg(long)]
        wrist: f64,
        /// Step the mover this many times instead of blocking until done.
        #[arg(long)]
        async_steps: Option<u32>,
    },
    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let _guard = armos_runtime::telemetry::init_tracing("armos");
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ArmError> {
    let path = cli.config.unwrap_or_else(config::config_path);

    if let Command::InitConfig { force } = cli.command {
        return init_config(&path, force);
    }

    let cfg = config::load_or_default(&path)?;
    info!(path = %path.display(), "configuration loaded");

    let lifecycle = HostLifecycle::new();
    install_ctrlc(&lifecycle);

    let (mut map, rig) = sim_rig(&cfg);
    let physics = spawn_physics(rig.clone(), lifecycle.clone())?;

    let result = match cli.command {
        Command::Hold {
            degrees,
            preset,
            preserve_wrist,
            seconds,
        } => hold_target(degrees, preset)
            .and_then(|target| hold(&mut map, &cfg, &lifecycle, target, preserve_wrist, seconds)),
        Command::Move {
            arm_ticks,
            wrist,
            async_steps,
        } => move_arm(&mut map, &cfg, &lifecycle, &rig, arm_ticks, wrist, async_steps),
        Command::InitConfig { .. } => Ok(()),
    };

    lifecycle.terminate();
    if physics.join().is_err() {
        warn!("simulation thread panicked");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum HoldTarget {
    Degrees(f64),
    Pose(Pose),
}

fn hold_target(degrees: Option<f64>, preset: Option<Pose>) -> Result<HoldTarget, ArmError> {
    match (degrees, preset) {
        (_, Some(pose)) => Ok(HoldTarget::Pose(pose)),
        (Some(degrees), None) => Ok(HoldTarget::Degrees(degrees)),
        (None, None) => Err(ArmError::InvalidParameter {
            name: "degrees".to_string(),
            details: "either --degrees or --preset is required".to_string(),
        }),
    }
}

fn hold(
    map: &mut HardwareMap,
    cfg: &ArmConfig,
    lifecycle: &HostLifecycle,
    target: HoldTarget,
    preserve_wrist: bool,
    seconds: f64,
) -> Result<(), ArmError> {
    let deadline = hold_deadline(Instant::now(), seconds)?;
    let mut arm = Arm::new(map, cfg, lifecycle.clone())?;
    let accepted = match target {
        HoldTarget::Degrees(degrees) => arm.rotate_arm_to(degrees, preserve_wrist),
        HoldTarget::Pose(pose) => arm.go_to(pose, preserve_wrist),
    };
    if !accepted {
        println!(
            "  {} {:?} is outside the safe envelope [{}°, {}°]",
            "⚠".yellow().bold(),
            target,
            cfg.presets.ready_to_intake + cfg.geometry.arm_angle_offset_deg,
            cfg.presets.deposit_on_floor + cfg.geometry.arm_angle_offset_deg,
        );
    }
    lifecycle.start();

    while Instant::now() < deadline && !lifecycle.state().is_terminated() {
        thread::sleep(REPORT_INTERVAL);
        println!(
            "  arm {:>8.2}°  ({:>6} / {:>6} ticks)  wrist {:>7.2}°",
            arm.arm_rotation(),
            arm.arm_motor_position(),
            arm.arm_motor_target(),
            arm.wrist_rotation(),
        );
        arm.log();
    }

    arm.shutdown();
    println!("  {} arm stopped", "✓".green().bold());
    Ok(())
}

/// `now + seconds`, or an error when that instant is not representable.
fn hold_deadline(now: Instant, seconds: f64) -> Result<Instant, ArmError> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .and_then(|span| now.checked_add(span))
        .ok_or_else(|| ArmError::InvalidParameter {
            name: "seconds".to_string(),
            details: format!("{seconds} is not a representable hold duration"),
        })
}

fn move_arm(
    map: &mut HardwareMap,
    cfg: &ArmConfig,
    lifecycle: &HostLifecycle,
    rig: &SimHandles,
    arm_ticks: i32,
    wrist: f64,
    async_steps: Option<u32>,
) -> Result<(), ArmError> {
    let hw = Arc::new(HardwareInterface::new(
        map.take_rotary(Arm::ARM_MOTOR_NAME),
        map.take_continuous(Arm::WRIST_SERVO_NAME),
    ));
    let mover = Arc::new(ArmAndWristMover::from_config(Arc::clone(&hw), cfg));
    lifecycle.start();

    match async_steps {
        Some(steps) => {
            mover.move_async(arm_ticks, wrist);
            println!("  mode {}", mover.mode().to_string().bold());
            let period = Duration::from_micros(cfg.mover.step_period_us);
            let mut last_report = Instant::now();
            for _ in 0..steps {
                if lifecycle.state().is_terminated() {
                    break;
                }
                mover.cycle_state_machine();
                thread::sleep(period);
                if last_report.elapsed() >= REPORT_INTERVAL {
                    report(&mover, rig);
                    last_report = Instant::now();
                }
            }
        }
        None => {
            mover.move_async(arm_ticks, wrist);
            println!("  mode {}", mover.mode().to_string().bold());
            let worker = {
                let mover = Arc::clone(&mover);
                let lifecycle = lifecycle.clone();
                let period = Duration::from_micros(cfg.mover.step_period_us);
                thread::Builder::new()
                    .name("Arm Mover".to_string())
                    .spawn(move || drive_until_done(&mover, &lifecycle, period))
                    .map_err(|source| ArmError::Spawn {
                        name: "Arm Mover".to_string(),
                        source,
                    })?
            };
            wait_for_mover(&worker, &mover, rig);
            if worker.join().is_err() {
                warn!("arm mover thread panicked");
            }
        }
    }

    // The worker has exited, so nothing can overwrite this.
    hw.stop_arm();
    report(&mover, rig);
    if mover.is_done() {
        println!("  {} move complete", "✓".green().bold());
    } else {
        println!("  {} move incomplete", "⚠".yellow().bold());
    }
    Ok(())
}

/// Step the mover until both axes are done or the host terminates.
fn drive_until_done(mover: &ArmAndWristMover, lifecycle: &HostLifecycle, period: Duration) {
    while !mover.is_done() && !lifecycle.state().is_terminated() {
        mover.cycle_state_machine();
        thread::sleep(period);
    }
}

/// Print progress until the mover worker exits.
fn wait_for_mover(worker: &JoinHandle<()>, mover: &ArmAndWristMover, rig: &SimHandles) {
    let mut last_report = Instant::now();
    while !worker.is_finished() {
        thread::sleep(Duration::from_millis(10));
        if last_report.elapsed() >= REPORT_INTERVAL {
            report(mover, rig);
            last_report = Instant::now();
        }
    }
}

fn report(mover: &ArmAndWristMover, rig: &SimHandles) {
    let arm = rig.motor(Arm::ARM_MOTOR_NAME).map_or(0, |m| m.position());
    let wrist = rig.servo(Arm::WRIST_SERVO_NAME).map_or(0.0, |s| s.position());
    println!(
        "  {}  (arm at {arm}, wrist at {wrist:.3})",
        mover.status_string().dimmed()
    );
}

fn init_config(path: &std::path::Path, force: bool) -> Result<(), ArmError> {
    if path.exists() && !force {
        return Err(ArmError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    config::save_to(&ArmConfig::default(), path)?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulation
// ─────────────────────────────────────────────────────────────────────────────

fn sim_rig(cfg: &ArmConfig) -> (HardwareMap, SimHandles) {
    SimRig::builder()
        .with_motor(
            SimMotor::new(Arm::ARM_MOTOR_NAME).with_direction(cfg.geometry.motor_direction),
        )
        .with_servo(
            SimServo::new(Arm::WRIST_SERVO_NAME)
                .with_position(cfg.mover.safe_wrist_position)
                .with_slew_rate(1.5),
        )
        .with_servo(SimServo::new(Arm::FLAP_SERVO_NAME))
        .build()
}

fn spawn_physics(rig: SimHandles, lifecycle: HostLifecycle) -> Result<JoinHandle<()>, ArmError> {
    thread::Builder::new()
        .name("Sim Physics".to_string())
        .spawn(move || {
            while !lifecycle.state().is_terminated() {
                rig.step(SIM_STEP);
                thread::sleep(SIM_STEP);
            }
        })
        .map_err(|source| ArmError::Spawn {
            name: "Sim Physics".to_string(),
            source,
        })
}

fn install_ctrlc(lifecycle: &HostLifecycle) {
    let lifecycle = lifecycle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the arm …".yellow().bold());
        lifecycle.terminate();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will kill the process without stopping the arm");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_hold_with_negative_degrees() {
        let cli = Cli::parse_from(["armos", "hold", "--degrees", "-20", "--preserve-wrist"]);
        match cli.command {
            Command::Hold {
                degrees,
                preset,
                preserve_wrist,
                seconds,
            } => {
                assert_eq!(degrees, Some(-20.0));
                assert_eq!(preset, None);
                assert!(preserve_wrist);
                assert_eq!(seconds, 3.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn hold_accepts_exactly_one_target() {
        let cli = Cli::parse_from(["armos", "hold", "--preset", "deposit-on-backdrop"]);
        match cli.command {
            Command::Hold { degrees, preset, .. } => {
                assert_eq!(
                    hold_target(degrees, preset).unwrap(),
                    HoldTarget::Pose(Pose::DepositOnBackdrop)
                );
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["armos", "hold"]).is_err());
        assert!(Cli::try_parse_from(["armos", "hold", "--preset", "backdrop"]).is_err());
        assert!(
            Cli::try_parse_from(["armos", "hold", "--degrees", "10", "--preset", "idle"]).is_err()
        );
    }

    #[test]
    fn hold_deadline_rejects_unrepresentable_spans() {
        let now = Instant::now();
        assert_eq!(
            hold_deadline(now, 1.5).unwrap(),
            now + Duration::from_millis(1500)
        );
        for seconds in [-1.0, f64::NAN, f64::INFINITY, 1e20, 1.8e19] {
            assert!(
                matches!(
                    hold_deadline(now, seconds),
                    Err(ArmError::InvalidParameter { ref name, .. }) if name == "seconds"
                ),
                "{seconds} should be rejected"
            );
        }
    }

    #[test]
    fn parses_move_with_config() {
        let cli = Cli::parse_from([
            "armos",
            "move",
            "--arm-ticks",
            "1500",
            "--wrist",
            "0.4",
            "--async-steps",
            "100",
            "--config",
            "/tmp/arm.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/arm.toml")));
        assert!(matches!(
            cli.command,
            Command::Move {
                arm_ticks: 1500,
                async_steps: Some(100),
                ..
            }
        ));
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        init_config(&path, false).expect("first write");
        assert!(matches!(init_config(&path, false), Err(ArmError::Config(_))));
        init_config(&path, true).expect("forced write");
    }

    #[test]
    fn async_move_runs_against_simulation() {
        let cfg = ArmConfig::default();
        let lifecycle = HostLifecycle::new();
        let (mut map, rig) = sim_rig(&cfg);
        let physics = spawn_physics(rig.clone(), lifecycle.clone()).unwrap();

        move_arm(&mut map, &cfg, &lifecycle, &rig, 400, 0.5, Some(50)).unwrap();
        lifecycle.terminate();
        physics.join().unwrap();

        let motor = rig.motor(Arm::ARM_MOTOR_NAME).unwrap();
        assert_eq!(motor.power_history().last(), Some(&0.0));
    }

    #[test]
    fn terminated_blocking_move_leaves_motor_stopped() {
        let cfg = ArmConfig::default();
        let lifecycle = HostLifecycle::new();
        // No physics thread: the arm never reaches its target.
        let (mut map, rig) = sim_rig(&cfg);
        let motor = rig.motor(Arm::ARM_MOTOR_NAME).unwrap().clone();

        let terminator = {
            let lifecycle = lifecycle.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                lifecycle.terminate();
            })
        };
        move_arm(&mut map, &cfg, &lifecycle, &rig, 3000, 0.5, None).unwrap();
        terminator.join().unwrap();

        assert!(motor.power_history().contains(&-1.0));
        assert_eq!(motor.power(), 0.0);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(motor.power(), 0.0);
        assert_eq!(motor.power_history().last(), Some(&0.0));
    }
}
