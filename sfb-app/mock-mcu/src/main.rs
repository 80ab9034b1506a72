mod sim;

use clap::{Parser, ValueEnum};
use sfb_core::utils::{
    config::FollowConfig,
    controllers::{
        DistanceSensor, Drivetrain, FollowStrategy, PanScanner, RangeSensor, ScanFollow,
        SimpleFollow,
    },
    CommandChannel, ControlLoop, EmbassyClock,
};
use sim::{motor_channels, SimPin, SimPwm, StdDelay, StdioSerial, World};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error>;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy
{
    /// Drive forward while something is within the threshold.
    Simple,
    /// Sweep left/center/right and hold the target distance.
    Scan,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// follow strategy
    #[clap(long, value_enum, default_value = "scan")]
    policy: Policy,
    /// JSON file with tuning overrides
    #[clap(long)]
    config: Option<PathBuf>,
    /// obstacle distance to the left (cm)
    #[clap(long, default_value_t = 200.0)]
    left: f32,
    /// obstacle distance straight ahead (cm)
    #[clap(long, default_value_t = 25.0)]
    center: f32,
    /// obstacle distance to the right (cm)
    #[clap(long, default_value_t = 200.0)]
    right: f32,
    /// run each motor forward once before starting
    #[clap(long)]
    jog: bool,
}

fn load_config(path: Option<&Path>) -> Result<FollowConfig, BoxError> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<FollowConfig>(&text)?
        }
        None => FollowConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run<R, F>(
    mut ctl: ControlLoop<SimPin, SimPwm, R, F, StdioSerial, StdDelay>,
    shutdown: &AtomicBool,
    jog: bool,
) -> Result<(), BoxError>
where
    R: RangeSensor,
    F: FollowStrategy,
{
    ctl.commands().announce();
    if jog {
        info!("Jogging motors M1..M4");
        ctl.drivetrain().jog_test(&mut StdDelay, 20_000, 1_000, 400)?;
    }
    ctl.run(shutdown)?;
    Ok(())
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let opts: Opts = Opts::parse();

    let config = load_config(opts.config.as_deref())?;
    info!(policy = ?opts.policy, ?config, "Starting simulated follower");

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, stopping");
        flag.store(true, Ordering::Release);
    })?;

    let world = World::new([opts.left, opts.center, opts.right]);
    let drivetrain = Drivetrain::new(motor_channels(), config.polarity, config.limits);
    let sensor = DistanceSensor::new(world.trigger(), world.echo(), EmbassyClock);
    let commands = CommandChannel::new(StdioSerial::spawn());

    match opts.policy {
        Policy::Simple => {
            let ctl =
                ControlLoop::new(drivetrain, sensor, SimpleFollow, commands, StdDelay, config);
            run(ctl, &shutdown, opts.jog)?;
        }
        Policy::Scan => {
            let mut scanner = PanScanner::new(world.servo());
            scanner.rest()?;
            let ctl = ControlLoop::new(
                drivetrain,
                sensor,
                ScanFollow::new(scanner),
                commands,
                StdDelay,
                config,
            );
            run(ctl, &shutdown, opts.jog)?;
        }
    }

    info!("Program stopped by user");
    Ok(())
}
