use std::path::PathBuf;
use std::time::Duration;

use air_sampler::node::{self, Config};
use air_sampler::sensors::simulated::{SimGasSensor, SimIndicator, SimThermometer};
use air_sampler::sensors::{self, Bme280, Led, Sgp30};
use air_sampler::Persistence;
use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::{Result, Section};
use linux_embedded_hal::{Delay, I2cdev};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "air sampler")]
#[command(version = "1.0")]
#[command(
    about = "Samples temperature, humidity, co2eq and tvoc and calibrates the \
    gas sensor during the first 48 hours"
)]
struct Cli {
    /// where baselines.json and upload_queue.json live
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// seconds between samples
    #[arg(short, long, default_value_t = 3)]
    interval: u64,

    /// seconds until the gas sensor baseline is stored
    #[arg(long, default_value_t = 172_800)]
    warmup: u64,

    #[arg(long, value_enum, default_value_t)]
    persistence: Persistence,

    /// run without hardware using simulated sensors
    #[arg(long)]
    simulate: bool,

    #[arg(long, default_value = "/dev/i2c-1")]
    i2c_bus: String,

    #[arg(long, default_value = "/dev/gpiochip0")]
    gpio_chip: String,

    /// gpio line the status led is on
    #[arg(long, default_value_t = 17)]
    led_line: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    setup_tracing();
    let cli = Cli::parse();
    info!("started air-sampler, args: {cli:?}");

    let config = Config {
        data_dir: cli.data_dir.clone(),
        interval: Duration::from_secs(cli.interval),
        warmup: Duration::from_secs(cli.warmup),
        persistence: cli.persistence,
    };

    if cli.simulate {
        let thermometer = SimThermometer::steady(21.5, 45.0);
        let gas = SimGasSensor::new([(400, 20), (410, 22), (405, 21)]).with_baseline(
            sensors::Baseline {
                co2eq: 0x8973,
                tvoc: 0x8aae,
            },
        );
        return node::run(
            &config,
            thermometer,
            sensors::shared(gas),
            sensors::shared(SimIndicator::default()),
            shutdown(),
        )
        .await;
    }

    let thermometer = Bme280::open(&cli.i2c_bus).wrap_err("Could not set up bme280")?;
    let bus = I2cdev::new(&cli.i2c_bus)
        .wrap_err("Could not open i2c bus for sgp30")
        .with_note(|| format!("bus: {}", cli.i2c_bus))?;
    let mut gas = Sgp30::new(bus, Delay);
    gas.init().wrap_err("Could not init sgp30")?;
    let led = Led::open(&cli.gpio_chip, cli.led_line).wrap_err("Could not set up status led")?;

    node::run(
        &config,
        thermometer,
        sensors::shared(gas),
        sensors::shared(led),
        shutdown(),
    )
    .await
}

async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Can not listen for shutdown signal, only a kill will stop us: {e}");
        std::future::pending::<()>().await;
    }
}

fn setup_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let fmt = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt)
        .with(ErrorLayer::default())
        .init();
}
