use ad_orchestrator::config::{AdSlotConfig, PluginOptions};
use ad_orchestrator::device::DeviceClass;
use ad_orchestrator::simulate::{self, SimulationSettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adorch", about = "Video ad insertion orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every ad slot in an options file
    Validate {
        /// Options file (defaults to the user config location)
        file: Option<PathBuf>,
    },
    /// Play a session in virtual time and print the emitted signals
    Simulate {
        /// Options file (defaults to the user config location)
        file: Option<PathBuf>,
        /// Content length in seconds
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        /// Device class (desktop, android, iphone, ipod, ipad); overrides the file
        #[arg(long)]
        device: Option<String>,
        /// Length of each ad in seconds
        #[arg(long, default_value_t = 15.0)]
        ad_length: f64,
        /// Make every ad request fail
        #[arg(long)]
        fail_fetch: bool,
    },
}

fn load_options(file: Option<PathBuf>) -> PluginOptions {
    let path = match file {
        Some(path) => path,
        None => match PluginOptions::default_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    };
    match PluginOptions::load(&path) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbosity: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.unwrap_or("warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let options = load_options(file);
            init_logging(options.log_level());

            match options.device_class() {
                Ok(class) => println!("Device: {}", class),
                Err(e) => println!("Device: invalid ({})", e),
            }
            let mut failures = 0;
            for (index, slot) in options.ads.iter().enumerate() {
                match AdSlotConfig::from_options(slot) {
                    Ok(config) => println!(
                        "  [{}] {} at {}s (trigger second {}): ok",
                        index,
                        config.position,
                        config.offset,
                        config.trigger_second()
                    ),
                    Err(e) => {
                        failures += 1;
                        println!("  [{}] invalid: {}", index, e);
                    }
                }
            }
            println!("{} slot(s), {} invalid", options.ads.len(), failures);
            if failures > 0 {
                std::process::exit(1);
            }
        }
        Commands::Simulate {
            file,
            duration,
            device,
            ad_length,
            fail_fetch,
        } => {
            let mut options = load_options(file);
            init_logging(options.log_level());

            if let Some(name) = device {
                if let Err(e) = name.parse::<DeviceClass>() {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                options.device = Some(name);
            }
            let settings = SimulationSettings {
                content_duration: duration,
                ad_length,
                fail_fetch,
                ..Default::default()
            };
            let report = match simulate::run(&options, &settings) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            for (at, signal) in &report.signals {
                if matches!(signal, ad_orchestrator::Signal::Tick(_)) {
                    continue;
                }
                println!("{:>9.3}s  {}", at.as_secs_f64(), signal);
            }
            println!(
                "ads started: {} | ended: {} | errors: {}",
                report.count("vast.adStart"),
                report.count("vast.adEnd"),
                report.count("vast.adError")
            );
        }
    }
}
