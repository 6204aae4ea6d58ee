use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use dsmcsim::config::SimConfig;
use dsmcsim::core::Simulation;
use dsmcsim::error::Result;
use dsmcsim::report::{fitted_temperature, maxwell_boltzmann_speed_pdf, SpeedHistogram};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Relax a monatomic gas toward Maxwell-Boltzmann with 1D DSMC",
    long_about = None
)]
struct Args {
    /// JSON configuration file; omitted fields use the Argon defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed, overrides the one in the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of speed histogram bins
    #[arg(short, long, default_value_t = 40)]
    bins: usize,

    /// Write the histogram and theoretical curve as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long, action)]
    dump_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.dump_config {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    let mass = config.species.mass;
    let mut sim = Simulation::new(config)?;
    let summary = sim.run();
    println!("{summary}");

    let samples = sim.samples();
    if samples.is_empty() {
        log::warn!("no speeds were sampled; increase total_time or lower sample_warmup_time");
        return Ok(());
    }

    let t_fit = fitted_temperature(samples, mass)?;
    let hist = SpeedHistogram::from_samples(samples, args.bins, None)?;
    println!("fitted temperature:    {t_fit:.3} K");
    println!(
        "KL(samples ‖ MB):      {:.4e}",
        hist.kl_divergence(t_fit, mass)?
    );
    println!();
    println!("{:>10}  {:>12}  {:>12}", "speed", "sampled", "theory");
    for (c, d) in hist.centers().into_iter().zip(hist.density()) {
        println!(
            "{c:>10.1}  {d:>12.4e}  {:>12.4e}",
            maxwell_boltzmann_speed_pdf(c, t_fit, mass)
        );
    }

    if let Some(path) = &args.csv {
        hist.write_histogram_csv(BufWriter::new(File::create(path)?), t_fit, mass)?;
        log::info!("histogram written to {}", path.display());
    }
    Ok(())
}
