use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use sfrc_inp::{EntityKind, InpFile};
use sfrc_io::{Isotropy, MaterialPropertyChange, OrientationSource, RunConfig, RunReport};

#[derive(Parser, Debug)]
#[command(name = "sfrc")]
#[command(about = "Fiber orientation post-processing for short-fiber composite decks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of estimation threads (default: all available cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the entities found in a deck
    Index {
        input: PathBuf,
    },
    /// Estimate fiber orientations and report them
    Estimate {
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Write a copy of the deck with per-fiber orientations
    Inject {
        input: PathBuf,

        /// Rewritten deck
        #[arg(short, long)]
        output: PathBuf,

        /// Take angles from a `;`-delimited orientation table instead of estimating
        #[arg(long)]
        table: Option<PathBuf>,

        /// Material of the injected sections
        #[arg(long)]
        material: Option<String>,

        /// Stop copying at the first line containing this text
        #[arg(long)]
        break_at: Option<String>,

        #[command(flatten)]
        property: PropertyArgs,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run from a JSON configuration file
    Run {
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Fiber family names to try, in order
    #[arg(short, long = "family", default_value = "Fiber")]
    families: Vec<String>,

    /// Skip the comparison with recorded orientations
    #[arg(long)]
    no_compare: bool,

    /// Write a JSON report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write a plain-text listing of buckets, groups and orientations here
    #[arg(long)]
    debug_dump: Option<PathBuf>,

    /// Print the report to stdout as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PropertyArgs {
    /// Material property to replace, e.g. `Conductivity`
    #[arg(long, requires_all = ["property_material", "values"])]
    property: Option<String>,

    /// Material holding the property
    #[arg(long)]
    property_material: Option<String>,

    #[arg(long, value_enum, default_value_t = IsotropyArg::Isotropic)]
    isotropy: IsotropyArg,

    /// New values, comma separated
    #[arg(long, value_delimiter = ',')]
    values: Vec<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum IsotropyArg {
    Isotropic,
    Orthotropic,
    Anisotropic,
}

impl From<IsotropyArg> for Isotropy {
    fn from(arg: IsotropyArg) -> Self {
        match arg {
            IsotropyArg::Isotropic => Isotropy::Isotropic,
            IsotropyArg::Orthotropic => Isotropy::Orthotropic,
            IsotropyArg::Anisotropic => Isotropy::Anisotropic,
        }
    }
}

impl CommonArgs {
    fn apply(&self, config: &mut RunConfig) {
        config.family_candidates = self.families.clone();
        config.compare = !self.no_compare;
        config.report = self.report.clone();
        config.debug_dump = self.debug_dump.clone();
    }
}

impl PropertyArgs {
    fn change(&self) -> Option<MaterialPropertyChange> {
        let property = self.property.clone()?;
        Some(MaterialPropertyChange {
            material: self.property_material.clone().unwrap_or_default(),
            property,
            isotropy: self.isotropy.into(),
            values: self.values.clone(),
        })
    }
}

/// Turn a subcommand into a run configuration, or `None` for `index`.
fn to_config(command: &Commands) -> Result<Option<(RunConfig, bool)>, sfrc_io::IoError> {
    let config = match command {
        Commands::Index { .. } => return Ok(None),
        Commands::Estimate { input, common } => {
            let mut config = RunConfig {
                input: input.clone(),
                ..RunConfig::default()
            };
            common.apply(&mut config);
            (config, common.json)
        }
        Commands::Inject {
            input,
            output,
            table,
            material,
            break_at,
            property,
            common,
        } => {
            let mut config = RunConfig {
                input: input.clone(),
                output: Some(output.clone()),
                material: material.clone(),
                break_point: break_at.clone(),
                material_property: property.change(),
                source: match table {
                    Some(path) => OrientationSource::Table { path: path.clone() },
                    None => OrientationSource::Estimate,
                },
                ..RunConfig::default()
            };
            common.apply(&mut config);
            (config, common.json)
        }
        Commands::Run { config } => (RunConfig::load(config)?, false),
    };
    Ok(Some(config))
}

fn print_index(input: &Path) -> Result<(), sfrc_inp::InpError> {
    let deck = InpFile::open(input)?;
    let index = deck.index();
    for kind in EntityKind::ALL {
        println!("{kind}: {}", index.len(kind));
    }
    for kind in index.empty_kinds() {
        println!("missing: {kind}");
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("family: {}", report.family);
    println!("fibers: {}", report.fibers.len());
    println!("groups: {}", report.groups.len());
    println!("individual: {}", report.individual.len());
    if !report.unpaired.is_empty() {
        println!("unpaired: {}", report.unpaired.join(", "));
    }
    println!("warnings: {}", report.warnings.len());
    if let Some(comparison) = &report.comparison
        && let (Some(mean), Some(min), Some(max)) =
            (comparison.mean_degrees, comparison.min_degrees, comparison.max_degrees)
    {
        println!("orientation error (deg): mean {mean:.3}, min {min:.3}, max {max:.3}");
    }
    if let Some(output) = &report.output {
        println!("injected_sections: {}", report.injected_sections);
        println!("output: {output}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Some(threads) = cli.threads {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            error!("failed to set thread pool size: {err}");
            return ExitCode::from(2);
        }
        info!("using {threads} threads");
    }

    if let Commands::Index { input } = &cli.command {
        return match print_index(input) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                ExitCode::from(1)
            }
        };
    }

    let (config, json) = match to_config(&cli.command) {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };

    let started = Utc::now();
    let outcome = match sfrc_io::run(&config) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(1);
        }
    };
    info!(
        "finished in {} ms",
        (Utc::now() - started).num_milliseconds()
    );

    if json {
        match serde_json::to_string_pretty(&outcome.report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                error!("failed to serialize report: {err}");
                return ExitCode::from(1);
            }
        }
    } else {
        print_summary(&outcome.report);
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(args: &[&str]) -> (RunConfig, bool) {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        to_config(&cli.command).unwrap().expect("command should run")
    }

    #[test]
    fn estimate_defaults_to_fiber_family_with_comparison() {
        let (config, json) = config_for(&["sfrc", "estimate", "coupon.inp", "--json"]);
        assert_eq!(config.input, PathBuf::from("coupon.inp"));
        assert_eq!(config.family_candidates, vec!["Fiber"]);
        assert!(config.compare && json);
        assert!(config.output.is_none());
    }

    #[test]
    fn inject_maps_every_option() {
        let (config, _) = config_for(&[
            "sfrc", "-v", "inject", "in.inp", "-o", "out/in.inp", "--table", "ori.txt",
            "-f", "Glass", "-f", "Fiber", "--break-at", "STEP", "--property", "Conductivity",
            "--property-material", "Carbon_Fiber", "--isotropy", "orthotropic", "--values",
            "6.83e-3,2.18e-3,2.18e-3", "--no-compare",
        ]);
        assert_eq!(config.output, Some(PathBuf::from("out/in.inp")));
        assert_eq!(config.family_candidates, vec!["Glass", "Fiber"]);
        assert_eq!(config.break_point.as_deref(), Some("STEP"));
        assert!(!config.compare);
        assert_eq!(
            config.source,
            OrientationSource::Table {
                path: PathBuf::from("ori.txt")
            }
        );
        let change = config.material_property.as_ref().expect("property change");
        assert_eq!(change.isotropy, Isotropy::Orthotropic);
        assert_eq!(change.values, vec![6.83e-3, 2.18e-3, 2.18e-3]);
        config.validate().expect("config should validate");
    }

    #[test]
    fn property_needs_material_and_values() {
        let err = Cli::try_parse_from(["sfrc", "inject", "a.inp", "-o", "b.inp", "--property", "Conductivity"]);
        assert!(err.is_err());
    }

    #[test]
    fn index_needs_no_config() {
        let cli = Cli::try_parse_from(["sfrc", "index", "a.inp"]).unwrap();
        assert!(to_config(&cli.command).unwrap().is_none());
    }
}
