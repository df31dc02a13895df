use anyhow::{Context, Result};
use clap::Parser;
use rdk_experiment::ExperimentConfig;
use std::path::PathBuf;

mod app;
pub use app::App;

/// Random-dot motion direction discrimination task
#[derive(Parser, Debug)]
#[command(name = "rdk-app")]
#[command(version)]
struct Cli {
    /// Experiment configuration (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the per-trial CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the block order and dot motion
    #[arg(long)]
    seed: Option<u64>,

    /// Open a window instead of borderless fullscreen
    #[arg(long)]
    windowed: bool,
}

impl Cli {
    fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.experiment_config()?;

    let app = App::new(config, !cli.windowed)?;
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli =
            Cli::try_parse_from(["rdk-app", "--output", "out/run1.csv", "--seed", "9"]).unwrap();
        let config = cli.experiment_config().unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/run1.csv"));
        assert_eq!(config.seed, Some(9));
        assert!(!cli.windowed);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "coherences": [0.2, 0.8], "seed": 1 }"#).unwrap();

        let cli = Cli::try_parse_from([
            "rdk-app",
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "2",
            "--windowed",
        ])
        .unwrap();
        let config = cli.experiment_config().unwrap();
        assert_eq!(config.coherences, vec![0.2, 0.8]);
        assert_eq!(config.seed, Some(2));
        assert!(cli.windowed);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["rdk-app", "-c", "/nonexistent/rdk.json"]).unwrap();
        assert!(cli.experiment_config().is_err());
    }
}
