use std::fs;

use anyhow::{Context, Result};

use magnum_forge::{MetalStrategy, SolverConfig};

use crate::cli::{MetalStrategyArg, SolverOptions};

impl From<MetalStrategyArg> for MetalStrategy {
    fn from(arg: MetalStrategyArg) -> Self {
        match arg {
            MetalStrategyArg::Auto => MetalStrategy::Auto,
            MetalStrategyArg::Projection => MetalStrategy::Projection,
            MetalStrategyArg::Purification => MetalStrategy::Purification,
        }
    }
}

/// File configuration first, then command-line overrides.
pub fn build_solver_config(opts: &SolverOptions) -> Result<SolverConfig> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            SolverConfig::from_toml(&text)
                .with_context(|| format!("Invalid solver config: {}", path.display()))?
        }
        None => SolverConfig::default(),
    };

    if let Some(strategy) = opts.metal_strategy {
        config.metal_strategy = strategy.into();
    }
    if let Some(replication) = opts.replication {
        config.replication = replication;
    }
    if let Some(limit) = opts.single_output_limit {
        config.single_output_limit = limit;
    }
    if opts.no_collision_check {
        config.collision_check = false;
    }
    if opts.no_optimize {
        config.optimize_parts = false;
    }

    config.validate()?;
    Ok(config)
}

pub fn strategy_name(strategy: MetalStrategy) -> &'static str {
    match strategy {
        MetalStrategy::Auto => "auto",
        MetalStrategy::Projection => "projection",
        MetalStrategy::Purification => "purification",
    }
}
