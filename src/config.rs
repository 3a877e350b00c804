// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Analysis configuration system

use crate::accel::{ExecutionMode, Executor, DEFAULT_AUTO_THRESHOLD};
use crate::decompose::{decompose, Decomposition, DecompositionParams};
use crate::geometry::TriangleMesh;
use crate::spatial::{Bvh, SortAxis, SpatialPartition};
use crate::topology::{evaluate_with, AnalysisKind, TopologyEvaluation, TopologyThresholds};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read by [`AnalysisConfig::load`] when present in the working directory
pub const CONFIG_FILE: &str = "meshprep.toml";

/// Analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Leaf size of the spatial index
    pub max_triangles_per_leaf: usize,
    /// Number of X bands in the spatial partition
    pub num_partitions: usize,
    pub sort_axis: SortAxis,
    pub execution_mode: ExecutionMode,
    /// Triangle count at which `Auto` mode switches to the accelerator
    pub auto_threshold: usize,
    pub decomposition: DecompositionParams,
    pub thresholds: TopologyThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_triangles_per_leaf: 10,
            num_partitions: 4,
            sort_axis: SortAxis::default(),
            execution_mode: ExecutionMode::CpuOnly,
            auto_threshold: DEFAULT_AUTO_THRESHOLD,
            decomposition: DecompositionParams::default(),
            thresholds: TopologyThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from file; `.json` files are read as JSON, anything
    /// else as TOML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AnalysisConfig = if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        };
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MESHPREP_*` overrides read through `var`
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = var("MESHPREP_MAX_TRIANGLES_PER_LEAF") {
            self.max_triangles_per_leaf = value
                .parse()
                .with_context(|| format!("Invalid MESHPREP_MAX_TRIANGLES_PER_LEAF: {value}"))?;
        }

        if let Some(value) = var("MESHPREP_NUM_PARTITIONS") {
            self.num_partitions = value
                .parse()
                .with_context(|| format!("Invalid MESHPREP_NUM_PARTITIONS: {value}"))?;
        }

        if let Some(value) = var("MESHPREP_MAX_PARTS") {
            self.decomposition.max_parts = value
                .parse()
                .with_context(|| format!("Invalid MESHPREP_MAX_PARTS: {value}"))?;
        }

        if let Some(value) = var("MESHPREP_EXECUTION_MODE") {
            self.execution_mode = parse_execution_mode(&value)
                .with_context(|| format!("Invalid MESHPREP_EXECUTION_MODE: {value}"))?;
        }

        if let Some(value) = var("MESHPREP_AUTO_THRESHOLD") {
            self.auto_threshold = value
                .parse()
                .with_context(|| format!("Invalid MESHPREP_AUTO_THRESHOLD: {value}"))?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_json(path.as_ref()) {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Executor for the configured mode
    pub fn executor(&self) -> Result<Executor> {
        let executor = Executor::init(self.execution_mode)
            .context("Failed to initialise execution backend")?;
        Ok(executor.with_auto_threshold(self.auto_threshold))
    }

    pub fn build_bvh(&self, mesh: &TriangleMesh, executor: &Executor) -> Result<Bvh> {
        Ok(Bvh::build_with(mesh, self.max_triangles_per_leaf, executor)?)
    }

    pub fn partition(&self, mesh: &TriangleMesh) -> Result<SpatialPartition> {
        Ok(SpatialPartition::create(
            mesh,
            self.num_partitions,
            self.sort_axis,
        )?)
    }

    pub fn decompose(&self, mesh: &TriangleMesh) -> Result<Decomposition> {
        Ok(decompose(mesh, &self.decomposition)?)
    }

    pub fn evaluate(
        &self,
        mesh: &TriangleMesh,
        kind: AnalysisKind,
        executor: &Executor,
    ) -> Result<TopologyEvaluation> {
        Ok(evaluate_with(mesh, kind, &self.thresholds, executor)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_execution_mode(value: &str) -> Result<ExecutionMode> {
    match value.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "cpu" | "cpuonly" => Ok(ExecutionMode::CpuOnly),
        "accelerated" | "acceleratedonly" => Ok(ExecutionMode::AcceleratedOnly),
        "preferred" | "acceleratedpreferred" => Ok(ExecutionMode::AcceleratedPreferred),
        "auto" => Ok(ExecutionMode::Auto),
        other => anyhow::bail!("unknown execution mode `{other}`"),
    }
}
