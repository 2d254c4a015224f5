// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gridline_app::{
    DEFAULT_OVERSCAN, DEFAULT_PAGE_SIZE, Density, DisplayMode, Field, GridState, VirtualScroll,
    Viewport,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "gridline";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_CACHE_TTL: &str = "5m";
const DEFAULT_TIMEOUT: &str = "5s";
// Initial viewport height before the terminal has been measured.
const INITIAL_VIEWPORT_ROWS: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub grid: Grid,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source: Source::default(),
            grid: Grid::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub path: Option<String>,
    pub cache_ttl: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            path: None,
            cache_ttl: Some(DEFAULT_CACHE_TTL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub page_size: Option<i64>,
    pub overscan: Option<i64>,
    pub virtualization: Option<bool>,
    pub density: Option<String>,
    pub visible_columns: Option<Vec<String>>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("GRIDLINE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set GRIDLINE_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [source] and [grid]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(raw) = &self.source.path
            && raw.trim().is_empty()
        {
            bail!(
                "source.path in {} is empty -- remove it or point it at a JSON file or URL",
                path.display()
            );
        }

        if let Some(ttl) = &self.source.cache_ttl {
            parse_duration(ttl)
                .with_context(|| format!("source.cache_ttl in {}", path.display()))?;
        }

        if let Some(timeout) = &self.source.timeout {
            let parsed = parse_duration(timeout)
                .with_context(|| format!("source.timeout in {}", path.display()))?;
            if parsed.is_zero() {
                bail!(
                    "source.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.grid.page_size
            && page_size <= 0
        {
            bail!(
                "grid.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(overscan) = self.grid.overscan
            && overscan < 0
        {
            bail!(
                "grid.overscan in {} must be non-negative, got {}",
                path.display(),
                overscan
            );
        }

        if let Some(density) = &self.grid.density
            && Density::parse(density).is_none()
        {
            bail!(
                "grid.density in {} is {:?}; use compact, standard or comfortable",
                path.display(),
                density
            );
        }

        if let Some(columns) = &self.grid.visible_columns {
            if columns.is_empty() {
                bail!(
                    "grid.visible_columns in {} must list at least one column",
                    path.display()
                );
            }
            for column in columns {
                if Field::parse(column).is_none() {
                    let known: Vec<&str> = Field::ALL.iter().map(|field| field.key()).collect();
                    bail!(
                        "grid.visible_columns in {} has unknown column {:?}; known: {}",
                        path.display(),
                        column,
                        known.join(", ")
                    );
                }
            }
        }

        Ok(())
    }

    /// `[source].path`, then `GRIDLINE_DATA_PATH`.
    pub fn source_path(&self) -> Option<String> {
        self.source
            .path
            .clone()
            .or_else(|| env::var("GRIDLINE_DATA_PATH").ok())
            .filter(|path| !path.trim().is_empty())
    }

    /// A zero TTL disables the response cache.
    pub fn cache_ttl(&self) -> Result<Duration> {
        parse_duration(self.source.cache_ttl.as_deref().unwrap_or(DEFAULT_CACHE_TTL))
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.source.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> usize {
        self.grid
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn overscan(&self) -> usize {
        self.grid
            .overscan
            .and_then(|overscan| usize::try_from(overscan).ok())
            .unwrap_or(DEFAULT_OVERSCAN)
    }

    pub fn virtualization(&self) -> bool {
        self.grid.virtualization.unwrap_or(true)
    }

    pub fn density(&self) -> Density {
        self.grid
            .density
            .as_deref()
            .and_then(Density::parse)
            .unwrap_or_default()
    }

    pub fn visible_columns(&self) -> Vec<Field> {
        let mut columns: Vec<Field> = Vec::new();
        for field in self
            .grid
            .visible_columns
            .iter()
            .flatten()
            .filter_map(|column| Field::parse(column))
        {
            if !columns.contains(&field) {
                columns.push(field);
            }
        }
        if columns.is_empty() {
            Field::ALL.to_vec()
        } else {
            columns
        }
    }

    /// Initial grid state seeded from `[grid]`.
    pub fn grid_state(&self) -> GridState {
        let density = self.density();
        GridState {
            visible_columns: self.visible_columns(),
            page_size: self.page_size(),
            display: if self.virtualization() {
                DisplayMode::Virtualized
            } else {
                DisplayMode::Paged
            },
            scroll: VirtualScroll::new(Viewport::new(
                density.row_height(),
                INITIAL_VIEWPORT_ROWS,
                self.overscan(),
            )),
            density,
            ..GridState::default()
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# gridline config\n# Place this file at: {}\n\nversion = 1\n\n[source]\n# JSON file or http(s) URL. GRIDLINE_DATA_PATH is used when unset.\n# path = \"/absolute/path/to/users.json\"\n# path = \"http://localhost:3000/api/users\"\ncache_ttl = \"{}\"\ntimeout = \"{}\"\n\n[grid]\npage_size = {}\noverscan = {}\nvirtualization = true\ndensity = \"standard\"\nvisible_columns = [{}]\n",
            path.display(),
            DEFAULT_CACHE_TTL,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_OVERSCAN,
            Field::ALL
                .iter()
                .map(|field| format!("\"{}\"", field.key()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let Some(secs) = mins.checked_mul(60) else {
            bail!("duration {raw:?} is too large -- use a smaller value");
        };
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5m)")
}
