//! Run plan for the feature-table binary.

use std::env;
use std::path::PathBuf;

use crate::error::FeatureError;
use crate::readings::{Parameter, Site};
use crate::window::LagBucket;

const DEFAULT_BUCKETS: [(u32, u32); 5] = [(1, 3), (4, 6), (7, 9), (10, 12), (13, 15)];

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub buckets: Vec<LagBucket>,
    pub parameters: Vec<Parameter>,
    pub sites: Vec<Site>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("aquahives_export.csv"),
            output_dir: PathBuf::from("."),
            buckets: default_buckets(),
            parameters: vec![Parameter::Turbidity, Parameter::Toc],
            sites: vec![Site::Pinawa, Site::Whitemouth],
        }
    }
}

pub fn default_buckets() -> Vec<LagBucket> {
    DEFAULT_BUCKETS
        .iter()
        .filter_map(|(start, end)| LagBucket::new(i64::from(*start), i64::from(*end)).ok())
        .collect()
}

pub fn run_config_from_env() -> Result<RunConfig, FeatureError> {
    let mut config = RunConfig::default();

    if let Some(input) = non_empty_var("AQF_INPUT") {
        config.input_path = PathBuf::from(input);
    }

    if let Some(output_dir) = non_empty_var("AQF_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(output_dir);
    }

    if let Some(raw) = non_empty_var("AQF_BUCKETS") {
        config.buckets = parse_buckets(&raw)?;
    }

    if let Some(raw) = non_empty_var("AQF_PARAMETERS") {
        config.parameters = split_list(&raw).map(Parameter::parse).collect();
    }

    if let Some(raw) = non_empty_var("AQF_SITES") {
        config.sites = split_list(&raw).map(Site::parse).collect();
    }

    Ok(config)
}

/// Parses `"1-3,4-6"`.
pub fn parse_buckets(raw: &str) -> Result<Vec<LagBucket>, FeatureError> {
    let buckets = split_list(raw)
        .map(str::parse)
        .collect::<Result<Vec<LagBucket>, _>>()?;
    if buckets.is_empty() {
        return Err(FeatureError::InvalidConfig(
            "at least one lag bucket is required".to_string(),
        ));
    }
    Ok(buckets)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
