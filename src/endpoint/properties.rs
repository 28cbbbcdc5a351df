//! Loader for legacy `conflagent.<name>.properties` endpoint files.

use super::Endpoint;
use crate::config::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const FILE_PREFIX: &str = "conflagent.";
const FILE_SUFFIX: &str = ".properties";

/// Parse `key=value` lines. Blank lines and `#` comments are skipped.
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Build a typed endpoint from parsed properties, failing on the first missing key.
pub fn endpoint_from_properties(
    name: &str,
    props: &HashMap<String, String>,
) -> Result<Endpoint, ConfigError> {
    let take = |key: &str| {
        props
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::MissingKey {
                endpoint: name.to_string(),
                key: key.to_string(),
            })
    };

    let endpoint = Endpoint {
        name: name.to_string(),
        email: take("email")?,
        api_token: take("api_token")?,
        base_url: take("base_url")?,
        space_key: take("space_key")?,
        root_page_id: take("root_page_id")?,
        shared_secret: take("gpt_shared_secret")?,
    };
    endpoint.validate()?;
    Ok(endpoint)
}

/// Endpoint name encoded in a `conflagent.<name>.properties` file name.
pub fn endpoint_name_from_file(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|name| !name.is_empty())
}

/// Load every properties file in `dir`. Files not matching the naming scheme are ignored.
pub fn load_properties_dir(dir: &Path) -> Result<Vec<Endpoint>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut endpoints = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(name) = endpoint_name_from_file(&file_name) else {
            continue;
        };

        let path = entry.path();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Loading endpoint '{}' from {}", name, path.display());
        endpoints.push(endpoint_from_properties(name, &parse_properties(&content))?);
    }

    endpoints.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(endpoints)
}
