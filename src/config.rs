/// Grid configuration.
///
/// Loaded from JSON with every field optional; missing fields take the
/// defaults below.
///
/// ```
/// use livegrid::config::GridConfig;
///
/// let config = GridConfig::from_json(r#"{"page_size": 25, "row_height": 28}"#).unwrap();
/// assert_eq!(config.page_size, 25);
/// assert_eq!(config.overscan, 3);
/// ```

use crate::error::{GridError, GridResult};
use crate::pagination::PaginationMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How selected positions are tracked when the processed sequence changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionIdentity {
    /// Positions are kept verbatim across sort/filter/group changes
    #[default]
    Positional,
    /// Selected data rows follow their stable row id to the new position
    RowId,
}

/// What selecting a position outside the processed sequence does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Store the position anyway
    #[default]
    Retain,
    /// Fail with `GridError::IndexOutOfRange`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub row_height: f64,
    pub overscan: usize,
    pub viewport_height: f64,
    /// 0 disables pagination
    pub page_size: usize,
    pub pagination_mode: PaginationMode,
    pub max_page_buttons: usize,
    pub selection_identity: SelectionIdentity,
    pub out_of_range: OutOfRangePolicy,
    pub groups_expanded: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 32.0,
            overscan: 3,
            viewport_height: 480.0,
            page_size: 0,
            pagination_mode: PaginationMode::Client,
            max_page_buttons: 7,
            selection_identity: SelectionIdentity::Positional,
            out_of_range: OutOfRangePolicy::Retain,
            groups_expanded: false,
        }
    }
}

impl GridConfig {
    pub fn from_json(json: &str) -> GridResult<Self> {
        let config: GridConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> GridResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("loaded grid config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> GridResult<()> {
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            return Err(GridError::Config(format!(
                "row_height must be a positive number, got {}",
                self.row_height
            )));
        }
        if !(self.viewport_height.is_finite() && self.viewport_height >= 0.0) {
            return Err(GridError::Config(format!(
                "viewport_height must not be negative, got {}",
                self.viewport_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::from_json("{}").unwrap();
        assert_eq!(config, GridConfig::default());
        assert_eq!(config.row_height, 32.0);
        assert_eq!(config.max_page_buttons, 7);
        assert_eq!(config.selection_identity, SelectionIdentity::Positional);
    }

    #[test]
    fn test_enum_fields() {
        let config = GridConfig::from_json(
            r#"{"pagination_mode": "server", "selection_identity": "row_id", "out_of_range": "reject"}"#,
        )
        .unwrap();
        assert_eq!(config.pagination_mode, PaginationMode::Server);
        assert_eq!(config.selection_identity, SelectionIdentity::RowId);
        assert_eq!(config.out_of_range, OutOfRangePolicy::Reject);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(GridConfig::from_json(r#"{"row_height": 0}"#), Err(GridError::Config(_))));
        assert!(matches!(GridConfig::from_json(r#"{"viewport_height": -1}"#), Err(GridError::Config(_))));
        assert!(matches!(GridConfig::from_json("not json"), Err(GridError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("livegrid-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"overscan": 10}"#).unwrap();
        let config = GridConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.overscan, 10);
        assert!(matches!(GridConfig::from_file(&path), Err(GridError::Io(_))));
    }
}
