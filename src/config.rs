//! Tunable constants for the editor.
//!
//! Every field has a default matching the classic patch editor, so an empty
//! JSON object (or no file at all) gives the stock behaviour.

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Glyph width in pixels.
    pub font_width: i32,
    /// Line height in pixels.
    pub font_height: i32,
    /// Wrap column for text boxes without an explicit width.
    pub default_text_width: usize,
    /// Maximum delay between mouse-up and the next mouse-down for a double-click.
    pub double_click_ms: u64,
    /// Maximum pointer travel (per axis) between the two clicks of a double-click.
    pub double_click_slop: i32,
    /// Delay used to batch motion events into one displacement.
    pub move_coalesce_ms: u64,
    /// Squared pixel distance within which a click hits a cord.
    pub line_hit_threshold: i64,
    /// Offset applied to pasted objects that would land on their originals.
    pub paste_offset: i32,
    pub nudge_small: i32,
    pub nudge_large: i32,
    /// Inlet/outlet nub width.
    pub port_width: i32,
    /// Inlet/outlet nub height.
    pub port_height: i32,
    /// Total horizontal text margin.
    pub text_margin_x: i32,
    /// Total vertical text margin.
    pub text_margin_y: i32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_width: 7,
            font_height: 16,
            default_text_width: 60,
            double_click_ms: 250,
            double_click_slop: 0,
            move_coalesce_ms: 5,
            line_hit_threshold: 50,
            paste_offset: 10,
            nudge_small: 1,
            nudge_large: 10,
            port_width: 7,
            port_height: 3,
            text_margin_x: 2,
            text_margin_y: 2,
        }
    }
}

impl EditorConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let cfg: EditorConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Half the port nub width, used to centre cords on their ports.
    pub fn port_middle(&self) -> i32 {
        (self.port_width - 1) / 2
    }

    pub fn text_metrics(&self) -> crate::rtext::TextMetrics {
        crate::rtext::TextMetrics {
            font_width: self.font_width,
            font_height: self.font_height,
            margin_x: self.text_margin_x,
            margin_y: self.text_margin_y,
            default_width: self.default_text_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: EditorConfig = serde_json::from_str(r#"{ "font_width": 9 }"#).unwrap();
        assert_eq!(cfg.font_width, 9);
        assert_eq!(cfg.default_text_width, 60);
        assert_eq!(cfg.double_click_ms, 250);
        assert_eq!(cfg.port_middle(), 3);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{ "paste_offset": 20 }"#).unwrap();
        let cfg = EditorConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.paste_offset, 20);
        assert_eq!(cfg.nudge_large, 10);
    }
}
