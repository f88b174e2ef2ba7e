use crate::ir::Position;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SNAP_DISTANCE: f32 = 40.0;
const TERMINAL_PLUG_OFFSET_X: f32 = 22.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Drops strictly closer than this to a free port anchor attach to it.
    pub threshold: f32,
    /// Horizontal distance from a terminal's top-left corner to its plug.
    pub terminal_offset_x: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            threshold: SNAP_DISTANCE,
            terminal_offset_x: TERMINAL_PLUG_OFFSET_X,
        }
    }
}

/// Switch faceplate geometry, used to place the 20 port handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceplateConfig {
    pub width: f32,
    pub height: f32,
    pub header_height: f32,
    pub body_padding: f32,
    pub panel_padding: f32,
    pub panel_gap: f32,
    pub uplink_panel_width: f32,
    pub port_height: f32,
    pub access_columns: u8,
    pub uplink_columns: u8,
    pub access_gap_x: f32,
    pub uplink_gap_x: f32,
    pub row_gap: f32,
}

impl Default for FaceplateConfig {
    fn default() -> Self {
        Self {
            width: 660.0,
            height: 160.0,
            header_height: 36.0,
            body_padding: 12.0,
            panel_padding: 12.0,
            panel_gap: 16.0,
            uplink_panel_width: 180.0,
            port_height: 40.0,
            access_columns: 8,
            uplink_columns: 2,
            access_gap_x: 8.0,
            uplink_gap_x: 16.0,
            row_gap: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub terminal: Position,
    pub switch_origin: Position,
    /// Added once per existing switch so new switches do not stack exactly.
    pub switch_step: Position,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            terminal: Position::new(50.0, 50.0),
            switch_origin: Position::new(100.0, 100.0),
            switch_step: Position::new(40.0, 40.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub snap: SnapConfig,
    pub faceplate: FaceplateConfig,
    pub spawn: SpawnConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SnapConfigFile {
    threshold: Option<f32>,
    terminal_offset_x: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FaceplateConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    header_height: Option<f32>,
    body_padding: Option<f32>,
    panel_padding: Option<f32>,
    panel_gap: Option<f32>,
    uplink_panel_width: Option<f32>,
    port_height: Option<f32>,
    access_columns: Option<u8>,
    uplink_columns: Option<u8>,
    access_gap_x: Option<f32>,
    uplink_gap_x: Option<f32>,
    row_gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SpawnConfigFile {
    terminal: Option<Position>,
    switch_origin: Option<Position>,
    switch_step: Option<Position>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    snap: Option<SnapConfigFile>,
    faceplate: Option<FaceplateConfigFile>,
    spawn: Option<SpawnConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}

/// Parses a config document. Strict JSON is tried first, then JSON5 so
/// hand-written files may carry comments and trailing commas.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(contents)?,
    };

    let mut config = Config::default();

    if let Some(snap) = parsed.snap {
        if let Some(v) = snap.threshold {
            anyhow::ensure!(v >= 0.0, "snap.threshold must not be negative");
            config.snap.threshold = v;
        }
        if let Some(v) = snap.terminal_offset_x {
            config.snap.terminal_offset_x = v;
        }
    }

    if let Some(face) = parsed.faceplate {
        let target = &mut config.faceplate;
        if let Some(v) = face.width {
            target.width = v;
        }
        if let Some(v) = face.height {
            target.height = v;
        }
        if let Some(v) = face.header_height {
            target.header_height = v;
        }
        if let Some(v) = face.body_padding {
            target.body_padding = v;
        }
        if let Some(v) = face.panel_padding {
            target.panel_padding = v;
        }
        if let Some(v) = face.panel_gap {
            target.panel_gap = v;
        }
        if let Some(v) = face.uplink_panel_width {
            target.uplink_panel_width = v;
        }
        if let Some(v) = face.port_height {
            target.port_height = v;
        }
        if let Some(v) = face.access_columns {
            anyhow::ensure!(v > 0, "faceplate.accessColumns must be positive");
            target.access_columns = v;
        }
        if let Some(v) = face.uplink_columns {
            anyhow::ensure!(v > 0, "faceplate.uplinkColumns must be positive");
            target.uplink_columns = v;
        }
        if let Some(v) = face.access_gap_x {
            target.access_gap_x = v;
        }
        if let Some(v) = face.uplink_gap_x {
            target.uplink_gap_x = v;
        }
        if let Some(v) = face.row_gap {
            target.row_gap = v;
        }
    }

    if let Some(spawn) = parsed.spawn {
        if let Some(v) = spawn.terminal {
            config.spawn.terminal = v.finite()?;
        }
        if let Some(v) = spawn.switch_origin {
            config.spawn.switch_origin = v.finite()?;
        }
        if let Some(v) = spawn.switch_step {
            config.spawn.switch_step = v.finite()?;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.snap.threshold, 40.0);
        assert_eq!(config.faceplate.access_columns, 8);
        assert_eq!(config.spawn.terminal, Position::new(50.0, 50.0));
    }

    #[test]
    fn overrides_selected_keys() {
        let config = parse_config(
            r#"{"snap": {"threshold": 25}, "spawn": {"terminal": {"x": 5, "y": 6}}}"#,
        )
        .unwrap();
        assert_eq!(config.snap.threshold, 25.0);
        assert_eq!(config.snap.terminal_offset_x, 22.0);
        assert_eq!(config.spawn.terminal, Position::new(5.0, 6.0));
    }

    #[test]
    fn accepts_json5() {
        let config = parse_config(
            "{\n  // tighter grid\n  faceplate: { accessColumns: 4, },\n}",
        )
        .unwrap();
        assert_eq!(config.faceplate.access_columns, 4);
    }

    #[test]
    fn rejects_negative_threshold() {
        assert!(parse_config(r#"{"snap": {"threshold": -1}}"#).is_err());
        assert!(parse_config("{spawn: {terminal: {x: NaN, y: 0}}}").is_err());
    }
}
