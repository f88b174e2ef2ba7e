use crate::config::{FaceplateConfig, SnapConfig};
use crate::ir::{PortId, PortKind, Position, Switch, Topology};

/// Handle rectangle of one port, relative to its switch's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortAnchor {
    pub port: PortId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PortAnchor {
    /// Top-centre of the handle, where a terminal plug lands.
    pub fn plug_point(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y)
    }

    /// Parent-relative position a terminal takes when plugged in here.
    pub fn terminal_offset(&self, snap: &SnapConfig) -> Position {
        let plug = self.plug_point();
        Position::new(plug.x - snap.terminal_offset_x, plug.y)
    }
}

/// Per-port handle geometry of a switch, normally owned by the renderer.
pub trait PortLayout {
    fn anchors(&self, switch: &Switch) -> Vec<PortAnchor>;

    fn anchor(&self, switch: &Switch, port: PortId) -> Option<PortAnchor> {
        self.anchors(switch)
            .into_iter()
            .find(|anchor| anchor.port == port)
    }
}

impl FaceplateConfig {
    fn port_anchor(&self, port: PortId) -> PortAnchor {
        let (panel_x, panel_width, columns, gap_x, index) = match port.kind() {
            PortKind::Access => (
                self.body_padding,
                self.width - 2.0 * self.body_padding - self.panel_gap - self.uplink_panel_width,
                self.access_columns.max(1),
                self.access_gap_x,
                port.number() - 1,
            ),
            PortKind::Uplink => (
                self.width - self.body_padding - self.uplink_panel_width,
                self.uplink_panel_width,
                self.uplink_columns.max(1),
                self.uplink_gap_x,
                port.number() - crate::ir::ACCESS_PORT_COUNT - 1,
            ),
        };
        let inner_width = panel_width - 2.0 * self.panel_padding;
        let cell_width = (inner_width - f32::from(columns - 1) * gap_x) / f32::from(columns);
        let col = f32::from(index % columns);
        let row = f32::from(index / columns);
        PortAnchor {
            port,
            x: panel_x + self.panel_padding + col * (cell_width + gap_x),
            y: self.header_height
                + self.body_padding
                + self.panel_padding
                + row * (self.port_height + self.row_gap),
            width: cell_width,
            height: self.port_height,
        }
    }
}

impl PortLayout for FaceplateConfig {
    fn anchors(&self, _switch: &Switch) -> Vec<PortAnchor> {
        PortId::all().map(|port| self.port_anchor(port)).collect()
    }

    fn anchor(&self, _switch: &Switch, port: PortId) -> Option<PortAnchor> {
        Some(self.port_anchor(port))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapDecision {
    Attach {
        switch: String,
        port: PortId,
        offset: Position,
        distance: f32,
    },
    Release {
        position: Position,
    },
}

/// Picks the port a dropped terminal plugs into.
///
/// `drop` is the terminal's absolute top-left; `current` is the port it was on
/// before the drag, which stays eligible so a terminal can be put back where it
/// came from. Candidates are scanned switch by switch, port by port, and only a
/// strictly closer anchor replaces the best one, so on exact ties the first
/// anchor encountered wins. That order carries no meaning beyond determinism.
pub fn resolve_snap(
    topology: &Topology,
    layout: &impl PortLayout,
    snap: &SnapConfig,
    current: Option<(&str, PortId)>,
    drop: Position,
) -> SnapDecision {
    let probe = Position::new(drop.x + snap.terminal_offset_x, drop.y);
    let mut best: Option<(PortAnchor, &Switch, f32)> = None;
    let mut best_distance = snap.threshold;

    for sw in &topology.switches {
        for anchor in layout.anchors(sw) {
            let own_port = current == Some((sw.id.as_str(), anchor.port));
            if sw.is_occupied(anchor.port) && !own_port {
                continue;
            }
            let distance = probe.distance(sw.position.offset(anchor.plug_point()));
            if distance < best_distance {
                best_distance = distance;
                best = Some((anchor, sw, distance));
            }
        }
    }

    match best {
        Some((anchor, sw, distance)) => SnapDecision::Attach {
            switch: sw.id.clone(),
            port: anchor.port,
            offset: anchor.terminal_offset(snap),
            distance,
        },
        None => SnapDecision::Release { position: drop },
    }
}
