use crate::ir::{
    Attachment, Cable, Direction, PortKind, PortTraffic, Position, Switch, Terminal,
    TerminalCategory, Topology,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Read model handed to the rendering layer after every resync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyView {
    pub switches: Vec<SwitchView>,
    pub terminals: Vec<TerminalView>,
    pub cables: Vec<CableView>,
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchView {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub ports: Vec<PortView>,
    /// Handles such as `p-1`.
    pub occupied_ports: Vec<String>,
    pub traffic: BTreeMap<String, PortTraffic>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortView {
    pub id: u8,
    pub handle: String,
    pub kind: PortKind,
    pub label: String,
    pub pvid: u16,
    pub vlan: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalView {
    pub id: String,
    pub label: String,
    pub category: TerminalCategory,
    pub direction: Direction,
    pub is_snapped: bool,
    pub attached_switch: Option<String>,
    pub attached_port: Option<String>,
    /// Parent-relative when snapped, absolute otherwise.
    pub position: Position,
    pub absolute_position: Position,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CableView {
    pub id: String,
    pub label: String,
    pub direction: Direction,
    pub source: String,
    pub source_handle: String,
    pub source_label: String,
    pub target: String,
    pub target_handle: String,
    pub target_label: String,
}

impl SwitchView {
    fn from_switch(sw: &Switch) -> Self {
        Self {
            id: sw.id.clone(),
            label: sw.label.clone(),
            position: sw.position,
            ports: sw
                .ports
                .iter()
                .map(|port| PortView {
                    id: port.id.number(),
                    handle: port.id.handle(),
                    kind: port.kind,
                    label: port.label.clone(),
                    pvid: port.native_vlan,
                    vlan: port.permitted_vlans.to_string(),
                })
                .collect(),
            occupied_ports: sw.occupied_ports.iter().map(|port| port.handle()).collect(),
            traffic: sw
                .traffic
                .iter()
                .map(|(port, traffic)| (port.handle(), *traffic))
                .collect(),
        }
    }
}

impl TerminalView {
    fn from_terminal(topology: &Topology, term: &Terminal) -> Self {
        let (position, attached_switch, attached_port) = match &term.attachment {
            Attachment::Free { position } => (*position, None, None),
            Attachment::Attached {
                switch,
                port,
                offset,
            } => (*offset, Some(switch.clone()), Some(port.handle())),
        };
        Self {
            id: term.id.clone(),
            label: term.label.clone(),
            category: term.category,
            direction: term.direction,
            is_snapped: attached_switch.is_some(),
            attached_switch,
            attached_port,
            position,
            absolute_position: topology.absolute_position(term),
        }
    }
}

impl CableView {
    fn from_cable(cable: &Cable) -> Self {
        Self {
            id: cable.id.clone(),
            label: cable.label.clone(),
            direction: cable.direction,
            source: cable.source.switch.clone(),
            source_handle: cable.source.port.handle(),
            source_label: cable.source.port.to_string(),
            target: cable.target.switch.clone(),
            target_handle: cable.target.port.handle(),
            target_label: cable.target.port.to_string(),
        }
    }
}

impl TopologyView {
    pub fn new(topology: &Topology, can_undo: bool, can_redo: bool) -> Self {
        Self {
            switches: topology.switches.iter().map(SwitchView::from_switch).collect(),
            terminals: topology
                .terminals
                .iter()
                .map(|term| TerminalView::from_terminal(topology, term))
                .collect(),
            cables: topology.cables.iter().map(CableView::from_cable).collect(),
            can_undo,
            can_redo,
        }
    }

    /// Tree-shaped plain-text listing: each switch with its occupied ports,
    /// followed by floating terminals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for sw in &self.switches {
            let _ = writeln!(
                out,
                "{} [{}] @ ({}, {})",
                sw.label, sw.id, sw.position.x, sw.position.y
            );
            for handle in &sw.occupied_ports {
                let traffic = sw.traffic.get(handle).copied().unwrap_or_default();
                let flags = match (traffic.has_transmit, traffic.has_receive) {
                    (true, true) => "TX/RX",
                    (true, false) => "TX",
                    (false, true) => "RX",
                    (false, false) => "--",
                };
                let occupant = self.describe_occupant(&sw.id, handle);
                let _ = writeln!(out, "  {handle:<5} {flags:<5} {occupant}");
            }
        }
        let floating: Vec<&TerminalView> =
            self.terminals.iter().filter(|term| !term.is_snapped).collect();
        if !floating.is_empty() {
            let _ = writeln!(out, "floating terminals");
            for term in floating {
                let _ = writeln!(
                    out,
                    "  {} [{}] {} @ ({}, {})",
                    term.label,
                    term.id,
                    term.category.as_str(),
                    term.position.x,
                    term.position.y
                );
            }
        }
        out
    }

    fn describe_occupant(&self, switch_id: &str, handle: &str) -> String {
        let terminal = self.terminals.iter().find(|term| {
            term.attached_switch.as_deref() == Some(switch_id)
                && term.attached_port.as_deref() == Some(handle)
        });
        if let Some(term) = terminal {
            return format!(
                "terminal {} [{}] {}",
                term.label,
                term.id,
                term.direction.as_str()
            );
        }
        let cable = self.cables.iter().find(|cable| {
            (cable.source == switch_id && cable.source_handle == handle)
                || (cable.target == switch_id && cable.target_handle == handle)
        });
        match cable {
            Some(cable) => format!(
                "cable {} [{}] {}",
                cable.label,
                cable.id,
                cable.direction.as_str()
            ),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::TopologyEditor;
    use crate::store::{CableConfig, TerminalConfig};

    #[test]
    fn view_exposes_derived_state() {
        let mut editor = TopologyEditor::default();
        editor.add_switch();
        editor.add_switch();
        editor
            .add_cable("sw-1", 1, "sw-2", 1, &CableConfig::default())
            .unwrap();
        editor
            .attach_terminal("sw-1", 2, &TerminalConfig::default())
            .unwrap();
        editor.add_free_terminal();

        let view = editor.view();
        assert!(view.can_undo);
        assert!(!view.can_redo);
        assert_eq!(view.switches[0].occupied_ports, vec!["p-1", "p-2"]);
        assert_eq!(view.cables[0].source_label, "P1");
        assert!(view.terminals[0].is_snapped);
        assert!(!view.terminals[1].is_snapped);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["switches"][0]["traffic"]["p-1"]["hasTransmit"], true);
        assert_eq!(json["terminals"][0]["attachedPort"], "p-2");
        assert_eq!(json["cables"][0]["direction"], "both");
    }

    #[test]
    fn summary_lists_ports_and_floating_terminals() {
        let mut editor = TopologyEditor::default();
        editor.add_switch();
        editor
            .attach_terminal("sw-1", 3, &TerminalConfig::default())
            .unwrap();
        editor.add_free_terminal();
        let summary = editor.view().summary();
        assert!(summary.contains("SW-1 [sw-1]"));
        assert!(summary.contains("p-3"));
        assert!(summary.contains("TX/RX"));
        assert!(summary.contains("floating terminals"));
        assert!(summary.contains("PC-2 [term-2]"));
    }
}
