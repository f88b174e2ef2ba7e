use crate::config::{Config, FaceplateConfig};
use crate::error::TopologyError;
use crate::history::History;
use crate::ir::{Endpoint, PortId, Position, Topology};
use crate::occupancy::sync_occupancy;
use crate::snap::{PortLayout, SnapDecision, resolve_snap};
use crate::store::{CableConfig, EntityPatch, Handle, TerminalConfig};
use crate::traffic::sync_traffic;
use crate::view::TopologyView;
use tracing::{debug, warn};

pub use crate::store::{ConnectOutcome, IgnoredConnect};

/// Runs both derivation passes, occupancy first. Returns whether anything
/// changed.
pub fn resync(topology: &mut Topology) -> bool {
    let occupancy = sync_occupancy(topology);
    let traffic = sync_traffic(topology);
    occupancy || traffic
}

fn port_id(number: u8) -> Result<PortId, TopologyError> {
    PortId::try_from(number)
}

/// Owns the topology and its history and is the only place mutations enter.
///
/// Every mutation is applied to a copy of the current graph. Only when it
/// validates are the derived passes run on the copy and the previous graph
/// pushed onto the undo stack, so a rejected intent leaves neither a partial
/// change nor a history entry.
#[derive(Debug, Clone)]
pub struct TopologyEditor<L = FaceplateConfig> {
    topology: Topology,
    history: History<Topology>,
    config: Config,
    layout: L,
}

impl TopologyEditor<FaceplateConfig> {
    pub fn new(config: Config) -> Self {
        let layout = config.faceplate.clone();
        Self::with_layout(config, layout)
    }
}

impl Default for TopologyEditor<FaceplateConfig> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<L: PortLayout> TopologyEditor<L> {
    pub fn with_layout(config: Config, layout: L) -> Self {
        Self {
            topology: Topology::new(),
            history: History::new(),
            config,
            layout,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn view(&self) -> TopologyView {
        TopologyView::new(&self.topology, self.can_undo(), self.can_redo())
    }

    /// Resyncs a mutated draft, installs it and pushes the previous graph
    /// onto the undo stack.
    fn install(&mut self, action: &'static str, mut draft: Topology) {
        resync(&mut draft);
        let previous = std::mem::replace(&mut self.topology, draft);
        self.history.record(previous);
        debug!(action, undo_depth = self.history.undo_depth(), "topology updated");
    }

    fn commit<R>(
        &mut self,
        action: &'static str,
        apply: impl FnOnce(&mut Topology, &Config, &L) -> Result<R, TopologyError>,
    ) -> Result<R, TopologyError> {
        let mut draft = self.topology.clone();
        let out = apply(&mut draft, &self.config, &self.layout)?;
        self.install(action, draft);
        Ok(out)
    }

    pub fn add_switch(&mut self) -> String {
        let mut draft = self.topology.clone();
        let id = draft.add_switch(&self.config.spawn);
        self.install("add_switch", draft);
        id
    }

    pub fn add_free_terminal(&mut self) -> String {
        let mut draft = self.topology.clone();
        let id = draft.add_free_terminal(self.config.spawn.terminal);
        self.install("add_free_terminal", draft);
        id
    }

    pub fn attach_terminal(
        &mut self,
        switch_id: &str,
        port: u8,
        terminal: &TerminalConfig,
    ) -> Result<String, TopologyError> {
        let port = port_id(port)?;
        self.commit("attach_terminal", |topo, config, layout| {
            topo.attach_terminal(layout, &config.snap, switch_id, port, terminal)
        })
    }

    pub fn detach_terminal(&mut self, terminal_id: &str) -> Result<(), TopologyError> {
        self.commit("detach_terminal", |topo, _, _| {
            topo.detach_terminal(terminal_id)
        })
    }

    /// Drag-stop of a terminal at absolute `position`: plugs it into the
    /// nearest free port within the snap threshold, or leaves it floating
    /// there.
    pub fn drop_terminal(
        &mut self,
        terminal_id: &str,
        position: Position,
    ) -> Result<SnapDecision, TopologyError> {
        let position = position.finite()?;
        let term = self
            .topology
            .terminal(terminal_id)
            .ok_or_else(|| TopologyError::InvalidReference(format!("terminal `{terminal_id}`")))?;
        let decision = resolve_snap(
            &self.topology,
            &self.layout,
            &self.config.snap,
            term.attached_to(),
            position,
        );
        self.commit("drop_terminal", |topo, _, _| match &decision {
            SnapDecision::Attach {
                switch,
                port,
                offset,
                ..
            } => topo.place_terminal(terminal_id, switch, *port, *offset),
            SnapDecision::Release { position } => topo.release_terminal(terminal_id, *position),
        })?;
        Ok(decision)
    }

    pub fn add_cable(
        &mut self,
        source_switch: &str,
        source_port: u8,
        target_switch: &str,
        target_port: u8,
        cable: &CableConfig,
    ) -> Result<String, TopologyError> {
        let source = Endpoint::new(source_switch, port_id(source_port)?);
        let target = Endpoint::new(target_switch, port_id(target_port)?);
        self.commit("add_cable", |topo, _, _| topo.add_cable(source, target, cable))
    }

    /// Cable drawn by dragging between two handles. Occupied ports make this
    /// a silent no-op with no history entry; unknown nodes are still errors.
    pub fn connect(
        &mut self,
        source: &Handle,
        target: &Handle,
    ) -> Result<ConnectOutcome, TopologyError> {
        let mut draft = self.topology.clone();
        let outcome = draft.connect(source, target)?;
        match &outcome {
            ConnectOutcome::Connected(id) => {
                debug!(cable = %id, "cable drawn");
                self.install("connect", draft);
            }
            ConnectOutcome::NoOp(reason) => {
                warn!(
                    source = %source.node,
                    target = %target.node,
                    %reason,
                    "connection ignored"
                );
            }
        }
        Ok(outcome)
    }

    pub fn update_entity(&mut self, id: &str, patch: &EntityPatch) -> Result<(), TopologyError> {
        self.commit("update_entity", |topo, _, _| topo.update_entity(id, patch))
    }

    pub fn delete_switch(&mut self, id: &str) -> Result<(), TopologyError> {
        self.commit("delete_switch", |topo, _, _| topo.delete_switch(id))
    }

    pub fn delete_terminal(&mut self, id: &str) -> Result<(), TopologyError> {
        self.commit("delete_terminal", |topo, _, _| topo.delete_terminal(id))
    }

    pub fn delete_cable(&mut self, id: &str) -> Result<(), TopologyError> {
        self.commit("delete_cable", |topo, _, _| topo.delete_cable(id))
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.topology);
        debug!(undone, "undo");
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.topology);
        debug!(redone, "redo");
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Attachment, Direction, PortTraffic};

    fn port(n: u8) -> PortId {
        PortId::new(n).unwrap()
    }

    fn editor_with_switches() -> TopologyEditor {
        let mut editor = TopologyEditor::default();
        editor.add_switch();
        editor.add_switch();
        editor
    }

    #[test]
    fn mutations_resync_derived_state() {
        let mut editor = editor_with_switches();
        editor
            .add_cable(
                "sw-1",
                1,
                "sw-2",
                1,
                &CableConfig {
                    direction: Some(Direction::AToB),
                    ..CableConfig::default()
                },
            )
            .unwrap();
        let topo = editor.topology();
        assert!(topo.switches[0].is_occupied(port(1)));
        assert_eq!(
            topo.switches[0].traffic_at(port(1)),
            PortTraffic {
                has_transmit: true,
                has_receive: false
            }
        );
        assert_eq!(
            topo.switches[1].traffic_at(port(1)),
            PortTraffic {
                has_transmit: false,
                has_receive: true
            }
        );
    }

    #[test]
    fn rejected_mutation_leaves_no_history() {
        let mut editor = editor_with_switches();
        editor
            .attach_terminal("sw-1", 2, &TerminalConfig::default())
            .unwrap();
        let depth = editor.history.undo_depth();
        let before = editor.topology().clone();
        assert!(editor.add_cable("sw-1", 2, "sw-2", 2, &CableConfig::default()).is_err());
        assert!(editor.attach_terminal("sw-1", 21, &TerminalConfig::default()).is_err());
        assert!(editor.delete_cable("cable-7").is_err());
        assert_eq!(editor.history.undo_depth(), depth);
        assert_eq!(editor.topology(), &before);
    }

    #[test]
    fn connect_noop_skips_history() {
        let mut editor = editor_with_switches();
        let first = editor
            .connect(&Handle::new("sw-1", "p-3"), &Handle::new("sw-2", "p-3"))
            .unwrap();
        assert_eq!(first, ConnectOutcome::Connected("cable-1".to_string()));
        let depth = editor.history.undo_depth();
        let again = editor
            .connect(&Handle::new("sw-1", "p-3"), &Handle::new("sw-2", "p-4"))
            .unwrap();
        assert!(matches!(
            again,
            ConnectOutcome::NoOp(IgnoredConnect::PortOccupied { .. })
        ));
        assert_eq!(editor.history.undo_depth(), depth);
        assert_eq!(editor.topology().cables.len(), 1);
    }

    #[test]
    fn drop_snaps_and_releases() {
        let mut editor = editor_with_switches();
        let term = editor.add_free_terminal();
        // sw-1 sits at (100, 100); port 1 plug point is (146.5, 160)
        let decision = editor
            .drop_terminal(&term, Position::new(124.5, 150.0))
            .unwrap();
        assert!(matches!(decision, SnapDecision::Attach { port: p, .. } if p == port(1)));
        assert!(editor.topology().switches[0].is_occupied(port(1)));

        let decision = editor
            .drop_terminal(&term, Position::new(900.0, 900.0))
            .unwrap();
        assert_eq!(
            decision,
            SnapDecision::Release {
                position: Position::new(900.0, 900.0)
            }
        );
        assert!(!editor.topology().switches[0].is_occupied(port(1)));
        assert!(editor.drop_terminal("term-9", Position::default()).is_err());
    }

    #[test]
    fn drop_rejects_non_finite_positions() {
        let mut editor = editor_with_switches();
        let term = editor.add_free_terminal();
        let depth = editor.history.undo_depth();
        for position in [
            Position::new(f32::NAN, 0.0),
            Position::new(0.0, f32::NEG_INFINITY),
        ] {
            assert!(matches!(
                editor.drop_terminal(&term, position),
                Err(TopologyError::InvalidPosition { .. })
            ));
        }
        assert_eq!(editor.history.undo_depth(), depth);

        let snapshot = editor.topology().clone();
        assert!(editor.undo());
        assert!(editor.redo());
        assert_eq!(editor.topology(), &snapshot);
    }

    #[test]
    fn terminal_can_return_to_its_own_port() {
        let mut editor = editor_with_switches();
        let term = editor
            .attach_terminal("sw-1", 1, &TerminalConfig::default())
            .unwrap();
        let decision = editor
            .drop_terminal(&term, Position::new(124.5, 158.0))
            .unwrap();
        assert!(matches!(decision, SnapDecision::Attach { port: p, .. } if p == port(1)));
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut editor = editor_with_switches();
        let term = editor
            .attach_terminal("sw-2", 7, &TerminalConfig::default())
            .unwrap();
        editor.detach_terminal(&term).unwrap();
        let after_detach = editor.topology().clone();

        assert!(editor.undo());
        assert!(matches!(
            editor.topology().terminal(&term).unwrap().attachment,
            Attachment::Attached { .. }
        ));
        assert!(editor.topology().switches[1].is_occupied(port(7)));
        assert!(editor.redo());
        assert_eq!(editor.topology(), &after_detach);
        assert!(!editor.redo());
    }

    #[test]
    fn undo_past_start_is_harmless() {
        let mut editor = TopologyEditor::default();
        assert!(!editor.undo());
        editor.add_switch();
        assert!(editor.undo());
        assert!(editor.topology().switches.is_empty());
        assert!(!editor.undo());
        assert!(editor.can_redo());
    }

    #[test]
    fn attribute_edits_are_undo_steps() {
        let mut editor = editor_with_switches();
        let patch = EntityPatch {
            label: Some("Core".to_string()),
            ..EntityPatch::default()
        };
        editor.update_entity("sw-1", &patch).unwrap();
        editor.update_entity("sw-1", &patch).unwrap();
        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.topology().switches[0].label, "SW-1");
    }
}
