use crate::config::{SnapConfig, SpawnConfig};
use crate::error::TopologyError;
use crate::ir::{
    Attachment, Cable, Direction, Endpoint, Occupant, PortId, Position, Switch, Terminal,
    TerminalCategory, Topology, VlanList, validate_vlan,
};
use crate::naming::{self, EntityKind};
use crate::snap::PortLayout;
use serde::Deserialize;
use std::fmt;

/// Settings applied when a terminal is plugged into a port.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalConfig {
    /// Existing terminal to move onto the port; a new one is created if unset.
    pub terminal: Option<String>,
    pub label: Option<String>,
    pub category: Option<TerminalCategory>,
    pub direction: Option<Direction>,
    /// Rewrites the port's native VLAN before plugging in.
    pub native_vlan: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CableConfig {
    pub label: Option<String>,
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortPatch {
    pub port: PortId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub native_vlan: Option<u16>,
    #[serde(default)]
    pub permitted_vlans: Option<VlanList>,
}

/// Attribute edits merged into one switch, terminal or cable. Identity,
/// attachment and cable endpoints are not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityPatch {
    pub label: Option<String>,
    pub position: Option<Position>,
    pub category: Option<TerminalCategory>,
    pub direction: Option<Direction>,
    pub ports: Vec<PortPatch>,
}

/// One end of an interactive cable-drawing gesture: node id plus handle
/// name such as `p-3`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Handle {
    pub node: String,
    pub handle: String,
}

impl Handle {
    pub fn new(node: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            handle: handle.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(String),
    /// The gesture was dropped without an error or a history entry.
    NoOp(IgnoredConnect),
}

/// Why a cable-drawing gesture was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoredConnect {
    /// Cables join switch ports only.
    TerminalHandle(String),
    SameEndpoint,
    PortOccupied { switch: String, port: PortId },
}

impl fmt::Display for IgnoredConnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TerminalHandle(id) => write!(f, "{id} is a terminal, not a switch port"),
            Self::SameEndpoint => f.write_str("both ends are the same port"),
            Self::PortOccupied { switch, port } => {
                write!(f, "port {port} on {switch} is already occupied")
            }
        }
    }
}

fn non_empty(label: Option<&String>) -> Option<String> {
    label.filter(|label| !label.trim().is_empty()).cloned()
}

fn unsupported(id: &str, field: &'static str) -> TopologyError {
    TopologyError::UnsupportedField {
        id: id.to_string(),
        field,
    }
}

impl Topology {
    fn require_switch(&self, id: &str) -> Result<&Switch, TopologyError> {
        self.switch(id)
            .ok_or_else(|| TopologyError::missing("switch", id))
    }

    fn require_terminal(&self, id: &str) -> Result<&Terminal, TopologyError> {
        self.terminal(id)
            .ok_or_else(|| TopologyError::missing("terminal", id))
    }

    /// Fails unless the port is free, or held by `allowed_terminal` itself.
    fn ensure_port_free(
        &self,
        switch_id: &str,
        port: PortId,
        allowed_terminal: Option<&str>,
    ) -> Result<(), TopologyError> {
        match self.port_occupant(switch_id, port) {
            None => Ok(()),
            Some(Occupant::Terminal(term)) if Some(term.id.as_str()) == allowed_terminal => Ok(()),
            Some(_) => Err(TopologyError::occupied(switch_id, port)),
        }
    }

    fn display_label<'a>(&'a self, switch_id: &'a str) -> &'a str {
        match self.switch(switch_id) {
            Some(sw) if !sw.label.trim().is_empty() => &sw.label,
            _ => switch_id,
        }
    }

    pub fn add_switch(&mut self, spawn: &SpawnConfig) -> String {
        let n = naming::allocate(self, EntityKind::Switch);
        let id = naming::entity_id(EntityKind::Switch, n);
        let count = self.switches.len() as f32;
        let position = Position::new(
            spawn.switch_origin.x + spawn.switch_step.x * count,
            spawn.switch_origin.y + spawn.switch_step.y * count,
        );
        self.switches
            .push(Switch::new(id.clone(), naming::switch_label(n), position));
        id
    }

    pub fn add_free_terminal(&mut self, position: Position) -> String {
        let n = naming::allocate(self, EntityKind::Terminal);
        let id = naming::entity_id(EntityKind::Terminal, n);
        self.terminals.push(Terminal {
            id: id.clone(),
            label: naming::terminal_label(n),
            category: TerminalCategory::default(),
            direction: Direction::default(),
            attachment: Attachment::Free { position },
        });
        id
    }

    /// Plugs a new or existing terminal into `port` of `switch_id`, returning
    /// the terminal id.
    pub fn attach_terminal(
        &mut self,
        layout: &impl PortLayout,
        snap: &SnapConfig,
        switch_id: &str,
        port: PortId,
        config: &TerminalConfig,
    ) -> Result<String, TopologyError> {
        let sw = self.require_switch(switch_id)?;
        if let Some(existing) = config.terminal.as_deref() {
            self.require_terminal(existing)?;
        }
        self.ensure_port_free(switch_id, port, config.terminal.as_deref())?;
        let native_vlan = config.native_vlan.map(validate_vlan).transpose()?;
        let offset = layout
            .anchor(sw, port)
            .ok_or_else(|| {
                TopologyError::InvalidReference(format!("{switch_id} {}", port.handle()))
            })?
            .terminal_offset(snap);

        if let Some(vlan) = native_vlan {
            if let Some(target) = self.switch_mut(switch_id).and_then(|sw| sw.port_mut(port)) {
                target.native_vlan = vlan;
            }
        }

        let attachment = Attachment::Attached {
            switch: switch_id.to_string(),
            port,
            offset,
        };
        let id = match config.terminal.as_deref() {
            Some(existing) => {
                let term = self
                    .terminal_mut(existing)
                    .ok_or_else(|| TopologyError::missing("terminal", existing))?;
                if let Some(label) = non_empty(config.label.as_ref()) {
                    term.label = label;
                }
                if let Some(category) = config.category {
                    term.category = category;
                }
                if let Some(direction) = config.direction {
                    term.direction = direction;
                }
                term.attachment = attachment;
                term.id.clone()
            }
            None => {
                let n = naming::allocate(self, EntityKind::Terminal);
                let id = naming::entity_id(EntityKind::Terminal, n);
                self.terminals.push(Terminal {
                    id: id.clone(),
                    label: non_empty(config.label.as_ref())
                        .unwrap_or_else(|| naming::terminal_label(n)),
                    category: config.category.unwrap_or_default(),
                    direction: config.direction.unwrap_or_default(),
                    attachment,
                });
                id
            }
        };
        Ok(id)
    }

    /// Frees a terminal at the absolute position it currently shows on the
    /// canvas. Already-free terminals stay where they are.
    pub fn detach_terminal(&mut self, terminal_id: &str) -> Result<(), TopologyError> {
        let position = self.absolute_position(self.require_terminal(terminal_id)?);
        self.release_terminal(terminal_id, position)
    }

    /// Frees a terminal at an explicit absolute position.
    pub fn release_terminal(
        &mut self,
        terminal_id: &str,
        position: Position,
    ) -> Result<(), TopologyError> {
        let term = self
            .terminal_mut(terminal_id)
            .ok_or_else(|| TopologyError::missing("terminal", terminal_id))?;
        term.attachment = Attachment::Free { position };
        Ok(())
    }

    /// Moves an existing terminal onto a port at a known offset, keeping its
    /// attributes. Used by drag-and-drop snapping.
    pub fn place_terminal(
        &mut self,
        terminal_id: &str,
        switch_id: &str,
        port: PortId,
        offset: Position,
    ) -> Result<(), TopologyError> {
        self.require_switch(switch_id)?;
        self.require_terminal(terminal_id)?;
        self.ensure_port_free(switch_id, port, Some(terminal_id))?;
        if let Some(term) = self.terminal_mut(terminal_id) {
            term.attachment = Attachment::Attached {
                switch: switch_id.to_string(),
                port,
                offset,
            };
        }
        Ok(())
    }

    pub fn add_cable(
        &mut self,
        source: Endpoint,
        target: Endpoint,
        config: &CableConfig,
    ) -> Result<String, TopologyError> {
        self.require_switch(&source.switch)?;
        self.require_switch(&target.switch)?;
        self.ensure_port_free(&source.switch, source.port, None)?;
        self.ensure_port_free(&target.switch, target.port, None)?;
        if source == target {
            return Err(TopologyError::occupied(&target.switch, target.port));
        }

        let label = non_empty(config.label.as_ref()).unwrap_or_else(|| {
            naming::cable_label(
                self.display_label(&source.switch),
                source.port,
                self.display_label(&target.switch),
                target.port,
            )
        });
        let n = naming::allocate(self, EntityKind::Cable);
        let id = naming::entity_id(EntityKind::Cable, n);
        self.cables.push(Cable {
            id: id.clone(),
            source,
            target,
            direction: config.direction.unwrap_or_default(),
            label,
        });
        Ok(id)
    }

    /// Interactive cable drawing. Returns [`ConnectOutcome::NoOp`] without
    /// touching the graph when either port is taken or an end is not a
    /// switch port.
    pub fn connect(
        &mut self,
        source: &Handle,
        target: &Handle,
    ) -> Result<ConnectOutcome, TopologyError> {
        let source = match self.gesture_endpoint(source)? {
            Ok(endpoint) => endpoint,
            Err(ignored) => return Ok(ConnectOutcome::NoOp(ignored)),
        };
        let target = match self.gesture_endpoint(target)? {
            Ok(endpoint) => endpoint,
            Err(ignored) => return Ok(ConnectOutcome::NoOp(ignored)),
        };
        if source == target {
            return Ok(ConnectOutcome::NoOp(IgnoredConnect::SameEndpoint));
        }
        for end in [&source, &target] {
            if self.port_occupant(&end.switch, end.port).is_some() {
                return Ok(ConnectOutcome::NoOp(IgnoredConnect::PortOccupied {
                    switch: end.switch.clone(),
                    port: end.port,
                }));
            }
        }
        self.add_cable(source, target, &CableConfig::default())
            .map(ConnectOutcome::Connected)
    }

    fn gesture_endpoint(
        &self,
        handle: &Handle,
    ) -> Result<Result<Endpoint, IgnoredConnect>, TopologyError> {
        if self.terminal(&handle.node).is_some() {
            return Ok(Err(IgnoredConnect::TerminalHandle(handle.node.clone())));
        }
        self.require_switch(&handle.node)?;
        let port = PortId::from_handle(&handle.handle).ok_or_else(|| {
            TopologyError::InvalidReference(format!("handle `{}` on {}", handle.handle, handle.node))
        })?;
        Ok(Ok(Endpoint::new(handle.node.clone(), port)))
    }

    pub fn update_entity(&mut self, id: &str, patch: &EntityPatch) -> Result<(), TopologyError> {
        if self.switch(id).is_some() {
            self.update_switch(id, patch)
        } else if self.terminal(id).is_some() {
            self.update_terminal(id, patch)
        } else if self.cable(id).is_some() {
            self.update_cable(id, patch)
        } else {
            Err(TopologyError::InvalidReference(format!("`{id}`")))
        }
    }

    fn update_switch(&mut self, id: &str, patch: &EntityPatch) -> Result<(), TopologyError> {
        if patch.category.is_some() {
            return Err(unsupported(id, "category"));
        }
        if patch.direction.is_some() {
            return Err(unsupported(id, "direction"));
        }
        if let Some(position) = patch.position {
            position.finite()?;
        }
        for port_patch in &patch.ports {
            if let Some(vlan) = port_patch.native_vlan {
                validate_vlan(vlan)?;
            }
        }

        let sw = self
            .switch_mut(id)
            .ok_or_else(|| TopologyError::missing("switch", id))?;
        if let Some(label) = &patch.label {
            sw.label = label.clone();
        }
        if let Some(position) = patch.position {
            sw.position = position;
        }
        for port_patch in &patch.ports {
            let Some(port) = sw.port_mut(port_patch.port) else {
                continue;
            };
            if let Some(label) = &port_patch.label {
                port.label = label.clone();
            }
            if let Some(vlan) = port_patch.native_vlan {
                port.native_vlan = vlan;
            }
            if let Some(vlans) = &port_patch.permitted_vlans {
                port.permitted_vlans = vlans.clone();
            }
        }
        Ok(())
    }

    fn update_terminal(&mut self, id: &str, patch: &EntityPatch) -> Result<(), TopologyError> {
        if !patch.ports.is_empty() {
            return Err(unsupported(id, "ports"));
        }
        let term = self
            .terminal_mut(id)
            .ok_or_else(|| TopologyError::missing("terminal", id))?;
        if patch.position.is_some() && term.attached_to().is_some() {
            return Err(unsupported(id, "position"));
        }
        if let Some(position) = patch.position {
            position.finite()?;
        }
        if let Some(label) = &patch.label {
            term.label = label.clone();
        }
        if let Some(category) = patch.category {
            term.category = category;
        }
        if let Some(direction) = patch.direction {
            term.direction = direction;
        }
        if let Some(position) = patch.position {
            term.attachment = Attachment::Free { position };
        }
        Ok(())
    }

    fn update_cable(&mut self, id: &str, patch: &EntityPatch) -> Result<(), TopologyError> {
        if patch.position.is_some() {
            return Err(unsupported(id, "position"));
        }
        if patch.category.is_some() {
            return Err(unsupported(id, "category"));
        }
        if !patch.ports.is_empty() {
            return Err(unsupported(id, "ports"));
        }
        let cable = self
            .cable_mut(id)
            .ok_or_else(|| TopologyError::missing("cable", id))?;
        if let Some(label) = &patch.label {
            cable.label = label.clone();
        }
        if let Some(direction) = patch.direction {
            cable.direction = direction;
        }
        Ok(())
    }

    /// Removes a switch with every terminal plugged into it and every cable
    /// touching it.
    pub fn delete_switch(&mut self, id: &str) -> Result<(), TopologyError> {
        self.require_switch(id)?;
        self.switches.retain(|sw| sw.id != id);
        self.terminals.retain(|term| !term.is_attached_to(id));
        self.cables.retain(|cable| !cable.touches(id));
        Ok(())
    }

    pub fn delete_terminal(&mut self, id: &str) -> Result<(), TopologyError> {
        self.require_terminal(id)?;
        self.terminals.retain(|term| term.id != id);
        Ok(())
    }

    pub fn delete_cable(&mut self, id: &str) -> Result<(), TopologyError> {
        if self.cable(id).is_none() {
            return Err(TopologyError::missing("cable", id));
        }
        self.cables.retain(|cable| cable.id != id);
        Ok(())
    }
}
