use crate::error::TopologyError;
use crate::naming::IdWatermarks;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub const ACCESS_PORT_COUNT: u8 = 16;
pub const UPLINK_PORT_COUNT: u8 = 4;
pub const PORT_COUNT: u8 = ACCESS_PORT_COUNT + UPLINK_PORT_COUNT;

pub const MAX_VLAN_ID: u16 = 4094;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Position) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rejects NaN and infinite coordinates, which would make the graph
    /// compare unequal to its own snapshot.
    pub fn finite(self) -> Result<Self, TopologyError> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(TopologyError::InvalidPosition {
                x: self.x,
                y: self.y,
            })
        }
    }

    pub fn distance(self, other: Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Physical port number on a switch, always within `1..=PORT_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PortId(u8);

impl PortId {
    pub fn new(number: u8) -> Option<Self> {
        (1..=PORT_COUNT).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> PortKind {
        if self.0 <= ACCESS_PORT_COUNT {
            PortKind::Access
        } else {
            PortKind::Uplink
        }
    }

    /// Connection handle name used by the canvas, e.g. `p-7`.
    pub fn handle(self) -> String {
        format!("p-{}", self.0)
    }

    pub fn from_handle(handle: &str) -> Option<Self> {
        handle
            .strip_prefix("p-")
            .and_then(|rest| rest.parse::<u8>().ok())
            .and_then(Self::new)
    }

    pub fn all() -> impl Iterator<Item = PortId> {
        (1..=PORT_COUNT).map(PortId)
    }
}

impl TryFrom<u8> for PortId {
    type Error = TopologyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PortId::new(value)
            .ok_or_else(|| TopologyError::InvalidReference(format!("port {value}")))
    }
}

impl From<PortId> for u8 {
    fn from(value: PortId) -> Self {
        value.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Access,
    Uplink,
}

/// Declared traffic flow. For cables `a` is the stored source endpoint; for
/// terminals `a` is the terminal and `b` the switch it plugs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "both", alias = "full-duplex")]
    FullDuplex,
    #[serde(rename = "a-to-b")]
    AToB,
    #[serde(rename = "b-to-a")]
    BToA,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullDuplex => "both",
            Self::AToB => "a-to-b",
            Self::BToA => "b-to-a",
        }
    }
}

impl FromStr for Direction {
    type Err = TopologyError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "both" | "full-duplex" => Ok(Self::FullDuplex),
            "a-to-b" => Ok(Self::AToB),
            "b-to-a" => Ok(Self::BToA),
            other => Err(TopologyError::UnknownValue {
                kind: "direction",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TerminalCategory {
    #[default]
    #[serde(rename = "pc", alias = "workstation")]
    Workstation,
    #[serde(rename = "server")]
    Server,
    #[serde(rename = "laptop")]
    Laptop,
    #[serde(rename = "tablet")]
    Tablet,
}

impl TerminalCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workstation => "pc",
            Self::Server => "server",
            Self::Laptop => "laptop",
            Self::Tablet => "tablet",
        }
    }
}

impl FromStr for TerminalCategory {
    type Err = TopologyError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "pc" | "workstation" => Ok(Self::Workstation),
            "server" => Ok(Self::Server),
            "laptop" => Ok(Self::Laptop),
            "tablet" => Ok(Self::Tablet),
            other => Err(TopologyError::UnknownValue {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanRange {
    pub start: u16,
    pub end: u16,
}

/// Permitted VLAN tags of a port, written as `1,10-20,300`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VlanList {
    ranges: Vec<VlanRange>,
}

impl VlanList {
    pub fn single(id: u16) -> Self {
        Self {
            ranges: vec![VlanRange { start: id, end: id }],
        }
    }

    pub fn contains(&self, id: u16) -> bool {
        self.ranges
            .iter()
            .any(|range| (range.start..=range.end).contains(&id))
    }
}

impl Default for VlanList {
    fn default() -> Self {
        Self::single(1)
    }
}

pub fn validate_vlan(id: u16) -> Result<u16, TopologyError> {
    if (1..=MAX_VLAN_ID).contains(&id) {
        Ok(id)
    } else {
        Err(TopologyError::InvalidVlan(id.to_string()))
    }
}

fn parse_vlan_id(token: &str) -> Result<u16, TopologyError> {
    let id = token
        .trim()
        .parse::<u16>()
        .map_err(|_| TopologyError::InvalidVlan(token.trim().to_string()))?;
    validate_vlan(id)
}

impl FromStr for VlanList {
    type Err = TopologyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let range = match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_vlan_id(start)?;
                    let end = parse_vlan_id(end)?;
                    if start > end {
                        return Err(TopologyError::InvalidVlan(part.to_string()));
                    }
                    VlanRange { start, end }
                }
                None => {
                    let id = parse_vlan_id(part)?;
                    VlanRange { start: id, end: id }
                }
            };
            ranges.push(range);
        }
        if ranges.is_empty() {
            return Err(TopologyError::InvalidVlan(input.to_string()));
        }
        Ok(Self { ranges })
    }
}

impl TryFrom<String> for VlanList {
    type Error = TopologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VlanList> for String {
    fn from(value: VlanList) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VlanList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, range) in self.ranges.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            if range.start == range.end {
                write!(f, "{}", range.start)?;
            } else {
                write!(f, "{}-{}", range.start, range.end)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub kind: PortKind,
    pub label: String,
    pub native_vlan: u16,
    pub permitted_vlans: VlanList,
}

impl Port {
    fn new(id: PortId) -> Self {
        let kind = id.kind();
        let label = match kind {
            PortKind::Access => format!("GE1/0/{}", id.number()),
            PortKind::Uplink => format!("XGE1/0/{}", id.number() - ACCESS_PORT_COUNT),
        };
        Self {
            id,
            kind,
            label,
            native_vlan: 1,
            permitted_vlans: VlanList::default(),
        }
    }

    /// The fixed 16 access + 4 uplink port set of a freshly created switch.
    pub fn generate_all() -> Vec<Port> {
        PortId::all().map(Port::new).collect()
    }
}

/// Transmit/receive activity of one port, seen from the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortTraffic {
    pub has_transmit: bool,
    pub has_receive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub ports: Vec<Port>,
    /// Derived by the occupancy pass; never edited directly.
    pub occupied_ports: BTreeSet<PortId>,
    /// Derived by the traffic pass for every occupied port.
    pub traffic: BTreeMap<PortId, PortTraffic>,
}

impl Switch {
    pub fn new(id: String, label: String, position: Position) -> Self {
        Self {
            id,
            label,
            position,
            ports: Port::generate_all(),
            occupied_ports: BTreeSet::new(),
            traffic: BTreeMap::new(),
        }
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|port| port.id == id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.iter_mut().find(|port| port.id == id)
    }

    pub fn is_occupied(&self, port: PortId) -> bool {
        self.occupied_ports.contains(&port)
    }

    pub fn traffic_at(&self, port: PortId) -> PortTraffic {
        self.traffic.get(&port).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Free {
        position: Position,
    },
    /// Positioned relative to the owning switch.
    Attached {
        switch: String,
        port: PortId,
        offset: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub id: String,
    pub label: String,
    pub category: TerminalCategory,
    pub direction: Direction,
    pub attachment: Attachment,
}

impl Terminal {
    pub fn attached_to(&self) -> Option<(&str, PortId)> {
        match &self.attachment {
            Attachment::Attached { switch, port, .. } => Some((switch.as_str(), *port)),
            Attachment::Free { .. } => None,
        }
    }

    pub fn is_attached_to(&self, switch_id: &str) -> bool {
        self.attached_to()
            .is_some_and(|(switch, _)| switch == switch_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub switch: String,
    pub port: PortId,
}

impl Endpoint {
    pub fn new(switch: impl Into<String>, port: PortId) -> Self {
        Self {
            switch: switch.into(),
            port,
        }
    }

    pub fn matches(&self, switch_id: &str, port: PortId) -> bool {
        self.switch == switch_id && self.port == port
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cable {
    pub id: String,
    pub source: Endpoint,
    pub target: Endpoint,
    pub direction: Direction,
    pub label: String,
}

impl Cable {
    pub fn touches(&self, switch_id: &str) -> bool {
        self.source.switch == switch_id || self.target.switch == switch_id
    }

    pub fn uses(&self, switch_id: &str, port: PortId) -> bool {
        self.source.matches(switch_id, port) || self.target.matches(switch_id, port)
    }
}

/// What explains the occupancy of a port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Occupant<'a> {
    Terminal(&'a Terminal),
    Cable(&'a Cable),
}

/// The whole editable graph value. Snapshots for undo/redo are clones of it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Topology {
    pub switches: Vec<Switch>,
    pub terminals: Vec<Terminal>,
    pub cables: Vec<Cable>,
    pub(crate) watermarks: IdWatermarks,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch(&self, id: &str) -> Option<&Switch> {
        self.switches.iter().find(|sw| sw.id == id)
    }

    pub fn switch_mut(&mut self, id: &str) -> Option<&mut Switch> {
        self.switches.iter_mut().find(|sw| sw.id == id)
    }

    pub fn terminal(&self, id: &str) -> Option<&Terminal> {
        self.terminals.iter().find(|term| term.id == id)
    }

    pub fn terminal_mut(&mut self, id: &str) -> Option<&mut Terminal> {
        self.terminals.iter_mut().find(|term| term.id == id)
    }

    pub fn cable(&self, id: &str) -> Option<&Cable> {
        self.cables.iter().find(|cable| cable.id == id)
    }

    pub fn cable_mut(&mut self, id: &str) -> Option<&mut Cable> {
        self.cables.iter_mut().find(|cable| cable.id == id)
    }

    pub fn terminal_at(&self, switch_id: &str, port: PortId) -> Option<&Terminal> {
        self.terminals
            .iter()
            .find(|term| term.attached_to() == Some((switch_id, port)))
    }

    pub fn cable_at(&self, switch_id: &str, port: PortId) -> Option<&Cable> {
        self.cables.iter().find(|cable| cable.uses(switch_id, port))
    }

    /// The entity occupying a port. A terminal wins over a cable, although the
    /// store never lets both reference the same port.
    pub fn port_occupant(&self, switch_id: &str, port: PortId) -> Option<Occupant<'_>> {
        if let Some(term) = self.terminal_at(switch_id, port) {
            return Some(Occupant::Terminal(term));
        }
        self.cable_at(switch_id, port).map(Occupant::Cable)
    }

    pub fn terminals_on<'a>(&'a self, switch_id: &'a str) -> impl Iterator<Item = &'a Terminal> {
        self.terminals
            .iter()
            .filter(move |term| term.is_attached_to(switch_id))
    }

    pub fn cables_on<'a>(&'a self, switch_id: &'a str) -> impl Iterator<Item = &'a Cable> {
        self.cables.iter().filter(move |cable| cable.touches(switch_id))
    }

    pub fn free_terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals
            .iter()
            .filter(|term| matches!(term.attachment, Attachment::Free { .. }))
    }

    /// On-canvas position of a terminal, resolving parent-relative offsets.
    pub fn absolute_position(&self, terminal: &Terminal) -> Position {
        match &terminal.attachment {
            Attachment::Free { position } => *position,
            Attachment::Attached { switch, offset, .. } => match self.switch(switch) {
                Some(parent) => parent.position.offset(*offset),
                None => *offset,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_access_and_uplink_ports() {
        let ports = Port::generate_all();
        assert_eq!(ports.len(), 20);
        assert_eq!(ports[0].label, "GE1/0/1");
        assert_eq!(ports[15].label, "GE1/0/16");
        assert_eq!(ports[16].label, "XGE1/0/1");
        assert_eq!(ports[19].kind, PortKind::Uplink);
        assert!(ports.iter().all(|port| port.native_vlan == 1));
    }

    #[test]
    fn port_ids_are_bounded() {
        assert!(PortId::new(0).is_none());
        assert!(PortId::new(21).is_none());
        assert_eq!(PortId::from_handle("p-20").map(PortId::number), Some(20));
        assert!(PortId::from_handle("p-x").is_none());
        assert!(PortId::from_handle("20").is_none());
    }

    #[test]
    fn parses_vlan_lists() {
        let list: VlanList = "1, 10-20,300".parse().unwrap();
        assert!(list.contains(15));
        assert!(list.contains(300));
        assert!(!list.contains(21));
        assert_eq!(list.to_string(), "1,10-20,300");
        assert!("0".parse::<VlanList>().is_err());
        assert!("4095".parse::<VlanList>().is_err());
        assert!("20-10".parse::<VlanList>().is_err());
        assert!("".parse::<VlanList>().is_err());
    }

    #[test]
    fn direction_tokens() {
        assert_eq!("a-to-b".parse::<Direction>().unwrap(), Direction::AToB);
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::FullDuplex);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(
            serde_json::to_string(&Direction::BToA).unwrap(),
            "\"b-to-a\""
        );
    }

    #[test]
    fn absolute_position_follows_parent() {
        let mut topo = Topology::new();
        topo.switches.push(Switch::new(
            "sw-1".to_string(),
            "SW-1".to_string(),
            Position::new(100.0, 50.0),
        ));
        let term = Terminal {
            id: "term-1".to_string(),
            label: "PC-1".to_string(),
            category: TerminalCategory::Workstation,
            direction: Direction::FullDuplex,
            attachment: Attachment::Attached {
                switch: "sw-1".to_string(),
                port: PortId::new(1).unwrap(),
                offset: Position::new(10.0, 60.0),
            },
        };
        assert_eq!(topo.absolute_position(&term), Position::new(110.0, 110.0));
    }
}
