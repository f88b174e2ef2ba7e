use crate::ir::{Direction, Occupant, PortId, PortTraffic, Topology};
use std::collections::BTreeMap;

const BOTH: PortTraffic = PortTraffic {
    has_transmit: true,
    has_receive: true,
};
const TRANSMIT_ONLY: PortTraffic = PortTraffic {
    has_transmit: true,
    has_receive: false,
};
const RECEIVE_ONLY: PortTraffic = PortTraffic {
    has_transmit: false,
    has_receive: true,
};

/// Flags for a port hosting a terminal. The terminal's direction is declared
/// from its own side, so the switch sees it mirrored.
pub fn terminal_traffic(direction: Direction) -> PortTraffic {
    match direction {
        Direction::FullDuplex => BOTH,
        Direction::AToB => RECEIVE_ONLY,
        Direction::BToA => TRANSMIT_ONLY,
    }
}

/// Flags for one end of a cable. `a-to-b` means source transmits, so the same
/// stored value reads differently at the two ends.
pub fn cable_traffic(direction: Direction, is_source_end: bool) -> PortTraffic {
    match (direction, is_source_end) {
        (Direction::FullDuplex, _) => BOTH,
        (Direction::AToB, true) | (Direction::BToA, false) => TRANSMIT_ONLY,
        (Direction::AToB, false) | (Direction::BToA, true) => RECEIVE_ONLY,
    }
}

/// Traffic on `port` of `switch_id`, from the switch's perspective.
/// Unoccupied ports resolve to all-false without looking at terminals or
/// cables.
pub fn resolve_port_traffic(topology: &Topology, switch_id: &str, port: PortId) -> PortTraffic {
    let Some(sw) = topology.switch(switch_id) else {
        return PortTraffic::default();
    };
    if !sw.is_occupied(port) {
        return PortTraffic::default();
    }
    match topology.port_occupant(switch_id, port) {
        Some(Occupant::Terminal(term)) => terminal_traffic(term.direction),
        Some(Occupant::Cable(cable)) => {
            cable_traffic(cable.direction, cable.source.matches(switch_id, port))
        }
        None => PortTraffic::default(),
    }
}

/// Rebuilds every switch's per-port traffic map from its occupied ports.
/// Must run after the occupancy pass. Returns whether anything changed.
pub fn sync_traffic(topology: &mut Topology) -> bool {
    let current: &Topology = topology;
    let recomputed: Vec<BTreeMap<PortId, PortTraffic>> = current
        .switches
        .iter()
        .map(|sw| {
            sw.occupied_ports
                .iter()
                .map(|&port| (port, resolve_port_traffic(current, &sw.id, port)))
                .collect()
        })
        .collect();

    let mut changed = false;
    for (sw, traffic) in topology.switches.iter_mut().zip(recomputed) {
        if sw.traffic != traffic {
            sw.traffic = traffic;
            changed = true;
        }
    }
    changed
}
