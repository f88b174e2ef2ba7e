use crate::ir::{PortId, Topology};
use std::collections::BTreeSet;

/// Ports of `switch_id` referenced by incident cable endpoints or attached
/// terminals.
pub fn compute_occupied(topology: &Topology, switch_id: &str) -> BTreeSet<PortId> {
    let mut occupied = BTreeSet::new();
    for cable in topology.cables_on(switch_id) {
        if cable.source.switch == switch_id {
            occupied.insert(cable.source.port);
        }
        if cable.target.switch == switch_id {
            occupied.insert(cable.target.port);
        }
    }
    for term in topology.terminals_on(switch_id) {
        if let Some((_, port)) = term.attached_to() {
            occupied.insert(port);
        }
    }
    occupied
}

/// Recomputes every switch's occupied-port set. Switches whose set is already
/// equal by value are left untouched; returns whether anything changed.
pub fn sync_occupancy(topology: &mut Topology) -> bool {
    let current: &Topology = topology;
    let recomputed: Vec<BTreeSet<PortId>> = current
        .switches
        .iter()
        .map(|sw| compute_occupied(current, &sw.id))
        .collect();

    let mut changed = false;
    for (sw, occupied) in topology.switches.iter_mut().zip(recomputed) {
        if sw.occupied_ports != occupied {
            sw.occupied_ports = occupied;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Attachment, Cable, Direction, Endpoint, Position, Switch, Terminal, TerminalCategory,
    };

    fn port(n: u8) -> PortId {
        PortId::new(n).unwrap()
    }

    fn fixture() -> Topology {
        let mut topo = Topology::new();
        for id in ["sw-1", "sw-2"] {
            topo.switches.push(Switch::new(
                id.to_string(),
                id.to_uppercase(),
                Position::default(),
            ));
        }
        topo.cables.push(Cable {
            id: "cable-1".to_string(),
            source: Endpoint::new("sw-1", port(1)),
            target: Endpoint::new("sw-2", port(3)),
            direction: Direction::FullDuplex,
            label: "c".to_string(),
        });
        topo.terminals.push(Terminal {
            id: "term-1".to_string(),
            label: "PC-1".to_string(),
            category: TerminalCategory::Server,
            direction: Direction::AToB,
            attachment: Attachment::Attached {
                switch: "sw-1".to_string(),
                port: port(5),
                offset: Position::default(),
            },
        });
        topo.terminals.push(Terminal {
            id: "term-2".to_string(),
            label: "PC-2".to_string(),
            category: TerminalCategory::Laptop,
            direction: Direction::FullDuplex,
            attachment: Attachment::Free {
                position: Position::new(5.0, 5.0),
            },
        });
        topo
    }

    #[test]
    fn unions_cables_and_terminals() {
        let mut topo = fixture();
        assert!(sync_occupancy(&mut topo));
        let sw1: Vec<u8> = topo.switches[0]
            .occupied_ports
            .iter()
            .map(|p| p.number())
            .collect();
        let sw2: Vec<u8> = topo.switches[1]
            .occupied_ports
            .iter()
            .map(|p| p.number())
            .collect();
        assert_eq!(sw1, vec![1, 5]);
        assert_eq!(sw2, vec![3]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut topo = fixture();
        sync_occupancy(&mut topo);
        let before = topo.clone();
        assert!(!sync_occupancy(&mut topo));
        assert_eq!(topo, before);
    }

    #[test]
    fn loopback_cable_occupies_both_ports() {
        let mut topo = fixture();
        topo.cables.push(Cable {
            id: "cable-2".to_string(),
            source: Endpoint::new("sw-2", port(17)),
            target: Endpoint::new("sw-2", port(18)),
            direction: Direction::FullDuplex,
            label: "loop".to_string(),
        });
        let occupied = compute_occupied(&topo, "sw-2");
        assert!(occupied.contains(&port(17)));
        assert!(occupied.contains(&port(18)));
        assert_eq!(occupied.len(), 3);
    }

    #[test]
    fn removal_clears_vacated_port() {
        let mut topo = fixture();
        sync_occupancy(&mut topo);
        topo.cables.clear();
        assert!(sync_occupancy(&mut topo));
        assert!(!topo.switches[0].is_occupied(port(1)));
        assert!(topo.switches[1].occupied_ports.is_empty());
    }
}
