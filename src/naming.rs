use crate::ir::{PortId, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Switch,
    Terminal,
    Cable,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Switch => "sw",
            Self::Terminal => "term",
            Self::Cable => "cable",
        }
    }
}

/// Highest suffix ever handed out per entity kind, so deleting the newest
/// entity does not free its number for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdWatermarks {
    switch: u32,
    terminal: u32,
    cable: u32,
}

impl IdWatermarks {
    fn get(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Switch => self.switch,
            EntityKind::Terminal => self.terminal,
            EntityKind::Cable => self.cable,
        }
    }

    fn raise(&mut self, kind: EntityKind, value: u32) {
        let slot = match kind {
            EntityKind::Switch => &mut self.switch,
            EntityKind::Terminal => &mut self.terminal,
            EntityKind::Cable => &mut self.cable,
        };
        *slot = (*slot).max(value);
    }
}

/// Numeric part of an id such as `sw-12`; ids without one count as 0.
pub fn numeric_suffix(id: &str) -> u32 {
    id.split('-')
        .nth(1)
        .and_then(|part| part.parse::<u32>().ok())
        .unwrap_or(0)
}

fn max_suffix(topology: &Topology, kind: EntityKind) -> u32 {
    let max = match kind {
        EntityKind::Switch => topology
            .switches
            .iter()
            .map(|sw| numeric_suffix(&sw.id))
            .max(),
        EntityKind::Terminal => topology
            .terminals
            .iter()
            .map(|term| numeric_suffix(&term.id))
            .max(),
        EntityKind::Cable => topology
            .cables
            .iter()
            .map(|cable| numeric_suffix(&cable.id))
            .max(),
    };
    max.unwrap_or(0)
}

/// Reserves the next number for `kind`: one past the largest suffix in use or
/// ever issued.
pub fn allocate(topology: &mut Topology, kind: EntityKind) -> u32 {
    let next = max_suffix(topology, kind).max(topology.watermarks.get(kind)) + 1;
    topology.watermarks.raise(kind, next);
    next
}

pub fn entity_id(kind: EntityKind, n: u32) -> String {
    format!("{}-{n}", kind.prefix())
}

pub fn switch_label(n: u32) -> String {
    format!("SW-{n}")
}

pub fn terminal_label(n: u32) -> String {
    format!("PC-{n}")
}

/// Default cable name from the endpoint labels at creation time.
pub fn cable_label(source: &str, source_port: PortId, target: &str, target_port: PortId) -> String {
    format!("{source} {source_port} ↔ {target} {target_port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Position, Switch};

    fn push_switch(topo: &mut Topology, id: &str) {
        topo.switches.push(Switch::new(
            id.to_string(),
            id.to_uppercase(),
            Position::default(),
        ));
    }

    #[test]
    fn suffix_parsing() {
        assert_eq!(numeric_suffix("sw-7"), 7);
        assert_eq!(numeric_suffix("term-12"), 12);
        assert_eq!(numeric_suffix("core"), 0);
        assert_eq!(numeric_suffix("sw-x"), 0);
    }

    #[test]
    fn allocates_past_existing_ids() {
        let mut topo = Topology::new();
        assert_eq!(allocate(&mut topo, EntityKind::Switch), 1);
        push_switch(&mut topo, "sw-1");
        push_switch(&mut topo, "sw-5");
        assert_eq!(allocate(&mut topo, EntityKind::Switch), 6);
        assert_eq!(allocate(&mut topo, EntityKind::Terminal), 1);
    }

    #[test]
    fn never_reuses_a_freed_suffix() {
        let mut topo = Topology::new();
        let n = allocate(&mut topo, EntityKind::Switch);
        push_switch(&mut topo, &entity_id(EntityKind::Switch, n));
        let n = allocate(&mut topo, EntityKind::Switch);
        push_switch(&mut topo, &entity_id(EntityKind::Switch, n));
        topo.switches.retain(|sw| sw.id != "sw-2");
        assert_eq!(allocate(&mut topo, EntityKind::Switch), 3);
    }

    #[test]
    fn cable_label_uses_port_numbers() {
        let label = cable_label(
            "Core-01",
            PortId::new(1).unwrap(),
            "Agg-01",
            PortId::new(17).unwrap(),
        );
        assert_eq!(label, "Core-01 P1 ↔ Agg-01 P17");
    }
}
