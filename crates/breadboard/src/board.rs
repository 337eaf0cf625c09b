//! The board: placement, connectivity and the tick scheduler.
//!
//! A board owns every component and cable. Placement happens before
//! simulation; `initialise` compiles programs, validates addresses
//! and freezes the pin connectivity cache; `tick` then advances the
//! whole board one step:
//!
//! 1. Components run their per-tick action in placement order. A
//!    component sees the committed effects of components earlier in
//!    the same tick.
//! 2. One X-bus delivery sweep walks the connectivity cache in order
//!    and completes at most one handshake per writer.

use std::collections::HashMap;

use breadboard_core::{Observable, Tickable, Value};
use tracing::{debug, trace, warn};

use crate::cable::{Cable, CableKind};
use crate::component::{Component, ComponentKind};
use crate::error::SimError;
use crate::grid::Position;
use crate::mcu::Mcu;
use crate::net::NetGraph;

/// A pin slot within a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinId {
    S(usize),
    X(usize),
}

/// A pin slot within a board: component index plus pin slot.
///
/// The connectivity cache relates pins through these indices only;
/// nothing outside a component ever owns its buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId {
    pub component: usize,
    pub pin: PinId,
}

/// One connectivity-cache row: a pin and its electrical peers.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bus: BusId,
    pub peers: Vec<BusId>,
}

/// The simulation space: a fixed grid, its components and cables.
pub struct Board {
    width: i32,
    height: i32,
    components: Vec<Component>,
    solders: Vec<Cable>,
    bridges: Vec<Cable>,
    cache: Vec<CacheEntry>,
    cache_index: HashMap<BusId, usize>,
    initialised: bool,
    ticks: u64,
}

impl Board {
    /// Create an empty `width` x `height` board.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is below 1.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width >= 1 && height >= 1,
            "board dimensions must be at least 1x1"
        );
        Self {
            width,
            height,
            components: Vec::new(),
            solders: Vec::new(),
            bridges: Vec::new(),
            cache: Vec::new(),
            cache_index: HashMap::new(),
            initialised: false,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Ticks advanced since construction or the last `reset`.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn contains(&self, p: Position) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    #[must_use]
    pub fn component_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    #[must_use]
    pub fn solders(&self) -> &[Cable] {
        &self.solders
    }

    #[must_use]
    pub fn bridges(&self) -> &[Cable] {
        &self.bridges
    }

    /// Every cable, bridges first (net-resolution order).
    pub fn cables(&self) -> impl Iterator<Item = &Cable> {
        self.bridges.iter().chain(self.solders.iter())
    }

    /// Every microcontroller, in placement order.
    pub fn microcontrollers(&self) -> impl Iterator<Item = &Mcu> {
        self.components.iter().filter_map(Component::mcu)
    }

    /// Total instructions completed across every microcontroller.
    #[must_use]
    pub fn total_ops(&self) -> u64 {
        self.microcontrollers().map(Mcu::ops).sum()
    }

    /// The connectivity cache rows, valid after `initialise`.
    #[must_use]
    pub fn connectivity(&self) -> &[CacheEntry] {
        &self.cache
    }

    /// Place a component. Returns `false` (board unchanged) when a
    /// placement rule fails: footprint out of bounds or overlapping,
    /// an existing cable entering the footprint anywhere but an
    /// aligned pin port, a bridge terminating inside, or a pin net
    /// that would mix S- and X-buses.
    pub fn add_component(&mut self, component: Component) -> bool {
        if !component.in_bounds(self.width, self.height) {
            trace!(at = %component.position, "component rejected: out of bounds");
            return false;
        }
        if self.components.iter().any(|k| k.overlaps(&component)) {
            trace!(at = %component.position, "component rejected: overlap");
            return false;
        }
        for cable in self.cables() {
            let inside_a = component.footprint_contains(cable.a);
            let inside_b = component.footprint_contains(cable.b);
            if !inside_a && !inside_b {
                continue;
            }
            if inside_a && inside_b {
                trace!(at = %component.position, "component rejected: cable inside footprint");
                return false;
            }
            if cable.kind == CableKind::Bridge {
                trace!(at = %component.position, "component rejected: bridge at footprint");
                return false;
            }
            let (inside, outside) = if inside_a {
                (cable.a, cable.b)
            } else {
                (cable.b, cable.a)
            };
            if !component.has_aligned_port(inside, outside) {
                trace!(at = %component.position, "component rejected: cable not at a port");
                return false;
            }
        }
        if self.component_would_mix(&component) {
            trace!(at = %component.position, "component rejected: mixed net");
            return false;
        }
        self.components.push(component);
        self.invalidate();
        true
    }

    /// Remove the component at `index`. Returns `false` when no such
    /// component exists.
    pub fn remove_component(&mut self, index: usize) -> bool {
        if index >= self.components.len() {
            return false;
        }
        self.components.remove(index);
        self.invalidate();
        true
    }

    /// Remove the component whose footprint covers `p`.
    pub fn remove_component_at(&mut self, p: Position) -> bool {
        match self.components.iter().position(|k| k.footprint_contains(p)) {
            Some(index) => self.remove_component(index),
            None => false,
        }
    }

    /// Lay a cable. Returns `false` (board unchanged) when a
    /// placement rule fails: an endpoint off the grid, endpoints not
    /// adjacent, a duplicate span, an endpoint inside a component
    /// anywhere but an aligned pin port, both endpoints inside one
    /// component, a bridge terminating inside any component, or a
    /// net that would mix S- and X-buses.
    pub fn add_cable(&mut self, cable: Cable) -> bool {
        if !self.contains(cable.a) || !self.contains(cable.b) {
            trace!(a = %cable.a, b = %cable.b, "cable rejected: off the grid");
            return false;
        }
        if !cable.a.is_adjacent(cable.b) {
            trace!(a = %cable.a, b = %cable.b, "cable rejected: not adjacent");
            return false;
        }
        if self.cables().any(|c| c.same_span(cable.a, cable.b)) {
            trace!(a = %cable.a, b = %cable.b, "cable rejected: duplicate span");
            return false;
        }
        for component in &self.components {
            let inside_a = component.footprint_contains(cable.a);
            let inside_b = component.footprint_contains(cable.b);
            if !inside_a && !inside_b {
                continue;
            }
            if inside_a && inside_b {
                trace!(a = %cable.a, b = %cable.b, "cable rejected: both ends in one component");
                return false;
            }
            if cable.kind == CableKind::Bridge {
                trace!(a = %cable.a, b = %cable.b, "cable rejected: bridge into component");
                return false;
            }
            let (inside, outside) = if inside_a {
                (cable.a, cable.b)
            } else {
                (cable.b, cable.a)
            };
            if !component.has_aligned_port(inside, outside) {
                trace!(a = %cable.a, b = %cable.b, "cable rejected: not at a port");
                return false;
            }
        }
        if self.cable_would_mix(&cable) {
            trace!(a = %cable.a, b = %cable.b, "cable rejected: mixed net");
            return false;
        }
        match cable.kind {
            CableKind::Solder => self.solders.push(cable),
            CableKind::Bridge => self.bridges.push(cable),
        }
        self.invalidate();
        true
    }

    /// Remove the cable spanning `{a, b}`. Returns `false` when none
    /// exists.
    pub fn remove_cable(&mut self, a: Position, b: Position) -> bool {
        if let Some(index) = self.solders.iter().position(|c| c.same_span(a, b)) {
            self.solders.remove(index);
            self.invalidate();
            return true;
        }
        if let Some(index) = self.bridges.iter().position(|c| c.same_span(a, b)) {
            self.bridges.remove(index);
            self.invalidate();
            return true;
        }
        false
    }

    /// Whether laying `cable` would put S- and X-pins on one net.
    fn cable_would_mix(&self, cable: &Cable) -> bool {
        let graph = NetGraph::with_candidate(&self.bridges, &self.solders, cable);
        let blocked = |p: Position| self.components.iter().any(|k| k.footprint_contains(p));
        let net = graph.net_from(graph.len() - 1, &blocked);
        let (has_s, has_x) = self.net_bus_kinds(&graph, &net, None);
        has_s && has_x
    }

    /// Whether placing `component` would put S- and X-pins on one
    /// net through any of its pins.
    fn component_would_mix(&self, component: &Component) -> bool {
        let graph = NetGraph::new(&self.bridges, &self.solders);
        let blocked = |p: Position| {
            component.footprint_contains(p)
                || self.components.iter().any(|k| k.footprint_contains(p))
        };
        for (port, direction) in component.ports() {
            let Some(start) = graph.port_cable(port, direction) else {
                continue;
            };
            let net = graph.net_from(start, &blocked);
            let (has_s, has_x) = self.net_bus_kinds(&graph, &net, Some(component));
            if has_s && has_x {
                return true;
            }
        }
        false
    }

    /// Which pin kinds the net touches, over every placed component
    /// plus an optional candidate.
    fn net_bus_kinds(
        &self,
        graph: &NetGraph<'_>,
        net: &[usize],
        candidate: Option<&Component>,
    ) -> (bool, bool) {
        let mut has_s = false;
        let mut has_x = false;
        for component in self.components.iter().chain(candidate) {
            for pin in &component.sbuses {
                let port = component.port(pin.position);
                if let Some(cable) = graph.port_cable(port, pin.direction) {
                    if net.contains(&cable) {
                        has_s = true;
                    }
                }
            }
            for pin in &component.xbuses {
                let port = component.port(pin.position);
                if let Some(cable) = graph.port_cable(port, pin.direction) {
                    if net.contains(&cable) {
                        has_x = true;
                    }
                }
            }
        }
        (has_s, has_x)
    }

    /// Drop the connectivity cache; the next `tick` needs a fresh
    /// `initialise`.
    fn invalidate(&mut self) {
        self.cache.clear();
        self.cache_index.clear();
        self.initialised = false;
    }

    /// Compile every microcontroller, validate addresses, pair
    /// memory pins and freeze the connectivity cache.
    ///
    /// The cache iterates components in placement order with S-pins
    /// before X-pins; that order is also the delivery-sweep order
    /// and the peer tie-break order.
    ///
    /// # Errors
    ///
    /// The first compile, address or pairing fault, unchanged from
    /// the failing component.
    pub fn initialise(&mut self) -> Result<(), SimError> {
        for component in &self.components {
            component.validate_addresses()?;
        }
        for component in &mut self.components {
            let sbuses = &component.sbuses;
            let xbuses = &component.xbuses;
            match &mut component.kind {
                ComponentKind::MicroController(mcu) => mcu.compile(sbuses, xbuses)?,
                ComponentKind::Memory(memory) => memory.pair_pins(xbuses)?,
                _ => {}
            }
        }
        self.rebuild_cache();
        self.initialised = true;
        debug!(
            components = self.components.len(),
            solders = self.solders.len(),
            bridges = self.bridges.len(),
            pins = self.cache.len(),
            "board initialised"
        );
        Ok(())
    }

    fn rebuild_cache(&mut self) {
        let graph = NetGraph::new(&self.bridges, &self.solders);
        let blocked = |p: Position| self.components.iter().any(|k| k.footprint_contains(p));

        // Wired cable per pin, in cache order.
        let mut wired: Vec<(BusId, Option<usize>)> = Vec::new();
        for (ci, component) in self.components.iter().enumerate() {
            for (slot, pin) in component.sbuses.iter().enumerate() {
                let id = BusId {
                    component: ci,
                    pin: PinId::S(slot),
                };
                wired.push((id, graph.port_cable(component.port(pin.position), pin.direction)));
            }
            for (slot, pin) in component.xbuses.iter().enumerate() {
                let id = BusId {
                    component: ci,
                    pin: PinId::X(slot),
                };
                wired.push((id, graph.port_cable(component.port(pin.position), pin.direction)));
            }
        }

        let mut cache = Vec::with_capacity(wired.len());
        let mut cache_index = HashMap::with_capacity(wired.len());
        for &(id, cable) in &wired {
            let peers = match cable {
                None => Vec::new(),
                Some(start) => {
                    let net = graph.net_from(start, &blocked);
                    wired
                        .iter()
                        .filter(|(peer, peer_cable)| {
                            *peer != id && peer_cable.is_some_and(|c| net.contains(&c))
                        })
                        .map(|&(peer, _)| peer)
                        .collect()
                }
            };
            cache_index.insert(id, cache.len());
            cache.push(CacheEntry { bus: id, peers });
        }
        self.cache = cache;
        self.cache_index = cache_index;
    }

    /// Advance the whole board one step.
    ///
    /// # Errors
    ///
    /// `SimError::NotInitialised` before `initialise`, or the first
    /// fatal fault a component raises. The board stops mid-tick on a
    /// fault; `reset` recovers.
    pub fn tick(&mut self) -> Result<(), SimError> {
        if !self.initialised {
            return Err(SimError::NotInitialised);
        }
        self.ticks += 1;
        for index in 0..self.components.len() {
            if let Err(fault) = self.tick_component(index) {
                warn!(component = index, %fault, "tick aborted");
                return Err(fault);
            }
        }
        self.deliver();
        Ok(())
    }

    fn tick_component(&mut self, index: usize) -> Result<(), SimError> {
        let s_net = self.sbus_net_levels(index);
        let component = &mut self.components[index];
        let sbuses = &mut component.sbuses;
        let xbuses = &mut component.xbuses;
        match &mut component.kind {
            ComponentKind::PressButton(button) => button.tick(sbuses),
            ComponentKind::ToggleButton(button) => button.tick(sbuses),
            ComponentKind::Led(led) => led.tick(&s_net),
            ComponentKind::NumericDisplay(display) => display.tick(xbuses),
            ComponentKind::TextDisplay(display) => display.tick(xbuses),
            ComponentKind::BitmapDisplay(display) => display.tick(xbuses),
            ComponentKind::Memory(memory) => memory.tick(xbuses)?,
            ComponentKind::MicroController(mcu) => mcu.step(sbuses, xbuses, &s_net)?,
        }
        Ok(())
    }

    /// Net level for each S-pin of one component: the pin's own
    /// value combined with every cached peer.
    fn sbus_net_levels(&self, index: usize) -> Vec<i64> {
        let component = &self.components[index];
        (0..component.sbuses.len())
            .map(|slot| {
                let id = BusId {
                    component: index,
                    pin: PinId::S(slot),
                };
                let mut level = component.sbuses[slot].value();
                if let Some(&row) = self.cache_index.get(&id) {
                    for peer in &self.cache[row].peers {
                        if let PinId::S(peer_slot) = peer.pin {
                            level = level
                                .max(self.components[peer.component].sbuses[peer_slot].value());
                        }
                    }
                }
                level
            })
            .collect()
    }

    /// The post-tick X-bus delivery sweep: for each announcing
    /// writer in cache order, complete one handshake with the first
    /// accepting peer.
    fn deliver(&mut self) {
        for row in 0..self.cache.len() {
            let writer = self.cache[row].bus;
            let PinId::X(writer_slot) = writer.pin else {
                continue;
            };
            if !self.components[writer.component].xbuses[writer_slot].offers_value() {
                continue;
            }
            let payload = self.components[writer.component].xbuses[writer_slot].value();

            let reader = self.cache[row].peers.iter().find_map(|peer| {
                let PinId::X(peer_slot) = peer.pin else {
                    return None;
                };
                self.components[peer.component].xbuses[peer_slot]
                    .accepts_value()
                    .then_some((peer.component, peer_slot))
            });
            if let Some((peer_component, peer_slot)) = reader {
                self.components[peer_component].xbuses[peer_slot].receive(payload);
                self.components[writer.component].xbuses[writer_slot].complete_write();
            }
        }
    }

    /// Return every component to its default state and restart the
    /// tick counter. The board stays initialised; compiled programs
    /// are kept and rewound.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.reset();
        }
        self.ticks = 0;
    }
}

impl Tickable for Board {
    type Error = SimError;

    fn tick(&mut self) -> Result<(), SimError> {
        Board::tick(self)
    }
}

impl Observable for Board {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "width" => return Some(Value::I64(i64::from(self.width))),
            "height" => return Some(Value::I64(i64::from(self.height))),
            "ticks" => return Some(Value::I64(self.ticks as i64)),
            "ops" => return Some(Value::I64(self.total_ops() as i64)),
            "components" => return Some(self.components.len().into()),
            "cables" => return Some((self.solders.len() + self.bridges.len()).into()),
            _ => {}
        }
        // `mcu.<n>.<sub>` delegates to the n-th microcontroller.
        let rest = path.strip_prefix("mcu.")?;
        let (index, sub) = rest.split_once('.')?;
        let index: usize = index.parse().ok()?;
        self.microcontrollers().nth(index)?.query(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::PressButton;
    use crate::grid::Direction;
    use crate::led::Led;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn button_led_board() -> Board {
        let mut board = Board::new(4, 4);
        let button = Component::new(
            ComponentKind::PressButton(PressButton::new()),
            p(0, 0),
            2,
            2,
        )
        .with_sbus("s0", p(1, 0), Direction::Right);
        let led = Component::new(ComponentKind::Led(Led::new(0xFF0000)), p(2, 0), 1, 1)
            .with_sbus("s0", p(0, 0), Direction::Left);
        assert!(board.add_component(button));
        assert!(board.add_component(led));
        board
    }

    #[test]
    fn rejects_out_of_bounds_component() {
        let mut board = Board::new(2, 2);
        let led = Component::new(ComponentKind::Led(Led::new(0)), p(1, 1), 2, 1);
        assert!(!board.add_component(led));
        assert!(board.components().is_empty());
    }

    #[test]
    fn rejects_overlapping_component() {
        let mut board = Board::new(4, 4);
        assert!(board.add_component(Component::new(
            ComponentKind::Led(Led::new(0)),
            p(0, 0),
            2,
            2
        )));
        assert!(!board.add_component(Component::new(
            ComponentKind::Led(Led::new(0)),
            p(1, 1),
            1,
            1
        )));
    }

    #[test]
    fn rejects_cable_off_grid_or_diagonal() {
        let mut board = Board::new(2, 2);
        assert!(!board.add_cable(Cable::solder(p(0, 0), p(0, -1))));
        assert!(!board.add_cable(Cable::solder(p(0, 0), p(1, 1))));
        assert!(board.add_cable(Cable::solder(p(0, 0), p(1, 0))));
    }

    #[test]
    fn rejects_duplicate_span_either_orientation() {
        let mut board = Board::new(3, 3);
        assert!(board.add_cable(Cable::solder(p(0, 0), p(1, 0))));
        assert!(!board.add_cable(Cable::solder(p(1, 0), p(0, 0))));
        assert!(!board.add_cable(Cable::bridge(p(0, 0), p(1, 0))));
    }

    #[test]
    fn cable_into_component_must_hit_aligned_port() {
        let mut board = button_led_board();
        // LED's pin faces left: entering from the right is rejected.
        assert!(!board.add_cable(Cable::solder(p(2, 0), p(3, 0))));
        // Entering along the facing is accepted.
        assert!(board.add_cable(Cable::solder(p(1, 0), p(2, 0))));
    }

    #[test]
    fn bridge_may_not_terminate_inside_component() {
        let mut board = button_led_board();
        assert!(!board.add_cable(Cable::bridge(p(1, 0), p(2, 0))));
    }

    #[test]
    fn remove_cable_by_span() {
        let mut board = Board::new(3, 3);
        assert!(board.add_cable(Cable::solder(p(0, 0), p(1, 0))));
        assert!(board.remove_cable(p(1, 0), p(0, 0)));
        assert!(!board.remove_cable(p(1, 0), p(0, 0)));
    }

    #[test]
    fn tick_requires_initialise() {
        let mut board = button_led_board();
        assert_eq!(board.tick(), Err(SimError::NotInitialised));
        board.initialise().expect("initialise");
        board.tick().expect("tick");
    }

    #[test]
    fn edits_invalidate_initialise() {
        let mut board = button_led_board();
        board.initialise().expect("initialise");
        assert!(board.add_cable(Cable::solder(p(0, 2), p(0, 3))));
        assert_eq!(board.tick(), Err(SimError::NotInitialised));
    }

    #[test]
    fn cache_is_symmetric() {
        let mut board = button_led_board();
        assert!(board.add_cable(Cable::solder(p(1, 0), p(2, 0))));
        board.initialise().expect("initialise");
        for entry in board.connectivity() {
            for peer in &entry.peers {
                let row = board.connectivity().iter().find(|e| e.bus == *peer);
                assert!(row.is_some_and(|e| e.peers.contains(&entry.bus)));
            }
        }
    }

    #[test]
    fn unwired_pin_has_no_peers() {
        let mut board = button_led_board();
        board.initialise().expect("initialise");
        for entry in board.connectivity() {
            assert!(entry.peers.is_empty());
        }
    }

    #[test]
    fn observable_board_paths() {
        let board = button_led_board();
        assert_eq!(board.query("width"), Some(Value::I64(4)));
        assert_eq!(board.query("components"), Some(Value::I64(2)));
        assert_eq!(board.query("bogus"), None);
    }
}
