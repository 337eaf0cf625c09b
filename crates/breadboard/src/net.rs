//! Net resolution: which cables are electrically continuous.
//!
//! A net is grown by flood fill from a starting cable. Solder joins
//! solder at any shared endpoint, and bridge joins bridge the same
//! way. Continuity between the two kinds at a point needs at least
//! two bridges meeting there: a lone bridge crosses solder without
//! connecting. Nets never propagate through cells covered by a
//! component footprint — a cable endpoint on such a cell is a port,
//! and the component's pin is the only thing it feeds.

use crate::cable::{Cable, CableKind};
use crate::grid::{Direction, Position};

/// A read-only view over every cable considered for net resolution:
/// the board's bridges, then its solders, then (optionally) one
/// candidate cable being validated for placement.
pub struct NetGraph<'a> {
    cables: Vec<&'a Cable>,
}

impl<'a> NetGraph<'a> {
    #[must_use]
    pub fn new(bridges: &'a [Cable], solders: &'a [Cable]) -> Self {
        Self {
            cables: bridges.iter().chain(solders.iter()).collect(),
        }
    }

    /// A view that also contains `candidate`, placed last.
    #[must_use]
    pub fn with_candidate(bridges: &'a [Cable], solders: &'a [Cable], candidate: &'a Cable) -> Self {
        let mut graph = Self::new(bridges, solders);
        graph.cables.push(candidate);
        graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cables.is_empty()
    }

    #[must_use]
    pub fn cable(&self, index: usize) -> &Cable {
        self.cables[index]
    }

    /// Index of the cable a pin is wired to: endpoints must be
    /// exactly `{port, port + direction}`.
    #[must_use]
    pub fn port_cable(&self, port: Position, direction: Direction) -> Option<usize> {
        let far = port.shifted(direction);
        self.cables.iter().position(|c| c.same_span(port, far))
    }

    /// Number of bridges with an endpoint at `p`.
    fn bridges_at(&self, p: Position) -> usize {
        self.cables
            .iter()
            .filter(|c| c.kind == CableKind::Bridge && c.touches(p))
            .count()
    }

    /// Flood-fill the net containing `start`.
    ///
    /// `blocked` reports cells inside a component footprint; the
    /// frontier never includes endpoints on such cells. Returns the
    /// cable indices of the net in discovery order (always including
    /// `start`).
    pub fn net_from(&self, start: usize, blocked: &dyn Fn(Position) -> bool) -> Vec<usize> {
        let mut visited = vec![false; self.cables.len()];
        visited[start] = true;
        let mut net = vec![start];

        let mut frontier: Vec<(usize, Position)> = Vec::new();
        for end in [self.cables[start].a, self.cables[start].b] {
            if !blocked(end) {
                frontier.push((start, end));
            }
        }

        let mut at = 0;
        while at < frontier.len() {
            let (ci, p) = frontier[at];
            at += 1;
            let meeting_bridges = self.bridges_at(p);
            for (j, other) in self.cables.iter().enumerate() {
                if visited[j] || !other.touches(p) {
                    continue;
                }
                if other.kind != self.cables[ci].kind && meeting_bridges < 2 {
                    continue;
                }
                visited[j] = true;
                net.push(j);
                for end in [other.a, other.b] {
                    if !blocked(end) {
                        frontier.push((j, end));
                    }
                }
            }
        }
        net
    }
}
