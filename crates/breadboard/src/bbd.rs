//! Board persistence: `.bbd` save and load.
//!
//! Saving flattens the board into the `format-bbd` document model.
//! Loading parses a document and then **replays** it into a fresh
//! board through the ordinary placement rules — components in
//! document order, then cables with bridges before solders, so
//! crossing rules see every bridge. Records that violate a placement
//! rule are dropped; the load still succeeds but reports itself
//! non-perfect.

use std::path::Path;

use tracing::warn;

use format_bbd::{
    BbdError, BoardDoc, BusDoc, CableDoc, CableKindDoc, ComponentDoc, ComponentKindDoc,
    DirectionDoc, RegisterDoc,
};

use crate::board::Board;
use crate::bus::{SBus, XBus};
use crate::button::{PressButton, ToggleButton};
use crate::cable::{Cable, CableKind};
use crate::component::{Component, ComponentKind};
use crate::display::{BitmapDisplay, NumericDisplay, TextDisplay};
use crate::grid::{Direction, Position};
use crate::led::Led;
use crate::mcu::{Mcu, ACC};
use crate::memory::Memory;

/// A loaded board plus whether every record survived the replay.
pub struct LoadOutcome {
    pub board: Board,
    /// `false` when any component or cable was dropped for violating
    /// a placement rule.
    pub perfect: bool,
}

impl Board {
    /// Write the board to a `.bbd` file.
    ///
    /// # Errors
    ///
    /// Surfaces encode and I/O failures.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BbdError> {
        self.to_doc().write(path)
    }

    /// Encode the board as `.bbd` JSON text.
    ///
    /// # Errors
    ///
    /// Surfaces encode failures.
    pub fn save_to_string(&self) -> Result<String, BbdError> {
        self.to_doc().to_json()
    }

    /// Read a `.bbd` file and replay it into a fresh board.
    ///
    /// # Errors
    ///
    /// Surfaces I/O and decode failures. Placement-rule violations
    /// do not fail the load; they mark the outcome non-perfect.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadOutcome, BbdError> {
        Self::replay(&BoardDoc::read(path)?)
    }

    /// Decode `.bbd` JSON text and replay it into a fresh board.
    ///
    /// # Errors
    ///
    /// As for [`Board::load`].
    pub fn load_from_str(text: &str) -> Result<LoadOutcome, BbdError> {
        Self::replay(&BoardDoc::from_json(text)?)
    }

    /// Flatten into the document model. Only placement-relevant
    /// fields are captured; runtime state is not.
    #[must_use]
    pub fn to_doc(&self) -> BoardDoc {
        BoardDoc {
            width: self.width(),
            height: self.height(),
            components: self.components().iter().map(component_doc).collect(),
            cables: self.cables().map(cable_doc).collect(),
        }
    }

    /// Replay a document into a fresh board.
    ///
    /// # Errors
    ///
    /// `BbdError::Board` when the document's dimensions are below
    /// 1x1.
    pub fn replay(doc: &BoardDoc) -> Result<LoadOutcome, BbdError> {
        if doc.width < 1 || doc.height < 1 {
            return Err(BbdError::Board(format!(
                "board dimensions {}x{} out of range (minimum 1x1)",
                doc.width, doc.height,
            )));
        }
        let mut board = Board::new(doc.width, doc.height);
        let mut perfect = true;

        for record in &doc.components {
            if !board.add_component(component_from_doc(record)) {
                perfect = false;
                warn!(x = record.x, y = record.y, "load dropped a component");
            }
        }
        // Bridges before solders, so solder placement sees every
        // crossing it must respect.
        for pass in [CableKindDoc::Bridge, CableKindDoc::Solder] {
            for record in doc.cables.iter().filter(|c| c.kind == pass) {
                if !board.add_cable(cable_from_doc(record)) {
                    perfect = false;
                    warn!(
                        ax = record.ax,
                        ay = record.ay,
                        bx = record.bx,
                        by = record.by,
                        "load dropped a cable"
                    );
                }
            }
        }
        Ok(LoadOutcome { board, perfect })
    }
}

fn component_doc(component: &Component) -> ComponentDoc {
    let kind = match &component.kind {
        ComponentKind::PressButton(_) => ComponentKindDoc::PressButton,
        ComponentKind::ToggleButton(_) => ComponentKindDoc::ToggleButton,
        ComponentKind::Led(led) => ComponentKindDoc::Led { color: led.color },
        ComponentKind::NumericDisplay(display) => ComponentKindDoc::NumericDisplay {
            base: display.base,
            min: display.min,
            max: display.max,
        },
        ComponentKind::TextDisplay(display) => ComponentKindDoc::TextDisplay {
            max_len: display.max_len,
        },
        ComponentKind::BitmapDisplay(display) => ComponentKindDoc::BitmapDisplay {
            pixel_width: display.width(),
            pixel_height: display.height(),
            default_color: display.default_color,
            inactive_color: display.inactive_color,
        },
        ComponentKind::Memory(memory) => ComponentKindDoc::Memory {
            capacity: memory.capacity(),
        },
        ComponentKind::MicroController(mcu) => ComponentKindDoc::MicroController {
            registers: mcu
                .register_addresses()
                .map(|address| RegisterDoc {
                    address: address.to_string(),
                })
                .collect(),
            source: mcu.source().to_string(),
        },
    };
    ComponentDoc {
        x: component.position.x,
        y: component.position.y,
        width: component.width,
        height: component.height,
        sbuses: component
            .sbuses
            .iter()
            .map(|pin| bus_doc(&pin.address, pin.position, pin.direction))
            .collect(),
        xbuses: component
            .xbuses
            .iter()
            .map(|pin| bus_doc(&pin.address, pin.position, pin.direction))
            .collect(),
        kind,
    }
}

fn component_from_doc(record: &ComponentDoc) -> Component {
    let kind = match &record.kind {
        ComponentKindDoc::PressButton => ComponentKind::PressButton(PressButton::new()),
        ComponentKindDoc::ToggleButton => ComponentKind::ToggleButton(ToggleButton::new()),
        ComponentKindDoc::Led { color } => ComponentKind::Led(Led::new(*color)),
        ComponentKindDoc::NumericDisplay { base, min, max } => {
            ComponentKind::NumericDisplay(NumericDisplay::new(*base, *min, *max))
        }
        ComponentKindDoc::TextDisplay { max_len } => {
            ComponentKind::TextDisplay(TextDisplay::new(*max_len))
        }
        ComponentKindDoc::BitmapDisplay {
            pixel_width,
            pixel_height,
            default_color,
            inactive_color,
        } => ComponentKind::BitmapDisplay(BitmapDisplay::new(
            *pixel_width,
            *pixel_height,
            *default_color,
            *inactive_color,
        )),
        ComponentKindDoc::Memory { capacity } => ComponentKind::Memory(Memory::new(*capacity)),
        ComponentKindDoc::MicroController { registers, source } => {
            let mut mcu = Mcu::new();
            for register in registers {
                // The accumulator is built in; re-adding it would
                // trip the address-disjointness check.
                if register.address != ACC {
                    mcu.add_register(register.address.clone());
                }
            }
            mcu.set_source(source.clone());
            ComponentKind::MicroController(mcu)
        }
    };

    let mut component = Component::new(
        kind,
        Position::new(record.x, record.y),
        record.width,
        record.height,
    );
    for pin in &record.sbuses {
        component.sbuses.push(SBus::new(
            pin.address.clone(),
            Position::new(pin.x, pin.y),
            direction_from_doc(pin.direction),
        ));
    }
    for pin in &record.xbuses {
        component.xbuses.push(XBus::new(
            pin.address.clone(),
            Position::new(pin.x, pin.y),
            direction_from_doc(pin.direction),
        ));
    }
    component
}

fn bus_doc(address: &str, local: Position, direction: Direction) -> BusDoc {
    BusDoc {
        address: address.to_string(),
        x: local.x,
        y: local.y,
        direction: direction_doc(direction),
    }
}

fn cable_doc(cable: &Cable) -> CableDoc {
    CableDoc {
        kind: match cable.kind {
            CableKind::Solder => CableKindDoc::Solder,
            CableKind::Bridge => CableKindDoc::Bridge,
        },
        ax: cable.a.x,
        ay: cable.a.y,
        bx: cable.b.x,
        by: cable.b.y,
    }
}

fn cable_from_doc(record: &CableDoc) -> Cable {
    Cable::new(
        match record.kind {
            CableKindDoc::Solder => CableKind::Solder,
            CableKindDoc::Bridge => CableKind::Bridge,
        },
        Position::new(record.ax, record.ay),
        Position::new(record.bx, record.by),
    )
}

fn direction_doc(direction: Direction) -> DirectionDoc {
    match direction {
        Direction::Up => DirectionDoc::Up,
        Direction::Down => DirectionDoc::Down,
        Direction::Left => DirectionDoc::Left,
        Direction::Right => DirectionDoc::Right,
    }
}

fn direction_from_doc(direction: DirectionDoc) -> Direction {
    match direction {
        DirectionDoc::Up => Direction::Up,
        DirectionDoc::Down => Direction::Down,
        DirectionDoc::Left => Direction::Left,
        DirectionDoc::Right => Direction::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn sample_board() -> Board {
        let mut board = Board::new(8, 6);
        let button = Component::new(
            ComponentKind::PressButton(PressButton::new()),
            p(0, 0),
            2,
            2,
        )
        .with_sbus("s0", p(1, 0), Direction::Right);
        let mcu = Component::new(ComponentKind::MicroController(Mcu::new()), p(4, 0), 2, 2)
            .with_register("r0")
            .with_xbus("x0", p(0, 0), Direction::Left)
            .with_source("mov 1 r0\nslp 1\n");
        let memory = Component::new(ComponentKind::Memory(Memory::new(16)), p(4, 3), 2, 2)
            .with_xbus("xp0", p(0, 0), Direction::Left)
            .with_xbus("xd0", p(0, 1), Direction::Left);
        assert!(board.add_component(button));
        assert!(board.add_component(mcu));
        assert!(board.add_component(memory));
        assert!(board.add_cable(Cable::solder(p(2, 0), p(3, 0))));
        assert!(board.add_cable(Cable::solder(p(0, 3), p(0, 4))));
        assert!(board.add_cable(Cable::bridge(p(0, 3), p(1, 3))));
        board
    }

    #[test]
    fn save_load_round_trip() {
        let board = sample_board();
        let text = board.save_to_string().expect("save");
        let outcome = Board::load_from_str(&text).expect("load");
        assert!(outcome.perfect);
        assert_eq!(outcome.board.to_doc(), board.to_doc());
    }

    #[test]
    fn loaded_microcontroller_keeps_registers_and_source() {
        let text = sample_board().save_to_string().expect("save");
        let outcome = Board::load_from_str(&text).expect("load");
        let mcu = outcome.board.microcontrollers().next().expect("one mcu");
        assert_eq!(mcu.source(), "mov 1 r0\nslp 1\n");
        let addresses: Vec<&str> = mcu.register_addresses().collect();
        assert_eq!(addresses, vec![ACC, "r0"]);
    }

    #[test]
    fn replay_drops_violating_records() {
        let mut doc = sample_board().to_doc();
        // A second component on the button's footprint cannot place.
        doc.components.push(ComponentDoc {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            sbuses: vec![],
            xbuses: vec![],
            kind: ComponentKindDoc::Led { color: 0x00FF00 },
        });
        // A dangling diagonal cable cannot place either.
        doc.cables.push(CableDoc {
            kind: CableKindDoc::Solder,
            ax: 0,
            ay: 5,
            bx: 1,
            by: 4,
        });
        let outcome = Board::replay(&doc).expect("load");
        assert!(!outcome.perfect);
        assert_eq!(outcome.board.components().len(), 3);
        assert_eq!(outcome.board.cables().count(), 3);
    }

    #[test]
    fn replay_rejects_degenerate_board() {
        let doc = BoardDoc {
            width: 0,
            height: 3,
            components: vec![],
            cables: vec![],
        };
        assert!(matches!(Board::replay(&doc), Err(BbdError::Board(_))));
    }

    #[test]
    fn loaded_board_simulates() {
        let text = sample_board().save_to_string().expect("save");
        let mut outcome = Board::load_from_str(&text).expect("load");
        outcome.board.initialise().expect("initialise");
        outcome.board.tick().expect("tick");
    }
}
