//! BreadBoard board document (`.bbd`) format.
//!
//! A `.bbd` file is a JSON document describing a board's placement
//! state: dimensions, components with their pins, and cables. Only
//! placement-relevant fields are recorded — runtime state (pin
//! protocol states, register values, display contents) is rebuilt as
//! default when a board is loaded.
//!
//! This crate owns the document data model and the file encoding. It
//! knows nothing about placement rules; replaying a document onto a
//! live board is the simulator's job.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical file extension for board documents.
pub const EXTENSION: &str = "bbd";

/// Errors raised while encoding, decoding or transferring a document.
#[derive(Debug, Error)]
pub enum BbdError {
    /// File could not be read or written.
    #[error("board file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Document is not valid JSON or does not match the schema.
    #[error("malformed board document: {0}")]
    Json(#[from] serde_json::Error),
    /// Document decoded but describes an impossible board.
    #[error("invalid board document: {0}")]
    Board(String),
}

/// Top-level board record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDoc {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub components: Vec<ComponentDoc>,
    #[serde(default)]
    pub cables: Vec<CableDoc>,
}

impl BoardDoc {
    /// Decode a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `BbdError::Json` on malformed input and
    /// `BbdError::Board` when the decoded dimensions are below 1x1.
    pub fn from_json(text: &str) -> Result<Self, BbdError> {
        let doc: BoardDoc = serde_json::from_str(text)?;
        if doc.width < 1 || doc.height < 1 {
            return Err(BbdError::Board(format!(
                "board dimensions {}x{} out of range (minimum 1x1)",
                doc.width, doc.height,
            )));
        }
        Ok(doc)
    }

    /// Encode the document as pretty-printed JSON text.
    ///
    /// # Errors
    ///
    /// Returns `BbdError::Json` if a value cannot be represented.
    pub fn to_json(&self) -> Result<String, BbdError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and decode a `.bbd` file.
    ///
    /// # Errors
    ///
    /// Surfaces I/O and decode failures.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, BbdError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Encode and write a `.bbd` file.
    ///
    /// # Errors
    ///
    /// Surfaces I/O and encode failures.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), BbdError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// A placed component.
///
/// The variant tag and its scalars are flattened into the record, so
/// a component serialises as one object:
/// `{"type": "Led", "color": 16711680, "x": 2, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDoc {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub sbuses: Vec<BusDoc>,
    #[serde(default)]
    pub xbuses: Vec<BusDoc>,
    #[serde(flatten)]
    pub kind: ComponentKindDoc,
}

/// Component variant tag and placement-relevant scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentKindDoc {
    PressButton,
    ToggleButton,
    Led {
        /// `0xRRGGBB`.
        color: u32,
    },
    NumericDisplay {
        base: u32,
        min: i64,
        max: i64,
    },
    TextDisplay {
        max_len: usize,
    },
    BitmapDisplay {
        pixel_width: i32,
        pixel_height: i32,
        /// `0xRRGGBB`; lit-pixel colour hint for the renderer.
        default_color: u32,
        /// `0xRRGGBB`; cleared-pixel fill.
        inactive_color: u32,
    },
    Memory {
        capacity: usize,
    },
    MicroController {
        #[serde(default)]
        registers: Vec<RegisterDoc>,
        source: String,
    },
}

/// A component pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusDoc {
    pub address: String,
    /// Tile-local position inside the component footprint.
    pub x: i32,
    pub y: i32,
    pub direction: DirectionDoc,
}

/// Pin facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionDoc {
    Up,
    Down,
    Left,
    Right,
}

/// A microcontroller register declaration. Values are runtime state
/// and always load as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDoc {
    pub address: String,
}

/// A cable between two adjacent grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableDoc {
    pub kind: CableKindDoc,
    pub ax: i32,
    pub ay: i32,
    pub bx: i32,
    pub by: i32,
}

/// Cable variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableKindDoc {
    Solder,
    Bridge,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> BoardDoc {
        BoardDoc {
            width: 8,
            height: 6,
            components: vec![
                ComponentDoc {
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 2,
                    sbuses: vec![BusDoc {
                        address: "s0".into(),
                        x: 1,
                        y: 0,
                        direction: DirectionDoc::Right,
                    }],
                    xbuses: vec![],
                    kind: ComponentKindDoc::PressButton,
                },
                ComponentDoc {
                    x: 4,
                    y: 0,
                    width: 2,
                    height: 2,
                    sbuses: vec![],
                    xbuses: vec![BusDoc {
                        address: "x0".into(),
                        x: 0,
                        y: 0,
                        direction: DirectionDoc::Left,
                    }],
                    kind: ComponentKindDoc::MicroController {
                        registers: vec![RegisterDoc {
                            address: "r0".into(),
                        }],
                        source: "mov 1 r0\nslp 1".into(),
                    },
                },
            ],
            cables: vec![CableDoc {
                kind: CableKindDoc::Solder,
                ax: 2,
                ay: 0,
                bx: 3,
                by: 0,
            }],
        }
    }

    #[test]
    fn json_round_trip() {
        let doc = sample_doc();
        let text = doc.to_json().expect("encode");
        let back = BoardDoc::from_json(&text).expect("decode");
        assert_eq!(back, doc);
    }

    #[test]
    fn variant_tag_is_flattened() {
        let text = sample_doc().to_json().expect("encode");
        assert!(text.contains("\"type\": \"PressButton\""));
        assert!(text.contains("\"type\": \"MicroController\""));
    }

    #[test]
    fn reject_malformed_json() {
        assert!(matches!(
            BoardDoc::from_json("{\"width\": 4"),
            Err(BbdError::Json(_))
        ));
    }

    #[test]
    fn reject_unknown_component_type() {
        let text = r#"{
            "width": 4, "height": 4,
            "components": [{"type": "Phaser", "x": 0, "y": 0, "width": 1, "height": 1}],
            "cables": []
        }"#;
        assert!(BoardDoc::from_json(text).is_err());
    }

    #[test]
    fn reject_degenerate_dimensions() {
        let text = r#"{"width": 0, "height": 4, "components": [], "cables": []}"#;
        assert!(matches!(
            BoardDoc::from_json(text),
            Err(BbdError::Board(_))
        ));
    }

    #[test]
    fn missing_collections_default_empty() {
        let doc = BoardDoc::from_json(r#"{"width": 2, "height": 2}"#).expect("decode");
        assert!(doc.components.is_empty());
        assert!(doc.cables.is_empty());
    }
}
