// THEORY:
// The game-state types are the public data model shared by the detector, the log
// serializer, the HTTP server and the browser client. A `GameStateSnapshot` is a
// transient picture of one detection cycle: it is rebuilt from scratch every
// frame and carries no identity across frames.
//
// The serde shape is the wire format the browser submits, so every optional part
// has a default: a client may omit dice, the cube, radii or pip counts entirely.

use serde::{Deserialize, Serialize};

/// What a detection represents on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    #[default]
    Checker,
    RedDie,
    WhiteDie,
}

/// A single object found in a frame, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    /// Circle radius for checkers, half the side for squares.
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub kind: DetectionKind,
    /// Die face value. `None` when it could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pips: Option<u8>,
}

impl Detection {
    pub fn checker(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius,
            kind: DetectionKind::Checker,
            pips: None,
        }
    }

    pub fn die(kind: DetectionKind, x: f64, y: f64, radius: f64, pips: Option<u8>) -> Self {
        Self {
            x,
            y,
            radius,
            kind,
            pips,
        }
    }
}

/// The two dice, each optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dice {
    #[serde(default)]
    pub red: Option<Detection>,
    #[serde(default)]
    pub white: Option<Detection>,
}

/// The doubling cube. Coordinates may be missing in a client submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cube {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    /// Face value. `None` when it could not be read.
    #[serde(default)]
    pub value: Option<u32>,
}

impl Cube {
    /// Both coordinates, when the cube position is known.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }
}

/// Everything seen in one detection cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    #[serde(default)]
    pub checkers: Vec<Detection>,
    #[serde(default)]
    pub dice: Dice,
    #[serde(default)]
    pub cube: Option<Cube>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_client_snapshot() {
        let json = r#"{
            "checkers": [{"x": 120.4, "y": 339.6}],
            "dice": {"red": {"x": 150, "y": 200, "pips": 6}},
            "cube": {"x": null, "y": 300, "value": 1}
        }"#;
        let snapshot: GameStateSnapshot = serde_json::from_str(json).expect("parse snapshot");
        assert_eq!(snapshot.checkers.len(), 1);
        assert_eq!(snapshot.checkers[0].kind, DetectionKind::Checker);
        assert_eq!(snapshot.checkers[0].radius, 0.0);
        assert_eq!(snapshot.dice.red.as_ref().and_then(|d| d.pips), Some(6));
        assert!(snapshot.dice.white.is_none());
        assert_eq!(snapshot.cube.as_ref().and_then(Cube::position), None);
    }

    #[test]
    fn empty_object_is_empty_snapshot() {
        let snapshot: GameStateSnapshot = serde_json::from_str("{}").expect("parse snapshot");
        assert_eq!(snapshot, GameStateSnapshot::default());
    }

    #[test]
    fn kind_uses_snake_case() {
        let die = Detection::die(DetectionKind::WhiteDie, 1.0, 2.0, 3.0, None);
        let json = serde_json::to_value(&die).expect("serialize die");
        assert_eq!(json["kind"], "white_die");
        assert!(json.get("pips").is_none());
    }

    #[test]
    fn cube_is_not_a_detection_kind() {
        let json = r#"{"x": 1, "y": 2, "kind": "cube"}"#;
        assert!(serde_json::from_str::<Detection>(json).is_err());
    }
}
