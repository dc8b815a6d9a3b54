use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A keyboard key code as reported by the host's input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// Space bar.
    pub const SPACE: KeyCode = KeyCode(32);
    /// Left arrow.
    pub const LEFT: KeyCode = KeyCode(1073741904);
    /// Right arrow.
    pub const RIGHT: KeyCode = KeyCode(1073741903);
    /// Up arrow.
    pub const UP: KeyCode = KeyCode(1073741906);
    /// Down arrow.
    pub const DOWN: KeyCode = KeyCode(1073741905);

    /// Key code for a printable ASCII character.
    pub fn from_char(c: char) -> KeyCode {
        KeyCode(c.to_ascii_lowercase() as u32)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_graphic() => write!(f, "'{c}'"),
            _ => write!(f, "key {}", self.0),
        }
    }
}

/// When an input handler fires relative to the button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Once, on the tick the button goes down.
    Pressed,
    /// Every tick the button is down, including the first.
    Held,
    /// Once, on the tick the button comes back up.
    Released,
}

impl FromStr for InputMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pressed" => Ok(Self::Pressed),
            "held" => Ok(Self::Held),
            "released" => Ok(Self::Released),
            other => Err(CoreError::UnknownInputMode(other.to_string())),
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressed => write!(f, "pressed"),
            Self::Held => write!(f, "held"),
            Self::Released => write!(f, "released"),
        }
    }
}

/// A pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

impl FromStr for MouseButton {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" | "1" => Ok(Self::Left),
            "middle" | "2" => Ok(Self::Middle),
            "right" | "3" => Ok(Self::Right),
            other => Err(CoreError::UnknownMouseButton(other.to_string())),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Middle => write!(f, "middle"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A side of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Matches whichever edge is touched.
    Any,
    /// x = 0.
    Left,
    /// x = stage width.
    Right,
    /// y = 0.
    Top,
    /// y = stage height.
    Bottom,
}

impl Edge {
    /// True if a handler declared for `self` should fire on contact with `touched`.
    pub fn matches(self, touched: Edge) -> bool {
        self == Edge::Any || self == touched
    }
}

impl FromStr for Edge {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(CoreError::UnknownEdge(other.to_string())),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

/// Progress curve for glides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Starts slow.
    EaseIn,
    /// Ends slow.
    EaseOut,
    /// Smoothstep.
    EaseInOut,
}

impl Easing {
    /// Map linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

impl FromStr for Easing {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "ease_in" => Ok(Self::EaseIn),
            "ease_out" => Ok(Self::EaseOut),
            "ease_in_out" => Ok(Self::EaseInOut),
            other => Err(CoreError::UnknownEasing(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_mode_parse() {
        assert_eq!("pressed".parse::<InputMode>(), Ok(InputMode::Pressed));
        assert_eq!("held".parse::<InputMode>(), Ok(InputMode::Held));
        assert_eq!("released".parse::<InputMode>(), Ok(InputMode::Released));
        assert_eq!(
            "tapped".parse::<InputMode>(),
            Err(CoreError::UnknownInputMode("tapped".into()))
        );
    }

    #[test]
    fn edge_matching() {
        assert!(Edge::Any.matches(Edge::Left));
        assert!(Edge::Top.matches(Edge::Top));
        assert!(!Edge::Top.matches(Edge::Bottom));
        assert!("middle".parse::<Edge>().is_err());
    }

    #[test]
    fn mouse_button_parse_accepts_numbers() {
        assert_eq!("1".parse::<MouseButton>(), Ok(MouseButton::Left));
        assert_eq!("right".parse::<MouseButton>(), Ok(MouseButton::Right));
        assert!("4".parse::<MouseButton>().is_err());
    }

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-12);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12);
        }
        assert!((Easing::EaseIn.apply(0.5) - 0.25).abs() < 1e-12);
        assert!((Easing::EaseOut.apply(0.5) - 0.75).abs() < 1e-12);
        assert_eq!("bounce".parse::<Easing>().ok(), None);
    }

    #[test]
    fn key_code_display() {
        assert_eq!(KeyCode::from_char('A').to_string(), "'a'");
        assert_eq!(KeyCode::SPACE.to_string(), "key 32");
    }
}
