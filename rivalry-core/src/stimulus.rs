use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Defines stimuli and their render data
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    /// Stable index of the pre-loaded asset this stimulus draws.
    fn cache_id(&self) -> usize;
    fn is_transition(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Percept {
    House,
    Face,
}

impl Percept {
    pub fn other(&self) -> Self {
        match self {
            Percept::House => Percept::Face,
            Percept::Face => Percept::House,
        }
    }
}

/// One of the four unambiguous images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SteadyState {
    BlueHouse,
    RedHouse,
    BlueFace,
    RedFace,
}

impl SteadyState {
    pub const ALL: [SteadyState; 4] = [
        SteadyState::BlueHouse,
        SteadyState::RedHouse,
        SteadyState::BlueFace,
        SteadyState::RedFace,
    ];

    pub fn percept(&self) -> Percept {
        match self {
            SteadyState::BlueHouse | SteadyState::RedHouse => Percept::House,
            SteadyState::BlueFace | SteadyState::RedFace => Percept::Face,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SteadyState::BlueHouse => "blue_house",
            SteadyState::RedHouse => "red_house",
            SteadyState::BlueFace => "blue_face",
            SteadyState::RedFace => "red_face",
        }
    }
}

/// Direction of a fading transition between two steady states.
///
/// Only pairings that occur inside one colour scheme exist: a blue house
/// always fades into a red face and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeDirection {
    BlueHouseToRedFace,
    RedHouseToBlueFace,
    RedFaceToBlueHouse,
    BlueFaceToRedHouse,
}

impl FadeDirection {
    pub const ALL: [FadeDirection; 4] = [
        FadeDirection::BlueHouseToRedFace,
        FadeDirection::RedHouseToBlueFace,
        FadeDirection::RedFaceToBlueHouse,
        FadeDirection::BlueFaceToRedHouse,
    ];

    pub fn between(from: SteadyState, to: SteadyState) -> Option<Self> {
        use SteadyState::*;
        match (from, to) {
            (BlueHouse, RedFace) => Some(FadeDirection::BlueHouseToRedFace),
            (RedHouse, BlueFace) => Some(FadeDirection::RedHouseToBlueFace),
            (RedFace, BlueHouse) => Some(FadeDirection::RedFaceToBlueHouse),
            (BlueFace, RedHouse) => Some(FadeDirection::BlueFaceToRedHouse),
            _ => None,
        }
    }

    pub fn from_state(&self) -> SteadyState {
        match self {
            FadeDirection::BlueHouseToRedFace => SteadyState::BlueHouse,
            FadeDirection::RedHouseToBlueFace => SteadyState::RedHouse,
            FadeDirection::RedFaceToBlueHouse => SteadyState::RedFace,
            FadeDirection::BlueFaceToRedHouse => SteadyState::BlueFace,
        }
    }

    pub fn to_state(&self) -> SteadyState {
        match self {
            FadeDirection::BlueHouseToRedFace => SteadyState::RedFace,
            FadeDirection::RedHouseToBlueFace => SteadyState::BlueFace,
            FadeDirection::RedFaceToBlueHouse => SteadyState::BlueHouse,
            FadeDirection::BlueFaceToRedHouse => SteadyState::RedHouse,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FadeDirection::BlueHouseToRedFace => "blue_house_to_red_face",
            FadeDirection::RedHouseToBlueFace => "red_house_to_blue_face",
            FadeDirection::RedFaceToBlueHouse => "red_face_to_blue_house",
            FadeDirection::BlueFaceToRedHouse => "blue_face_to_red_house",
        }
    }
}

/// Colour assignment of the two images. The rivalry stimulus shows both at
/// once; an unambiguous block alternates between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    BlueHouseRedFace,
    RedHouseBlueFace,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 2] =
        [ColorScheme::BlueHouseRedFace, ColorScheme::RedHouseBlueFace];

    pub fn steady(&self, percept: Percept) -> SteadyState {
        match (self, percept) {
            (ColorScheme::BlueHouseRedFace, Percept::House) => SteadyState::BlueHouse,
            (ColorScheme::BlueHouseRedFace, Percept::Face) => SteadyState::RedFace,
            (ColorScheme::RedHouseBlueFace, Percept::House) => SteadyState::RedHouse,
            (ColorScheme::RedHouseBlueFace, Percept::Face) => SteadyState::BlueFace,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ColorScheme::BlueHouseRedFace => "blue_house_red_face",
            ColorScheme::RedHouseBlueFace => "red_house_blue_face",
        }
    }
}

/// Selects the asset drawn for a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorCombination {
    Rivalry(ColorScheme),
    Steady(SteadyState),
    Fade(FadeDirection),
    Break,
}

impl ColorCombination {
    /// Asset basename, also used as the textual form in logs.
    pub fn asset_name(&self) -> String {
        match self {
            ColorCombination::Rivalry(scheme) => format!("rivalry_{}", scheme.name()),
            ColorCombination::Steady(state) => state.name().to_string(),
            ColorCombination::Fade(direction) => format!("fade_{}", direction.name()),
            ColorCombination::Break => "break".to_string(),
        }
    }
}

impl Stimulus for ColorCombination {
    fn cache_id(&self) -> usize {
        match self {
            ColorCombination::Rivalry(scheme) => *scheme as usize,
            ColorCombination::Steady(state) => 2 + *state as usize,
            ColorCombination::Fade(direction) => 6 + *direction as usize,
            ColorCombination::Break => 10,
        }
    }

    fn is_transition(&self) -> bool {
        matches!(self, ColorCombination::Fade(_))
    }
}

impl fmt::Display for ColorCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.asset_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColorCombination(pub String);

impl fmt::Display for UnknownColorCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color combination `{}`", self.0)
    }
}

impl std::error::Error for UnknownColorCombination {}

impl FromStr for ColorCombination {
    type Err = UnknownColorCombination;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "break" {
            return Ok(ColorCombination::Break);
        }
        if let Some(rest) = s.strip_prefix("rivalry_") {
            return ColorScheme::ALL
                .into_iter()
                .find(|scheme| scheme.name() == rest)
                .map(ColorCombination::Rivalry)
                .ok_or_else(|| UnknownColorCombination(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix("fade_") {
            return FadeDirection::ALL
                .into_iter()
                .find(|direction| direction.name() == rest)
                .map(ColorCombination::Fade)
                .ok_or_else(|| UnknownColorCombination(s.to_string()));
        }
        SteadyState::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .map(ColorCombination::Steady)
            .ok_or_else(|| UnknownColorCombination(s.to_string()))
    }
}

impl Serialize for ColorCombination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.asset_name())
    }
}

impl<'de> Deserialize<'de> for ColorCombination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
