pub mod key;
pub mod stage;
pub mod stimulus;
pub mod trial;

pub use key::Key;
pub use stage::SessionStage;
pub use stimulus::{ColorCombination, ColorScheme, FadeDirection, Percept, SteadyState, Stimulus};
pub use trial::{BlockType, DurationUnit, TrialSpec, TrialType};
