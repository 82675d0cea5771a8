use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use string_cache::DefaultAtom as Atom;

/// Identity of a keyboard key as reported by the presentation framework,
/// e.g. `"space"`, `"escape"`, `"j"`.
///
/// Names are normalised to lower case and interned, so comparing two keys
/// on the response path is a pointer comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Atom);

impl Key {
    pub fn new(name: &str) -> Self {
        Key(Atom::from(name.trim().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Key::new(&name))
    }
}
