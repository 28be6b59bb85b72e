//! External binding configuration format.
//!
//! A configuration maps each description to either a single binding spec or
//! an ordered list of specs (one logical action bound to several physical
//! inputs across devices). The format is deliberately loose: specs naming a
//! device with no registered handler are stored but never read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-specific identifier of a raw input.
///
/// Keyboards use numeric key codes, pointer buttons use numeric indices,
/// gamepads and speech use string tokens (`button-2`, `axis-1`, a spoken
/// transcript). The untagged representation mirrors the wire format, where
/// an id is simply a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputId {
    Index(u32),
    Token(String),
}

impl InputId {
    pub fn token(token: impl Into<String>) -> Self {
        InputId::Token(token.into())
    }

    /// Gamepad button id for a numeric button slot.
    pub fn button(index: usize) -> Self {
        InputId::Token(format!("button-{index}"))
    }

    /// Gamepad axis id for a numeric axis slot.
    pub fn axis(index: usize) -> Self {
        InputId::Token(format!("axis-{index}"))
    }
}

impl From<u32> for InputId {
    fn from(index: u32) -> Self {
        InputId::Index(index)
    }
}

impl From<&str> for InputId {
    fn from(token: &str) -> Self {
        InputId::Token(token.to_string())
    }
}

impl From<String> for InputId {
    fn from(token: String) -> Self {
        InputId::Token(token)
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputId::Index(index) => write!(f, "{index}"),
            InputId::Token(token) => write!(f, "{token}"),
        }
    }
}

/// One physical input bound to a description.
///
/// The edge flags default to false when absent; `down`/`up` select which
/// button edges write into the state, `invert` negates analog values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSpec {
    pub device: String,
    pub input_id: InputId,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub invert: bool,
}

impl BindingSpec {
    pub fn new(device: impl Into<String>, input_id: impl Into<InputId>) -> Self {
        Self {
            device: device.into(),
            input_id: input_id.into(),
            down: false,
            up: false,
            invert: false,
        }
    }

    pub fn down(mut self) -> Self {
        self.down = true;
        self
    }

    pub fn up(mut self) -> Self {
        self.up = true;
        self
    }

    pub fn invert(mut self) -> Self {
        self.invert = true;
        self
    }
}

/// One spec or a fan-out list of specs for a single description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSlot {
    Single(BindingSpec),
    Multiple(Vec<BindingSpec>),
}

impl BindingSlot {
    pub fn specs(&self) -> &[BindingSpec] {
        match self {
            BindingSlot::Single(spec) => std::slice::from_ref(spec),
            BindingSlot::Multiple(specs) => specs,
        }
    }

    fn push(&mut self, spec: BindingSpec) {
        match self {
            BindingSlot::Single(existing) => {
                *self = BindingSlot::Multiple(vec![existing.clone(), spec]);
            }
            BindingSlot::Multiple(specs) => specs.push(spec),
        }
    }
}

impl From<BindingSpec> for BindingSlot {
    fn from(spec: BindingSpec) -> Self {
        BindingSlot::Single(spec)
    }
}

impl From<Vec<BindingSpec>> for BindingSlot {
    fn from(specs: Vec<BindingSpec>) -> Self {
        BindingSlot::Multiple(specs)
    }
}

/// Full binding configuration: description to spec(s).
///
/// Entries keep their declaration order, so when two descriptions bind the
/// same physical input the later declaration wins in the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingsConfig {
    entries: Vec<(String, BindingSlot)>,
}

impl BindingsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spec for a description, fanning out when one already exists.
    pub fn bind(&mut self, description: impl Into<String>, spec: BindingSpec) -> &mut Self {
        let description = description.into();
        match self.entries.iter_mut().find(|(d, _)| *d == description) {
            Some((_, slot)) => slot.push(spec),
            None => self.entries.push((description, BindingSlot::Single(spec))),
        }
        self
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingSlot)> {
        self.entries.iter().map(|(d, slot)| (d.as_str(), slot))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, BindingSlot)> for BindingsConfig {
    fn from_iter<T: IntoIterator<Item = (String, BindingSlot)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for BindingsConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConfigVisitor;

        impl<'de> serde::de::Visitor<'de> for ConfigVisitor {
            type Value = BindingsConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from description to binding spec(s)")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((description, slot)) = access.next_entry()? {
                    entries.push((description, slot));
                }
                Ok(BindingsConfig { entries })
            }
        }

        deserializer.deserialize_map(ConfigVisitor)
    }
}
