use std::{collections::HashMap, num::ParseIntError};

use bevy_derive::{Deref, DerefMut};
use serde::Serialize;

/// A `#define` colour, the value is the packed EuroScope colour number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub name: String,
    pub value: u32,
}

impl Color {
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// `(value & 0xff, value >> 8 & 0xff, value >> 16)`, the last component
    /// is not masked.
    pub fn to_rgb(&self) -> (u32, u32, u32) {
        (self.value & 0xff, (self.value >> 8) & 0xff, self.value >> 16)
    }
}

/// Colour defines keyed by lowercased name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deref, DerefMut)]
pub struct ColorTable(pub HashMap<String, Color>);

impl ColorTable {
    /// Registers `name`, silently replacing an earlier define of the same
    /// (case-insensitive) name.
    pub fn define(&mut self, name: &str, value: &str) -> Result<(), ParseIntError> {
        let value = value.parse()?;
        self.0.insert(name.to_lowercase(), Color::new(name, value));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Color> {
        self.0.get(&name.to_lowercase())
    }
}
