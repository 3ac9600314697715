//! Free-form objects placed on object layers

use crate::{Gid, Properties, Value};
use serde::{Deserialize, Serialize};

/// An object placed on an object layer (spawn point, trigger zone, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MapObject {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// `type` attribute (`class` in newer editor versions)
    #[serde(default)]
    pub class: String,
    /// Position in pixels
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Set for tile objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<Gid>,
    pub visible: bool,
    #[serde(default)]
    pub properties: Properties,
}

impl MapObject {
    /// Create a new visible object at a position
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            visible: true,
            ..Default::default()
        }
    }

    /// Classification tag: the type if set, the name otherwise
    pub fn tag(&self) -> &str {
        if self.class.is_empty() {
            &self.name
        } else {
            &self.class
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Get a string property
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_string())
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}
