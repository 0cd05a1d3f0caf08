//! Vector feature tables: a layer is an ordered attribute schema, a CRS tag,
//! and a list of features.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::Crs;

/// Geometry type used across all rivergeo crates
pub type Geometry = geo::Geometry<f64>;

/// Name of a geometry variant, for messages
pub fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Attribute values keyed by field name
pub type Attributes = HashMap<String, AttributeValue>;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// ISO 8601 date (`YYYY-MM-DD`)
    Date(String),
    Null,
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Text(s) | AttributeValue::Date(s) => serde_json::Value::String(s.clone()),
            AttributeValue::Integer(i) => serde_json::Value::Number((*i).into()),
            AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Boolean(b) => serde_json::Value::Bool(*b),
            AttributeValue::Null => serde_json::Value::Null,
        }
    }

    /// Convert from a JSON value. Nested arrays and objects are kept as JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => n.as_f64().map(AttributeValue::Number).unwrap_or(AttributeValue::Null),
            },
            serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
            other => AttributeValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) | AttributeValue::Date(s) => write!(f, "{}", s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Null => Ok(()),
        }
    }
}

/// dBase-style field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Character,
    Numeric,
    Float,
    Integer,
    Double,
    Logical,
    Date,
}

/// Attribute column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub length: u8,
    pub decimals: u8,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind, length: u8, decimals: u8) -> Self {
        Self { name: name.into(), kind, length, decimals }
    }

    pub fn character(name: impl Into<String>, length: u8) -> Self {
        Self::new(name, FieldKind::Character, length, 0)
    }

    pub fn numeric(name: impl Into<String>, length: u8, decimals: u8) -> Self {
        Self::new(name, FieldKind::Numeric, length, decimals)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer, 4, 0)
    }

    /// Guess a field definition from a sample value
    pub fn infer(name: impl Into<String>, value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Integer(_) => Self::numeric(name, 18, 0),
            AttributeValue::Number(_) => Self::numeric(name, 24, 15),
            AttributeValue::Boolean(_) => Self::new(name, FieldKind::Logical, 1, 0),
            AttributeValue::Date(_) => Self::new(name, FieldKind::Date, 8, 0),
            AttributeValue::Text(_) | AttributeValue::Null => Self::character(name, 254),
        }
    }
}

/// A feature: optional geometry plus attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self { geometry: Some(geometry.into()), attributes: Attributes::new() }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// A feature table with a CRS tag
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub crs: Option<Crs>,
    pub fields: Vec<FieldDef>,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(name: impl Into<String>, crs: Option<Crs>) -> Self {
        Self { name: name.into(), crs, fields: Vec::new(), features: Vec::new() }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Geometry of the feature at `index`, if both exist
    pub fn geometry(&self, index: usize) -> Option<&Geometry> {
        self.features.get(index).and_then(|f| f.geometry.as_ref())
    }

    /// The declared schema followed by definitions inferred for attributes
    /// that appear on features but not in the schema
    pub fn effective_fields(&self) -> Vec<FieldDef> {
        let mut fields = self.fields.clone();
        let mut names: Vec<String> = Vec::new();
        for feature in &self.features {
            let mut keys: Vec<&String> = feature.attributes.keys().collect();
            keys.sort();
            for key in keys {
                if !self.has_field(key) && !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        for name in names {
            let sample = self
                .features
                .iter()
                .filter_map(|f| f.attributes.get(&name))
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(AttributeValue::Null);
            fields.push(FieldDef::infer(name, &sample));
        }
        fields
    }

    /// Extend the schema with inferred definitions, see [`Layer::effective_fields`]
    pub fn complete_schema(&mut self) {
        self.fields = self.effective_fields();
    }
}
