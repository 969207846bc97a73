//! Padded, immutable grid models.
//!
//! A [`GridModel`] owns one or more named 2-D layers (rows are latitude,
//! columns are longitude) and the axes that index them. The axes are padded at
//! construction so that every valid query falls strictly inside them:
//!
//! - longitude wraps around: one column is copied from the opposite edge with
//!   its axis value shifted by a full cycle;
//! - latitude is duplicated: the polar rows are repeated with the axis value
//!   extrapolated by the edge spacing.
//!
//! Once built a model never changes, so it can be shared behind an `Arc` and
//! read from any number of threads.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::coords::{LonConvention, FULL_CYCLE};
use crate::error::{RedPlanetError, Result};

/// Value standing in for "measurement undefined at this location".
///
/// This exact bit pattern is part of the public contract: callers compare
/// results against it with `==`.
pub const NANVAL: f64 = -1e10;

/// Tolerance used when deciding whether a raw longitude axis already closes the cycle
const SEAM_TOLERANCE: f64 = 1e-9;

/// Possible metadata attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

/// Borrowed view of one padded layer together with its axes
#[derive(Debug, Clone, Copy)]
pub struct LayerView<'a> {
    pub name: &'a str,
    pub values: ArrayView2<'a, f64>,
    pub lon_axis: &'a [f64],
    pub lat_axis: &'a [f64],
}

/// Serializable overview of a grid model
#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub layers: Vec<String>,
    pub lon_convention: LonConvention,
    pub cyclic: bool,
    pub lon_points: usize,
    pub lat_points: usize,
    pub lon_extent: (f64, f64),
    pub lat_extent: (f64, f64),
    pub nan_sentinel: f64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Immutable padded grid with named layers
#[derive(Debug, Clone)]
pub struct GridModel {
    lon_axis: Vec<f64>,
    lat_axis: Vec<f64>,
    layers: HashMap<String, Array2<f64>>,
    metadata: HashMap<String, AttributeValue>,
    nan_sentinel: f64,
    lon_convention: LonConvention,
    cyclic: bool,
}

impl GridModel {
    /// Start building a model from raw (unpadded) axes
    pub fn builder(raw_lon_axis: Vec<f64>, raw_lat_axis: Vec<f64>) -> GridModelBuilder {
        GridModelBuilder::new(raw_lon_axis, raw_lat_axis)
    }

    /// Pad raw axes and layers into a model with default options
    ///
    /// Every layer must have shape `(raw_lat_axis.len(), raw_lon_axis.len())`.
    pub fn build(
        raw_lon_axis: Vec<f64>,
        raw_lat_axis: Vec<f64>,
        raw_layers: impl IntoIterator<Item = (String, Array2<f64>)>,
        cyclic: bool,
    ) -> Result<Self> {
        raw_layers
            .into_iter()
            .fold(
                Self::builder(raw_lon_axis, raw_lat_axis).cyclic(cyclic),
                |builder, (name, values)| builder.layer(name, values),
            )
            .build()
    }

    /// Get a layer with its axes
    pub fn layer(&self, name: &str) -> Result<LayerView<'_>> {
        let (name, values) =
            self.layers
                .get_key_value(name)
                .ok_or_else(|| RedPlanetError::UnknownLayer {
                    name: name.to_string(),
                })?;

        Ok(LayerView {
            name,
            values: values.view(),
            lon_axis: &self.lon_axis,
            lat_axis: &self.lat_axis,
        })
    }

    /// Check if a layer exists
    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Layer names in sorted order
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Padded longitude axis
    pub fn lon_axis(&self) -> &[f64] {
        &self.lon_axis
    }

    /// Padded latitude axis
    pub fn lat_axis(&self) -> &[f64] {
        &self.lat_axis
    }

    pub fn metadata(&self) -> &HashMap<String, AttributeValue> {
        &self.metadata
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.metadata.get(name)
    }

    /// Get a numeric attribute with error handling
    pub fn number_attribute(&self, name: &str) -> Result<f64> {
        match self.metadata.get(name) {
            Some(AttributeValue::Number(value)) => Ok(*value),
            Some(other) => Err(RedPlanetError::DataShape {
                message: format!("Attribute {} is not a number: {:?}", name, other),
            }),
            None => Err(RedPlanetError::DataShape {
                message: format!("Missing attribute: {}", name),
            }),
        }
    }

    /// Get a text attribute, if present and textual
    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        match self.metadata.get(name) {
            Some(AttributeValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn nan_sentinel(&self) -> f64 {
        self.nan_sentinel
    }

    /// Exact comparison against the sentinel
    pub fn is_sentinel(&self, value: f64) -> bool {
        value == self.nan_sentinel
    }

    pub fn lon_convention(&self) -> LonConvention {
        self.lon_convention
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// Approximate memory held by the layers and axes, in bytes
    pub fn memory_usage(&self) -> usize {
        let cells: usize = self.layers.values().map(|layer| layer.len()).sum();
        (cells + self.lon_axis.len() + self.lat_axis.len()) * std::mem::size_of::<f64>()
    }

    pub fn summary(&self) -> GridSummary {
        GridSummary {
            layers: self.layer_names(),
            lon_convention: self.lon_convention,
            cyclic: self.cyclic,
            lon_points: self.lon_axis.len(),
            lat_points: self.lat_axis.len(),
            lon_extent: (self.lon_axis[0], self.lon_axis[self.lon_axis.len() - 1]),
            lat_extent: (self.lat_axis[0], self.lat_axis[self.lat_axis.len() - 1]),
            nan_sentinel: self.nan_sentinel,
            attributes: self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Builder that validates raw arrays and pads them into a [`GridModel`]
#[derive(Debug, Clone)]
pub struct GridModelBuilder {
    raw_lon_axis: Vec<f64>,
    raw_lat_axis: Vec<f64>,
    layers: Vec<(String, Array2<f64>)>,
    metadata: HashMap<String, AttributeValue>,
    cyclic: bool,
    pad_latitude: bool,
    nan_sentinel: f64,
}

impl GridModelBuilder {
    pub fn new(raw_lon_axis: Vec<f64>, raw_lat_axis: Vec<f64>) -> Self {
        Self {
            raw_lon_axis,
            raw_lat_axis,
            layers: Vec::new(),
            metadata: HashMap::new(),
            cyclic: true,
            pad_latitude: true,
            nan_sentinel: NANVAL,
        }
    }

    /// Whether longitude wraps around (default: true)
    pub fn cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }

    /// Whether to duplicate the polar rows (default: true)
    pub fn pad_latitude(mut self, pad: bool) -> Self {
        self.pad_latitude = pad;
        self
    }

    pub fn sentinel(mut self, sentinel: f64) -> Self {
        self.nan_sentinel = sentinel;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: HashMap<String, AttributeValue>) -> Self {
        self.metadata.extend(attributes);
        self
    }

    /// Add a raw layer of shape `(lat, lon)`
    pub fn layer(mut self, name: impl Into<String>, values: Array2<f64>) -> Self {
        self.layers.push((name.into(), values));
        self
    }

    /// Validate and pad everything
    pub fn build(self) -> Result<GridModel> {
        check_axis("longitude", &self.raw_lon_axis)?;
        check_axis("latitude", &self.raw_lat_axis)?;

        if self.layers.is_empty() {
            return Err(RedPlanetError::DataShape {
                message: "Grid model needs at least one layer".to_string(),
            });
        }

        let expected = (self.raw_lat_axis.len(), self.raw_lon_axis.len());
        let mut seen = HashSet::new();
        for (name, values) in &self.layers {
            if values.dim() != expected {
                return Err(RedPlanetError::DataShape {
                    message: format!(
                        "Layer {} has shape {:?}, expected (lat, lon) = {:?}",
                        name,
                        values.dim(),
                        expected
                    ),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(RedPlanetError::DataShape {
                    message: format!("Layer {} given more than once", name),
                });
            }
        }

        let lon_convention = LonConvention::infer(&self.raw_lon_axis);
        let (lon_axis, col_map) = if self.cyclic {
            wrap_longitude(&self.raw_lon_axis)?
        } else {
            identity_padding(&self.raw_lon_axis)
        };
        let (lat_axis, row_map) = if self.pad_latitude {
            duplicate_edges(&self.raw_lat_axis)
        } else {
            identity_padding(&self.raw_lat_axis)
        };

        check_axis("padded longitude", &lon_axis)?;
        check_axis("padded latitude", &lat_axis)?;

        let sentinel = self.nan_sentinel;
        let layers = self
            .layers
            .into_iter()
            .map(|(name, raw)| {
                let padded = Array2::from_shape_fn((row_map.len(), col_map.len()), |(r, c)| {
                    let value = raw[[row_map[r], col_map[c]]];
                    if value.is_finite() {
                        value
                    } else {
                        sentinel
                    }
                });
                (name, padded)
            })
            .collect();

        Ok(GridModel {
            lon_axis,
            lat_axis,
            layers,
            metadata: self.metadata,
            nan_sentinel: sentinel,
            lon_convention,
            cyclic: self.cyclic,
        })
    }
}

/// Axes must be finite, strictly increasing, and have at least two points
fn check_axis(label: &str, axis: &[f64]) -> Result<()> {
    if axis.len() < 2 {
        return Err(RedPlanetError::DataShape {
            message: format!("{} axis needs at least 2 points, got {}", label, axis.len()),
        });
    }

    if let Some(bad) = axis.iter().find(|v| !v.is_finite()) {
        return Err(RedPlanetError::DataShape {
            message: format!("{} axis contains non-finite value {}", label, bad),
        });
    }

    if let Some(i) = axis.windows(2).position(|w| w[0] >= w[1]) {
        return Err(RedPlanetError::DataShape {
            message: format!(
                "{} axis is not strictly increasing at index {} ({} >= {})",
                label,
                i,
                axis[i],
                axis[i + 1]
            ),
        });
    }

    Ok(())
}

fn identity_padding(axis: &[f64]) -> (Vec<f64>, Vec<usize>) {
    (axis.to_vec(), (0..axis.len()).collect())
}

/// Pad a longitude axis with one wrapped column on each side.
///
/// Returns the padded axis and, for each padded column, the raw column it
/// copies.
fn wrap_longitude(axis: &[f64]) -> Result<(Vec<f64>, Vec<usize>)> {
    let n = axis.len();
    let span = axis[n - 1] - axis[0];

    if span > FULL_CYCLE + SEAM_TOLERANCE {
        return Err(RedPlanetError::DataShape {
            message: format!(
                "Cyclic longitude axis spans {} degrees, more than a full cycle",
                span
            ),
        });
    }

    // A closed axis repeats the seam column; wrap from its inner neighbours instead
    let closed = (span - FULL_CYCLE).abs() <= SEAM_TOLERANCE;
    if closed && n < 3 {
        return Err(RedPlanetError::DataShape {
            message: "Closed longitude axis needs at least 3 points".to_string(),
        });
    }
    let (left_src, right_src) = if closed { (n - 2, 1) } else { (n - 1, 0) };

    let mut padded = Vec::with_capacity(n + 2);
    padded.push(axis[left_src] - FULL_CYCLE);
    padded.extend_from_slice(axis);
    padded.push(axis[right_src] + FULL_CYCLE);

    let mut cols = Vec::with_capacity(n + 2);
    cols.push(left_src);
    cols.extend(0..n);
    cols.push(right_src);

    Ok((padded, cols))
}

/// Pad a latitude axis by repeating the edge rows
fn duplicate_edges(axis: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = axis.len();
    let below = axis[0] - (axis[1] - axis[0]);
    let above = axis[n - 1] + (axis[n - 1] - axis[n - 2]);

    let mut padded = Vec::with_capacity(n + 2);
    padded.push(below);
    padded.extend_from_slice(axis);
    padded.push(above);

    let mut rows = Vec::with_capacity(n + 2);
    rows.push(0);
    rows.extend(0..n);
    rows.push(n - 1);

    (padded, rows)
}
