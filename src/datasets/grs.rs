//! GRS element concentration grids.
//!
//! Surface concentrations of nine elements measured by the Mars Odyssey Gamma
//! Ray Spectrometer on a 5 degree grid, each with a concentration and a
//! one-sigma uncertainty layer. Raw tables come in ppm (Th) or weight percent
//! (everything else) with `9999.999` marking cells without a measurement; they
//! are stored as fractions out of one with the sentinel in place of the marker.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{unknown_quantity, Dataset, DatasetHandle, DatasetInfo};
use crate::coords::CoordRange;
use crate::data_loader::RawGrid;
use crate::derived::{self, DerivedQuantityEngine, Sentinel};
use crate::error::{RedPlanetError, Result};
use crate::grid::{GridModel, NANVAL};
use crate::query::QueryOptions;

/// Marker for missing cells in the raw tables
pub const MISSING_MARKER: f64 = 9999.999;

/// Layer holding `cl + h2o + s`
pub const VOLATILE_SUM_LAYER: &str = "cl+h2o+s";

/// Quantity names, with `:sigma` selecting the uncertainty layer
pub const QUANTITIES: &[&str] = &["al", "ca", "cl", "fe", "h2o", "k", "si", "s", "th"];

/// GRS elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Al,
    Ca,
    Cl,
    Fe,
    H2o,
    K,
    Si,
    S,
    Th,
}

impl Element {
    pub const ALL: [Element; 9] = [
        Element::Al,
        Element::Ca,
        Element::Cl,
        Element::Fe,
        Element::H2o,
        Element::K,
        Element::Si,
        Element::S,
        Element::Th,
    ];

    /// Elements excluded by volatile-free normalization
    pub const VOLATILES: [Element; 3] = [Element::Cl, Element::H2o, Element::S];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Al => "al",
            Element::Ca => "ca",
            Element::Cl => "cl",
            Element::Fe => "fe",
            Element::H2o => "h2o",
            Element::K => "k",
            Element::Si => "si",
            Element::S => "s",
            Element::Th => "th",
        }
    }

    pub fn is_volatile(&self) -> bool {
        Self::VOLATILES.contains(self)
    }

    /// Factor converting raw table units to a fraction out of one
    pub fn scale_factor(&self) -> f64 {
        match self {
            // ppm
            Element::Th => 1e-6,
            // weight percent
            _ => 0.01,
        }
    }

    fn volatile_names() -> [&'static str; 3] {
        Self::VOLATILES.map(|e| e.as_str())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Element {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Element::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or_else(|| unknown_quantity(DatasetHandle::Grs, s))
    }
}

/// Which of the two per-element layers to read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    #[default]
    Concentration,
    Sigma,
}

impl Measure {
    /// Name of the layer holding this measure for a base name
    pub fn layer_name(&self, base: &str) -> String {
        match self {
            Measure::Concentration => base.to_string(),
            Measure::Sigma => format!("{}:sigma", base),
        }
    }
}

/// Parsed GRS quantity, e.g. `"th"` or `"th:sigma"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrsQuantity {
    pub element: Element,
    pub measure: Measure,
}

impl GrsQuantity {
    pub fn layer_name(&self) -> String {
        self.measure.layer_name(self.element.as_str())
    }
}

impl FromStr for GrsQuantity {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (element, measure) = match s.split_once(':') {
            None => (s, Measure::Concentration),
            Some((element, measure)) => {
                let measure = match measure.to_lowercase().as_str() {
                    "concentration" => Measure::Concentration,
                    "sigma" => Measure::Sigma,
                    _ => return Err(unknown_quantity(DatasetHandle::Grs, s)),
                };
                (element, measure)
            }
        };

        Ok(Self {
            element: element.parse()?,
            measure,
        })
    }
}

/// GRS grids with the precomputed volatile sum
#[derive(Debug, Clone)]
pub struct GrsDataset {
    model: Arc<GridModel>,
}

impl GrsDataset {
    /// Build from raw tables in their native units
    ///
    /// Layers are named after the element (`"th"`) with an optional
    /// `"th:sigma"` companion. Unknown layer names are skipped.
    pub fn from_raw(mut raw: RawGrid) -> Result<Self> {
        let grid_spacing = raw.lon.get(1).zip(raw.lon.first()).map(|(b, a)| b - a);
        let mut builder = GridModel::builder(raw.lon.clone(), raw.lat.clone())
            .cyclic(raw.cyclic)
            .attributes(std::mem::take(&mut raw.attributes))
            .attribute("units", "concentration out of 1");
        if let Some(spacing) = grid_spacing {
            builder = builder.attribute("grid_spacing", spacing);
        }

        let mut loaded = 0;
        for measure in [Measure::Concentration, Measure::Sigma] {
            let mut volatiles = Vec::with_capacity(3);

            for element in Element::ALL {
                let name = measure.layer_name(element.as_str());
                let Some(values) = raw.layers.remove(&name) else {
                    continue;
                };
                let scaled = scale_raw(values, element.scale_factor());
                if element.is_volatile() {
                    volatiles.push(scaled.clone());
                }
                builder = builder.layer(name, scaled);
                loaded += 1;
            }

            if volatiles.len() == Element::VOLATILES.len() {
                let sum = volatile_sum(&volatiles[0], &volatiles[1], &volatiles[2])?;
                builder = builder.layer(measure.layer_name(VOLATILE_SUM_LAYER), sum);
            } else if measure == Measure::Concentration {
                warn!(
                    found = volatiles.len(),
                    "GRS data is missing volatile elements; normalization is unavailable"
                );
            }
        }

        for name in raw.layers.keys() {
            warn!(layer = %name, "Skipping unrecognized GRS layer");
        }

        if loaded == 0 {
            return Err(RedPlanetError::DataShape {
                message: "GRS data contains no element layers".to_string(),
            });
        }

        debug!(layers = loaded, "Built GRS grid model");
        Ok(Self {
            model: Arc::new(builder.build()?),
        })
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    /// Concentration of `element`, optionally volatile-free
    pub fn concentration(
        &self,
        element: Element,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64> {
        self.evaluate(
            GrsQuantity {
                element,
                measure: Measure::Concentration,
            },
            lon,
            lat,
            options,
        )
    }
}

impl Dataset for GrsDataset {
    type Quantity = GrsQuantity;

    fn handle(&self) -> DatasetHandle {
        DatasetHandle::Grs
    }

    fn lon_range(&self) -> CoordRange {
        CoordRange::ANY_LON
    }

    fn evaluate(
        &self,
        quantity: GrsQuantity,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64> {
        let engine = DerivedQuantityEngine::new(Arc::clone(&self.model), options.method);
        let sentinel = engine.sentinel();
        let layer = quantity.layer_name();

        let value = if options.normalize {
            let volatiles = Element::volatile_names();
            derived::ensure_not_volatile(quantity.element.as_str(), &volatiles)?;
            engine.volatile_free(
                &layer,
                &quantity.measure.layer_name(VOLATILE_SUM_LAYER),
                &volatiles,
                lon,
                lat,
            )?
        } else {
            engine.value(&layer, lon, lat)?
        };

        Ok(non_negative(value, sentinel))
    }

    fn info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset: DatasetHandle::Grs,
            quantities: QUANTITIES.to_vec(),
            lon_range: self.lon_range(),
            lat_range: self.lat_range(),
            grid: Some(self.model.summary()),
            model: None,
        }
    }
}

/// Concentrations are never negative; a negative value means "undefined"
fn non_negative(value: f64, sentinel: Sentinel) -> f64 {
    if value < 0.0 {
        sentinel.value()
    } else {
        value
    }
}

/// Exact match: the marker is written as `9999.999` and parses to this same value
fn is_missing(value: f64) -> bool {
    !value.is_finite() || value == MISSING_MARKER
}

fn scale_raw(mut values: Array2<f64>, factor: f64) -> Array2<f64> {
    values.mapv_inplace(|v| if is_missing(v) { NANVAL } else { v * factor });
    values
}

/// Cell-wise `cl + h2o + s`, undefined unless all three are defined
fn volatile_sum(cl: &Array2<f64>, h2o: &Array2<f64>, s: &Array2<f64>) -> Result<Array2<f64>> {
    if cl.dim() != h2o.dim() || cl.dim() != s.dim() {
        return Err(RedPlanetError::DataShape {
            message: format!(
                "Volatile layers differ in shape: {:?}, {:?}, {:?}",
                cl.dim(),
                h2o.dim(),
                s.dim()
            ),
        });
    }

    let sentinel = Sentinel(NANVAL);
    Ok(Zip::from(cl).and(h2o).and(s).map_collect(|&a, &b, &c| {
        let sum = sentinel.guard(&[a, b, c], || a + b + c);
        non_negative(sum, sentinel)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::InterpolationMethod;

    /// Two-by-two raw tables on a coarse grid, constant per element
    fn raw_tables(th_ppm: f64, k_wt: f64, cl: f64, h2o: f64, s: f64) -> RawGrid {
        let lon = vec![-135.0, -45.0, 45.0, 135.0];
        let lat = vec![-45.0, 45.0];
        let filled = |v: f64| Array2::from_elem((2, 4), v);
        RawGrid::new(lon, lat)
            .with_layer("th", filled(th_ppm))
            .with_layer("th:sigma", filled(0.1 * th_ppm))
            .with_layer("k", filled(k_wt))
            .with_layer("cl", filled(cl))
            .with_layer("h2o", filled(h2o))
            .with_layer("s", filled(s))
    }

    fn options(method: InterpolationMethod, normalize: bool) -> QueryOptions {
        QueryOptions {
            method,
            normalize,
            ..QueryOptions::default()
        }
    }

    #[test]
    fn test_quantity_parsing() {
        let q: GrsQuantity = "th".parse().unwrap();
        assert_eq!(q.element, Element::Th);
        assert_eq!(q.measure, Measure::Concentration);
        assert_eq!(q.layer_name(), "th");

        let q: GrsQuantity = "H2O:sigma".parse().unwrap();
        assert_eq!(q.element, Element::H2o);
        assert_eq!(q.layer_name(), "h2o:sigma");

        assert!(matches!(
            "u".parse::<GrsQuantity>(),
            Err(RedPlanetError::UnknownQuantity { .. })
        ));
        assert!("th:mean".parse::<GrsQuantity>().is_err());
    }

    #[test]
    fn test_unit_scaling() {
        let grs = GrsDataset::from_raw(raw_tables(2.0, 0.3, 0.5, 4.0, 5.0)).unwrap();
        let opts = options(InterpolationMethod::Linear, false);

        let th = grs.evaluate("th".parse().unwrap(), 0.0, 0.0, &opts).unwrap();
        assert!((th - 2e-6).abs() < 1e-18);

        let k = grs.evaluate("k".parse().unwrap(), 0.0, 0.0, &opts).unwrap();
        assert!((k - 0.003).abs() < 1e-15);

        let sum = grs.model().layer(VOLATILE_SUM_LAYER).unwrap().values[[1, 1]];
        assert!((sum - 0.095).abs() < 1e-12);
        assert!(!grs.model().has_layer("cl+h2o+s:sigma"));
    }

    #[test]
    fn test_volatile_free_normalization() {
        // cl + h2o + s = 20 wt%
        let grs = GrsDataset::from_raw(raw_tables(2.0, 10.0, 5.0, 10.0, 5.0)).unwrap();
        let opts = options(InterpolationMethod::Nearest, true);

        let k = grs.evaluate("k".parse().unwrap(), 10.0, 10.0, &opts).unwrap();
        assert!((k - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_normalizing_volatile_is_rejected() {
        let grs = GrsDataset::from_raw(raw_tables(2.0, 10.0, 5.0, 10.0, 5.0)).unwrap();
        let opts = options(InterpolationMethod::Linear, true);
        for name in ["cl", "h2o", "s", "s:sigma"] {
            let result = grs.evaluate(name.parse().unwrap(), 0.0, 0.0, &opts);
            assert!(
                matches!(result, Err(RedPlanetError::InvalidOperation { .. })),
                "{} should not normalize",
                name
            );
        }
    }

    #[test]
    fn test_missing_marker_becomes_sentinel() {
        let mut raw = raw_tables(2.0, 10.0, 5.0, 10.0, 5.0);
        raw.layers.get_mut("cl").unwrap()[[0, 0]] = MISSING_MARKER;
        raw.layers.get_mut("th").unwrap()[[0, 0]] = MISSING_MARKER;
        let grs = GrsDataset::from_raw(raw).unwrap();

        let sum = grs.model().layer(VOLATILE_SUM_LAYER).unwrap();
        // Padded index (1, 1) is raw (0, 0)
        assert_eq!(sum.values[[1, 1]], NANVAL);
        assert_ne!(sum.values[[1, 2]], NANVAL);

        // Nearest to raw cell (0, 0) at (-135, -45)
        let opts = options(InterpolationMethod::Nearest, false);
        let th = grs.evaluate("th".parse().unwrap(), -135.0, -45.0, &opts).unwrap();
        assert_eq!(th, NANVAL);

        // The undefined volatile sum poisons normalization of k there
        let opts = options(InterpolationMethod::Nearest, true);
        let k = grs.evaluate("k".parse().unwrap(), -135.0, -45.0, &opts).unwrap();
        assert_eq!(k, NANVAL);
    }

    #[test]
    fn test_missing_marker_matches_exactly() {
        let parsed: f64 = serde_json::from_str("9999.999").unwrap();
        assert!(is_missing(parsed));
        assert!(is_missing(f64::NAN));
        assert!(!is_missing(9999.9991));
        assert!(!is_missing(9999.998_999_9));

        let mut raw = raw_tables(2.0, 10.0, 5.0, 10.0, 5.0);
        raw.layers.get_mut("th").unwrap()[[0, 0]] = 9999.9991;
        let grs = GrsDataset::from_raw(raw).unwrap();
        let opts = options(InterpolationMethod::Nearest, false);
        let th = grs.evaluate("th".parse().unwrap(), -135.0, -45.0, &opts).unwrap();
        assert!((th - 9999.9991e-6).abs() < 1e-12);
    }

    #[test]
    fn test_negative_values_become_sentinel() {
        let grs = GrsDataset::from_raw(raw_tables(-1.0, 10.0, 5.0, 10.0, 5.0)).unwrap();
        let opts = options(InterpolationMethod::Linear, false);
        let th = grs.evaluate("th".parse().unwrap(), 0.0, 0.0, &opts).unwrap();
        assert_eq!(th, NANVAL);
    }

    #[test]
    fn test_no_element_layers() {
        let raw = RawGrid::new(vec![0.0, 90.0], vec![0.0, 10.0])
            .with_layer("u", Array2::zeros((2, 2)));
        assert!(matches!(
            GrsDataset::from_raw(raw),
            Err(RedPlanetError::DataShape { .. })
        ));
    }
}
