//! Refinement options.
//!
//! [`TinOptions`] can be assembled with [`TinOptionsBuilder`], taken from one
//! of the [`config_presets`], or deserialized (for example from JSON).

use serde::{Deserialize, Serialize};

use crate::core::error::TinError;

/// Coordinate space of emitted mesh vertices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// `origin + index · cell_size`.
    #[default]
    World,
    /// Raw `(column, row)` indices.
    GridLocal,
}

/// Options controlling greedy refinement.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::config::{CoordinateSpace, TinOptionsBuilder};
///
/// let options = TinOptionsBuilder::default()
///     .max_error(0.5)
///     .max_insertions(10_000_usize)
///     .coordinate_space(CoordinateSpace::GridLocal)
///     .build()
///     .unwrap();
/// assert_eq!(options.max_insertions, Some(10_000));
/// assert_eq!(options.max_triangles, None);
///
/// assert!(TinOptionsBuilder::default().max_error(-1.0).build().is_err());
/// ```
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TinOptions {
    /// Largest tolerated vertical deviation, in elevation units.
    pub max_error: f64,
    /// Stop after this many successful insertions.
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    pub max_insertions: Option<usize>,
    /// Stop before the triangle count would exceed this value.
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    pub max_triangles: Option<usize>,
    /// Coordinate space of the emitted mesh.
    #[builder(default)]
    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
    /// Run the global empty-circumcircle check once refinement converges.
    #[builder(default)]
    #[serde(default)]
    pub verify_delaunay: bool,
}

impl TinOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max_error) = self.max_error {
            check_max_error(max_error)?;
        }
        if matches!(self.max_triangles, Some(Some(cap)) if cap < 2) {
            return Err("max_triangles must be at least 2".to_string());
        }
        Ok(())
    }
}

fn check_max_error(max_error: f64) -> Result<(), String> {
    if max_error.is_finite() && max_error >= 0.0 {
        Ok(())
    } else {
        Err(format!(
            "max_error must be a finite, non-negative number (got {max_error})"
        ))
    }
}

impl TinOptions {
    /// Options with the given tolerance and every other field defaulted.
    #[must_use]
    pub fn new(max_error: f64) -> Self {
        Self {
            max_error,
            max_insertions: None,
            max_triangles: None,
            coordinate_space: CoordinateSpace::World,
            verify_delaunay: false,
        }
    }

    /// Re-checks the options, which matters for deserialized values.
    ///
    /// # Errors
    ///
    /// Returns [`TinError::InvalidParameters`] for a negative or non-finite
    /// `max_error`, or a triangle cap below the two seed triangles.
    pub fn validate(&self) -> Result<(), TinError> {
        check_max_error(self.max_error).map_err(|message| TinError::InvalidParameters { message })?;
        if self.max_triangles.is_some_and(|cap| cap < 2) {
            return Err(TinError::InvalidParameters {
                message: "max_triangles must be at least 2".to_string(),
            });
        }
        Ok(())
    }
}

impl From<TinOptionsBuilderError> for TinError {
    fn from(err: TinOptionsBuilderError) -> Self {
        Self::InvalidParameters {
            message: err.to_string(),
        }
    }
}

/// Ready-made option sets.
pub mod config_presets {
    use super::TinOptions;

    /// Insert until every valid cell is reproduced exactly.
    ///
    /// Planes are evaluated in floating point, so exact reproduction only
    /// holds where facet interpolation is exact, such as integer elevations
    /// on an integer-sloped surface. Non-integer data that is planar in
    /// theory still picks up rounding-level error, and a zero tolerance then
    /// inserts a vertex for nearly every cell. Use a small positive
    /// tolerance such as `1e-9` for that data.
    #[must_use]
    pub fn lossless() -> TinOptions {
        TinOptions::new(0.0)
    }

    /// Tolerate one cell size of vertical error, a common default for
    /// terrain of similar horizontal and vertical resolution.
    #[must_use]
    pub fn default_for_cell_size(cell_size: f64) -> TinOptions {
        TinOptions::new(cell_size.abs())
    }

    /// Coarse preview with a hard cap on output size.
    #[must_use]
    pub fn preview(max_error: f64, max_triangles: usize) -> TinOptions {
        TinOptions {
            max_triangles: Some(max_triangles),
            ..TinOptions::new(max_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_max_error() {
        let err = TinOptionsBuilder::default().build().unwrap_err();
        assert!(err.to_string().contains("max_error"));
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert!(TinOptionsBuilder::default().max_error(f64::NAN).build().is_err());
        assert!(
            TinOptionsBuilder::default()
                .max_error(1.0)
                .max_triangles(0_usize)
                .build()
                .is_err()
        );
    }

    #[test]
    fn validate_catches_deserialized_garbage() {
        let options: TinOptions = serde_json::from_str(r#"{"max_error": -2.0}"#).unwrap();
        assert!(matches!(
            options.validate(),
            Err(TinError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn json_round_trip_keeps_defaults() {
        let options: TinOptions =
            serde_json::from_str(r#"{"max_error": 1.5, "coordinate_space": "grid_local"}"#).unwrap();
        assert_eq!(options.coordinate_space, CoordinateSpace::GridLocal);
        assert_eq!(options.max_insertions, None);
        assert!(!options.verify_delaunay);
        options.validate().unwrap();
    }

    #[test]
    fn presets() {
        assert_eq!(config_presets::lossless().max_error, 0.0);
        assert_eq!(config_presets::default_for_cell_size(30.0).max_error, 30.0);
        let preview = config_presets::preview(5.0, 1000);
        assert_eq!(preview.max_triangles, Some(1000));
        preview.validate().unwrap();
    }
}
