//! # terra-tin
//!
//! Greedy-insertion simplification of elevation rasters into a
//! [triangulated irregular network](https://en.wikipedia.org/wiki/Triangulated_irregular_network).
//!
//! Starting from two triangles spanning the valid part of the grid, the
//! worst-approximated grid cell is repeatedly inserted into a Delaunay
//! triangulation until every remaining cell lies within a vertical tolerance
//! of the piecewise-planar surface.
//!
//! # Features
//!
//! - Exact integer predicates on grid positions (no floating-point orientation failures)
//! - Incremental insertion with Lawson edge flips, including points on existing edges
//! - Deterministic output: ties are broken by raster scan order
//! - No-data aware seeding and evaluation
//! - OBJ and OFF writers behind a small [`MeshSink`](io::writer::MeshSink) trait
//! - Serialization/Deserialization of options and meshes with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use terra_tin::prelude::*;
//!
//! // 5 x 5 flat terrain with a single peak in the middle.
//! let mut samples = vec![0.0; 25];
//! samples[2 * 5 + 2] = 100.0;
//! let grid = Grid::from_samples(5, 5, samples).unwrap();
//!
//! let mesh = build_tin(&grid, 1.0).unwrap();
//! assert!(mesh.vertices().iter().any(|v| (v.x, v.y, v.z) == (2.0, 2.0, 100.0)));
//!
//! let mut obj = ObjWriter::new(Vec::new());
//! mesh.write_to(&mut obj).unwrap();
//! assert!(String::from_utf8(obj.into_inner()).unwrap().starts_with("v "));
//! ```
//!
//! # Options
//!
//! ```rust
//! use terra_tin::prelude::*;
//!
//! let grid = Grid::new(3, 3, 30.0, 1000.0, 2000.0, -9999.0, vec![
//!     5.0, 6.0, 5.0,
//!     6.0, 9.0, 6.0,
//!     5.0, 6.0, -9999.0,
//! ])
//! .unwrap();
//!
//! let options = TinOptionsBuilder::default()
//!     .max_error(0.0)
//!     .coordinate_space(CoordinateSpace::GridLocal)
//!     .verify_delaunay(true)
//!     .build()
//!     .unwrap();
//! let (mesh, stats) = build_tin_with_statistics(&grid, &options).unwrap();
//! assert_eq!(mesh.number_of_vertices(), 4 + stats.insertions);
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events and never
//! installs a subscriber: `debug` per insertion, `info` on convergence, `warn`
//! when a cap stops refinement or a seed corner needs repair.

#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Grid model, triangulation and the greedy refinement loop.
pub mod core {
    /// Algorithms operating on a [`Triangulation`](triangulation::Triangulation).
    pub mod algorithms {
        /// Candidate Evaluator (worst cell under a triangle)
        pub mod evaluate;
        /// Vertex insertion and edge legalization
        pub mod insertion;
        /// Point location by adjacency walk
        pub mod locate;
    }
    /// Storage and hashing aliases
    pub mod collections;
    pub mod config;
    pub mod error;
    pub mod grid;
    pub mod mesh;
    pub mod scheduler;
    pub mod tin;
    pub mod triangulation;
}

/// Integer grid positions, exact predicates and planes.
pub mod geometry {
    pub mod plane;
    pub mod point;
    pub mod predicates;
}

/// Mesh serialization.
pub mod io {
    pub mod writer;
}

pub use crate::core::tin::{build_tin, build_tin_with_options, build_tin_with_statistics};

/// A prelude module that re-exports commonly used types.
pub mod prelude {
    pub use crate::core::{
        algorithms::{
            evaluate::{Candidate, UsedCells, evaluate},
            insertion::{InsertionError, InsertionOutcome},
            locate::{LocateError, LocateResult, locate},
        },
        config::{CoordinateSpace, TinOptions, TinOptionsBuilder, config_presets},
        error::TinError,
        grid::{BoundingBox3, CellExtent, Grid, GridError},
        mesh::{Face, Mesh, MeshVertex},
        scheduler::{GreedyScheduler, RefinementState, RefinementStatistics, max_deviation},
        tin::{build_tin, build_tin_with_options, build_tin_with_statistics},
        triangulation::{
            Triangle, TriangleKey, Triangulation, TriangulationValidationError, Vertex, VertexKey,
        },
    };

    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_set_with_capacity,
    };

    pub use crate::geometry::{
        plane::Plane,
        point::GridPoint,
        predicates::{InSphere, Orientation, insphere, orientation},
    };

    pub use crate::io::writer::{MeshSink, MeshWriteError, ObjWriter, OffWriter};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}
