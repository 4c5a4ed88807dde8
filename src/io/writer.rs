//! Text serializations of a [`Mesh`](crate::core::mesh::Mesh).
//!
//! Writers implement [`MeshSink`], which only sees an ordered vertex
//! sequence and an ordered face sequence. Indices are checked before any
//! byte is written.

use std::io::{self, Write};

use thiserror::Error;

use crate::core::mesh::{Face, MeshVertex, check_faces};

/// Errors raised while serializing a mesh.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MeshWriteError {
    /// The underlying writer failed.
    #[error("I/O error while writing mesh: {0}")]
    Io(#[from] io::Error),

    /// A face refers to a vertex that does not exist.
    #[error("Face {face} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        /// Position of the face in the face sequence.
        face: usize,
        /// Offending 0-based vertex index.
        index: usize,
        /// Number of vertices available.
        vertex_count: usize,
    },
}

/// Consumer of a decomposed mesh.
pub trait MeshSink {
    /// Receives every vertex followed by every face.
    ///
    /// # Errors
    ///
    /// Implementations report I/O failures and dangling face indices.
    fn write_mesh(&mut self, vertices: &[MeshVertex], faces: &[Face])
    -> Result<(), MeshWriteError>;
}

/// Wavefront OBJ: `v x y z` lines with 18 fixed decimals, then 1-based
/// `f i j k` lines.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::mesh::{Face, Mesh, MeshVertex};
/// use terra_tin::io::writer::ObjWriter;
///
/// let mesh = Mesh::new(
///     vec![
///         MeshVertex::new(0.0, 0.0, 1.0),
///         MeshVertex::new(1.0, 0.0, 1.0),
///         MeshVertex::new(0.0, 1.0, 1.0),
///     ],
///     vec![Face([0, 1, 2])],
/// )
/// .unwrap();
///
/// let mut writer = ObjWriter::new(Vec::new());
/// mesh.write_to(&mut writer).unwrap();
/// let text = String::from_utf8(writer.into_inner()).unwrap();
/// assert!(text.ends_with("f 1 2 3\n"));
/// ```
#[derive(Debug)]
pub struct ObjWriter<W: Write> {
    inner: W,
}

impl<W: Write> ObjWriter<W> {
    /// Wraps a byte sink.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> MeshSink for ObjWriter<W> {
    fn write_mesh(
        &mut self,
        vertices: &[MeshVertex],
        faces: &[Face],
    ) -> Result<(), MeshWriteError> {
        check_faces(vertices.len(), faces)?;
        for v in vertices {
            writeln!(self.inner, "v {:.18} {:.18} {:.18}", v.x, v.y, v.z)?;
        }
        for Face([a, b, c]) in faces {
            writeln!(self.inner, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        self.inner.flush()?;
        Ok(())
    }
}

/// Object File Format: `OFF` header, counts, vertices, then `3 i j k`
/// faces with 0-based indices.
#[derive(Debug)]
pub struct OffWriter<W: Write> {
    inner: W,
}

impl<W: Write> OffWriter<W> {
    /// Wraps a byte sink.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> MeshSink for OffWriter<W> {
    fn write_mesh(
        &mut self,
        vertices: &[MeshVertex],
        faces: &[Face],
    ) -> Result<(), MeshWriteError> {
        check_faces(vertices.len(), faces)?;
        writeln!(self.inner, "OFF")?;
        writeln!(self.inner, "{} {} 0", vertices.len(), faces.len())?;
        for v in vertices {
            writeln!(self.inner, "{} {} {}", v.x, v.y, v.z)?;
        }
        for Face([a, b, c]) in faces {
            writeln!(self.inner, "3 {a} {b} {c}")?;
        }
        self.inner.flush()?;
        Ok(())
    }
}
