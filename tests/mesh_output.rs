//! Integration tests for the public surface: error taxonomy, options,
//! mesh extraction and the OBJ / OFF writers.

use terra_tin::prelude::*;

fn ridge() -> Grid {
    let samples = (0..6)
        .flat_map(|row| (0..9).map(move |column| f64::from((4 - column as i32).abs() * 3 + row)))
        .collect();
    Grid::new(9, 6, 25.0, 430_000.0, 5_120_000.0, -32768.0, samples).unwrap()
}

fn obj_bytes(mesh: &Mesh) -> Vec<u8> {
    let mut writer = ObjWriter::new(Vec::new());
    mesh.write_to(&mut writer).unwrap();
    writer.into_inner()
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[test]
fn invalid_tolerances_are_rejected() {
    let grid = ridge();
    for bad in [-1.0, -f64::EPSILON, f64::NAN, f64::INFINITY] {
        assert!(
            matches!(build_tin(&grid, bad), Err(TinError::InvalidParameters { .. })),
            "max_error {bad} accepted"
        );
    }
}

#[test]
fn grid_without_valid_samples_is_empty() {
    let grid = Grid::new(3, 3, 1.0, 0.0, 0.0, -1.0, vec![-1.0; 9]).unwrap();
    assert_eq!(build_tin(&grid, 1.0).unwrap_err(), TinError::EmptyGrid);
}

#[test]
fn single_column_of_valid_samples_is_invalid() {
    let nan = f64::NAN;
    #[rustfmt::skip]
    let grid = Grid::from_samples(3, 3, vec![
        nan, 1.0, nan,
        nan, 2.0, nan,
        nan, 3.0, nan,
    ])
    .unwrap();
    let err = build_tin(&grid, 0.0).unwrap_err();
    assert!(matches!(err, TinError::InvalidParameters { .. }));
    assert!(err.to_string().contains("column"));
}

#[test]
fn malformed_grids_convert_into_tin_errors() {
    fn load(samples: Vec<f64>) -> Result<Mesh, TinError> {
        let grid = Grid::from_samples(4, 4, samples)?;
        build_tin(&grid, 0.5)
    }
    assert!(matches!(
        load(vec![0.0; 15]),
        Err(TinError::Grid(GridError::BufferLengthMismatch {
            expected: 16,
            actual: 15
        }))
    ));
    assert!(load(vec![0.0; 16]).is_ok());
}

#[test]
fn builder_errors_convert_into_tin_errors() {
    fn options() -> Result<TinOptions, TinError> {
        Ok(TinOptionsBuilder::default().max_triangles(1_usize).build()?)
    }
    assert!(matches!(options(), Err(TinError::InvalidParameters { .. })));
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn options_load_from_json() {
    let json = r#"{
        "max_error": 2.5,
        "max_insertions": 3,
        "coordinate_space": "grid_local",
        "verify_delaunay": true
    }"#;
    let options: TinOptions = serde_json::from_str(json).unwrap();
    options.validate().unwrap();

    let (mesh, stats) = build_tin_with_statistics(&ridge(), &options).unwrap();
    assert!(stats.insertions <= 3);
    assert!(mesh.vertices().iter().all(|v| v.x <= 8.0 && v.y <= 5.0));

    let text = serde_json::to_string(&options).unwrap();
    assert_eq!(serde_json::from_str::<TinOptions>(&text).unwrap(), options);
}

#[test]
fn coordinate_spaces_differ_only_by_affine_map() {
    let grid = ridge();
    let world = build_tin(&grid, 1.0).unwrap();
    let local = build_tin_with_options(
        &grid,
        &TinOptions {
            coordinate_space: CoordinateSpace::GridLocal,
            ..TinOptions::new(1.0)
        },
    )
    .unwrap();

    assert_eq!(world.faces(), local.faces());
    for (w, l) in world.vertices().iter().zip(local.vertices()) {
        assert_eq!(w.x, l.x.mul_add(25.0, 430_000.0));
        assert_eq!(w.y, l.y.mul_add(25.0, 5_120_000.0));
        assert_eq!(w.z, l.z);
    }
}

// =============================================================================
// Mesh extraction and writers
// =============================================================================

#[test]
fn faces_reference_valid_vertices_with_ccw_winding() {
    let mesh = build_tin_with_options(
        &ridge(),
        &TinOptions {
            coordinate_space: CoordinateSpace::GridLocal,
            ..TinOptions::new(0.0)
        },
    )
    .unwrap();

    for face in 0..mesh.number_of_faces() {
        let [a, b, c] = mesh
            .face_vertices(face)
            .unwrap()
            .map(|v| GridPoint::new(v.x as i64, v.y as i64));
        assert_eq!(orientation(a, b, c), Orientation::POSITIVE);
    }
    let used: FastHashSet<usize> = mesh.faces().iter().flat_map(|f| f.indices()).collect();
    assert_eq!(used.len(), mesh.number_of_vertices());
}

#[test]
fn obj_output_is_deterministic() {
    let grid = ridge();
    let first = obj_bytes(&build_tin(&grid, 0.5).unwrap());
    let second = obj_bytes(&build_tin(&grid, 0.5).unwrap());
    assert_eq!(first, second);
}

#[test]
fn obj_lists_vertices_then_one_based_faces() {
    let mesh = build_tin(&ridge(), 0.5).unwrap();
    let text = String::from_utf8(obj_bytes(&mesh)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), mesh.number_of_vertices() + mesh.number_of_faces());

    let (v_lines, f_lines) = lines.split_at(mesh.number_of_vertices());
    for (line, vertex) in v_lines.iter().zip(mesh.vertices()) {
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields[0], "v");
        assert!(fields[1..].iter().all(|f| f.split_once('.').unwrap().1.len() == 18));
        assert_eq!(fields[1].parse::<f64>().unwrap(), vertex.x);
    }
    let mut max_index = 0;
    for (line, face) in f_lines.iter().zip(mesh.faces()) {
        let indices: Vec<usize> = line
            .strip_prefix("f ")
            .unwrap()
            .split(' ')
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(indices, face.indices().map(|i| i + 1).to_vec());
        max_index = max_index.max(*indices.iter().max().unwrap());
    }
    assert_eq!(max_index, mesh.number_of_vertices());
}

#[test]
fn off_output_has_counts_header() {
    let mesh = build_tin(&ridge(), 2.0).unwrap();
    let mut writer = OffWriter::new(Vec::new());
    mesh.write_to(&mut writer).unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("OFF"));
    assert_eq!(
        lines.next().unwrap(),
        format!("{} {} 0", mesh.number_of_vertices(), mesh.number_of_faces())
    );
    assert_eq!(
        lines.filter(|l| l.starts_with("3 ")).count(),
        mesh.number_of_faces()
    );
}

#[test]
fn custom_sinks_receive_the_whole_mesh() {
    #[derive(Default)]
    struct Counter {
        vertices: usize,
        faces: usize,
    }
    impl MeshSink for Counter {
        fn write_mesh(
            &mut self,
            vertices: &[MeshVertex],
            faces: &[Face],
        ) -> Result<(), MeshWriteError> {
            self.vertices += vertices.len();
            self.faces += faces.len();
            Ok(())
        }
    }

    let mesh = build_tin(&ridge(), 1.0).unwrap();
    let mut sink = Counter::default();
    mesh.write_to(&mut sink).unwrap();
    assert_eq!(sink.vertices, mesh.number_of_vertices());
    assert_eq!(sink.faces, mesh.number_of_faces());

    let dynamic: &mut dyn MeshSink = &mut sink;
    mesh.write_to(dynamic).unwrap();
    assert_eq!(sink.faces, 2 * mesh.number_of_faces());
}
