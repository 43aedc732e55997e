// src/engine_lib/obj.rs

//! Wavefront OBJ subset reader: `v`, `vt`, `vn` and triangular `f` lines.
//!
//! The reader is lenient. Malformed input never aborts a load; each case has a
//! fixed recovery:
//!
//! | input                                          | recovery                        |
//! |------------------------------------------------|---------------------------------|
//! | unknown directive, comment, blank line         | ignored                         |
//! | missing / non-numeric component in v, vt, vn   | component reads 0.0, warning    |
//! | `f` with fewer than 3 vertex groups            | line skipped, warning           |
//! | `f` with more than 3 vertex groups             | first 3 groups used             |
//! | unparsable or zero position index              | line skipped, warning           |
//! | empty, unparsable or zero texcoord/normal index| `None`                          |
//! | negative index reaching before the first item  | treated as unparsable           |
//!
//! Negative indices count back from the items read so far (`-1` is the latest).
//! Positive out-of-range indices are not checked here; see `Model::vertex_stream`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::{Vec2, Vec3};

#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("failed to open OBJ file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read OBJ data: {0}")]
    Read(#[from] std::io::Error),
}

/// One corner of a face, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub tex_coord: Option<usize>,
    pub normal: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub vertices: [FaceVertex; 3],
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub faces: Vec<Face>,
}

impl MeshData {
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ObjError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ObjError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self, ObjError> {
        let mut mesh = MeshData::default();
        for (line_idx, line) in reader.lines().enumerate() {
            mesh.parse_line(&line?, line_idx + 1);
        }
        Ok(mesh)
    }

    pub fn parse_str(source: &str) -> Self {
        let mut mesh = MeshData::default();
        for (line_idx, line) in source.lines().enumerate() {
            mesh.parse_line(line, line_idx + 1);
        }
        mesh
    }

    fn parse_line(&mut self, line: &str, line_no: usize) {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => self.positions.push(read_vec3(&mut tokens, line_no)),
            Some("vt") => {
                let u = read_component(tokens.next(), line_no);
                let v = read_component(tokens.next(), line_no);
                self.tex_coords.push(Vec2::new(u, v));
            }
            Some("vn") => self.normals.push(read_vec3(&mut tokens, line_no)),
            Some("f") => {
                let counts = [self.positions.len(), self.tex_coords.len(), self.normals.len()];
                if let Some(face) = read_face(&mut tokens, counts, line_no) {
                    self.faces.push(face);
                }
            }
            _ => {}
        }
    }
}

fn read_component(token: Option<&str>, line_no: usize) -> f32 {
    match token.map(str::parse::<f32>) {
        Some(Ok(value)) => value,
        _ => {
            log::warn!("OBJ line {}: missing or invalid number, using 0.0", line_no);
            0.0
        }
    }
}

fn read_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>, line_no: usize) -> Vec3 {
    let x = read_component(tokens.next(), line_no);
    let y = read_component(tokens.next(), line_no);
    let z = read_component(tokens.next(), line_no);
    Vec3::new(x, y, z)
}

/// OBJ index to 0-based. Positive indices are 1-based, negative ones are
/// relative to `len`. Empty, zero or garbage yields `None`.
fn to_index(token: &str, len: usize) -> Option<usize> {
    match token.parse::<i64>().ok()? {
        0 => None,
        i if i > 0 => usize::try_from(i - 1).ok(),
        i => len.checked_sub(usize::try_from(i.unsigned_abs()).ok()?),
    }
}

fn read_face_vertex(group: &str, [positions, tex_coords, normals]: [usize; 3]) -> Option<FaceVertex> {
    let mut parts = group.split('/');
    let position = to_index(parts.next()?, positions)?;
    let tex_coord = parts.next().and_then(|t| to_index(t, tex_coords));
    let normal = parts.next().and_then(|t| to_index(t, normals));
    Some(FaceVertex { position, tex_coord, normal })
}

fn read_face<'a>(tokens: &mut impl Iterator<Item = &'a str>, counts: [usize; 3], line_no: usize) -> Option<Face> {
    let groups: Vec<&str> = tokens.take(3).collect();
    if groups.len() < 3 {
        log::warn!("OBJ line {}: face needs 3 vertices, got {}", line_no, groups.len());
        return None;
    }
    let mut vertices = [FaceVertex { position: 0, tex_coord: None, normal: None }; 3];
    for (slot, group) in vertices.iter_mut().zip(groups) {
        match read_face_vertex(group, counts) {
            Some(v) => *slot = v,
            None => {
                log::warn!("OBJ line {}: bad vertex group '{}', face skipped", line_no, group);
                return None;
            }
        }
    }
    Some(Face { vertices })
}
