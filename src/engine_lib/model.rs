// src/engine_lib/model.rs

use std::path::Path;

use glam::{Mat4, Vec2, Vec3};

use crate::engine_lib::assets::TextureId;
use crate::engine_lib::collision::Aabb;
use crate::engine_lib::obj::{MeshData, ObjError};
use crate::rendering_lib::vertex::{MeshVertex, TangentVertex};

/// Position, rotation in degrees applied X then Y then Z, and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE }
    }
}

impl Transform {
    /// `T * Rx * Ry * Rz * S`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_scale(self.scale)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSlot {
    Diffuse,
    Secondary,
    Surface,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSlots {
    pub diffuse: Option<TextureId>,
    pub secondary: Option<TextureId>,
    /// Normal / parallax map.
    pub surface: Option<TextureId>,
}

impl TextureSlots {
    /// Texture ids in shader binding order. For a single-texture model the
    /// present colour texture always takes binding 0.
    pub fn bindings(&self, kind: ShaderKind) -> [Option<TextureId>; 3] {
        match kind {
            ShaderKind::Colored => [None, None, None],
            ShaderKind::Textured => [self.diffuse.or(self.secondary), None, None],
            ShaderKind::DoubleTextured => [self.diffuse, self.secondary, None],
            ShaderKind::Parallax => [self.diffuse, self.secondary, self.surface],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Colored,
    Textured,
    DoubleTextured,
    Parallax,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] =
        [ShaderKind::Colored, ShaderKind::Textured, ShaderKind::DoubleTextured, ShaderKind::Parallax];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn uses_tangents(self) -> bool {
        self == ShaderKind::Parallax
    }
}

/// What a model can feed a shader. Fixed once the model is finalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub color_textures: u8,
    pub has_surface_map: bool,
}

impl ModelCapabilities {
    pub fn of(slots: &TextureSlots) -> Self {
        Self {
            color_textures: slots.diffuse.is_some() as u8 + slots.secondary.is_some() as u8,
            has_surface_map: slots.surface.is_some(),
        }
    }

    pub fn shader_kind(&self) -> ShaderKind {
        match (self.has_surface_map, self.color_textures) {
            (true, _) => ShaderKind::Parallax,
            (false, 0) => ShaderKind::Colored,
            (false, 1) => ShaderKind::Textured,
            (false, _) => ShaderKind::DoubleTextured,
        }
    }
}

pub enum VertexStream {
    Basic(Vec<MeshVertex>),
    Tangent(Vec<TangentVertex>),
}

impl VertexStream {
    pub fn len(&self) -> usize {
        match self {
            VertexStream::Basic(v) => v.len(),
            VertexStream::Tangent(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexStream::Basic(v) => bytemuck::cast_slice(v),
            VertexStream::Tangent(v) => bytemuck::cast_slice(v),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub mesh: MeshData,
    pub transform: Transform,
    pub textures: TextureSlots,
    local_aabb: Aabb,
    capabilities: Option<ModelCapabilities>,
}

impl Model {
    pub fn new(name: impl Into<String>, mesh: MeshData) -> Self {
        let mut model = Self {
            name: name.into(),
            mesh,
            transform: Transform::default(),
            textures: TextureSlots::default(),
            local_aabb: Aabb::default(),
            capabilities: None,
        };
        model.calculate_aabb();
        model
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ObjError> {
        let path = path.as_ref();
        let mesh = MeshData::read_file(path)?;
        log::info!(
            "Loaded model {} ({} positions, {} faces)",
            path.display(),
            mesh.positions.len(),
            mesh.faces.len()
        );
        Ok(Self::new(path.display().to_string(), mesh))
    }

    pub fn from_obj_str(name: impl Into<String>, source: &str) -> Self {
        Self::new(name, MeshData::parse_str(source))
    }

    pub fn calculate_aabb(&mut self) {
        self.local_aabb = Aabb::from_points(self.mesh.positions.iter().copied());
    }

    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn transformed_aabb(&self) -> Aabb {
        self.local_aabb.transformed(&self.model_matrix())
    }

    pub fn aabb_line_vertices(&self) -> [Vec3; 24] {
        self.transformed_aabb().edge_vertices()
    }

    /// Changing a slot invalidates the capability descriptor until the next `finalize`.
    pub fn set_texture(&mut self, slot: TextureSlot, id: Option<TextureId>) {
        match slot {
            TextureSlot::Diffuse => self.textures.diffuse = id,
            TextureSlot::Secondary => self.textures.secondary = id,
            TextureSlot::Surface => self.textures.surface = id,
        }
        self.capabilities = None;
    }

    pub fn finalize(&mut self) {
        self.capabilities = Some(ModelCapabilities::of(&self.textures));
    }

    pub fn capabilities(&self) -> ModelCapabilities {
        self.capabilities.unwrap_or_else(|| ModelCapabilities::of(&self.textures))
    }

    pub fn shader_kind(&self) -> ShaderKind {
        self.capabilities().shader_kind()
    }

    /// Expands the faces into a flat, non-indexed triangle list.
    pub fn vertex_stream(&self) -> VertexStream {
        let basic = self.basic_vertices();
        if !self.shader_kind().uses_tangents() {
            return VertexStream::Basic(basic);
        }

        let mut out = Vec::with_capacity(basic.len());
        for tri in basic.chunks_exact(3) {
            let (tangent, bitangent) = tangent_frame(tri);
            out.extend(tri.iter().map(|v| TangentVertex {
                position: v.position,
                tex_coord: v.tex_coord,
                normal: v.normal,
                tangent: tangent.to_array(),
                bitangent: bitangent.to_array(),
            }));
        }
        VertexStream::Tangent(out)
    }

    fn basic_vertices(&self) -> Vec<MeshVertex> {
        let mesh = &self.mesh;
        let mut warned = false;
        let mut out = Vec::with_capacity(mesh.faces.len() * 3);
        for face in &mesh.faces {
            for fv in &face.vertices {
                let position = match mesh.positions.get(fv.position) {
                    Some(p) => *p,
                    None => {
                        if !warned {
                            log::warn!(
                                "{}: position index {} out of range, using origin",
                                self.name,
                                fv.position + 1
                            );
                            warned = true;
                        }
                        Vec3::ZERO
                    }
                };
                let tex_coord = fv
                    .tex_coord
                    .and_then(|i| mesh.tex_coords.get(i).copied())
                    .unwrap_or(Vec2::ZERO);
                let normal = fv.normal.and_then(|i| mesh.normals.get(i).copied()).unwrap_or(Vec3::ZERO);
                out.push(MeshVertex {
                    position: position.to_array(),
                    tex_coord: tex_coord.to_array(),
                    normal: normal.to_array(),
                });
            }
        }
        out
    }
}

fn tangent_frame(tri: &[MeshVertex]) -> (Vec3, Vec3) {
    let p = |i: usize| Vec3::from_array(tri[i].position);
    let uv = |i: usize| Vec2::from_array(tri[i].tex_coord);

    let edge1 = p(1) - p(0);
    let edge2 = p(2) - p(0);
    let d1 = uv(1) - uv(0);
    let d2 = uv(2) - uv(0);

    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < f32::EPSILON {
        return (Vec3::X, Vec3::Y);
    }
    let f = 1.0 / det;
    let tangent = (f * (d2.y * edge1 - d1.y * edge2)).normalize_or_zero();
    let bitangent = (f * (-d2.x * edge1 + d1.x * edge2)).normalize_or_zero();
    (tangent, bitangent)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = "\
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
vt 0 0
vt 1 0
vt 1 1
f 1/1 2/2 3/3
f 5/1 6/2 7/3
";

    #[test]
    fn local_aabb_covers_positions() {
        let model = Model::from_obj_str("cube", CUBE);
        assert_eq!(model.local_aabb(), Aabb::new(Vec3::splat(-1.0), Vec3::ONE));
    }

    #[test]
    fn empty_mesh_has_degenerate_box() {
        let model = Model::from_obj_str("empty", "# nothing\n");
        assert_eq!(model.local_aabb(), Aabb::default());
        assert_eq!(model.transformed_aabb(), Aabb::default());
    }

    #[test]
    fn transformed_aabb_applies_scale_then_translation() {
        let mut model = Model::from_obj_str("cube", CUBE);
        model.transform.scale = Vec3::new(2.0, 1.0, 0.5);
        model.transform.position = Vec3::new(10.0, 0.0, 0.0);
        let aabb = model.transformed_aabb();
        assert!(aabb.min.abs_diff_eq(Vec3::new(8.0, -1.0, -0.5), 1e-5));
        assert!(aabb.max.abs_diff_eq(Vec3::new(12.0, 1.0, 0.5), 1e-5));
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        let t = Transform { rotation: Vec3::new(90.0, 90.0, 0.0), ..Default::default() };
        let expected = Mat4::from_rotation_x(90f32.to_radians()) * Mat4::from_rotation_y(90f32.to_radians());
        assert!(t.matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn capability_table_picks_shader() {
        let id = Some(TextureId(0));
        let cases = [
            (TextureSlots::default(), ShaderKind::Colored),
            (TextureSlots { diffuse: id, ..Default::default() }, ShaderKind::Textured),
            (TextureSlots { secondary: id, ..Default::default() }, ShaderKind::Textured),
            (TextureSlots { diffuse: id, secondary: id, surface: None }, ShaderKind::DoubleTextured),
            (TextureSlots { surface: id, ..Default::default() }, ShaderKind::Parallax),
            (TextureSlots { diffuse: id, secondary: id, surface: id }, ShaderKind::Parallax),
        ];
        for (slots, kind) in cases {
            assert_eq!(ModelCapabilities::of(&slots).shader_kind(), kind, "{:?}", slots);
        }
    }

    #[test]
    fn single_secondary_texture_binds_first() {
        let slots = TextureSlots { secondary: Some(TextureId(3)), ..Default::default() };
        assert_eq!(slots.bindings(ShaderKind::Textured), [Some(TextureId(3)), None, None]);
    }

    #[test]
    fn finalize_freezes_capabilities_until_slots_change() {
        let mut model = Model::from_obj_str("cube", CUBE);
        model.finalize();
        assert_eq!(model.shader_kind(), ShaderKind::Colored);
        model.set_texture(TextureSlot::Diffuse, Some(TextureId(1)));
        model.finalize();
        assert_eq!(model.shader_kind(), ShaderKind::Textured);
    }

    #[test]
    fn vertex_stream_expands_faces() {
        let model = Model::from_obj_str("cube", CUBE);
        let VertexStream::Basic(verts) = model.vertex_stream() else {
            panic!("colored model should not carry tangents");
        };
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[4].position, [1.0, -1.0, 1.0]);
        assert_eq!(verts[4].tex_coord, [1.0, 0.0]);
        assert_eq!(verts[4].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_indices_fall_back_to_zero() {
        let model = Model::from_obj_str("broken", "v 1 2 3\nf 1/9/9 7 1\n");
        let VertexStream::Basic(verts) = model.vertex_stream() else { unreachable!() };
        assert_eq!(verts[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(verts[0].tex_coord, [0.0, 0.0]);
        assert_eq!(verts[1].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn parallax_stream_carries_tangent_frame() {
        let mut model = Model::from_obj_str("cube", CUBE);
        model.set_texture(TextureSlot::Surface, Some(TextureId(0)));
        model.finalize();
        let VertexStream::Tangent(verts) = model.vertex_stream() else {
            panic!("parallax model needs tangents");
        };
        // Face 1 lies in z = -1 with u along +x and v along +y.
        assert!(Vec3::from_array(verts[0].tangent).abs_diff_eq(Vec3::X, 1e-5));
        assert!(Vec3::from_array(verts[0].bitangent).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn degenerate_uvs_use_default_frame() {
        let tri = [MeshVertex::default(); 3];
        assert_eq!(tangent_frame(&tri), (Vec3::X, Vec3::Y));
    }
}
