// src/rendering_lib/shader.rs

/// Lit model shaders. One vertex entry per vertex layout, one fragment entry per
/// `ShaderKind`.
pub const SCENE_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    skybox_view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
}

struct Lights {
    positions: array<vec4<f32>, 4>,
    colors: array<vec4<f32>, 4>,
}

struct Object {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> lights: Lights;
@group(1) @binding(0) var<uniform> object: Object;
@group(2) @binding(0) var t_diffuse: texture_2d<f32>;
@group(2) @binding(1) var t_secondary: texture_2d<f32>;
@group(2) @binding(2) var t_surface: texture_2d<f32>;
@group(2) @binding(3) var s_linear: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) normal: vec3<f32>,
}

struct TangentInput {
    @location(0) position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) bitangent: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tangent: vec3<f32>,
    @location(4) bitangent: vec3<f32>,
}

fn to_world(v: vec3<f32>) -> vec3<f32> {
    return (object.normal * vec4<f32>(v, 0.0)).xyz;
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(in.position, 1.0);
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.tex_coord = in.tex_coord;
    out.normal = to_world(in.normal);
    out.tangent = to_world(vec3<f32>(1.0, 0.0, 0.0));
    out.bitangent = to_world(vec3<f32>(0.0, 1.0, 0.0));
    return out;
}

@vertex
fn vs_tangent(in: TangentInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(in.position, 1.0);
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.tex_coord = in.tex_coord;
    out.normal = to_world(in.normal);
    out.tangent = to_world(in.tangent);
    out.bitangent = to_world(in.bitangent);
    return out;
}

fn safe_normalize(v: vec3<f32>, fallback: vec3<f32>) -> vec3<f32> {
    let len = length(v);
    return select(fallback, v / max(len, 0.0001), len >= 0.0001);
}

fn shade(albedo: vec3<f32>, n: vec3<f32>, world_position: vec3<f32>) -> vec3<f32> {
    var lighting = albedo * 0.1;
    for (var i = 0; i < 4; i = i + 1) {
        let to_light = lights.positions[i].xyz - world_position;
        let dist = max(length(to_light), 0.0001);
        let diffuse = max(dot(n, to_light / dist), 0.0);
        lighting = lighting + lights.colors[i].rgb * diffuse * albedo / (dist * dist);
    }
    return lighting;
}

@fragment
fn fs_colored(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = safe_normalize(in.normal, vec3<f32>(0.0, 1.0, 0.0));
    return vec4<f32>(shade(vec3<f32>(0.8, 0.8, 0.8), n, in.world_position), 1.0);
}

@fragment
fn fs_textured(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(t_diffuse, s_linear, in.tex_coord).rgb;
    let n = safe_normalize(in.normal, vec3<f32>(0.0, 1.0, 0.0));
    return vec4<f32>(shade(albedo, n, in.world_position), 1.0);
}

@fragment
fn fs_double_textured(in: VertexOutput) -> @location(0) vec4<f32> {
    let a = textureSample(t_diffuse, s_linear, in.tex_coord);
    let b = textureSample(t_secondary, s_linear, in.tex_coord);
    let albedo = mix(a.rgb, b.rgb, 0.2 * b.a);
    let n = safe_normalize(in.normal, vec3<f32>(0.0, 1.0, 0.0));
    return vec4<f32>(shade(albedo, n, in.world_position), 1.0);
}

// Surface map: rgb is a tangent-space normal, alpha is height (1 = no offset).
@fragment
fn fs_parallax(in: VertexOutput) -> @location(0) vec4<f32> {
    let t = safe_normalize(in.tangent, vec3<f32>(1.0, 0.0, 0.0));
    let b = safe_normalize(in.bitangent, vec3<f32>(0.0, 1.0, 0.0));
    let n = safe_normalize(in.normal, vec3<f32>(0.0, 0.0, 1.0));
    let tbn = mat3x3<f32>(t, b, n);

    let view_dir = safe_normalize(camera.view_position.xyz - in.world_position, n);
    let view_ts = transpose(tbn) * view_dir;
    let height = textureSample(t_surface, s_linear, in.tex_coord).a;
    let offset = view_ts.xy / max(view_ts.z, 0.1) * (1.0 - height) * 0.05;
    let uv = in.tex_coord - offset;

    let sampled = textureSample(t_surface, s_linear, uv).rgb * 2.0 - 1.0;
    let normal = safe_normalize(tbn * sampled, n);
    let a = textureSample(t_diffuse, s_linear, uv);
    let c = textureSample(t_secondary, s_linear, uv);
    let albedo = a.rgb * c.rgb;
    return vec4<f32>(shade(albedo, normal, in.world_position), 1.0);
}
"#;

/// Cube-mapped background drawn around the eye. Depth is forced to the far plane.
pub const SKYBOX_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    skybox_view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var t_sky: texture_cube<f32>;
@group(1) @binding(1) var s_sky: sampler;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn vs_skybox(@location(0) position: vec3<f32>) -> SkyOutput {
    var out: SkyOutput;
    let clip = camera.skybox_view_proj * vec4<f32>(position, 1.0);
    out.clip_position = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn fs_skybox(in: SkyOutput) -> @location(0) vec4<f32> {
    return textureSample(t_sky, s_sky, in.direction);
}
"#;

/// Flat-coloured world-space lines for the collider overlay.
pub const LINE_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    skybox_view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;

@vertex
fn vs_line(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * vec4<f32>(position, 1.0);
}

@fragment
fn fs_line() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0, 1.0, 0.0, 1.0);
}
"#;

/// Full-screen passes of the bloom chain.
pub const POST_SHADER_SOURCE: &str = r#"
struct BloomParams {
    threshold: f32,
    strength: f32,
    direction: vec2<f32>,
}

@group(0) @binding(0) var t_source: texture_2d<f32>;
@group(0) @binding(1) var s_post: sampler;
@group(0) @binding(2) var<uniform> params: BloomParams;

@group(0) @binding(3) var t_bloom: texture_2d<f32>;

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
}

@vertex
fn vs_quad(@location(0) position: vec2<f32>, @location(1) tex_coord: vec2<f32>) -> QuadOutput {
    var out: QuadOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.tex_coord = tex_coord;
    return out;
}

@fragment
fn fs_extract(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_source, s_post, in.tex_coord).rgb;
    let brightness = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    return vec4<f32>(select(vec3<f32>(0.0), color, brightness > params.threshold), 1.0);
}

@fragment
fn fs_blur(in: QuadOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel = params.direction / vec2<f32>(textureDimensions(t_source));
    var result = textureSample(t_source, s_post, in.tex_coord).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let offset = texel * f32(i);
        result = result + textureSample(t_source, s_post, in.tex_coord + offset).rgb * weights[i];
        result = result + textureSample(t_source, s_post, in.tex_coord - offset).rgb * weights[i];
    }
    return vec4<f32>(result, 1.0);
}

@fragment
fn fs_combine(in: QuadOutput) -> @location(0) vec4<f32> {
    let scene = textureSample(t_source, s_post, in.tex_coord).rgb;
    let bloom = textureSample(t_bloom, s_post, in.tex_coord).rgb;
    let hdr = scene + bloom * params.strength;
    return vec4<f32>(vec3<f32>(1.0) - exp(-hdr), 1.0);
}
"#;
