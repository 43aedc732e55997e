// src/engine_lib/scene.rs

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::engine_lib::assets::{TextureId, TextureRegistry};
use crate::engine_lib::collision::{Aabb, CollisionResult};
use crate::engine_lib::model::{Model, ShaderKind, TextureSlot};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cube map faces in +X, -X, +Y, -Y, +Z, -Z order. A face that failed to load is `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Skybox {
    pub faces: [Option<TextureId>; 6],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Per-frame behaviour attached to a level.
pub trait LevelScript {
    fn update(&mut self, models: &mut [Model], dt: f32);
}

/// Lowers `model` by `speed` units per second until it touches `rest_on`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkingPlatform {
    pub model: usize,
    pub rest_on: usize,
    pub speed: f32,
}

impl LevelScript for SinkingPlatform {
    fn update(&mut self, models: &mut [Model], dt: f32) {
        if self.model == self.rest_on {
            return;
        }
        let Some(support) = models.get(self.rest_on).map(Model::transformed_aabb) else {
            return;
        };
        let Some(platform) = models.get_mut(self.model) else {
            return;
        };
        if !Aabb::check_collision(&platform.transformed_aabb(), &support) {
            platform.transform.position.y -= self.speed * dt;
        }
    }
}

#[derive(Debug, PartialEq)]
enum Directive<'a> {
    Model(&'a str),
    Texture(TextureSlot, &'a str),
    Position(Vec3),
    Rotation(Vec3),
    Scale(Vec3),
    Skybox(Vec<&'a str>),
}

#[derive(Debug, PartialEq)]
enum DirectiveError<'a> {
    Unknown(&'a str),
    MissingPath(&'a str),
    BadVector(&'a str),
}

fn parse_vec3<'a>(keyword: &'a str, args: &[&'a str]) -> Result<Vec3, DirectiveError<'a>> {
    if args.len() < 3 {
        return Err(DirectiveError::BadVector(keyword));
    }
    let mut v = [0.0f32; 3];
    for (slot, arg) in v.iter_mut().zip(args) {
        *slot = arg.parse().map_err(|_| DirectiveError::BadVector(keyword))?;
    }
    Ok(Vec3::from_array(v))
}

fn parse_directive<'a>(keyword: &'a str, args: &[&'a str]) -> Result<Directive<'a>, DirectiveError<'a>> {
    let path = || args.first().copied().ok_or(DirectiveError::MissingPath(keyword));
    match keyword {
        "Model" => Ok(Directive::Model(path()?)),
        "Texture0" => Ok(Directive::Texture(TextureSlot::Diffuse, path()?)),
        "Texture1" => Ok(Directive::Texture(TextureSlot::Secondary, path()?)),
        "Texture2" => Ok(Directive::Texture(TextureSlot::Surface, path()?)),
        "Position" => parse_vec3(keyword, args).map(Directive::Position),
        "Rotation" => parse_vec3(keyword, args).map(Directive::Rotation),
        "Scale" => parse_vec3(keyword, args).map(Directive::Scale),
        "Skybox" => Ok(Directive::Skybox(args.to_vec())),
        other => Err(DirectiveError::Unknown(other)),
    }
}

pub struct Scene {
    pub models: Vec<Model>,
    pub projection: Projection,
    pub skybox: Option<Skybox>,
    scripts: Vec<Box<dyn LevelScript>>,
}

impl Scene {
    pub fn new(projection: Projection) -> Self {
        Self { models: Vec::new(), projection, skybox: None, scripts: Vec::new() }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.projection.aspect = width as f32 / height as f32;
        }
    }

    pub fn add_script(&mut self, script: Box<dyn LevelScript>) {
        self.scripts.push(script);
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>, textures: &mut TextureRegistry) -> Result<(), SceneError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_from_str(&source, textures);
        log::info!(
            "Loaded scene {} ({} models, skybox: {})",
            path.display(),
            self.models.len(),
            self.skybox.is_some()
        );
        Ok(())
    }

    /// Interprets scene text. Bad lines are logged and skipped; nothing here is fatal.
    pub fn load_from_str(&mut self, source: &str, textures: &mut TextureRegistry) {
        let mut current: Option<usize> = None;
        let mut lines = source.lines().enumerate();

        while let Some((idx, line)) = lines.next() {
            let line_no = idx + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((keyword, args)) = tokens.split_first() else {
                continue;
            };

            let directive = match parse_directive(keyword, args) {
                Ok(d) => d,
                Err(DirectiveError::Unknown(k)) => {
                    log::warn!("Scene line {}: unknown keyword '{}'", line_no, k);
                    continue;
                }
                Err(DirectiveError::MissingPath(k)) => {
                    log::warn!("Scene line {}: '{}' needs a path", line_no, k);
                    if k == "Model" {
                        current = None;
                    }
                    continue;
                }
                Err(DirectiveError::BadVector(k)) => {
                    log::warn!("Scene line {}: '{}' needs three numbers", line_no, k);
                    continue;
                }
            };

            match directive {
                Directive::Model(path) => match Model::load_from_file(path) {
                    Ok(model) => {
                        self.models.push(model);
                        current = Some(self.models.len() - 1);
                    }
                    Err(e) => {
                        log::error!("Scene line {}: {}", line_no, e);
                        current = None;
                    }
                },
                Directive::Skybox(inline) => {
                    let mut paths: Vec<String> = inline.iter().map(|s| s.to_string()).collect();
                    while paths.len() < 6 {
                        let Some((_, next)) = lines.next() else { break };
                        paths.extend(next.split_whitespace().map(str::to_string));
                    }
                    if paths.len() < 6 {
                        log::warn!("Scene line {}: skybox needs 6 faces, found {}", line_no, paths.len());
                        continue;
                    }
                    self.skybox = Some(load_skybox(&paths[..6], textures));
                }
                modifier => {
                    let Some(model) = current.and_then(|i| self.models.get_mut(i)) else {
                        log::warn!("Scene line {}: '{}' has no model to apply to", line_no, keyword);
                        continue;
                    };
                    apply_modifier(model, modifier, textures, line_no);
                }
            }
        }

        for model in &mut self.models {
            model.finalize();
        }
    }

    /// Pipeline for `model`, looked up from the capabilities fixed at finalize.
    pub fn shader_for(&self, model: &Model) -> ShaderKind {
        model.capabilities().shader_kind()
    }

    /// First model in storage order whose box overlaps the player's.
    pub fn check_player_collision(&self, player: &Model) -> CollisionResult {
        let player_box = player.transformed_aabb();
        self.models
            .iter()
            .find(|m| Aabb::check_collision(&player_box, &m.transformed_aabb()))
            .map(|m| CollisionResult::hit(player.transform.position, m.transform.position))
            .unwrap_or(CollisionResult::NONE)
    }

    pub fn update(&mut self, dt: f32) {
        for script in &mut self.scripts {
            script.update(&mut self.models, dt);
        }
    }
}

fn apply_modifier(model: &mut Model, directive: Directive<'_>, textures: &mut TextureRegistry, line_no: usize) {
    match directive {
        Directive::Texture(slot, path) => {
            let id = match textures.load(path) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("Scene line {}: {}", line_no, e);
                    None
                }
            };
            model.set_texture(slot, id);
        }
        Directive::Position(v) => model.transform.position = v,
        Directive::Rotation(v) => model.transform.rotation = v,
        Directive::Scale(v) => model.transform.scale = v,
        Directive::Model(_) | Directive::Skybox(_) => {}
    }
}

fn load_skybox(paths: &[String], textures: &mut TextureRegistry) -> Skybox {
    let mut faces = [None; 6];
    for (face, path) in faces.iter_mut().zip(paths) {
        match textures.load(path) {
            Ok(id) => *face = Some(id),
            Err(e) => log::warn!("Skybox face: {}", e),
        }
    }
    Skybox { faces }
}
