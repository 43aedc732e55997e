// src/engine_lib/mod.rs
pub mod assets;
pub mod camera;
pub mod collision;
pub mod controller;
pub mod model;
pub mod obj;
pub mod player;
pub mod scene;
pub mod time;

pub use assets::{TextureId, TextureRegistry};
pub use camera::Camera;
pub use collision::{Aabb, CollisionResult};
pub use controller::InputState;
pub use model::{Model, ShaderKind};
pub use player::{Player, PlayerOutcome};
pub use scene::Scene;
pub use time::FrameClock;
