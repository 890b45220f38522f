//! Pan/zoom grid engine: coordinate transform, block-aware hit-testing, gesture
//! recognition, selection, immediate-mode rendering and a minimap.
//!
//! Everything here is host-agnostic. The web binary supplies a [`Surface`] over a
//! 2D canvas and feeds DOM input into [`GridEngine`].

pub mod blocks;
pub mod colors;
pub mod config;
pub mod engine;
pub mod gesture;
pub mod image_cache;
pub mod minimap;
pub mod renderer;
pub mod selection;
pub mod surface;
pub mod viewport;

pub use blocks::{BlockIndex, ResolvedBlock};
pub use config::{ConfigError, GridConfig};
pub use engine::{EngineEvent, EngineKey, GridEngine, ViewportState};
pub use gesture::{GestureAction, GestureController, GestureState, InteractionMode, PointerInput, PointerKind};
pub use image_cache::ImageCache;
pub use minimap::Minimap;
pub use renderer::{FrameInput, FrameStats, render};
pub use selection::{SelectionController, SelectionFilter, SelectionSummary, dedup_by_block_origin};
pub use surface::{DrawCommand, RecordingSurface, Surface, TextAlign, TextStyle};
pub use viewport::{GridRange, ScreenRect, Viewport};
