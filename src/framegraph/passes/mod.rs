//! The eight standard passes: Geometry, Skybox, Transparent, Lighting,
//! Bloom, Post-Process, Present, UI.
//!
//! Each owns its own pipeline(s) and bind group layout(s) and only ever
//! touches the [`crate::framegraph::pool::ResourcePool`] it was registered
//! against through the images/buffers it declared at construction time —
//! the same boundary [`crate::framegraph::node::Pass`] imposes on every
//! pass, standard or not.

pub mod bloom;
pub mod geometry;
pub mod lighting;
pub mod post_process;
pub mod present;
pub mod skybox;
pub mod transparent;
pub mod ui;

pub use bloom::BloomPass;
pub use geometry::GeometryPass;
pub use lighting::LightingPass;
pub use post_process::PostProcessPass;
pub use present::PresentPass;
pub use skybox::SkyboxPass;
pub use transparent::TransparentPass;
pub use ui::UiPass;
