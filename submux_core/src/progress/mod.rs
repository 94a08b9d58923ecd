pub mod reporter;
pub mod tracker;

pub use reporter::{ProgressReporter, SurfaceTracker};
pub use tracker::{render, Action, ProgressTracker, StatusSurfaces};
