pub mod actions;
pub mod projects;
pub mod slices;
pub mod topology;

pub use actions::ActionTools;
pub use projects::ProjectTools;
pub use slices::{SliceQuery, SliceTools};
pub use topology::{QueryParams, TopologyTools};
