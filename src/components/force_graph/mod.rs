mod classify;
mod component;
mod palette;
mod render;
mod simulation;
mod state;
mod types;

pub use classify::{NodeClassifier, is_document_node};
pub use component::{ForceGraphCanvas, LinkClickHandler, NodeClickHandler};
pub use palette::ColorScheme;
pub use simulation::{ForceParams, NodeKind, PositionedLink, PositionedNode, Viewport};
pub use state::{ForceGraphState, HUB_ID, LayoutOptions, Release, is_hub_node};
pub use types::{GraphData, GraphLink, GraphNode, NodeId};
