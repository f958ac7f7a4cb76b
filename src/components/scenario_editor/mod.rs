mod component;
mod render;
mod state;
mod store;
mod types;

pub use component::{ScenarioEditor, Severity};
pub use store::{LocalStore, ScenarioStore, StoreError};
pub use types::{Connection, Node, NodeId, NodeKind, ScenarioDocument, Vec2, Viewport};
