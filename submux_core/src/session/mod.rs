pub mod meta;
pub mod state;
pub mod store;

pub use meta::{MetaField, MetaMap};
pub use state::{JobSpec, Session, Stage, VideoSource};
pub use store::SessionStore;
