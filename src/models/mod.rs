pub mod link;
pub mod visit;

pub use link::Link;
pub use visit::{NewVisit, Visit};
