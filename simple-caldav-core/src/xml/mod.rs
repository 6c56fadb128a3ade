//! XML reading (projection) and writing (request bodies).

pub mod projection;
pub mod selector;
pub mod writer;

pub use projection::{Instruction, Projected, Projection, parse_document, project, project_items};
pub use selector::Selector;
pub use writer::XmlElement;
