pub mod labels;
pub mod types;

pub use labels::{LABEL_PREFIX, is_managed, port_label, service_label};
pub use types::*;
