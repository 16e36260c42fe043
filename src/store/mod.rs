pub mod memory;
pub mod traits;

pub use traits::{DataFacade, KeyValueStore};
