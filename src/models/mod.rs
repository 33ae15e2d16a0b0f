pub mod media_item;
pub mod media_key;

pub use media_item::*;
pub use media_key::*;
