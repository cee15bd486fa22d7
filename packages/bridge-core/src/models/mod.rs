pub mod model;
pub mod traits;
