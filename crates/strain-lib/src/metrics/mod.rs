pub mod align;
pub mod baseline;
pub mod rate;
