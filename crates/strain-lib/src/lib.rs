pub mod cycles;
pub mod dataset;
pub mod error;
pub mod io;
pub mod metrics;
pub mod numeric;
pub mod pipeline;
pub mod plot;

pub use cycles::*;
pub use dataset::*;
pub use error::{Result, StrainError};
pub use metrics::*;
