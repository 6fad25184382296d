//! Items used throughout the crate.
pub use log::{debug, info, trace};

pub use crate::error::InternalError;
