pub use anyhow::{Context, Result, bail};
pub use itertools::Itertools;
pub use log::{debug, info, warn};
