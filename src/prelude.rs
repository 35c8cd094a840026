pub use anyhow::{bail, Context, Result};
