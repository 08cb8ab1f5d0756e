/// Crate-wide result alias.
pub type DiffuseResult<T> = Result<T, DiffuseError>;

/// Error taxonomy for shadow generation.
///
/// Pixel transforms surface `Raster` errors; the build pipeline absorbs them
/// and degrades to "no shadow", so hosts normally only see `Validation` and
/// `Schedule` from the engine API.
#[derive(thiserror::Error, Debug)]
pub enum DiffuseError {
    /// Invalid input to a constructor or engine call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Pixel transform failure (degenerate dimensions, buffer mismatch).
    #[error("raster error: {0}")]
    Raster(String),

    /// Worker dispatch or settle failure.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Passthrough for wrapped lower-level errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DiffuseError {
    /// Build a `Validation` error from any message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a `Raster` error from any message.
    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    /// Build a `Schedule` error from any message.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            DiffuseError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(DiffuseError::raster("x").to_string().contains("raster error:"));
        assert!(
            DiffuseError::schedule("x")
                .to_string()
                .contains("schedule error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = DiffuseError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
