//! Fixed-order shadow composition from content snapshot to finished surface.

pub(crate) mod build;
