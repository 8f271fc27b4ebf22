pub use fuller_core::*;

#[cfg(feature = "flush")]
pub mod flush {
    pub use fuller_flush::*;
}

#[cfg(feature = "evict")]
pub mod evict {
    pub use fuller_evict::*;
}
