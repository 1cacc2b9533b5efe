//! Feed construction: mapping decoded rows onto entries, and rendering the
//! Atom document.
//!
//! - [`assembler`] - row → [`FeedEntry`] via the configured field mapping
//! - [`atom`] - Atom XML rendering via quick-xml

pub mod assembler;
pub mod atom;

pub use assembler::{assemble, AssembleError, FeedEntry, DEFAULT_TITLE};
pub use atom::{render, RenderError};
