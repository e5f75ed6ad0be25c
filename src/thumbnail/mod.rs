//! Thumbnail commands
//!
//! A [`CommandFactory`] turns a thumbnail type name ("fit", "crop", ...)
//! into a [`ThumbnailCommand`]. The command carries the target
//! [`Dimension`](crate::handlers::Dimension) and computes the output
//! [`Frame`]; a [`Renderer`] turns that frame into bytes.

mod command;
mod render;

pub use command::{CommandError, CommandFactory, Frame, ThumbnailCommand, ThumbnailType};
pub use render::{PassthroughRenderer, Renderer};
