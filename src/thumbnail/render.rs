use bytes::Bytes;

use super::command::Frame;
use crate::handlers::{HandlerError, Picture};

/// Produces thumbnail bytes for a picture laid out in a frame
///
/// Resampling lives behind this trait so the registry never links an image
/// codec itself.
pub trait Renderer: Send + Sync {
    fn render(&self, picture: &Picture, frame: &Frame) -> Result<Bytes, HandlerError>;
}

/// Hands the source bytes back untouched
#[derive(Debug, Clone, Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(&self, picture: &Picture, frame: &Frame) -> Result<Bytes, HandlerError> {
        tracing::debug!(
            canvas = %frame.canvas,
            size = picture.bytes.len(),
            "Passthrough render"
        );
        Ok(picture.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Dimension;

    #[test]
    fn test_passthrough_returns_source() {
        let picture = Picture {
            bytes: Bytes::from_static(b"\x89PNG"),
            mime: "image/png".to_string(),
            dimension: None,
        };
        let frame = Frame {
            canvas: Dimension::new(10, 10),
            size: Dimension::new(10, 10),
            offset: (0, 0),
        };

        let out = PassthroughRenderer.render(&picture, &frame).unwrap();
        assert_eq!(out, picture.bytes);
    }
}
