use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::handlers::Dimension;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown thumbnail type: {0}")]
    UnknownType(String),
}

/// How a picture is laid into the target dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailType {
    /// Scale down to fit inside the box, keep aspect
    Fit,
    /// Fit, then pad to the full box
    Letter,
    /// Cover the box, cut the overflow
    Crop,
    /// Ignore aspect, take the box as is
    Stretch,
    /// Match the box width
    Widen,
    /// Match the box height
    Heighten,
    /// Cover the box, keep the overflow
    Spill,
}

impl ThumbnailType {
    pub const ALL: [ThumbnailType; 7] = [
        ThumbnailType::Fit,
        ThumbnailType::Letter,
        ThumbnailType::Crop,
        ThumbnailType::Stretch,
        ThumbnailType::Widen,
        ThumbnailType::Heighten,
        ThumbnailType::Spill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailType::Fit => "fit",
            ThumbnailType::Letter => "letter",
            ThumbnailType::Crop => "crop",
            ThumbnailType::Stretch => "stretch",
            ThumbnailType::Widen => "widen",
            ThumbnailType::Heighten => "heighten",
            ThumbnailType::Spill => "spill",
        }
    }
}

impl fmt::Display for ThumbnailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailType {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or(CommandError::UnknownType(normalized))
    }
}

/// Output geometry of one thumbnail
///
/// `size` is the scaled picture, `canvas` the final image. `offset` places
/// the picture on the canvas and is negative when the picture overflows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub canvas: Dimension,
    pub size: Dimension,
    pub offset: (i64, i64),
}

impl Frame {
    fn plain(size: Dimension) -> Self {
        Self {
            canvas: size,
            size,
            offset: (0, 0),
        }
    }

    fn centered(canvas: Dimension, size: Dimension) -> Self {
        Self {
            canvas,
            size,
            offset: (
                (i64::from(canvas.width) - i64::from(size.width)) / 2,
                (i64::from(canvas.height) - i64::from(size.height)) / 2,
            ),
        }
    }
}

/// Per-dimension thumbnail instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCommand {
    kind: ThumbnailType,
    dimension: Option<Dimension>,
}

impl ThumbnailCommand {
    pub fn new(kind: ThumbnailType) -> Self {
        Self {
            kind,
            dimension: None,
        }
    }

    pub fn kind(&self) -> ThumbnailType {
        self.kind
    }

    pub fn set_dimension(&mut self, dimension: Dimension) {
        self.dimension = Some(dimension);
    }

    pub fn dimension(&self) -> Option<Dimension> {
        self.dimension
    }

    /// Compute the output geometry for a picture of `source` size
    ///
    /// Without a target dimension the source is kept as is. Without a usable
    /// source size the target is taken verbatim.
    pub fn frame(&self, source: Option<Dimension>) -> Frame {
        let Some(target) = self.dimension else {
            return Frame::plain(source.unwrap_or(Dimension::new(0, 0)));
        };

        let source = match source {
            Some(s) if s.width > 0 && s.height > 0 => s,
            _ => return Frame::plain(target),
        };

        let sx = f64::from(target.width) / f64::from(source.width);
        let sy = f64::from(target.height) / f64::from(source.height);

        match self.kind {
            ThumbnailType::Stretch => Frame::plain(target),
            ThumbnailType::Fit => Frame::plain(scale(source, sx.min(sy))),
            ThumbnailType::Letter => Frame::centered(target, scale(source, sx.min(sy))),
            ThumbnailType::Crop => Frame::centered(target, scale(source, sx.max(sy))),
            ThumbnailType::Spill => Frame::plain(scale(source, sx.max(sy))),
            ThumbnailType::Widen => Frame::plain(scale(source, sx)),
            ThumbnailType::Heighten => Frame::plain(scale(source, sy)),
        }
    }
}

fn scale(source: Dimension, factor: f64) -> Dimension {
    let px = |v: u32| ((f64::from(v) * factor).round() as u32).max(1);
    Dimension::new(px(source.width), px(source.height))
}

/// Builds thumbnail commands by type name
#[derive(Debug, Clone)]
pub struct CommandFactory {
    kinds: BTreeMap<String, ThumbnailType>,
}

impl CommandFactory {
    pub fn new() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Factory knowing every built-in type under its own name
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        for kind in ThumbnailType::ALL {
            factory.alias(kind.as_str(), kind);
        }
        factory
    }

    /// Make `name` produce commands of `kind`
    pub fn alias(&mut self, name: &str, kind: ThumbnailType) {
        self.kinds.insert(name.trim().to_lowercase(), kind);
    }

    pub fn supports(&self, name: &str) -> bool {
        self.kinds.contains_key(&name.trim().to_lowercase())
    }

    pub fn make(&self, name: &str) -> Result<ThumbnailCommand, CommandError> {
        let normalized = name.trim().to_lowercase();
        self.kinds
            .get(&normalized)
            .map(|kind| ThumbnailCommand::new(*kind))
            .ok_or(CommandError::UnknownType(normalized))
    }
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}
