use std::path::PathBuf;

/// Errors produced by the MSDF atlas pipeline.
#[derive(Debug)]
pub enum MsdfError {
    /// The font bytes could not be parsed.
    FontLoadFailed { reason: String },

    /// The font has no glyph for this codepoint.
    GlyphNotFound { codepoint: char },

    /// The packed atlas would exceed the texture dimension ceiling.
    AtlasTooLarge {
        required_width: u64,
        required_height: u64,
        max_dimension: u32,
    },

    /// Atlas generation stopped; wraps the underlying cause.
    AtlasGenerationFailed(Box<MsdfError>),

    /// A configuration value is out of range.
    InvalidConfig { reason: String },

    /// Reading or writing an atlas file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An interchange JSON document is malformed or inconsistent.
    Interchange { reason: String },

    /// PNG encoding or decoding failed.
    Image { reason: String },

    /// The background generation thread panicked.
    WorkerPanicked,
}

impl MsdfError {
    /// Wrap `self` as the cause of a failed atlas generation.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn into_generation_failure(self) -> Self {
        match self {
            MsdfError::AtlasGenerationFailed(_) => self,
            other => MsdfError::AtlasGenerationFailed(Box::new(other)),
        }
    }

    /// The innermost error behind any number of `AtlasGenerationFailed` layers.
    pub fn root_cause(&self) -> &MsdfError {
        let mut current = self;
        while let MsdfError::AtlasGenerationFailed(inner) = current {
            current = inner;
        }
        current
    }
}

impl std::fmt::Display for MsdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MsdfError::FontLoadFailed { reason } => write!(f, "Failed to load font: {}", reason),
            MsdfError::GlyphNotFound { codepoint } => write!(
                f,
                "Glyph not found for U+{:04X} ({:?})",
                *codepoint as u32, codepoint
            ),
            MsdfError::AtlasTooLarge {
                required_width,
                required_height,
                max_dimension,
            } => write!(
                f,
                "Atlas too large: requires {}x{} but the limit is {}x{}",
                required_width, required_height, max_dimension, max_dimension
            ),
            MsdfError::AtlasGenerationFailed(inner) => {
                write!(f, "Atlas generation failed: {}", inner)
            }
            MsdfError::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
            MsdfError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
            MsdfError::Interchange { reason } => {
                write!(f, "Invalid atlas document: {}", reason)
            }
            MsdfError::Image { reason } => write!(f, "Image error: {}", reason),
            MsdfError::WorkerPanicked => write!(f, "Atlas worker thread panicked"),
        }
    }
}

impl std::error::Error for MsdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MsdfError::AtlasGenerationFailed(inner) => Some(inner.as_ref()),
            MsdfError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ttf_parser::FaceParsingError> for MsdfError {
    fn from(err: ttf_parser::FaceParsingError) -> Self {
        MsdfError::FontLoadFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MsdfError {
    fn from(err: serde_json::Error) -> Self {
        MsdfError::Interchange {
            reason: err.to_string(),
        }
    }
}

impl From<image::ImageError> for MsdfError {
    fn from(err: image::ImageError) -> Self {
        MsdfError::Image {
            reason: err.to_string(),
        }
    }
}

/// Result type for MSDF operations.
pub type MsdfResult<T> = Result<T, MsdfError>;
