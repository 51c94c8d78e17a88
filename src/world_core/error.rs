use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid height field dimensions {width}x{depth}, both must be > 0")]
    InvalidDimensions { width: usize, depth: usize },

    #[error("height field needs {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to load heightmap image {}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save heightmap image {}", path.display())]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start chunk loader: {0}")]
    LoaderSetup(String),
}

pub type Result<T> = std::result::Result<T, TerrainError>;
