use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixelGridError {
    /// Uploaded bytes are not a decodable image. No job is created and no
    /// session state changes when this is returned.
    #[error("Unsupported source: not an image")]
    UnsupportedSource,

    #[error("No source loaded")]
    NoSource,

    #[error("Animation decode error: {0}")]
    Decode(String),

    #[error("Image load error: {0}")]
    Load(#[from] image::ImageError),

    #[error("Color grid has zero rows or columns")]
    EmptyGrid,

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PixelGridError>;

// Implement Serialize so failures cross the shell boundary as plain text
impl serde::Serialize for PixelGridError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
