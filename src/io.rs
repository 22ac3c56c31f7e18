use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::{Color, ColorParseError};

/// File name offered for the exported bitmap.
pub const EXPORT_IMAGE_NAME: &str = "drawing.png";
/// File name offered for the saved project.
pub const EXPORT_PROJECT_NAME: &str = "project.json";
/// The only project format version this build understands.
pub const PROJECT_VERSION: u32 = 1;

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted project or import files.
const MAX_IMAGE_DIM: u32 = 32_768;

// ============================================================================
// ERRORS
// ============================================================================

/// Bitmap encode/decode failures.
#[derive(Debug)]
pub enum CodecError {
    Encode(String),
    Decode(String),
    DataUri(String),
    TooLarge { width: u32, height: u32 },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Encode(e) => write!(f, "encode error: {}", e),
            CodecError::Decode(e) => write!(f, "decode error: {}", e),
            CodecError::DataUri(e) => write!(f, "invalid data URI: {}", e),
            CodecError::TooLarge { width, height } => {
                write!(f, "image too large: {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        CodecError::DataUri(e.to_string())
    }
}

/// Reasons a project document is rejected. The surface is never touched when
/// one of these is returned.
#[derive(Debug)]
pub enum ProjectError {
    Parse(String),
    UnsupportedVersion(u32),
    InvalidColor(ColorParseError),
    Image(CodecError),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Parse(e) => write!(f, "malformed project: {}", e),
            ProjectError::UnsupportedVersion(v) => {
                write!(f, "unsupported project version {} (expected {})", v, PROJECT_VERSION)
            }
            ProjectError::InvalidColor(e) => write!(f, "bad background: {}", e),
            ProjectError::Image(e) => write!(f, "bad image: {}", e),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Parse(e.to_string())
    }
}

impl From<CodecError> for ProjectError {
    fn from(e: CodecError) -> Self {
        ProjectError::Image(e)
    }
}

impl From<ColorParseError> for ProjectError {
    fn from(e: ColorParseError) -> Self {
        ProjectError::InvalidColor(e)
    }
}

// ============================================================================
// BITMAP CODEC
// ============================================================================

/// Encode an RGBA buffer as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new(&mut out);
    #[allow(deprecated)]
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e: ImageError| CodecError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode any supported raster format into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let reader = image::io::Reader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    if width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
        return Err(CodecError::TooLarge { width, height });
    }
    let decoded = image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

/// `data:image/png;base64,...`
pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Extract the payload bytes of a base64 `data:image/*` URI.
pub fn from_data_uri(uri: &str) -> Result<Vec<u8>, CodecError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| CodecError::DataUri("missing 'data:' prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CodecError::DataUri("missing ',' separator".into()))?;
    let mut parts = meta.split(';');
    let mime = parts.next().unwrap_or("");
    if !mime.starts_with("image/") {
        return Err(CodecError::DataUri(format!("unexpected media type '{}'", mime)));
    }
    if !parts.any(|p| p == "base64") {
        return Err(CodecError::DataUri("only base64 payloads are supported".into()));
    }
    Ok(STANDARD.decode(payload.trim())?)
}

// ============================================================================
// PROJECT DOCUMENT
// ============================================================================

fn default_background() -> String {
    Color::WHITE.to_hex()
}

/// The JSON project file: `{ "version": 1, "background": "#ffffff", "image": "data:..." }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    pub version: u32,
    #[serde(default = "default_background")]
    pub background: String,
    pub image: String,
}

/// A validated project, ready to be applied to a surface.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub background: Color,
    pub image: RgbaImage,
}

/// Build the document for the current surface content.
pub fn build_project(pixels: &RgbaImage, background: Color) -> Result<ProjectDocument, CodecError> {
    Ok(ProjectDocument {
        version: PROJECT_VERSION,
        background: background.to_hex(),
        image: to_data_uri(&encode_png(pixels)?),
    })
}

pub fn project_to_json(doc: &ProjectDocument) -> String {
    // A struct of strings and integers always serializes.
    serde_json::to_string(doc).unwrap_or_default()
}

/// Parse and fully validate a project file. Nothing is applied here.
pub fn parse_project(json: &str) -> Result<LoadedProject, ProjectError> {
    let doc: ProjectDocument = serde_json::from_str(json)?;
    if doc.version != PROJECT_VERSION {
        return Err(ProjectError::UnsupportedVersion(doc.version));
    }
    let background: Color = doc.background.parse()?;
    let bytes = from_data_uri(&doc.image)?;
    let image = decode_image(&bytes)?;
    Ok(LoadedProject { background, image })
}
