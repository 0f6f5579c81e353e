use log::debug;
use resvg::usvg;
use std::time::Duration;
use thiserror::Error;

use crate::{
    codec,
    manifest::{strip_extension, Manifest, Placement},
    svg::{
        recolor::recolor,
        viewport::{map_point, map_vector, view_box_transform},
        Document, ParseError,
    },
};

pub mod context;

pub use context::RenderContext;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("SVG source is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("SVG has no visible content to measure")]
    EmptyContent,

    #[error("Failed to allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("Canvas has not been sized")]
    Unsized,

    #[error("Failed to decode SVG")]
    Decode(#[source] usvg::Error),

    #[error("SVG did not decode within {0:?}")]
    Timeout(Duration),

    #[error("SVG decode worker failed")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Inputs for rendering one file.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    /// File name of the source; its stem keys the manifest entry.
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color: Option<String>,
}

impl RenderRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the output size. A missing height falls back to the width.
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height.or(width);
        self
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    pub fn key(&self) -> &str {
        strip_extension(&self.name)
    }
}

fn round_px(value: f32) -> u32 {
    value.round().max(0.0) as u32
}

/// Renders one SVG to PNG and returns the image as Base64 text.
///
/// The document is fitted to its content by setting its viewBox to the
/// content bounding box, then sized to the requested dimensions. When a
/// manifest is given, the content box is recorded in canvas pixels: the
/// box origin goes through the viewBox transform as a point and its
/// extent as a vector, so `left`/`top` are the offset of the content
/// from the canvas origin.
///
/// Measuring and decoding all run against the context's decode timeout,
/// counted from the moment the document is attached.
pub async fn render(
    context: &mut RenderContext,
    source: &[u8],
    request: &RenderRequest,
    manifest: Option<&mut Manifest>,
) -> Result<String, RenderError> {
    let document = Document::parse(std::str::from_utf8(source)?)?;

    let mut attachment = context.attach(&request.name, document);
    let deadline = attachment.deadline();

    let bbox = attachment.bounding_box().await?;
    debug!("{}: content box {bbox}", request.name);

    let root = attachment.root_mut();
    root.set_attribute("viewBox", bbox.to_string());
    if let Some(width) = request.width {
        root.set_attribute("width", width.to_string());
    }
    if let Some(height) = request.height {
        root.set_attribute("height", height.to_string());
    }

    let (viewport_width, viewport_height) = attachment.viewport_size().await?;
    let (width, height) = (round_px(viewport_width), round_px(viewport_height));
    attachment.canvas().resize(width, height)?;

    // The content box is measured without a viewBox, so the size
    // attributes set above leave it unchanged.
    if let Some(manifest) = manifest {
        let ctm = view_box_transform(
            bbox,
            attachment.aspect_ratio(),
            viewport_width,
            viewport_height,
        );

        let (left, top) = map_point(ctm, bbox.x, bbox.y);
        let (extent_x, extent_y) = map_vector(ctm, bbox.width, bbox.height);
        let placement = Placement {
            width: round_px(extent_x),
            height: round_px(extent_y),
            left: round_px(left),
            top: round_px(top),
        };

        let entry = manifest.entry(placement, request.color.clone(), (width, height));
        manifest.record(request.key(), entry);
    }

    if let Some(color) = &request.color {
        recolor(attachment.root_mut(), color);
    }

    let markup = attachment.detach().to_markup();

    let image = context.decode(markup, deadline).await?;

    let canvas = context.canvas_mut();
    canvas.clear()?;
    canvas.draw(&image)?;
    let data_url = canvas.to_data_url()?;

    debug!("{}: rendered {width}x{height}", request.name);

    Ok(codec::strip_data_url(&data_url).to_string())
}
