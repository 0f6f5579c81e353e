use log::{debug, trace};
use resvg::{
    tiny_skia::{Color, Pixmap, Transform},
    usvg::{fontdb::Database, Options, Tree},
};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use super::RenderError;
use crate::{
    codec,
    svg::{
        viewport::{AspectRatio, ViewBox},
        Document, Element,
    },
};

fn usvg_options(fontdb: Arc<Database>) -> Options<'static> {
    Options {
        fontdb,
        ..Default::default()
    }
}

/// The raster target every render draws into.
#[derive(Default)]
pub struct Canvas {
    pixmap: Option<Pixmap>,
}

impl Canvas {
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas { width, height })?;
        self.pixmap = Some(pixmap);
        Ok(())
    }

    #[cfg(test)]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    fn pixmap_mut(&mut self) -> Result<&mut Pixmap, RenderError> {
        self.pixmap.as_mut().ok_or(RenderError::Unsized)
    }

    pub fn clear(&mut self) -> Result<(), RenderError> {
        self.pixmap_mut()?.fill(Color::TRANSPARENT);
        Ok(())
    }

    /// Draws `image` at the origin at its own size.
    pub fn draw(&mut self, image: &Tree) -> Result<(), RenderError> {
        let pixmap = self.pixmap_mut()?;
        resvg::render(image, Transform::identity(), &mut pixmap.as_mut());
        Ok(())
    }

    pub fn to_data_url(&self) -> Result<String, RenderError> {
        let pixmap = self.pixmap.as_ref().ok_or(RenderError::Unsized)?;
        let png = pixmap
            .encode_png()
            .map_err(|err| RenderError::Encode(err.to_string()))?;
        Ok(codec::to_data_url("image/png", &png))
    }
}

/// Owns the shared canvas and the slot a document occupies while it is
/// being measured. Only one document can be attached at a time.
///
/// Every parse of an attached document, including the final decode,
/// shares one deadline that starts when the document is attached.
pub struct RenderContext {
    fontdb: Arc<Database>,
    canvas: Canvas,
    attached: Option<String>,
    decode_timeout: Duration,
}

impl RenderContext {
    pub fn new(fontdb: Arc<Database>, decode_timeout: Duration) -> Self {
        Self {
            fontdb,
            canvas: Canvas::default(),
            attached: None,
            decode_timeout,
        }
    }

    pub fn attach(&mut self, name: &str, document: Document) -> Attachment<'_> {
        trace!("Attaching {name}");
        self.attached = Some(name.to_string());
        let deadline = Instant::now() + self.decode_timeout;
        Attachment {
            guard: AttachGuard { context: self },
            document,
            deadline,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Decodes serialized markup into a drawable image on a blocking
    /// worker, giving up at `deadline`. A decode that overruns keeps its
    /// worker busy until it finishes; its result is discarded.
    pub async fn decode(&self, markup: String, deadline: Instant) -> Result<Tree, RenderError> {
        let fontdb = self.fontdb.clone();
        let task = tokio::task::spawn_blocking(move || {
            Tree::from_str(&markup, &usvg_options(fontdb))
        });

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => result.map_err(RenderError::Decode),
            Ok(Err(err)) => Err(RenderError::Worker(err)),
            Err(_) => Err(RenderError::Timeout(self.decode_timeout)),
        }
    }
}

/// Clears the attachment slot when dropped.
struct AttachGuard<'a> {
    context: &'a mut RenderContext,
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        if let Some(name) = self.context.attached.take() {
            debug!("Detached {name}");
        }
    }
}

/// A document attached to a [`RenderContext`]. Dropping the attachment
/// detaches the document, whichever way the render exits.
pub struct Attachment<'a> {
    guard: AttachGuard<'a>,
    document: Document,
    deadline: Instant,
}

impl Attachment<'_> {
    pub fn root(&self) -> &Element {
        &self.document.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.document.root
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    async fn layout(&self, document: &Document) -> Result<Tree, RenderError> {
        self.guard
            .context
            .decode(document.to_markup(), self.deadline)
            .await
    }

    /// Content bounding box in the document's own user space, ignoring
    /// any viewBox currently set.
    pub async fn bounding_box(&self) -> Result<ViewBox, RenderError> {
        let mut probe = self.document.clone();
        probe.root.remove_attribute("viewBox");

        let tree = self.layout(&probe).await?;
        let rect = tree.root().abs_bounding_box();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return Err(RenderError::EmptyContent);
        }

        Ok(ViewBox {
            x: rect.x(),
            y: rect.y(),
            width: rect.width(),
            height: rect.height(),
        })
    }

    /// Viewport size the document resolves to in its current state.
    pub async fn viewport_size(&self) -> Result<(f32, f32), RenderError> {
        let size = self.layout(&self.document).await?.size();
        Ok((size.width(), size.height()))
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.root()
            .attribute("preserveAspectRatio")
            .map(AspectRatio::parse)
            .unwrap_or_default()
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.guard.context.canvas
    }

    pub fn detach(self) -> Document {
        let Attachment { guard, document, .. } = self;
        drop(guard);
        document
    }
}
