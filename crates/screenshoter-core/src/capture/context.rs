//! Browsing context hierarchy
//!
//! Pages nest documents: iframes inside the main document, iframes inside
//! iframes, shadow roots inside host elements. Every context has its own
//! client coordinate space. [`ContextTree`] stores the hierarchy as an arena
//! indexed by [`ContextId`]; children refer to their parent by index and never
//! own it.
//!
//! Client coordinates of a frame start at the frame's content box, so a point
//! moves into the parent's space by adding the client location of the
//! frame's host element. Shadow roots share the coordinate space of their
//! host's document.

use std::fmt;

use crate::{
    capture::DriverSession,
    error::{CaptureError, CaptureResult},
    model::{ElementId, Offset, Region},
};

/// Index of a context inside a [`ContextTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    /// Raw arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

/// What kind of document boundary a context represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Top-level document
    Main,
    /// Document of an iframe element
    Frame,
    /// Shadow tree attached to a host element
    ShadowRoot,
}

#[derive(Debug, Clone)]
struct ContextNode {
    kind:              ContextKind,
    parent:            Option<ContextId>,
    host:              Option<ElementId>,
    scrolling_element: Option<ElementId>,
}

/// Arena of browsing contexts rooted at the main document
#[derive(Debug, Clone)]
pub struct ContextTree {
    nodes: Vec<ContextNode>,
}

impl ContextTree {
    /// Creates a tree holding only the main document
    pub fn new(scrolling_element: Option<ElementId>) -> Self {
        Self {
            nodes: vec![ContextNode {
                kind: ContextKind::Main,
                parent: None,
                host: None,
                scrolling_element,
            }],
        }
    }

    /// The main document
    pub fn main(&self) -> ContextId {
        ContextId(0)
    }

    /// Number of contexts in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the main document is always present
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: ContextId) -> CaptureResult<&ContextNode> {
        self.nodes
            .get(id.0)
            .ok_or(CaptureError::ContextNotFound { context: id.0 })
    }

    fn push(&mut self, node: ContextNode) -> ContextId {
        self.nodes.push(node);
        ContextId(self.nodes.len() - 1)
    }

    /// Adds an iframe document hosted by `host` inside `parent`
    pub fn add_frame(
        &mut self,
        parent: ContextId,
        host: ElementId,
        scrolling_element: Option<ElementId>,
    ) -> CaptureResult<ContextId> {
        self.node(parent)?;
        Ok(self.push(ContextNode {
            kind: ContextKind::Frame,
            parent: Some(parent),
            host: Some(host),
            scrolling_element,
        }))
    }

    /// Adds a shadow root attached to `host` inside `parent`
    pub fn add_shadow_root(&mut self, parent: ContextId, host: ElementId) -> CaptureResult<ContextId> {
        self.node(parent)?;
        Ok(self.push(ContextNode {
            kind: ContextKind::ShadowRoot,
            parent: Some(parent),
            host: Some(host),
            scrolling_element: None,
        }))
    }

    /// Kind of a context
    pub fn kind(&self, id: ContextId) -> CaptureResult<ContextKind> {
        Ok(self.node(id)?.kind)
    }

    /// Parent of a context, `None` for the main document
    pub fn parent(&self, id: ContextId) -> CaptureResult<Option<ContextId>> {
        Ok(self.node(id)?.parent)
    }

    /// Element hosting a frame or shadow root inside its parent
    pub fn host(&self, id: ContextId) -> CaptureResult<Option<&ElementId>> {
        Ok(self.node(id)?.host.as_ref())
    }

    /// Element that scrolls the content of a context
    pub fn scrolling_element(&self, id: ContextId) -> CaptureResult<Option<&ElementId>> {
        Ok(self.node(id)?.scrolling_element.as_ref())
    }

    /// Contexts from `id` up to and including the main document
    pub fn path(&self, id: ContextId) -> CaptureResult<Vec<ContextId>> {
        let mut path = vec![id];
        let mut current = self.parent(id)?;
        while let Some(parent) = current {
            path.push(parent);
            current = self.parent(parent)?;
        }
        Ok(path)
    }

    /// Host element whose client location shifts a context into its parent
    ///
    /// Only frames start a new coordinate space.
    pub fn frame_host(&self, id: ContextId) -> CaptureResult<Option<&ElementId>> {
        let node = self.node(id)?;
        Ok(match node.kind {
            ContextKind::Frame => node.host.as_ref(),
            ContextKind::Main | ContextKind::ShadowRoot => None,
        })
    }

    /// Location of a context's client origin in viewport coordinates
    pub async fn location_in_viewport(
        &self,
        session: &DriverSession,
        id: ContextId,
    ) -> CaptureResult<Offset> {
        let mut location = Offset::zero();
        for context in self.path(id)? {
            if let Some(host) = self.frame_host(context)? {
                location = location + session.scroll.get_client_region(host).await?.location();
            }
        }
        Ok(location)
    }

    /// Visible part of `region` (client coordinates of `id`) in viewport
    /// coordinates
    ///
    /// The region is clipped by every enclosing frame and by the viewport.
    /// An empty result means the region is not visible at the current scroll
    /// positions.
    pub async fn region_in_viewport(
        &self,
        session: &DriverSession,
        id: ContextId,
        region: Region,
    ) -> CaptureResult<Region> {
        let mut current = region;
        for context in self.path(id)? {
            if let Some(host) = self.frame_host(context)? {
                let host_region = session.scroll.get_client_region(host).await?;
                current = current.offset(host_region.location()).intersect(&host_region);
            }
        }

        let viewport = Region::from_size(session.viewport.get_viewport_size().await?);
        let visible = current.intersect(&viewport);
        tracing::trace!("Region {} in {} is {} in viewport", region, id, visible);
        Ok(visible)
    }
}
