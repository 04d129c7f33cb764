//! Page tree walking.
//!
//! The tree is walked depth-first with an explicit stack, so deep trees do
//! not recurse and a node reached twice is skipped instead of looping.

use super::catalog::Document;
use super::health::IssueKind;
use crate::error::Result;
use crate::model::{Dictionary, ObjRef, Object};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// US Letter, used when no `MediaBox` is found anywhere up the tree.
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A leaf of the page tree with inherited attributes applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub obj_ref: ObjRef,
    /// The page dictionary, with inherited entries filled in.
    pub attrs: Dictionary,
    pub resources: Dictionary,
    pub media_box: [f64; 4],
    pub crop_box: [f64; 4],
    /// Degrees, normalized into `0..360`.
    pub rotate: i64,
    /// Content streams in drawing order (usually references).
    pub contents: Vec<Object>,
    pub annots: Vec<Object>,
}

impl Page {
    fn from_attrs(doc: &Document, obj_ref: ObjRef, attrs: Dictionary) -> Result<Self> {
        let media_box = match page_box(doc, &attrs, "MediaBox") {
            Some(b) => b,
            None => {
                doc.health().record(
                    IssueKind::MissingMediaBox,
                    None,
                    format!("page {obj_ref} has no MediaBox, using US Letter"),
                );
                DEFAULT_MEDIA_BOX
            }
        };
        let crop_box = page_box(doc, &attrs, "CropBox").unwrap_or(media_box);
        let rotate = match attrs.get("Rotate") {
            Some(r) => doc.resolve_object(r)?.as_int().unwrap_or(0).rem_euclid(360),
            None => 0,
        };
        let resources = match attrs.get("Resources") {
            Some(r) => doc.resolve_dict(r).unwrap_or_default(),
            None => Dictionary::new(),
        };
        let contents = match attrs.get("Contents") {
            None | Some(Object::Null) => Vec::new(),
            Some(Object::Array(items)) => items.clone(),
            Some(r @ Object::Ref(_)) => match doc.resolve_object(r)? {
                // An indirect array of streams
                Object::Array(items) => items,
                Object::Null => Vec::new(),
                _ => vec![r.clone()],
            },
            Some(other) => vec![other.clone()],
        };
        let annots = match attrs.get("Annots") {
            Some(a) => match doc.resolve_object(a)? {
                Object::Array(items) => items,
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        Ok(Self {
            obj_ref,
            attrs,
            resources,
            media_box,
            crop_box,
            rotate,
            contents,
            annots,
        })
    }

    /// Decoded content streams, joined by a newline.
    pub fn content_data(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for content in &self.contents {
            let Object::Stream(stream) = doc.resolve_object(content)? else {
                tracing::debug!(page = %self.obj_ref, "content entry is not a stream");
                continue;
            };
            if !out.is_empty() {
                out.push(b'\n');
            }
            out.extend_from_slice(&doc.stream_data(&stream)?);
        }
        Ok(out)
    }
}

/// A four-number rectangle, elements resolved.
fn page_box(doc: &Document, attrs: &Dictionary, key: &str) -> Option<[f64; 4]> {
    let obj = doc.resolve_object(attrs.get(key)?).ok()?;
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = doc.resolve_object(item).ok()?.as_num().ok()?;
    }
    Some(out)
}

/// Inheritable attributes of one tree node, linked to its parent.
#[derive(Debug)]
struct InheritedNode {
    parent: Option<Arc<InheritedNode>>,
    resources: Option<Object>,
    media_box: Option<Object>,
    crop_box: Option<Object>,
    rotate: Option<Object>,
}

const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

impl InheritedNode {
    fn root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            resources: None,
            media_box: None,
            crop_box: None,
            rotate: None,
        })
    }

    fn from_dict(parent: Arc<InheritedNode>, dict: &Dictionary) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(parent),
            resources: dict.get("Resources").cloned(),
            media_box: dict.get("MediaBox").cloned(),
            crop_box: dict.get("CropBox").cloned(),
            rotate: dict.get("Rotate").cloned(),
        })
    }

    fn own(&self, key: &str) -> Option<&Object> {
        match key {
            "Resources" => self.resources.as_ref(),
            "MediaBox" => self.media_box.as_ref(),
            "CropBox" => self.crop_box.as_ref(),
            "Rotate" => self.rotate.as_ref(),
            _ => None,
        }
    }

    /// Nearest value for `key` walking up the ancestors.
    fn lookup(&self, key: &str) -> Option<&Object> {
        let mut node = Some(self);
        while let Some(n) = node {
            if let Some(value) = n.own(key) {
                return Some(value);
            }
            node = n.parent.as_deref();
        }
        None
    }

    /// Fill inheritable entries `dest` does not set itself.
    fn apply_to(&self, dest: &mut Dictionary) {
        for key in INHERITABLE {
            if !dest.contains_key(key)
                && let Some(value) = self.lookup(key)
            {
                dest.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// Lazy page sequence over the page tree.
///
/// When the tree yields no pages at all, every object typed `/Page` is
/// offered instead, in object-number order.
pub struct PageIter<'a> {
    doc: &'a Document,
    stack: Vec<(Object, Arc<InheritedNode>)>,
    visited: FxHashSet<ObjRef>,
    /// Root `/Count`, checked once the walk finishes.
    expected: Option<i64>,
    yielded: usize,
    fallback: Option<std::vec::IntoIter<ObjRef>>,
    finished: bool,
}

impl<'a> PageIter<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        let stack = match doc.catalog().get("Pages") {
            Some(root) => vec![(root.clone(), InheritedNode::root())],
            None => Vec::new(),
        };
        Self {
            doc,
            stack,
            visited: FxHashSet::default(),
            expected: doc.page_count(),
            yielded: 0,
            fallback: None,
            finished: false,
        }
    }

    fn next_from_tree(&mut self) -> Option<Result<Page>> {
        while let Some((node, inherited)) = self.stack.pop() {
            let obj_ref = match &node {
                &Object::Ref(r) => {
                    if !self.visited.insert(r) {
                        self.doc.health().record(
                            IssueKind::PageTreeCycle,
                            None,
                            format!("page tree reaches {r} twice"),
                        );
                        continue;
                    }
                    r
                }
                _ => ObjRef::new(0, 0),
            };

            let dict = match self.doc.resolve_dict(&node) {
                Ok(dict) => dict,
                Err(e) if self.doc.options().strict => return Some(Err(e)),
                Err(e) => {
                    tracing::debug!(node = %obj_ref, error = %e, "skipping unreadable page tree node");
                    continue;
                }
            };

            if is_tree_node(&dict) {
                let inherited = InheritedNode::from_dict(inherited, &dict);
                let kids = match dict.get("Kids").map(|k| self.doc.resolve_object(k)) {
                    Some(Ok(Object::Array(kids))) => kids,
                    Some(Err(e)) if self.doc.options().strict => return Some(Err(e)),
                    _ => Vec::new(),
                };
                // Reverse so the first kid is popped first
                for kid in kids.into_iter().rev() {
                    self.stack.push((kid, Arc::clone(&inherited)));
                }
                continue;
            }

            let mut attrs = dict;
            inherited.apply_to(&mut attrs);
            self.yielded += 1;
            return Some(Page::from_attrs(self.doc, obj_ref, attrs));
        }
        None
    }

    fn next_from_objects(&mut self) -> Option<Result<Page>> {
        let doc = self.doc;
        let ids = self.fallback.get_or_insert_with(|| {
            tracing::debug!("page tree yielded nothing, looking for /Type /Page objects");
            doc.object_ids().into_iter()
        });
        for obj_ref in ids.by_ref() {
            let Ok(obj) = doc.resolve(obj_ref.obj_num, obj_ref.gen_num) else {
                continue;
            };
            if let Object::Dict(dict) = obj.value()
                && dict.get("Type").and_then(|t| t.as_name().ok()) == Some("Page")
            {
                return Some(Page::from_attrs(doc, obj_ref, dict.clone()));
            }
        }
        None
    }

    fn check_count(&self) {
        if let Some(expected) = self.expected
            && expected != self.yielded as i64
        {
            self.doc.health().record(
                IssueKind::PageCountMismatch,
                None,
                format!("page tree declares {expected} pages, found {}", self.yielded),
            );
        }
    }
}

fn is_tree_node(dict: &Dictionary) -> bool {
    match dict.get("Type").and_then(|t| t.as_name().ok()) {
        Some("Pages") => true,
        Some("Page") => false,
        _ => dict.contains_key("Kids"),
    }
}

impl Iterator for PageIter<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.fallback.is_none() {
            if let Some(page) = self.next_from_tree() {
                return Some(page);
            }
            self.check_count();
            if self.yielded > 0 {
                self.finished = true;
                return None;
            }
        }
        let page = self.next_from_objects();
        if page.is_none() {
            self.finished = true;
        }
        page
    }
}
