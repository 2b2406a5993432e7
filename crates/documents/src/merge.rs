//! PDF page concatenation on top of `lopdf`.
//!
//! [`PdfAccumulator`] holds the in-progress merged document. Appending a
//! document renumbers its objects past the accumulator's highest id, copies
//! them over, and re-parents its pages (with inherited attributes resolved)
//! under the accumulator's page tree root. A failed append leaves the
//! accumulator untouched.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::MergeError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed (cyclic) `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfAccumulator {
    doc: Document,
    pages_id: ObjectId,
}

impl PdfAccumulator {
    /// Start from the base (cover) document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MergeError> {
        let doc = Document::load_mem(bytes)?;
        let pages_id = page_tree_root(&doc)?;
        Ok(Self { doc, pages_id })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Append every page of `bytes`. Returns the number of pages added.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize, MergeError> {
        let mut other = Document::load_mem(bytes)?;
        page_tree_root(&other)?;
        other.renumber_objects_with(self.doc.max_id + 1);

        let mut pages = Vec::new();
        for page_id in other.get_pages().into_values() {
            let mut page = flatten_page(&other, page_id)?;
            page.set("Parent", self.pages_id);
            pages.push((page_id, page));
        }
        if pages.is_empty() {
            return Ok(0);
        }

        // Everything fallible about the target is checked before writing.
        let count = kid_count(&self.doc, self.pages_id)?;

        self.doc.max_id = self.doc.max_id.max(other.max_id);
        for (id, object) in other.objects {
            if !is_tree_node(&object) {
                self.doc.objects.insert(id, object);
            }
        }
        let added = pages.len();
        let mut refs = Vec::with_capacity(added);
        for (id, page) in pages {
            self.doc.objects.insert(id, Object::Dictionary(page));
            refs.push(Object::Reference(id));
        }

        let root = self
            .doc
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)?;
        root.get_mut(b"Kids")
            .and_then(Object::as_array_mut)?
            .extend(refs);
        root.set("Count", (count + added) as i64);

        Ok(added)
    }

    /// Serialise the merged document.
    pub fn finish(mut self) -> Result<Vec<u8>, MergeError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| MergeError::Serialize(e.to_string()))?;
        Ok(buffer)
    }
}

fn page_tree_root(doc: &Document) -> Result<ObjectId, MergeError> {
    let pages_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| doc.get_dictionary(root))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| MergeError::MissingPageTree)?;
    kid_count(doc, pages_id)?;
    Ok(pages_id)
}

/// Leaf page count of a page tree node, checking it has a `/Kids` array.
fn kid_count(doc: &Document, pages_id: ObjectId) -> Result<usize, MergeError> {
    let node = doc
        .get_dictionary(pages_id)
        .map_err(|_| MergeError::MissingPageTree)?;
    let kids = node
        .get(b"Kids")
        .and_then(Object::as_array)
        .map_err(|_| MergeError::MissingPageTree)?;
    Ok(node
        .get(b"Count")
        .and_then(Object::as_i64)
        .map(|c| c.max(0) as usize)
        .unwrap_or(kids.len()))
}

/// Copy of a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, MergeError> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(parent_id)?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(page)
}

fn is_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|d| d.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| name == b"Catalog" || name == b"Pages")
        .unwrap_or(false)
}
