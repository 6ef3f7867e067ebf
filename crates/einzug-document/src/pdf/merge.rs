// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered PDF concatenation using `lopdf`.
//
// The first source becomes the base document. Pages of every further source
// are brought in by an object importer that rewrites references as it walks,
// then linked into the base page tree in one pass. The importer maps each
// source object id to exactly one target id, so resources shared between
// pages of a source (fonts, images) are imported once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use einzug_core::error::{EinzugError, Result};

/// Concatenate `sources` (in order) into a single PDF written to `target`.
///
/// Fails if `sources` is empty — the pipeline never publishes an empty batch,
/// so an empty list here is a caller bug.
#[instrument(skip_all, fields(count = sources.len(), target = %target.display()))]
pub fn merge_files(sources: &[PathBuf], target: &Path) -> Result<()> {
    let (first, rest) = sources
        .split_first()
        .ok_or_else(|| EinzugError::Pdf("merge called with no input files".into()))?;

    info!(base = %first.display(), additional = rest.len(), "merging PDFs");

    let mut merged = load(first)?;
    let pages_root = page_tree_root(&merged)?;

    let mut appended = Vec::new();
    for path in rest {
        let source = load(path)?;
        let mut importer = ObjectImporter::new(&source, &mut merged);
        for page_id in source.get_pages().values() {
            appended.push(importer.import_page(*page_id)?);
        }
    }
    link_pages(&mut merged, pages_root, &appended)?;

    merged
        .save(target)
        .map_err(|err| EinzugError::Pdf(format!("failed to write merged PDF: {err}")))?;

    debug!(pages_appended = appended.len(), "merge complete");
    Ok(())
}

fn load(path: &Path) -> Result<Document> {
    Document::load(path)
        .map_err(|err| EinzugError::Pdf(format!("failed to open {}: {err}", path.display())))
}

/// The /Pages node referenced by the document catalog.
fn page_tree_root(doc: &Document) -> Result<ObjectId> {
    let catalog = doc
        .catalog()
        .map_err(|err| EinzugError::Pdf(format!("document has no catalog: {err}")))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(EinzugError::Pdf("document has no page tree root".into())),
    }
}

/// Wire the appended pages into the base page tree: parent pointers on each
/// page, then /Kids and /Count on the root.
fn link_pages(doc: &mut Document, pages_root: ObjectId, appended: &[ObjectId]) -> Result<()> {
    for &page_id in appended {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_root));
        }
    }

    let Ok(Object::Dictionary(root)) = doc.get_object_mut(pages_root) else {
        return Err(EinzugError::Pdf("page tree root is not a dictionary".into()));
    };
    match root.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => {
            kids.extend(appended.iter().map(|id| Object::Reference(*id)));
        }
        _ => return Err(EinzugError::Pdf("page tree root has no /Kids array".into())),
    }
    match root.get_mut(b"Count") {
        Ok(Object::Integer(count)) => *count += appended.len() as i64,
        _ => return Err(EinzugError::Pdf("page tree root has no /Count".into())),
    }
    Ok(())
}

/// Copies an object graph from one document into another, rewriting every
/// reference to the target's id space.
///
/// Each source id is claimed in the target before its object is descended
/// into, which both terminates reference cycles and ensures a shared resource
/// is imported exactly once. /Parent entries are dropped on the way in;
/// `link_pages` re-establishes them against the base page tree.
struct ObjectImporter<'s, 't> {
    source: &'s Document,
    target: &'t mut Document,
    imported: BTreeMap<ObjectId, ObjectId>,
}

impl<'s, 't> ObjectImporter<'s, 't> {
    fn new(source: &'s Document, target: &'t mut Document) -> Self {
        Self {
            source,
            target,
            imported: BTreeMap::new(),
        }
    }

    fn import_page(&mut self, page_id: ObjectId) -> Result<ObjectId> {
        match self.import_ref(page_id) {
            Object::Reference(new_id) => Ok(new_id),
            _ => Err(EinzugError::Pdf(format!(
                "page object {page_id:?} missing from source"
            ))),
        }
    }

    fn import_ref(&mut self, id: ObjectId) -> Object {
        if let Some(&new_id) = self.imported.get(&id) {
            return Object::Reference(new_id);
        }

        let source: &'s Document = self.source;
        let Ok(object) = source.get_object(id) else {
            warn!(?id, "dangling reference in source, dropping");
            return Object::Null;
        };

        // Claim the target id up front so cycles resolve to it.
        let new_id = self.target.new_object_id();
        self.imported.insert(id, new_id);

        let rewritten = self.rewrite(object);
        self.target.objects.insert(new_id, rewritten);
        Object::Reference(new_id)
    }

    fn rewrite(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.import_ref(*id),
            Object::Dictionary(dict) => Object::Dictionary(self.rewrite_dict(dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.rewrite(item)).collect())
            }
            Object::Stream(stream) => Object::Stream(Stream::new(
                self.rewrite_dict(&stream.dict),
                stream.content.clone(),
            )),
            scalar => scalar.clone(),
        }
    }

    fn rewrite_dict(&mut self, dict: &Dictionary) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            out.set(key.clone(), self.rewrite(value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page::PageWriter;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn write_page_pdf(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([128, 128, 128]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");

        let path = dir.join(name);
        PageWriter::new(300, false)
            .write_page(&buf.into_inner(), &path)
            .expect("write page pdf");
        path
    }

    #[test]
    fn merge_concatenates_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p0 = write_page_pdf(dir.path(), "0.pdf", 4, 4);
        let p1 = write_page_pdf(dir.path(), "1.pdf", 8, 8);
        let p2 = write_page_pdf(dir.path(), "2.pdf", 12, 12);

        let target = dir.path().join("no_ocr.pdf");
        merge_files(&[p0, p1, p2], &target).expect("merge");

        let merged = Document::load(&target).expect("load merged");
        assert_eq!(merged.get_pages().len(), 3);
    }

    #[test]
    fn single_file_merge_is_a_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p0 = write_page_pdf(dir.path(), "0.pdf", 4, 4);

        let target = dir.path().join("no_ocr.pdf");
        merge_files(&[p0], &target).expect("merge");

        let merged = Document::load(&target).expect("load merged");
        assert_eq!(merged.get_pages().len(), 1);
    }

    #[test]
    fn multi_page_sources_keep_their_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p0 = write_page_pdf(dir.path(), "0.pdf", 4, 4);
        let p1 = write_page_pdf(dir.path(), "1.pdf", 8, 8);
        let p2 = write_page_pdf(dir.path(), "2.pdf", 12, 12);

        // First merge produces a two-page document, which then takes part in
        // a second merge as a non-base source.
        let pair = dir.path().join("pair.pdf");
        merge_files(&[p0, p1], &pair).expect("first merge");

        let target = dir.path().join("no_ocr.pdf");
        merge_files(&[p2, pair], &target).expect("second merge");

        let merged = Document::load(&target).expect("load merged");
        assert_eq!(merged.get_pages().len(), 3);
    }

    #[test]
    fn empty_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("no_ocr.pdf");
        let err = merge_files(&[], &target).unwrap_err();
        assert!(matches!(err, EinzugError::Pdf(_)));
    }
}
