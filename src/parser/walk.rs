//! Forward traversal of pages, subheaders and row-index records.

use crate::error::Result;

use super::byteview::ByteView;
use super::classify::Classified;
use super::descriptor::{RowIndex, Signature};
use super::header::{FileHeader, Layout};
use super::page::{PageHeader, PageType, SubHeaderPointer};
use super::window::{ByteSource, PageWindow};

/// Control returned by a [`Visitor`] for each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    Continue,
    /// Skip the remaining nodes that share this node's parent.
    SkipSiblings,
    /// Skip the children of this node.
    SkipSubtree,
    /// Stop the walk.
    Terminate,
}

/// One subheader as seen by a visitor.
#[derive(Debug, Clone, Copy)]
pub struct Subheader<'a> {
    pub pointer: &'a SubHeaderPointer,
    /// Payload bytes; `None` for empty or truncated pointers.
    pub payload: Option<ByteView<'a>>,
    /// Present only for plain, non-empty payloads.
    pub signature: Option<Classified<Signature>>,
}

/// Callbacks invoked by [`walk`]. Every method defaults to `Continue`.
pub trait Visitor {
    /// # Errors
    ///
    /// Any error aborts the walk and is returned from it.
    fn visit_page(&mut self, _page: &PageHeader) -> Result<VisitResult> {
        Ok(VisitResult::Continue)
    }

    /// # Errors
    ///
    /// Any error aborts the walk and is returned from it.
    fn visit_subheader(&mut self, _page: &PageHeader, _subheader: &Subheader<'_>) -> Result<VisitResult> {
        Ok(VisitResult::Continue)
    }

    /// # Errors
    ///
    /// Any error aborts the walk and is returned from it.
    fn visit_row_index(&mut self, _page: &PageHeader, _entry: &RowIndex) -> Result<VisitResult> {
        Ok(VisitResult::Continue)
    }
}

/// Visits every page of the file in order.
///
/// Subheaders are visited on META, MIX and AMD pages and row-index records on
/// INDEX pages; other page types are visited as leaves.
///
/// # Errors
///
/// Fails on the first structural error or visitor error.
pub fn walk<S, V>(window: &mut PageWindow<S>, header: &FileHeader, visitor: &mut V) -> Result<()>
where
    S: ByteSource,
    V: Visitor + ?Sized,
{
    let layout = header.layout;
    for index in 0..window.page_count() {
        let page = window.load(index)?;
        let page_header = PageHeader::parse(page, index, layout)?;
        match visitor.visit_page(&page_header)? {
            VisitResult::Continue => {}
            VisitResult::SkipSubtree => continue,
            VisitResult::SkipSiblings | VisitResult::Terminate => return Ok(()),
        }
        let flow = if page_header.carries_subheaders() {
            walk_subheaders(page, &page_header, layout, visitor)?
        } else if page_header.known_type() == Some(PageType::Index) {
            walk_row_index(page, &page_header, layout, visitor)?
        } else {
            VisitResult::Continue
        };
        if flow == VisitResult::Terminate {
            return Ok(());
        }
    }
    Ok(())
}

fn walk_subheaders<V: Visitor + ?Sized>(
    page: ByteView<'_>,
    page_header: &PageHeader,
    layout: Layout,
    visitor: &mut V,
) -> Result<VisitResult> {
    for slot in 0..page_header.subheader_count {
        let pointer = SubHeaderPointer::parse(page, page_header, slot, layout)?;
        let payload = pointer.payload(page)?;
        let signature = payload
            .filter(|_| pointer.is_plain())
            .and_then(|payload| Signature::read(payload, layout));
        let subheader = Subheader {
            pointer: &pointer,
            payload,
            signature,
        };
        match visitor.visit_subheader(page_header, &subheader)? {
            VisitResult::Continue | VisitResult::SkipSubtree => {}
            VisitResult::SkipSiblings => break,
            VisitResult::Terminate => return Ok(VisitResult::Terminate),
        }
    }
    Ok(VisitResult::Continue)
}

fn walk_row_index<V: Visitor + ?Sized>(
    page: ByteView<'_>,
    page_header: &PageHeader,
    layout: Layout,
    visitor: &mut V,
) -> Result<VisitResult> {
    for slot in 0..page_header.subheader_count {
        let entry = RowIndex::parse(page, page_header, slot, layout)?;
        match visitor.visit_row_index(page_header, &entry)? {
            VisitResult::Continue | VisitResult::SkipSubtree => {}
            VisitResult::SkipSiblings => break,
            VisitResult::Terminate => return Ok(VisitResult::Terminate),
        }
    }
    Ok(VisitResult::Continue)
}
