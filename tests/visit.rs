mod common;

use common::{Cell, SasBuilder, Storage, text_column};
use sas7bdat_reader::Result;
use sas7bdat_reader::parser::{
    Classified, PageHeader, PageType, RowIndex, Signature, Subheader, VisitResult, Visitor,
};

/// Records every callback and answers with fixed results.
#[derive(Default)]
struct Recorder {
    pages: Vec<Option<PageType>>,
    subheaders: Vec<(u64, Option<Classified<Signature>>, bool)>,
    row_index: Vec<RowIndex>,
    on_page: Option<VisitResult>,
    on_subheader: Option<VisitResult>,
}

impl Visitor for Recorder {
    fn visit_page(&mut self, page: &PageHeader) -> Result<VisitResult> {
        self.pages.push(page.known_type());
        Ok(self.on_page.unwrap_or(VisitResult::Continue))
    }

    fn visit_subheader(&mut self, page: &PageHeader, subheader: &Subheader<'_>) -> Result<VisitResult> {
        self.subheaders
            .push((page.index, subheader.signature, subheader.pointer.is_data));
        Ok(self.on_subheader.unwrap_or(VisitResult::Continue))
    }

    fn visit_row_index(&mut self, _page: &PageHeader, entry: &RowIndex) -> Result<VisitResult> {
        self.row_index.push(*entry);
        Ok(VisitResult::Continue)
    }
}

fn known_signatures(recorder: &Recorder) -> Vec<Signature> {
    recorder
        .subheaders
        .iter()
        .filter_map(|(_, signature, _)| signature.and_then(|s| s.known()))
        .collect()
}

#[test]
fn walk_reports_every_node_in_order() {
    let mut sas = common::open(SasBuilder::sample().index_page(true).build());
    let mut recorder = Recorder::default();
    sas.visit(&mut recorder).unwrap();

    assert_eq!(
        recorder.pages,
        vec![Some(PageType::Meta), Some(PageType::Data), Some(PageType::Index)]
    );
    assert_eq!(
        known_signatures(&recorder),
        vec![
            Signature::RowSize,
            Signature::ColSize,
            Signature::SubhCnt,
            Signature::ColText,
            Signature::ColName,
            Signature::ColAttr,
            Signature::ColLabs,
            Signature::ColLabs,
        ]
    );
    assert!(recorder.subheaders.iter().all(|(page, _, _)| *page == 0));
    assert_eq!(recorder.row_index.len(), 1);
    assert_eq!(recorder.row_index[0].row_number, 3);
    assert_eq!(recorder.row_index[0].source.page, 2);
}

#[test]
fn skip_subtree_hides_a_page_children() {
    let mut sas = common::open(SasBuilder::sample().index_page(true).build());
    let mut recorder = Recorder {
        on_page: Some(VisitResult::SkipSubtree),
        ..Recorder::default()
    };
    sas.visit(&mut recorder).unwrap();
    assert_eq!(recorder.pages.len(), 3);
    assert!(recorder.subheaders.is_empty());
    assert!(recorder.row_index.is_empty());
}

#[test]
fn skip_siblings_moves_to_the_next_page() {
    let bytes = SasBuilder::sample().storage(Storage::Rle).build();
    let mut sas = common::open(bytes);
    let mut recorder = Recorder {
        on_subheader: Some(VisitResult::SkipSiblings),
        ..Recorder::default()
    };
    sas.visit(&mut recorder).unwrap();
    assert_eq!(recorder.subheaders.len(), recorder.pages.len());
    assert_eq!(known_signatures(&recorder)[0], Signature::RowSize);
}

#[test]
fn terminate_stops_the_walk() {
    let mut sas = common::open(SasBuilder::sample().build());
    let mut recorder = Recorder {
        on_subheader: Some(VisitResult::Terminate),
        ..Recorder::default()
    };
    sas.visit(&mut recorder).unwrap();
    assert_eq!(recorder.pages, vec![Some(PageType::Meta)]);
    assert_eq!(recorder.subheaders.len(), 1);
}

#[test]
fn row_subheaders_are_visible_with_their_raw_signatures() {
    let bytes = SasBuilder::new()
        .storage(Storage::Rle)
        .column(text_column("code", 16))
        .row(vec![Cell::Text("abcdefghijklmnop")])
        .row(vec![Cell::Text("")])
        .build();
    let mut sas = common::open(bytes);
    let mut recorder = Recorder::default();
    sas.visit(&mut recorder).unwrap();

    let rows: Vec<_> = recorder
        .subheaders
        .iter()
        .filter(|(_, _, is_data)| *is_data)
        .map(|(_, signature, _)| *signature)
        .collect();
    // The verbatim row starts with "abcd"; the compressed one has no signature.
    assert_eq!(rows, vec![Some(Classified::Unknown(0x6463_6261)), None]);
}

#[test]
fn visiting_leaves_rows_readable() {
    let mut sas = common::open(SasBuilder::sample().storage(Storage::Rdc).build());
    sas.visit(&mut Recorder::default()).unwrap();
    assert_eq!(common::collect_rows(&mut sas).len(), 3);
}
