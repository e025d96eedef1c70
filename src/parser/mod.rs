pub mod byteview;
pub mod classify;
pub mod descriptor;
pub mod document;
pub mod encoding;
pub mod header;
pub mod page;
pub mod rows;
pub mod values;
pub mod walk;
pub mod window;

pub use byteview::ByteView;
pub use classify::{Classified, WireCode};
pub use descriptor::{Descriptor, RowIndex, RowSize, Signature, StringRef};
pub use document::Document;
pub use encoding::CharacterSet;
pub use header::{FileHeader, Layout, Platform};
pub use page::{PageHeader, PageType, SubHeaderFormat, SubHeaderLocation, SubHeaderPointer};
pub use rows::compression::{Codec, Decompressor, Rdc, Rle};
pub use rows::{RowCursor, RowLayout, RowStrategy, RowWindow};
pub use values::ValueReader;
pub use walk::{Subheader, VisitResult, Visitor, walk};
pub use window::{ByteSource, PageWindow};
