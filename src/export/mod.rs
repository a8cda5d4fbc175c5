pub mod csv;
pub mod fields;
pub mod format;

pub use csv::{CONTENT_TYPE, DEFAULT_PREVIEW_ROWS, Preview, export_filename, preview, to_delimited_text};
pub use fields::{FIELD_SETS, Field, FieldSet, FieldSetId, Selection};
pub use format::{TrackView, value_of};
