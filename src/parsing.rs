pub(crate) mod dispatch_parser;
pub(crate) mod error;
pub(crate) mod helpers;
pub(crate) mod manifest_parser;
pub(crate) mod shape_pattern_parser;
pub(crate) mod stop_mapping_parser;

use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};

use crate::error::RResult;

pub use dispatch_parser::{DispatchContext, DispatchRecord, LineOutcome, SkipReason};
pub use manifest_parser::{ManifestEntry, parse as parse_manifest};
pub use shape_pattern_parser::parse as load_shape_catalog;
pub use stop_mapping_parser::parse as load_stop_mappings;

/// A consumer of the tokenized lines of one input file format.
pub trait LineListener {
    /// Used to identify the listener in log messages.
    fn name(&self) -> &'static str;

    fn handle_line(&mut self, line_number: usize, tokens: Vec<String>);
}

/// Streams a comma-delimited file into a listener, one line at a time.
///
/// Lines may have any number of fields. Bytes that are not valid UTF-8 are replaced with
/// U+FFFD instead of failing the line. Returns the number of lines read.
pub fn read_file(path: &Path, listener: &mut impl LineListener) -> RResult<usize> {
    log::info!("Parsing {} with {}...", path.display(), listener.name());

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut record = ByteRecord::new();
    let mut line_count = 0;

    while reader.read_byte_record(&mut record)? {
        line_count += 1;
        let tokens = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        listener.handle_line(line_count, tokens);
    }

    Ok(line_count)
}
