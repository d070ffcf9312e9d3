//! Parsing of `filesystem:ldir?` directory listings.

use sockinstr::InstrumentError;

/// One entry of the instrument's directory listing.
///
/// The scope reports its working directory as a single line of
/// semicolon-separated entries, each carrying five delimited fields. Fields
/// are kept as reported; only the size is interpreted further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name, without the surrounding quotes.
    pub name: String,
    /// Entry type as reported, e.g. `FILE` or `DIR`.
    pub entry_type: String,
    /// Size field as reported (decimal bytes for files).
    pub size: String,
    /// Modification date as reported.
    pub date: String,
    /// Modification time as reported.
    pub time: String,
}

impl DirEntry {
    /// The entry's size in bytes.
    pub fn size_bytes(&self) -> Result<u64, InstrumentError> {
        self.size
            .parse()
            .map_err(|_| InstrumentError::ResponseParseError(self.size.clone()))
    }
}

/// Tokenize a listing response into entries.
///
/// Commas, semicolons, and quotes all delimit; empty tokens are dropped and
/// the remaining tokens are grouped in fives. A trailing partial group is
/// ignored.
pub(crate) fn parse_listing(resp: &str) -> Vec<DirEntry> {
    let tokens: Vec<&str> = resp
        .split([',', ';', '"'])
        .filter(|t| !t.is_empty())
        .collect();
    tokens
        .chunks_exact(5)
        .map(|fields| DirEntry {
            name: fields[0].to_string(),
            entry_type: fields[1].to_string(),
            size: fields[2].to_string(),
            date: fields[3].to_string(),
            time: fields[4].to_string(),
        })
        .collect()
}

/// Find a listing entry by exact name match.
pub(crate) fn find_entry<'a>(listing: &'a [DirEntry], name: &str) -> Option<&'a DirEntry> {
    listing.iter().find(|entry| entry.name == name)
}
