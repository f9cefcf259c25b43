//! Catalog link decoding.
//!
//! Source and thumbnail links in catalog responses are obfuscated with a fixed
//! substitution cipher: a `--` marker followed by hex pairs, each pair standing
//! for one character. Decoded links are either absolute or host-relative; the
//! latter get the media host prepended.
//!
//! The substitution table is an owned [`CipherTable`] handed to the
//! [`Decoder`], so tests and alternative catalogs can supply their own.

use std::collections::HashMap;

/// Marker that introduces an obfuscated link.
pub const CIPHER_MARKER: &str = "--";

/// Image host that is served unobfuscated but must be fetched through its
/// mirror.
const IMAGE_HOST: &str = "https://aln.youtube-anime.com";
const IMAGE_MIRROR: &str = "https://wp.youtube-anime.com/aln.youtube-anime.com";

/// The catalog's substitution table, hex pair → plaintext character.
const CATALOG_PAIRS: [(&str, char); 84] = [
    ("79", 'A'), ("7a", 'B'), ("7b", 'C'), ("7c", 'D'), ("7d", 'E'), ("7e", 'F'),
    ("7f", 'G'), ("70", 'H'), ("71", 'I'), ("72", 'J'), ("73", 'K'), ("74", 'L'),
    ("75", 'M'), ("76", 'N'), ("77", 'O'), ("68", 'P'), ("69", 'Q'), ("6a", 'R'),
    ("6b", 'S'), ("6c", 'T'), ("6d", 'U'), ("6e", 'V'), ("6f", 'W'), ("60", 'X'),
    ("61", 'Y'), ("62", 'Z'),
    ("59", 'a'), ("5a", 'b'), ("5b", 'c'), ("5c", 'd'), ("5d", 'e'), ("5e", 'f'),
    ("5f", 'g'), ("50", 'h'), ("51", 'i'), ("52", 'j'), ("53", 'k'), ("54", 'l'),
    ("55", 'm'), ("56", 'n'), ("57", 'o'), ("48", 'p'), ("49", 'q'), ("4a", 'r'),
    ("4b", 's'), ("4c", 't'), ("4d", 'u'), ("4e", 'v'), ("4f", 'w'), ("40", 'x'),
    ("41", 'y'), ("42", 'z'),
    ("08", '0'), ("09", '1'), ("0a", '2'), ("0b", '3'), ("0c", '4'), ("0d", '5'),
    ("0e", '6'), ("0f", '7'), ("00", '8'), ("01", '9'),
    ("15", '-'), ("16", '.'), ("67", '_'), ("46", '~'), ("02", ':'), ("17", '/'),
    ("07", '?'), ("1b", '#'), ("63", '['), ("65", ']'), ("78", '@'), ("19", '!'),
    ("1c", '$'), ("1e", '&'), ("10", '('), ("11", ')'), ("12", '*'), ("13", '+'),
    ("14", ','), ("03", ';'), ("05", '='), ("1d", '%'),
];

// ---------------------------------------------------------------------------
// CipherTable
// ---------------------------------------------------------------------------

/// Immutable hex-pair → character lookup.
#[derive(Debug, Clone)]
pub struct CipherTable {
    pairs: HashMap<[u8; 2], char>,
}

impl CipherTable {
    /// Build a table from explicit `(pair, char)` entries. Pair matching is
    /// case-insensitive.
    pub fn from_pairs<'a>(entries: impl IntoIterator<Item = (&'a str, char)>) -> Self {
        let pairs = entries
            .into_iter()
            .filter_map(|(pair, ch)| {
                let bytes = pair.as_bytes();
                (bytes.len() == 2).then(|| ([bytes[0].to_ascii_lowercase(), bytes[1].to_ascii_lowercase()], ch))
            })
            .collect();
        Self { pairs }
    }

    /// The table used by the catalog.
    pub fn catalog() -> Self {
        Self::from_pairs(CATALOG_PAIRS)
    }

    /// Look up a two-byte chunk.
    pub fn lookup(&self, chunk: [u8; 2]) -> Option<char> {
        self.pairs
            .get(&[chunk[0].to_ascii_lowercase(), chunk[1].to_ascii_lowercase()])
            .copied()
    }

    /// Iterate over every `(pair, char)` entry.
    pub fn entries(&self) -> impl Iterator<Item = (String, char)> + '_ {
        self.pairs
            .iter()
            .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), *v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for CipherTable {
    fn default() -> Self {
        Self::catalog()
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Turns obfuscated catalog links into plain URLs.
#[derive(Debug, Clone)]
pub struct Decoder {
    table: CipherTable,
    media_host: String,
}

impl Decoder {
    /// Create a decoder that prefixes host-relative results with `media_host`.
    pub fn new(table: CipherTable, media_host: impl Into<String>) -> Self {
        Self {
            table,
            media_host: media_host.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn table(&self) -> &CipherTable {
        &self.table
    }

    /// Decode a catalog token into a link.
    ///
    /// Never fails: chunks missing from the table are copied through verbatim.
    pub fn decode(&self, token: &str) -> String {
        if token.is_empty() {
            return String::new();
        }

        if let Some(rest) = token.strip_prefix(IMAGE_HOST) {
            return format!("{IMAGE_MIRROR}{rest}");
        }

        let plain = match token.strip_prefix(CIPHER_MARKER) {
            Some(cipher) => self.substitute(cipher),
            None => token.to_string(),
        };

        if plain.starts_with('/') {
            format!("{}{plain}", self.media_host)
        } else {
            plain
        }
    }

    /// Decode a poster/thumbnail token into a URL the browser can load.
    ///
    /// Absolute results are routed through `/image-proxy`; bare paths are
    /// taken to live on the image mirror.
    pub fn decode_thumbnail(&self, token: &str) -> String {
        if token.is_empty() {
            return String::new();
        }

        let decoded = if token.starts_with(CIPHER_MARKER) || is_absolute(token) || token.starts_with('/') {
            self.decode(token)
        } else {
            format!("{IMAGE_MIRROR}/{token}")
        };

        if is_absolute(&decoded) {
            format!("/image-proxy?url={}", urlencoding::encode(&decoded))
        } else {
            decoded
        }
    }

    fn substitute(&self, cipher: &str) -> String {
        let mut out = String::with_capacity(cipher.len() / 2 + 1);
        let mut chars = cipher.chars();
        while let Some(a) = chars.next() {
            let Some(b) = chars.next() else {
                // Odd trailing character.
                out.push(a);
                break;
            };
            let known = (a.is_ascii() && b.is_ascii())
                .then(|| self.table.lookup([a as u8, b as u8]))
                .flatten();
            match known {
                Some(ch) => out.push(ch),
                None => {
                    out.push(a);
                    out.push(b);
                }
            }
        }
        out
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
