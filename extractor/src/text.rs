//! Text decoding and keyword matching.
//!
//! Asset files carry no declared encoding, so decoding is a guess: strict
//! UTF-8 first, then UTF-16. Keyword matching is a literal, case-sensitive
//! substring test with no word-boundary handling, so `Teleport` matches
//! inside `TeleportationEngine`.

const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Decodes raw bytes as UTF-8, falling back to UTF-16.
///
/// UTF-16 input is read in the byte order given by a leading BOM (which is
/// stripped) and little endian otherwise. Returns `None` when neither
/// encoding accepts the bytes.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::text::decode_text;
///
/// assert_eq!(decode_text(b"Health=100").as_deref(), Some("Health=100"));
///
/// let utf16: Vec<u8> = [0xFF, 0xFE, b'H', 0, b'i', 0].to_vec();
/// assert_eq!(decode_text(&utf16).as_deref(), Some("Hi"));
///
/// assert_eq!(decode_text(&[0xC3, 0x28, 0x00]), None);
/// ```
#[must_use]
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_owned()),
        Err(_) => decode_utf16(bytes),
    }
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
        (rest, false)
    } else if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
        (rest, true)
    } else {
        (bytes, false)
    };

    if body.len() % 2 != 0 {
        return None;
    }

    let units = body.chunks_exact(2).map(|pair| {
        let mut unit = [0_u8; 2];
        unit.copy_from_slice(pair);
        if big_endian {
            u16::from_be_bytes(unit)
        } else {
            u16::from_le_bytes(unit)
        }
    });

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .ok()
}

/// An ordered list of literal keywords.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Wraps a keyword list, keeping its order.
    #[must_use]
    pub fn new(keywords: Vec<String>) -> Self {
        Self(keywords)
    }

    /// Every keyword contained in `text`, in list order.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_deep_extractor::text::Keywords;
    ///
    /// let keywords = Keywords::new(vec!["Damage".into(), "Player".into(), "Speed".into()]);
    /// assert_eq!(keywords.all_in("PlayerDamageValue=50"), vec!["Damage", "Player"]);
    /// ```
    #[must_use]
    pub fn all_in<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.0
            .iter()
            .map(String::as_str)
            .filter(|keyword| text.contains(keyword))
            .collect()
    }

    /// The first keyword, in list order, contained in `text`.
    #[must_use]
    pub fn first_in<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.0
            .iter()
            .map(String::as_str)
            .find(|keyword| text.contains(keyword))
    }
}
