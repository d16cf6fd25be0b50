use std::borrow::Cow;
use std::fmt::{self, Display};
use std::str::FromStr;

use bytes::Bytes;

/// How a response body is decoded before it reaches the assertions.
///
/// Byte-preserving encodings hand the body through unchanged; `utf8` replaces
/// invalid sequences and `ascii` clears the high bit of every byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    Binary,
    Latin1,
    Hex,
    Base64,
    Utf8,
    Ascii,
}

impl BodyEncoding {
    pub fn decode(&self, body: Bytes) -> Bytes {
        match self {
            BodyEncoding::Binary | BodyEncoding::Latin1 | BodyEncoding::Hex | BodyEncoding::Base64 => {
                body
            }
            BodyEncoding::Utf8 => match String::from_utf8_lossy(&body) {
                Cow::Borrowed(_) => body,
                Cow::Owned(text) => Bytes::from(text),
            },
            BodyEncoding::Ascii => body.iter().map(|byte| byte & 0x7f).collect(),
        }
    }
}

impl Display for BodyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BodyEncoding::Binary => "binary",
            BodyEncoding::Latin1 => "latin1",
            BodyEncoding::Hex => "hex",
            BodyEncoding::Base64 => "base64",
            BodyEncoding::Utf8 => "utf8",
            BodyEncoding::Ascii => "ascii",
        };
        write!(f, "{label}")
    }
}

impl FromStr for BodyEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(BodyEncoding::Binary),
            "latin1" => Ok(BodyEncoding::Latin1),
            "hex" => Ok(BodyEncoding::Hex),
            "base64" => Ok(BodyEncoding::Base64),
            "utf8" | "utf-8" => Ok(BodyEncoding::Utf8),
            "ascii" => Ok(BodyEncoding::Ascii),
            _ => Err(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_preserves_bytes() {
        let body = Bytes::from_static(&[0xff, 0x00, 0x80]);
        assert_eq!(BodyEncoding::default().decode(body.clone()), body);
        assert_eq!(BodyEncoding::Hex.decode(body.clone()), body);
    }

    #[test]
    fn utf8_replaces_invalid_sequences() {
        let decoded = BodyEncoding::Utf8.decode(Bytes::from_static(&[b'a', 0xff]));
        assert_eq!(decoded.as_ref(), "a\u{fffd}".as_bytes());

        let valid = Bytes::from_static("äb".as_bytes());
        assert_eq!(BodyEncoding::Utf8.decode(valid.clone()), valid);
    }

    #[test]
    fn ascii_clears_high_bit() {
        let decoded = BodyEncoding::Ascii.decode(Bytes::from_static(&[0xc1, b'b']));
        assert_eq!(decoded.as_ref(), b"Ab");
    }

    #[test]
    fn parses_names() {
        assert_eq!("UTF-8".parse::<BodyEncoding>(), Ok(BodyEncoding::Utf8));
        assert_eq!("binary".parse::<BodyEncoding>(), Ok(BodyEncoding::Binary));
        assert!("ebcdic".parse::<BodyEncoding>().is_err());
    }
}
