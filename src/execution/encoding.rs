use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes a payload for the wire
pub fn encode(text: &str) -> String {
    STANDARD.encode(text)
}

/// Decodes a payload that is usually, but not always, base64
///
/// The service sometimes answers with plain text. Only input made entirely
/// of the base64 alphabet (line breaks allowed) that decodes to valid UTF-8
/// is decoded; anything else passes through unchanged.
pub fn decode_lenient(payload: &str) -> String {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let in_alphabet = compact
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
    if compact.is_empty() || compact.len() % 4 != 0 || !in_alphabet {
        return payload.to_string();
    }

    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| payload.to_string()),
        Err(_) => payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_encoded_payload() {
        let source = "public class Main {\n    // ü\n}\n";
        assert_eq!(decode_lenient(&encode(source)), source);
    }

    #[test]
    fn test_decodes_wrapped_payload() {
        // The service wraps long payloads every 60 characters
        let encoded = encode(&"x".repeat(100));
        let wrapped = format!("{}\n{}\n", &encoded[..60], &encoded[60..]);
        assert_eq!(decode_lenient(&wrapped), "x".repeat(100));
    }

    #[test]
    fn test_plain_text_passes_through() {
        for plain in ["3\n", "Hello, World!", "line one\nline two", "", "a b"] {
            assert_eq!(decode_lenient(plain), plain);
        }
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        // "////" decodes to 0xff 0xff 0xff
        assert_eq!(decode_lenient("////"), "////");
    }
}
