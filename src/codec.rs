use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine,
};

/// Accepts unpadded input and ignores leftover bits in the final group.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

fn is_alphabet(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/'
}

/// Decodes Base64 text produced by the canvas into raw bytes.
///
/// Any character outside `A-Z a-z 0-9 + /` is dropped before decoding, so
/// whitespace, line breaks and `=` padding are all tolerated. A single
/// dangling character in the last group carries fewer than eight bits and
/// is discarded. The output is always `floor(n * 3 / 4)` bytes for `n`
/// kept characters; malformed input is never an error.
pub fn decode(text: &str) -> Vec<u8> {
    let mut cleaned: String = text.chars().filter(|c| is_alphabet(*c)).collect();
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    // Every remaining input is well-formed for the lenient engine.
    LENIENT.decode(cleaned).unwrap_or_default()
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", encode(bytes))
}

/// Returns the payload of a `data:<mime>;base64,` URL, or the input itself
/// when it carries no such prefix.
pub fn strip_data_url(text: &str) -> &str {
    match text.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(text),
        None => text,
    }
}
