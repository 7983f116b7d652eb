use std::io::{Cursor, Read};

/// `data:` URL for an in-memory file, used for photo previews.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, base64::encode(bytes))
}

pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    let mut binding = Cursor::new(payload);
    let mut decoder = base64::read::DecoderReader::new(&mut binding, base64::STANDARD);
    let mut bytes = Vec::new();
    match decoder.read_to_end(&mut bytes) {
        Ok(_) => Some((mime_type.to_string(), bytes)),
        Err(_) => None,
    }
}
