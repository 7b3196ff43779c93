use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;

/// Characters left untouched when encoding a single URI component.
/// Matches the ECMAScript `encodeURIComponent` unreserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// Percent-encodes a value for use as one path segment or query value.
pub fn encode_component(value: &str) -> String {
	utf8_percent_encode(value, COMPONENT).to_string()
}

/// Reverses [`encode_component`]. Invalid UTF-8 sequences are replaced.
pub fn decode_component(value: &str) -> Cow<'_, str> {
	percent_decode_str(value).decode_utf8_lossy()
}
