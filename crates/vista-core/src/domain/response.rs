//! Response body stream.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};

use crate::error::ViewResult;

/// HTTP response rendered into by views.
pub type Response = http::Response<Body>;

/// Append-only body stream.
///
/// Views write the complete rendered output as one chunk, so a body
/// produced by a single render holds exactly one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    chunks: Vec<Bytes>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn write(&mut self, chunk: impl Into<Bytes>) {
        self.chunks.push(chunk.into());
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated contents.
    pub fn to_bytes(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            many => {
                let mut buf = BytesMut::with_capacity(self.len());
                for chunk in many {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }

    /// Contents as UTF-8 text, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        let mut body = Self::new();
        body.write(text);
        body
    }
}

/// Return `response` with `name` set to `value`, replacing any existing value.
pub fn with_header(response: Response, name: HeaderName, value: &str) -> ViewResult<Response> {
    let value = HeaderValue::from_str(value)?;
    let (mut parts, body) = response.into_parts();
    parts.headers.insert(name, value);
    Ok(Response::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn collects_chunks_in_order() {
        let mut body = Body::new();
        body.write("Hello, ");
        body.write(String::from("world"));

        assert_eq!(body.chunks().len(), 2);
        assert_eq!(body.to_bytes(), Bytes::from_static(b"Hello, world"));
        assert_eq!(body.len(), 12);
    }

    #[test]
    fn with_header_replaces_value() {
        let response = http::Response::builder()
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::new())
            .unwrap();

        let response = with_header(response, CONTENT_TYPE, "text/html").unwrap();

        assert_eq!(response.headers().get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    }

    #[test]
    fn with_header_rejects_control_characters() {
        let response = Response::new(Body::new());
        assert!(with_header(response, CONTENT_TYPE, "text/html\n").is_err());
    }
}
