//! Framing for the one-shot HTTP command sent to the camera.

use core::fmt::{self, Write};

use heapless::String;

use super::Ipv4;

/// Largest request this controller ever builds.
pub const MAX_REQUEST_LEN: usize = 192;

pub type RequestBuffer = String<MAX_REQUEST_LEN>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestError {
    /// The path must be absolute and free of whitespace.
    InvalidPath,
    /// The framed request exceeds [`MAX_REQUEST_LEN`].
    TooLong,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath => {
                f.write_str("command path must start with '/' and contain no whitespace")
            }
            Self::TooLong => f.write_str("command request too long"),
        }
    }
}

/// Checks that `path` can be placed on an HTTP request line.
///
/// # Errors
///
/// Returns [`RequestError::InvalidPath`] when the path is not absolute or
/// contains whitespace or control characters.
pub fn check_path(path: &str) -> Result<(), RequestError> {
    let well_formed = path.starts_with('/') && path.bytes().all(|byte| byte.is_ascii_graphic());
    if well_formed {
        Ok(())
    } else {
        Err(RequestError::InvalidPath)
    }
}

/// Frames `GET <path>` for `host`, asking the server to close afterwards.
///
/// # Errors
///
/// Returns [`RequestError`] when the path is malformed or the request does not
/// fit the fixed buffer.
pub fn encode_get(path: &str, host: Ipv4) -> Result<RequestBuffer, RequestError> {
    check_path(path)?;
    let mut request = RequestBuffer::new();
    write!(
        request,
        "GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n"
    )
    .map_err(|_| RequestError::TooLong)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_a_close_delimited_get() {
        let request = encode_get(
            "/gp/gpControl/command/shutter?p=1",
            Ipv4::new(10, 5, 5, 9),
        )
        .expect("fits");
        assert_eq!(
            request.as_str(),
            "GET /gp/gpControl/command/shutter?p=1 HTTP/1.1\r\nHost: 10.5.5.9\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn rejects_relative_or_spaced_paths() {
        assert_eq!(
            encode_get("shutter", Ipv4::new(10, 5, 5, 9)),
            Err(RequestError::InvalidPath)
        );
        assert_eq!(
            encode_get("/a b", Ipv4::new(10, 5, 5, 9)),
            Err(RequestError::InvalidPath)
        );
    }

    #[test]
    fn oversized_paths_do_not_truncate() {
        let mut path = heapless::String::<256>::new();
        path.push('/').unwrap();
        for _ in 0..200 {
            path.push('x').unwrap();
        }
        assert_eq!(
            encode_get(&path, Ipv4::new(10, 5, 5, 9)),
            Err(RequestError::TooLong)
        );
    }
}
