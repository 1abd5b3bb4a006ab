//! Decodes the `.ammo` corpus format into owned [`Bullet`]s.
//!
//! Ammo file format: a concatenation of bullets. Each bullet is a decimal
//! ASCII length, a single `\n`, then exactly that many bytes of a serialised
//! HTTP/1.1 request (request-line, headers, blank line, optional body). The
//! length header may carry a trailing space-delimited comment after the
//! integer, terminated by the newline.

use std::path::Path;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::error::{GunError, IntError};

const MAX_INT_CHARS: usize = 10;

/// One pre-parsed, immutable HTTP/1.1 request from the corpus.
///
/// Cloning a `Bullet` is cheap: the body is a refcounted [`Bytes`] and the
/// headers are a small map, so handing a fresh copy to each worker never
/// touches the allocator on the hot path.
#[derive(Clone, Debug)]
pub struct Bullet {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Parses the bullet-length header exactly like the source's integer
/// parser: rejects empty input, requires a leading digit, accepts `0-9`,
/// treats a space as the terminator, caps the digit count at
/// [`MAX_INT_CHARS`], and rejects any other non-digit character.
pub fn parse_bullet_len(b: &[u8]) -> Result<usize, IntError> {
    if b.is_empty() {
        return Err(IntError::Empty);
    }
    let mut v: usize = 0;
    for (i, &c) in b.iter().enumerate() {
        if c == b' ' {
            return Ok(v);
        }
        let k = c.wrapping_sub(b'0');
        if k > 9 {
            return Err(if i == 0 {
                IntError::UnexpectedFirstChar
            } else {
                IntError::UnexpectedTrailingChar
            });
        }
        if i >= MAX_INT_CHARS {
            return Err(IntError::TooLong);
        }
        v = 10 * v + k as usize;
    }
    Ok(v)
}

/// Parses one bullet's raw bytes (request-line, headers, blank line,
/// optional body) into a [`Bullet`].
fn parse_bullet(path: &Path, index: usize, raw: &[u8]) -> Result<Bullet, GunError> {
    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut header_storage);
    let parsed = req
        .parse(raw)
        .map_err(|e| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: e.to_string(),
        })?;
    let consumed = match parsed {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => {
            return Err(GunError::BulletMalformed {
                path: path.to_path_buf(),
                index,
                reason: "incomplete request (missing blank line)".into(),
            })
        },
    };

    let method = req
        .method
        .ok_or_else(|| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: "missing method".into(),
        })?
        .parse::<Method>()
        .map_err(|e| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: e.to_string(),
        })?;
    let req_path = req
        .path
        .ok_or_else(|| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: "missing request path".into(),
        })?
        .to_string();

    let mut headers = HeaderMap::with_capacity(req.headers.len());
    for h in req.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes()).map_err(|e| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_bytes(h.value).map_err(|e| GunError::BulletMalformed {
            path: path.to_path_buf(),
            index,
            reason: e.to_string(),
        })?;
        headers.append(name, value);
    }

    let body = Bytes::copy_from_slice(&raw[consumed..]);

    Ok(Bullet {
        method,
        path: req_path,
        headers,
        body,
    })
}

/// Reads and parses the whole ammo file into memory, in corpus order.
///
/// Fatal on any IO or decode error — corpus loading happens entirely before
/// any wire traffic is sent.
pub async fn load(path: &Path) -> Result<Vec<Bullet>, GunError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| GunError::AmmoOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let mut reader = BufReader::new(file);

    let mut bullets = Vec::new();
    let mut offset: u64 = 0;
    let mut header_line = Vec::new();

    loop {
        header_line.clear();
        let n = reader
            .read_until(b'\n', &mut header_line)
            .await
            .map_err(|source| GunError::BulletHeaderRead {
                path: path.to_path_buf(),
                offset,
                source,
            })?;
        if n == 0 {
            break; // clean EOF between bullets
        }
        offset += n as u64;

        let trimmed = header_line.strip_suffix(b"\n").unwrap_or(&header_line);
        let len = parse_bullet_len(trimmed).map_err(|source| GunError::BulletLength {
            path: path.to_path_buf(),
            offset,
            source,
        })?;

        let mut body = vec![0u8; len];
        reader
            .read_exact(&mut body)
            .await
            .map_err(|_| GunError::BulletTruncated {
                path: path.to_path_buf(),
                offset,
                expected: len,
                got: 0,
            })?;
        offset += len as u64;

        bullets.push(parse_bullet(path, bullets.len(), &body)?);
    }

    Ok(bullets)
}

/// Verifies the one-shot precondition: without cycling, the corpus must be
/// able to sustain the prescribed schedule.
///
/// Uses the area under the linear ramp (average rate × duration) as the
/// expected total send count, rounded up.
pub fn required_for_schedule(low: f64, high: f64, duration: std::time::Duration) -> usize {
    (((low + high) / 2.0) * duration.as_secs_f64()).ceil() as usize
}

pub fn check_shortfall(
    path: &Path,
    corpus_len: usize,
    low: f64,
    high: f64,
    duration: std::time::Duration,
) -> Result<(), GunError> {
    let need = required_for_schedule(low, high, duration);
    if corpus_len < need {
        return Err(GunError::Shortfall {
            path: path.to_path_buf(),
            have: corpus_len,
            need,
            low,
            high,
            duration,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parser_laws() {
        assert_eq!(parse_bullet_len(b""), Err(IntError::Empty));
        assert_eq!(parse_bullet_len(b"0"), Ok(0));
        assert_eq!(parse_bullet_len(b"42"), Ok(42));
        assert_eq!(parse_bullet_len(b"42 xyz"), Ok(42));
        assert_eq!(parse_bullet_len(b"1a"), Err(IntError::UnexpectedTrailingChar));
        assert_eq!(parse_bullet_len(b"a1"), Err(IntError::UnexpectedFirstChar));
        assert_eq!(parse_bullet_len(b"12345678901"), Err(IntError::TooLong));
    }

    #[test]
    fn int_parser_accepts_exactly_ten_digits() {
        assert_eq!(parse_bullet_len(b"1234567890"), Ok(1_234_567_890));
    }

    #[tokio::test]
    async fn decodes_single_bullet_with_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.ammo");
        let raw = b"GET / HTTP/1.1\r\nHost: example.test\r\nContent-Length: 4\r\n\r\nPING";
        tokio::fs::write(&path, format!("{}\n", raw.len()).into_bytes())
            .await
            .unwrap();
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut file, raw)
            .await
            .unwrap();

        let bullets = load(&path).await.unwrap();
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].method, Method::GET);
        assert_eq!(bullets[0].path, "/");
        assert_eq!(&bullets[0].body[..], b"PING");
    }

    #[test]
    fn shortfall_uses_average_rate_times_duration() {
        assert_eq!(
            required_for_schedule(10.0, 10.0, std::time::Duration::from_secs(1)),
            10
        );
        // corpus_len == need is sufficient (strict `<` is the failure condition).
        assert!(check_shortfall(
            Path::new("x.ammo"),
            10,
            10.0,
            10.0,
            std::time::Duration::from_secs(1)
        )
        .is_ok());
        // one short of what the schedule needs aborts.
        assert!(check_shortfall(
            Path::new("x.ammo"),
            9,
            10.0,
            10.0,
            std::time::Duration::from_secs(1)
        )
        .is_err());
        assert!(check_shortfall(
            Path::new("x.ammo"),
            11,
            10.0,
            10.0,
            std::time::Duration::from_secs(1)
        )
        .is_ok());
    }
}
