use crate::error::AllocationError;
use rand::rngs::OsRng;
use rand::TryRngCore;

/// A source of random bytes for identifiers.
///
/// Implementations must be cryptographically secure: secret keys are only as
/// unguessable as the bytes they are drawn from.
pub trait RandomSource: Send + Sync + 'static {
    /// Fills `dest` with random bytes and returns how many were written.
    fn read(&self, dest: &mut [u8]) -> Result<usize, AllocationError>;
}

/// Reads from the operating system's random number generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn read(&self, dest: &mut [u8]) -> Result<usize, AllocationError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| AllocationError::RandomSource(e.to_string()))?;
        Ok(dest.len())
    }
}

/// Draws `byte_len` bytes from `source` and encodes them as lowercase hex.
///
/// A source that fills fewer bytes than requested is treated as failed.
pub fn draw_hex<S: RandomSource + ?Sized>(
    source: &S,
    byte_len: usize,
) -> Result<String, AllocationError> {
    let mut bytes = vec![0_u8; byte_len];
    let actual = source.read(&mut bytes)?;
    if actual != byte_len {
        return Err(AllocationError::ShortRead {
            expected: byte_len,
            actual,
        });
    }
    Ok(encode_hex(&bytes))
}

fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(DIGITS[(byte >> 4) as usize] as char);
        out.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<u8>);

    impl RandomSource for Fixed {
        fn read(&self, dest: &mut [u8]) -> Result<usize, AllocationError> {
            let n = dest.len().min(self.0.len());
            dest[..n].copy_from_slice(&self.0[..n]);
            Ok(n)
        }
    }

    #[test]
    fn encodes_lowercase_hex() {
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa5, 0xff]), "000fa5ff");
        assert_eq!(encode_hex(&[]), "");
    }

    #[test]
    fn draw_hex_doubles_the_length() {
        for byte_len in [5, 8, 16] {
            let value = draw_hex(&OsRandom, byte_len).unwrap();
            assert_eq!(value.len(), byte_len * 2);
            assert!(value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        }
    }

    #[test]
    fn short_read_is_fatal() {
        let source = Fixed(vec![1, 2, 3]);
        let err = draw_hex(&source, 5).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::ShortRead {
                expected: 5,
                actual: 3
            }
        ));
    }

    #[test]
    fn full_read_is_encoded() {
        let source = Fixed(vec![0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert_eq!(draw_hex(&source, 5).unwrap(), "deadbeef01");
    }
}
