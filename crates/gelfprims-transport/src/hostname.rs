use crate::error::{Result, TransportError};

#[cfg(unix)]
const MAX_HOSTNAME_LEN: usize = 256;

/// Resolve the local host name (`gethostname(2)`).
#[cfg(unix)]
pub fn local_hostname() -> Result<String> {
    let mut buf = [0u8; MAX_HOSTNAME_LEN];

    // SAFETY: `buf` is a valid writable buffer of `buf.len()` bytes for the
    // duration of the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return Err(TransportError::Hostname(std::io::Error::last_os_error()));
    }

    // POSIX does not guarantee NUL termination on truncation.
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..len]).into_owned();
    if name.is_empty() {
        return Err(TransportError::Hostname(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "empty hostname",
        )));
    }

    Ok(name)
}

/// Resolve the local host name.
///
/// Returns an error on platforms without a supported lookup.
#[cfg(not(unix))]
pub fn local_hostname() -> Result<String> {
    Err(TransportError::Hostname(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "hostname lookup is only implemented for unix targets",
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn resolves_non_empty_hostname() {
        let name = local_hostname().unwrap();
        assert!(!name.is_empty());
        assert!(!name.contains('\0'));
    }
}
