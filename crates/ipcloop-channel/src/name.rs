use std::ffi::CString;
use std::fmt;

use crate::error::{ChannelError, Result};

/// Maximum logical name length in bytes.
///
/// Names travel in a 64-byte NUL-terminated field of the request envelope.
pub const MAX_NAME_LEN: usize = 63;

/// A validated logical channel name.
///
/// The logical name `worker` addresses the queue `/worker`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    name: String,
}

impl ChannelName {
    /// Validate a logical channel name.
    ///
    /// A single leading `/` is accepted and stripped, so both `worker` and
    /// `/worker` name the same queue.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let raw = name.as_ref();
        let name = raw.strip_prefix('/').unwrap_or(raw);

        if name.is_empty() {
            return Err(ChannelError::InvalidName {
                name: raw.to_string(),
                reason: "name must not be empty",
            });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ChannelError::NameTooLong {
                name: raw.to_string(),
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        if name.contains('/') {
            return Err(ChannelError::InvalidName {
                name: raw.to_string(),
                reason: "name must not contain '/'",
            });
        }
        if name.contains('\0') {
            return Err(ChannelError::InvalidName {
                name: raw.to_string(),
                reason: "name must not contain NUL",
            });
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    /// The logical name, without the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The queue path, `/` followed by the logical name.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }

    pub(crate) fn c_path(&self) -> CString {
        // Validation rejects interior NUL bytes.
        CString::new(self.path()).unwrap_or_default()
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_slash_path() {
        let name = ChannelName::new("alice").unwrap();
        assert_eq!(name.as_str(), "alice");
        assert_eq!(name.path(), "/alice");
        assert_eq!(name.c_path().as_bytes(), b"/alice");
    }

    #[test]
    fn accepts_leading_slash() {
        let name = ChannelName::new("/bob").unwrap();
        assert_eq!(name, ChannelName::new("bob").unwrap());
    }

    #[test]
    fn rejects_empty_and_nested_names() {
        assert!(matches!(
            ChannelName::new(""),
            Err(ChannelError::InvalidName { .. })
        ));
        assert!(matches!(
            ChannelName::new("/"),
            Err(ChannelError::InvalidName { .. })
        ));
        assert!(matches!(
            ChannelName::new("a/b"),
            Err(ChannelError::InvalidName { .. })
        ));
        assert!(matches!(
            ChannelName::new("a\0b"),
            Err(ChannelError::InvalidName { .. })
        ));
    }

    #[test]
    fn enforces_name_field_width() {
        let longest = "n".repeat(MAX_NAME_LEN);
        assert!(ChannelName::new(&longest).is_ok());

        let too_long = "n".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            ChannelName::new(&too_long),
            Err(ChannelError::NameTooLong { len: 64, max: 63, .. })
        ));
    }
}
