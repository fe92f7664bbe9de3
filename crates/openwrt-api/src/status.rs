// HTTP status classification
//
// The session only cares about four outcomes. 401 and 403 are kept apart
// for diagnostics but both lead to a re-login.

use crate::error::Error;

/// Longest body excerpt carried on `Error::Http`.
const BODY_PREVIEW_LEN: usize = 200;

/// Outcome of a completed HTTP exchange, by status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200 through 226.
    Success,
    /// 401.
    Unauthenticated,
    /// 403.
    Forbidden,
    /// Anything else.
    Failure(u16),
}

/// Classify a status code.
pub fn classify(status: u16) -> StatusClass {
    match status {
        200..=226 => StatusClass::Success,
        401 => StatusClass::Unauthenticated,
        403 => StatusClass::Forbidden,
        other => StatusClass::Failure(other),
    }
}

impl StatusClass {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Turn a non-success class into its error. `body` is only used as a
    /// diagnostic preview.
    pub fn check(self, body: &[u8]) -> Result<(), Error> {
        match self {
            Self::Success => Ok(()),
            Self::Unauthenticated => Err(Error::Unauthenticated),
            Self::Forbidden => Err(Error::Forbidden),
            Self::Failure(status) => {
                let text = String::from_utf8_lossy(body);
                Err(Error::Http {
                    status,
                    body: text.chars().take(BODY_PREVIEW_LEN).collect(),
                })
            }
        }
    }
}
