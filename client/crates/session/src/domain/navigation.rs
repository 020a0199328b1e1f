//! Navigation
//!
//! Where the session core sends the user. The host router implements
//! [`Navigator`].

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// The location the user originally tried to reach
    pub from: Option<String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: None,
        }
    }

    /// `path`, remembering `from` so the login page can send the user back.
    pub fn returning_to(path: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: Some(from.into()),
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &Location);
}
