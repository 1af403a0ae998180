//! Desktop background collaborator interface.
//!
//! The catalog resolves which file should become the background; actually
//! setting it is up to the platform integration behind [`DesktopSetter`].

use derive_more::{Display, Error};
use std::path::Path;

/// Which displays a background should be applied to.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Default)]
pub enum DisplayScope {
    /// The display (or desktop) that currently has focus.
    #[default]
    #[display("current display")]
    Current,
    #[display("all displays")]
    All,
    /// One display, by the platform's name for it.
    #[display("display {_0}")]
    Display(String),
}

/// Failure reported back by a [`DesktopSetter`].
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("{message}")]
pub struct SetterError {
    message: String,
}

impl SetterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Sets a file as the desktop background.
pub trait DesktopSetter {
    fn set_background(&self, path: &Path, scope: &DisplayScope) -> Result<(), SetterError>;
}
