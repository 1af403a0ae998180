//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("catalog operation failed")]
    Catalog,
    #[display("engine package operation failed")]
    Package,
    #[display("no asset with id {_0}")]
    UnknownAsset(#[error(not(source))] String),
    /// The asset exists but has nothing that can be set as a background.
    #[display("asset {_0} has no background file")]
    NoTarget(#[error(not(source))] String),
    #[display("failed to write output")]
    Output,
}
