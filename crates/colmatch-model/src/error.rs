use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("dataset has {headers} headers but row {row} has {cells} cells")]
    RowTooWide {
        headers: usize,
        row: usize,
        cells: usize,
    },
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
