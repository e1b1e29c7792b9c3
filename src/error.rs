use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeasError {
    #[error("malformed bias header `{header}`: expected `<label>=<value>`")]
    Format { header: String },

    #[error("{columns} data columns cannot be split evenly into {variations} variations")]
    LayoutMismatch { columns: usize, variations: usize },

    #[error("temperature tiers cover {expected} variations, but the sheet has {found}")]
    TierMismatch { expected: usize, found: usize },

    #[error("column `{0}` not found")]
    MissingColumn(String),

    #[error("invalid value in column `{column}` at row {row}: {reason}")]
    InvalidCell {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("sheet `{0}` contains no data")]
    EmptySheet(String),

    #[error("unsupported device `{0}`: supported devices are FETs and MOS/MIM capacitors")]
    UnknownDevice(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("error reading spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

pub type Result<T> = std::result::Result<T, MeasError>;
