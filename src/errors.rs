use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
