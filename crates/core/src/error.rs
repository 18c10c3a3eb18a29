#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
}
