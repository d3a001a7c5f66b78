use failure::Fail;

#[derive(Debug, Fail)]
pub enum NluTrainingError {
    #[fail(display = "Invalid training input: {}", _0)]
    InvalidTrainInput(String),
    #[fail(display = "Unknown language: '{}'", _0)]
    UnknownLanguage(String),
    #[fail(display = "Tag range {}..{} is not aligned with token boundaries", _0, _1)]
    MisalignedTagRange(usize, usize),
    #[fail(display = "Training stage '{}' failed", _0)]
    StageFailure(&'static str),
    #[fail(display = "Document '{}/{}' does not exist", _0, _1)]
    DocumentNotFound(String, String),
    #[fail(display = "Tooling adapter contract violation: {}", _0)]
    ToolingContractViolation(String),
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;
