use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
	#[display("event shorter than its context header")]
	TruncatedContext,
	#[display("field payload runs past the end of the event")]
	TruncatedField,
	#[display("unknown field tag {_0}")]
	UnknownTag(u8),
	#[display("unexpected tag {_0} inside a string array")]
	UnexpectedArrayTag(u8),
}

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
