use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read config file {path:?}: {source}")]
	ReadConfig { path: PathBuf, source: io::Error },
	#[error("Cannot parse config file {path:?}: {source}")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("{message}")]
	Validation { message: String },
}
