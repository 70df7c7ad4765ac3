use std::io;
use std::path::PathBuf;

use companion_core::sync::topics::TopicError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("failed to read settings from {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),
    #[error("invalid topic prefix: {0}")]
    TopicPrefix(TopicError),
    #[error("usage: companion-emulator [--config <path>]")]
    Usage,
    #[error("mqtt client: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("mqtt connection thread has exited")]
    ConnectionClosed,
    #[error("terminal: {0}")]
    Io(#[from] io::Error),
}
