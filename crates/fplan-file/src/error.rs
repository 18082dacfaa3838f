//! 持久化协作方错误定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("No layout stored for site: {0}")]
    NotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid template name: {0}")]
    InvalidTemplateName(#[from] TemplateNameError),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),
}

/// 模板名称不合规的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateNameError {
    #[error("name must be at least {min} characters")]
    TooShort { min: usize },

    #[error("name must be at most {max} characters")]
    TooLong { max: usize },

    #[error("character '{0}' is not allowed")]
    InvalidCharacter(char),

    #[error("name must not start or end with a space")]
    SurroundingWhitespace,

    #[error("'{0}' is a reserved word")]
    Reserved(String),

    #[error("'{0}' is a built-in template")]
    BuiltinConflict(String),
}
