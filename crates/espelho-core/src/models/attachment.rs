//! Attachment model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Attachment file type; a task holds at most one of each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "imagem")]
    Image,
}

impl FileType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "imagem",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "imagem" => Ok(Self::Image),
            other => Err(Error::InvalidInput(format!("unknown file type: {other}"))),
        }
    }
}

/// File attached to a task; the binary lives on disk, only metadata is mirrored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "id_anexo")]
    pub id: Option<i64>,
    #[serde(rename = "id_tarefa")]
    pub task_id: i64,
    #[serde(rename = "tipo_arquivo")]
    pub file_type: FileType,
    #[serde(rename = "nome_arquivo")]
    pub file_name: String,
    #[serde(rename = "nome_original")]
    pub original_name: String,
    #[serde(rename = "tamanho_arquivo")]
    pub size_bytes: i64,
    #[serde(rename = "caminho_arquivo")]
    pub path: String,
    #[serde(rename = "data_upload", default)]
    pub uploaded_at: Option<String>,
    #[serde(rename = "data_atualizacao", default)]
    pub updated_at: Option<String>,
}

impl Attachment {
    pub fn validate(&self) -> Result<()> {
        if self.task_id <= 0 {
            return Err(Error::InvalidInput(
                "attachment requires a valid task id".into(),
            ));
        }
        if self.file_name.trim().is_empty() || self.original_name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "attachment requires file and original names".into(),
            ));
        }
        if self.path.trim().is_empty() {
            return Err(Error::InvalidInput("attachment requires a file path".into()));
        }
        if self.size_bytes < 0 {
            return Err(Error::InvalidInput(
                "attachment size must not be negative".into(),
            ));
        }
        Ok(())
    }
}
