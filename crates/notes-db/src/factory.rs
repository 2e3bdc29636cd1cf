use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::document::DocumentDataSource;
use crate::relational::RelationalDataSource;
use crate::source::NotesDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Document,
    Relational,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Document => "document-backend",
            BackendKind::Relational => "relational-backend",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "document-backend" => Ok(BackendKind::Document),
            "relational-backend" => Ok(BackendKind::Relational),
            other => Err(anyhow::anyhow!(
                "unknown backend {:?} (expected document-backend or relational-backend)",
                other
            )),
        }
    }
}

/// Backend choice plus where each backend keeps its data. A `None` path
/// gives a non-persistent store.
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    pub backend: BackendKind,
    pub relational_path: Option<PathBuf>,
    pub document_path: Option<PathBuf>,
}

impl DataSourceConfig {
    pub fn in_memory(backend: BackendKind) -> Self {
        Self {
            backend,
            relational_path: None,
            document_path: None,
        }
    }
}

/// Open the configured backend. Called once at startup; the returned
/// handle is shared for the life of the process.
pub async fn open_data_source(config: &DataSourceConfig) -> Result<Arc<dyn NotesDataSource>> {
    info!("Opening {} data source", config.backend);

    let source: Arc<dyn NotesDataSource> = match config.backend {
        BackendKind::Relational => match &config.relational_path {
            Some(path) => Arc::new(RelationalDataSource::open(path)?),
            None => Arc::new(RelationalDataSource::in_memory()?),
        },
        BackendKind::Document => match &config.document_path {
            Some(path) => Arc::new(DocumentDataSource::open(path).await?),
            None => Arc::new(DocumentDataSource::in_memory()),
        },
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_backend_names() {
        assert_eq!(
            "document-backend".parse::<BackendKind>().unwrap(),
            BackendKind::Document
        );
        assert_eq!(
            "relational-backend".parse::<BackendKind>().unwrap(),
            BackendKind::Relational
        );
        assert!("sqlite".parse::<BackendKind>().is_err());
        assert!("Document-Backend".parse::<BackendKind>().is_err());
    }

    #[test]
    fn display_matches_config_value() {
        for kind in [BackendKind::Document, BackendKind::Relational] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn opens_each_backend_in_memory() {
        for kind in [BackendKind::Document, BackendKind::Relational] {
            let source = open_data_source(&DataSourceConfig::in_memory(kind))
                .await
                .unwrap();
            assert!(!source.user_email_exists("nobody@example.com").await.unwrap());
        }
    }
}
