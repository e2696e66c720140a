use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiftError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Study {study_id} does not exist.")]
    NotFound { study_id: String },

    #[error("{0}")]
    Data(String),

    #[error("Division by zero while computing {what}")]
    DivisionByZero { what: &'static str },

    #[error("Error while {stage} for study {study_id}: {source}")]
    Stage {
        study_id: String,
        stage: String,
        #[source]
        source: Box<LiftError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiftError {
    /// Wrap an error with the orchestration stage and study it came from.
    pub fn at_stage(self, study_id: &str, stage: impl Into<String>) -> Self {
        LiftError::Stage {
            study_id: study_id.to_string(),
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage wrappers.
    pub fn root(&self) -> &LiftError {
        match self {
            LiftError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Every failure surfaces to the caller as a bad request.
    pub fn status_code(&self) -> u16 {
        400
    }
}

pub type LiftResult<T> = Result<T, LiftError>;

/// Attach stage context to any `LiftResult`.
pub trait StageContext<T> {
    fn stage(self, study_id: &str, stage: &str) -> LiftResult<T>;
}

impl<T> StageContext<T> for LiftResult<T> {
    fn stage(self, study_id: &str, stage: &str) -> LiftResult<T> {
        self.map_err(|e| e.at_stage(study_id, stage))
    }
}
