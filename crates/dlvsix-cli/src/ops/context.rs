//! Shared command context.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dlvsix_core::Reporter;
use dlvsix_core::cache::TouchedFiles;

use crate::ops::AppError;

/// State shared by a command's operations.
#[derive(Clone)]
pub struct Context {
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
    pub touched: TouchedFiles,
    pub work_dir: PathBuf,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("work_dir", &self.work_dir)
            .field("touched", &self.touched.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(work_dir: PathBuf, reporter: Arc<dyn Reporter>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(dlvsix_core::USER_AGENT)
            .build()
            .map_err(|e| AppError::context("Failed to create HTTP client", e))?;
        Ok(Self {
            client,
            reporter,
            touched: TouchedFiles::new(),
            work_dir,
        })
    }
}
