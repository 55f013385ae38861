//! Fetcher test utilities

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use macos_release_watch::scraper::{FetchError, PageFetcher};

/// Fetcher returning prepared responses in order
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_page(self, html: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(html.into()));
        self
    }

    pub fn with_error(self, error: FetchError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left")
    }
}
