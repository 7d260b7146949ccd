//! In-memory fetcher for crawl tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use leakhunt_core::{normalize_url, StopFlag};
use leakhunt_tor::{FetchResult, Fetcher, FetcherKind, TorError};

/// Serves canned pages and records every fetch
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    pages: HashMap<String, (u16, String)>,
    redirects: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    stop_after: Option<(usize, StopFlag)>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(key(url), (200, body.to_string()));
        self
    }

    /// Serve `body` as if `url` had redirected to `final_url`
    pub fn redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.redirects.insert(key(url), final_url.to_string());
        self.page(url, body)
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(key(url), (status, String::new()));
        self
    }

    /// Request a stop once `fetches` fetches have completed
    pub fn stop_after(mut self, fetches: usize, stop: &StopFlag) -> Self {
        self.stop_after = Some((fetches, stop.clone()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(url: &str) -> String {
    normalize_url(url).unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Http
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(url.to_string());
            calls.len()
        };

        if let Some((after, stop)) = &self.stop_after {
            if count >= *after {
                stop.request();
            }
        }

        match self.pages.get(&key(url)) {
            Some((200, body)) => {
                let final_url = self.redirects.get(&key(url)).cloned().unwrap_or_else(|| url.to_string());
                FetchResult::success(url, final_url, 200, body.clone())
            }
            Some((status, _)) => FetchResult::failure(url, Some(*status), &TorError::Status(*status)),
            None => FetchResult::failure(url, Some(404), &TorError::Status(404)),
        }
    }
}
