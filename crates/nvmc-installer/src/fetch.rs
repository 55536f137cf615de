use std::io::{Read, Write};
use std::path::PathBuf;

use nvmc_core::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use tracing::debug;

pub const MAX_REDIRECTS: usize = 10;

pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Retrieves a URL into a caller-supplied sink.
pub trait Fetch {
    /// Writes the body served for `url` into `sink` and returns the number of
    /// bytes written.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

pub fn default_user_agent() -> String {
    format!("nvmc-{}", env!("CARGO_PKG_VERSION"))
}

/// Blocking HTTP fetcher that follows 300, 302 and 307 responses itself.
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
    progress: Option<ProgressFn>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(&default_user_agent())
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|err| Error::network("<client>", format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    fn copy_body(&self, url: &str, response: &mut Response, sink: &mut dyn Write) -> Result<u64> {
        let total = response.content_length();
        let mut buffer = vec![0_u8; 64 * 1024];
        let mut downloaded = 0_u64;
        if let Some(progress) = &self.progress {
            progress(0, total);
        }

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| Error::network(url, format!("failed reading response body: {err}")))?;
            if read == 0 {
                break;
            }
            sink.write_all(&buffer[..read]).map_err(|source| Error::Filesystem {
                message: "failed to write downloaded bytes".to_string(),
                path: PathBuf::from(url),
                source,
            })?;
            downloaded += read as u64;
            if let Some(progress) = &self.progress {
                progress(downloaded, total);
            }
        }
        sink.flush().map_err(|source| Error::Filesystem {
            message: "failed to flush downloaded bytes".to_string(),
            path: PathBuf::from(url),
            source,
        })?;

        debug!(url, bytes = downloaded, "download complete");
        Ok(downloaded)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut current = url.to_string();
        for _ in 0..=self.max_redirects {
            debug!(url = %current, "GET");
            let mut response = self
                .client
                .get(&current)
                .send()
                .map_err(|err| Error::network(&current, err.to_string()))?;

            let status = response.status();
            match status {
                StatusCode::OK => return self.copy_body(&current, &mut response, sink),
                StatusCode::MULTIPLE_CHOICES
                | StatusCode::FOUND
                | StatusCode::TEMPORARY_REDIRECT => {
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| {
                            Error::network(
                                &current,
                                format!("HTTP {status} response must have a Location header"),
                            )
                        })?;
                    let next = resolve_location(&current, location)?;
                    debug!(from = %current, to = %next, "following redirect");
                    current = next;
                }
                other => {
                    return Err(Error::network(
                        &current,
                        format!("unexpected HTTP status {other}"),
                    ))
                }
            }
        }

        Err(Error::network(
            url,
            format!("too many redirects (limit {})", self.max_redirects),
        ))
    }
}

/// Downloads `url` into `sink` with a default client.
pub fn download(url: &str, sink: &mut dyn Write) -> Result<u64> {
    HttpFetcher::new()?.fetch(url, sink)
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|err| Error::network(current, format!("invalid request URL: {err}")))?;
    base.join(location)
        .map(String::from)
        .map_err(|err| Error::network(current, format!("invalid Location header '{location}': {err}")))
}
