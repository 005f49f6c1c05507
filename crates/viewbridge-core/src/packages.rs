//! Import package loading.
//!
//! Drives the content's import loop: ask for the packages it is waiting on,
//! download them through the host on a bounded worker pool, hand the bodies
//! back, and repeat until the content stops waiting.
//!
//! # Invariants
//!
//! - At most `max_concurrent_downloads` downloads are in flight. Requests are
//!   issued in batches of that size and each batch is joined before the next
//!   one starts.
//! - An empty download aborts the load. Bodies of the failed batch are not
//!   added and later batches are never issued.
//! - Success means the content is neither waiting nor in error.
//!
//! A download that never returns stalls the build; there is no cancellation.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{
    config::BridgeConfig,
    engine::{Content, ImportRequest},
    error::PackageError,
    host::Host,
};

/// Bounded-concurrency package loader.
pub struct PackageLoader<H: Host> {
    host: Arc<H>,
    pool: ThreadPool,
    batch_size: usize,
    template: String,
}

impl<H: Host> PackageLoader<H> {
    /// Create a loader with its own download pool.
    pub fn new(host: Arc<H>, config: &BridgeConfig) -> Result<Self, PackageError> {
        let batch_size = config.max_concurrent_downloads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(batch_size)
            .thread_name(|i| format!("viewbridge-download-{i}"))
            .build()
            .map_err(|e| PackageError::Pool(e.to_string()))?;

        Ok(Self { host, pool, batch_size, template: config.import_source_template.clone() })
    }

    /// Maximum downloads in flight.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Source url for `request`: its own source, or the import template.
    pub fn source_for(&self, request: &ImportRequest) -> String {
        match &request.source {
            Some(source) if !source.is_empty() => source.clone(),
            _ => self
                .template
                .replace("{name}", &request.name)
                .replace("{version}", &request.version),
        }
    }

    /// Satisfy every import `content` is waiting on.
    pub fn load(&self, content: &mut dyn Content) -> Result<(), PackageError> {
        while content.is_waiting() && !content.is_error() {
            let requests = content.requested_packages();
            if requests.is_empty() {
                tracing::error!("content is waiting but requested no packages");
                return Err(PackageError::Stalled);
            }
            tracing::debug!(count = requests.len(), "loading packages");

            for batch in requests.chunks(self.batch_size) {
                self.load_batch(content, batch)?;
            }
        }

        if content.is_error() { Err(PackageError::ContentError) } else { Ok(()) }
    }

    fn load_batch(
        &self,
        content: &mut dyn Content,
        batch: &[ImportRequest],
    ) -> Result<(), PackageError> {
        let sources: Vec<String> = batch.iter().map(|request| self.source_for(request)).collect();
        let bodies: Vec<String> = self.pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    tracing::debug!(%source, "requesting package");
                    self.host.download_resource(source)
                })
                .collect()
        });

        if let Some(index) = bodies.iter().position(String::is_empty) {
            let request = &batch[index];
            tracing::error!(
                name = %request.name,
                version = %request.version,
                "could not retrieve requested import"
            );
            return Err(PackageError::EmptyContent {
                name: request.name.clone(),
                version: request.version.clone(),
                url: sources[index].clone(),
            });
        }

        for (request, body) in batch.iter().zip(bodies) {
            content.add_package(request, body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHost;

    impl Host for NullHost {
        fn send_message(&self, _token: &str, _message: String) {}

        fn download_resource(&self, _source: &str) -> String {
            String::new()
        }
    }

    fn request(source: Option<&str>) -> ImportRequest {
        ImportRequest {
            id: 1,
            name: "alexa-layouts".into(),
            version: "1.7.0".into(),
            source: source.map(str::to_string),
        }
    }

    #[test]
    fn template_fills_name_and_version() {
        let loader =
            PackageLoader::new(Arc::new(NullHost), &BridgeConfig::default()).expect("pool builds");
        assert_eq!(
            loader.source_for(&request(None)),
            "https://arl.assets.apl-alexa.com/packages/alexa-layouts/1.7.0/document.json"
        );
        assert_eq!(loader.source_for(&request(Some(""))), loader.source_for(&request(None)));
        assert_eq!(loader.source_for(&request(Some("https://x/y.json"))), "https://x/y.json");
    }

    #[test]
    fn zero_concurrency_is_one() {
        let config = BridgeConfig { max_concurrent_downloads: 0, ..BridgeConfig::default() };
        let loader = PackageLoader::new(Arc::new(NullHost), &config).expect("pool builds");
        assert_eq!(loader.batch_size(), 1);
    }
}
