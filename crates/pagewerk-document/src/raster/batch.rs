// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded-concurrency batch compression.
//
// A semaphore caps how many pages are being compressed at once; each task
// writes its result back into the slot of its input index, so the output order
// never depends on which process finishes first.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::process::ProcessInvoker;
use crate::raster::compressor::RasterCompressor;

/// Fans a list of pages out to a [`RasterCompressor`].
pub struct BatchCompressor<P> {
    compressor: Arc<RasterCompressor<P>>,
    window_size: usize,
}

impl<P: ProcessInvoker> BatchCompressor<P> {
    pub fn new(compressor: Arc<RasterCompressor<P>>, window_size: usize) -> Self {
        Self {
            compressor,
            window_size: window_size.max(1),
        }
    }

    pub fn compressor(&self) -> &RasterCompressor<P> {
        &self.compressor
    }

    /// Compress every source. The result has the same length and order as
    /// `sources`; a page that failed to compress is its original path.
    #[instrument(skip_all, fields(pages = sources.len(), window = self.window_size))]
    pub async fn compress_all(&self, sources: &[PathBuf]) -> Vec<PathBuf> {
        info!("Compressing {} pages", sources.len());

        let permits = Arc::new(Semaphore::new(self.window_size));
        let mut tasks = JoinSet::new();

        for (index, source) in sources.iter().cloned().enumerate() {
            let permits = Arc::clone(&permits);
            let compressor = Arc::clone(&self.compressor);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only fails if
                // it were; compress unbounded rather than drop the page.
                let _permit = permits.acquire_owned().await.ok();
                let compressed = compressor.compress(&source).await;
                (index, compressed)
            });
        }

        let mut slots: Vec<Option<PathBuf>> = vec![None; sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, compressed)) => slots[index] = Some(compressed),
                Err(err) => warn!(error = %err, "Compression task aborted"),
            }
        }

        let compressed: Vec<PathBuf> = slots
            .into_iter()
            .zip(sources)
            .map(|(slot, source)| slot.unwrap_or_else(|| source.clone()))
            .collect();

        let passed_through = compressed
            .iter()
            .zip(sources)
            .filter(|(out, src)| out == src)
            .count();
        debug!(passed_through, "Batch compression finished");

        compressed
    }
}
