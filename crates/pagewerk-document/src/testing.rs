// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test helpers: a scripted stand-in for the raster tool and image fixtures.

use std::collections::{HashMap, HashSet};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{Rgb, RgbImage};
use pagewerk_core::error::Result;
use pagewerk_core::types::CommandResult;

use crate::process::{Invocation, ProcessInvoker};

/// How the scripted tool behaves when asked to merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeScript {
    /// Write a container when every input can be found.
    #[default]
    WritesContainer,
    /// Complain on stderr unless `+compress` is given.
    StderrUnlessUncompressed,
    /// Complain on stderr on every attempt.
    AlwaysStderr,
    /// Exit quietly without writing anything.
    WritesNothing,
}

/// Plays the raster tool: answers colour probes from a table, "compresses" by
/// copying the source to the target, and writes a stub container on merge.
#[derive(Default)]
pub struct ScriptedInvoker {
    colors: HashMap<PathBuf, String>,
    failing: HashSet<PathBuf>,
    sized: HashMap<PathBuf, usize>,
    delays: HashMap<PathBuf, Duration>,
    merge: MergeScript,
    calls: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe output for `source`. Unlisted sources print nothing.
    pub fn with_colors(mut self, source: &Path, output: &str) -> Self {
        self.colors.insert(source.to_path_buf(), output.to_string());
        self
    }

    /// Compression of `source` leaves no file behind.
    pub fn failing_compression(mut self, source: &Path) -> Self {
        self.failing.insert(source.to_path_buf());
        self
    }

    /// Compression of `source` writes exactly `len` bytes.
    pub fn sized_output(mut self, source: &Path, len: usize) -> Self {
        self.sized.insert(source.to_path_buf(), len);
        self
    }

    /// Compression of `source` takes `delay`.
    pub fn with_delay(mut self, source: &Path, delay: Duration) -> Self {
        self.delays.insert(source.to_path_buf(), delay);
        self
    }

    pub fn with_merge(mut self, merge: MergeScript) -> Self {
        self.merge = merge;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn last_call(&self) -> Option<Invocation> {
        self.calls.lock().expect("calls lock").last().cloned()
    }

    pub fn merge_calls(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.has_flag("-adjoin"))
            .collect()
    }

    /// Highest number of compressions observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn probe(&self, invocation: &Invocation) -> CommandResult {
        let output = invocation
            .path_args()
            .last()
            .and_then(|source| self.colors.get(source))
            .cloned()
            .unwrap_or_default();
        CommandResult::completed(output, String::new(), Some(0))
    }

    async fn compress(&self, invocation: &Invocation) -> CommandResult {
        let paths: Vec<PathBuf> = invocation.path_args().map(Path::to_path_buf).collect();
        let (source, target) = (&paths[0], &paths[1]);

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(source) {
            tokio::time::sleep(*delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(source) {
            return CommandResult::completed(String::new(), "convert: no decode delegate".into(), Some(1));
        }
        if let Some(len) = self.sized.get(source) {
            std::fs::write(target, vec![0u8; *len]).expect("write sized output");
        } else if std::fs::copy(source, target).is_err() {
            return CommandResult::completed(String::new(), "convert: unable to open image".into(), Some(1));
        }
        CommandResult::completed(String::new(), String::new(), Some(0))
    }

    fn merge(&self, invocation: &Invocation) -> CommandResult {
        if invocation.exceeds_limit() {
            return CommandResult::rejected("command line too long");
        }
        let paths: Vec<&Path> = invocation.path_args().collect();
        let Some((target, inputs)) = paths.split_last() else {
            return CommandResult::completed(String::new(), "convert: no images".into(), Some(1));
        };

        match self.merge {
            MergeScript::WritesNothing => {
                return CommandResult::completed(String::new(), String::new(), Some(0));
            }
            MergeScript::AlwaysStderr => {
                return CommandResult::completed(String::new(), "convert: memory allocation failed".into(), Some(1));
            }
            MergeScript::StderrUnlessUncompressed if !invocation.has_flag("+compress") => {
                return CommandResult::completed(String::new(), "convert: compression failed".into(), Some(1));
            }
            _ => {}
        }

        if let Some(missing) = inputs
            .iter()
            .find(|input| !invocation.working_dir.join(input).exists())
        {
            return CommandResult::completed(
                String::new(),
                format!("convert: unable to open image '{}'", missing.display()),
                Some(1),
            );
        }

        // Relative targets resolve against the working directory, as the tool's do.
        let destination = invocation.working_dir.join(target);
        let mut container = b"II*\0".to_vec();
        container.resize(1024, 0);
        if std::fs::write(&destination, container).is_err() {
            return CommandResult::completed(
                String::new(),
                format!("convert: unable to open '{}'", destination.display()),
                Some(1),
            );
        }
        CommandResult::completed(String::new(), String::new(), Some(0))
    }
}

impl ProcessInvoker for ScriptedInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<CommandResult> {
        self.calls.lock().expect("calls lock").push(invocation.clone());

        let result = if invocation.has_flag("-format") {
            self.probe(invocation)
        } else if invocation.has_flag("-adjoin") {
            self.merge(invocation)
        } else {
            self.compress(invocation).await
        };
        Ok(result)
    }
}

/// Write a noisy RGB JPEG of `width`×`height` pixels tagged with `dpi`.
pub fn write_jpeg(path: &Path, width: u32, height: u32, dpi: u16) {
    let mut seed: u32 = width.wrapping_mul(31).wrapping_add(height);
    let image = RgbImage::from_fn(width, height, |x, y| {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let noise = (seed >> 16) as u8;
        Rgb([noise, (x % 256) as u8 ^ noise, (y % 256) as u8])
    });

    let file = std::fs::File::create(path).expect("create jpeg");
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), 90);
    encoder.set_pixel_density(PixelDensity::dpi(dpi));
    encoder.encode_image(&image).expect("encode jpeg");
}
