//! Channel: one audio channel's samples and their repairs
//!
//! The channel owns the immutable input buffer, runs the one-shot scan,
//! and afterwards serves three aligned sequences: raw input, corrected
//! output, and masked prediction errors. Repairs stay inspectable and can
//! be nudged around with single-step boundary revisions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellac_core::{ProcessingSettings, ProgressSink, Sample, SampleBuffer, StatusSink};

use crate::error::{RestoreError, RestoreResult};
use crate::patch::{NO_ERROR, Patch};
use crate::scanner::{ScanReport, Scanner, ScannerTools};

/// Single-step patch boundary revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchRevision {
    /// Move the whole patch one sample earlier
    ShiftLeft,
    /// Move the whole patch one sample later
    ShiftRight,
    /// Extend the patch by one sample at its left edge
    GrowLeft,
    /// Extend the patch by one sample at its right edge
    GrowRight,
    /// Release the leftmost covered sample
    ShrinkLeft,
    /// Release the rightmost covered sample
    ShrinkRight,
}

/// A single channel of audio and the repairs made to it.
///
/// A channel scans at most once. Scanning again, with different settings
/// or otherwise, means constructing a new channel over the same samples.
pub struct Channel {
    samples: SampleBuffer,
    settings: ProcessingSettings,
    tools: Option<ScannerTools>,
}

impl Channel {
    /// Create a channel over raw samples.
    ///
    /// Fails on an empty buffer or invalid settings.
    pub fn new(
        samples: impl Into<SampleBuffer>,
        settings: ProcessingSettings,
    ) -> RestoreResult<Self> {
        let samples = samples.into();
        if samples.is_empty() {
            return Err(RestoreError::EmptyInput);
        }
        settings.validate()?;
        Ok(Self {
            samples,
            settings,
            tools: None,
        })
    }

    /// Scan for impulsive damage and repair everything found.
    ///
    /// Blocks until the scan is complete; stage and progress reports go to
    /// the two sinks. Fails with [`RestoreError::AlreadyScanned`] on a
    /// second call.
    pub fn scan(
        &mut self,
        status: &dyn StatusSink,
        progress: &dyn ProgressSink,
    ) -> RestoreResult<ScanReport> {
        if self.tools.is_some() {
            return Err(RestoreError::AlreadyScanned);
        }
        let scanner = Scanner::new(self.samples.clone(), self.settings.clone());
        let (tools, report) = scanner.scan(status, progress)?;
        self.tools = Some(tools);
        Ok(report)
    }

    /// True once a scan has completed
    pub fn is_preprocessed(&self) -> bool {
        self.tools.is_some()
    }

    /// Number of samples in the channel
    pub fn len_samples(&self) -> usize {
        self.samples.len()
    }

    /// The settings this channel scans with
    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    /// Raw input sample at `pos`, exactly as constructed
    pub fn input_sample(&self, pos: usize) -> RestoreResult<Sample> {
        self.samples.get(pos).ok_or(RestoreError::OutOfRange {
            pos,
            len: self.samples.len(),
        })
    }

    /// Corrected sample at `pos`: the patch value where a repair covers
    /// the position, the raw input everywhere else
    pub fn output_sample(&self, pos: usize) -> RestoreResult<Sample> {
        match &self.tools {
            Some(tools) => tools.input_view.effective(pos),
            None => self.input_sample(pos),
        }
    }

    /// Effective prediction error at `pos`.
    ///
    /// Zero for repaired positions, for the warm-up prefix, and before a
    /// scan has run.
    pub fn prediction_err(&self, pos: usize) -> RestoreResult<Sample> {
        match &self.tools {
            Some(tools) => tools.err_view.effective(pos),
            None => {
                self.input_sample(pos)?;
                Ok(NO_ERROR)
            }
        }
    }

    /// Number of repairs made by the scan
    pub fn patch_count(&self) -> usize {
        self.tools
            .as_ref()
            .map_or(0, |tools| tools.input_registry.count())
    }

    /// All input patches, sorted by start position
    pub fn patches(&self) -> Vec<Arc<Patch>> {
        self.tools
            .as_ref()
            .map_or_else(Vec::new, |tools| tools.input_registry.snapshot())
    }

    /// Apply a one-step boundary revision to the patch starting at
    /// `start_position`.
    ///
    /// The revised range is validated against the buffer, the settings,
    /// and every other patch, then both the input patch and its no-error
    /// mirror are recomputed and swapped in one step each. Later patches
    /// whose prediction context saw the revised span are refreshed in
    /// order.
    pub fn revise_patch(&mut self, start_position: usize, op: PatchRevision) -> RestoreResult<()> {
        let tools = self.tools.as_ref().ok_or(RestoreError::NotPreprocessed)?;
        let patch = tools
            .input_registry
            .find_at(start_position)
            .ok_or(RestoreError::NoSuchPatch(start_position))?;
        let mirror = tools.err_registry.find_at(start_position);

        let (start, len) = patch.range();
        let revised = match op {
            PatchRevision::ShiftLeft => start.checked_sub(1).map(|s| (s, len)),
            PatchRevision::ShiftRight => Some((start + 1, len)),
            PatchRevision::GrowLeft => start.checked_sub(1).map(|s| (s, len + 1)),
            PatchRevision::GrowRight => Some((start, len + 1)),
            PatchRevision::ShrinkLeft => (len > 1).then_some((start + 1, len - 1)),
            PatchRevision::ShrinkRight => (len > 1).then_some((start, len - 1)),
        };
        let Some((new_start, new_len)) = revised else {
            return Err(RestoreError::RevisionRejected(format!(
                "{op:?} would leave no patch at position {start}"
            )));
        };

        validate_revision(
            tools,
            &self.settings,
            self.samples.len(),
            patch.seq(),
            new_start,
            new_len,
        )?;

        // Compute the replacement first, then publish range and values in
        // a single swap per patch.
        let values = tools
            .regenerator
            .regenerate_range(new_start, new_len, Some(patch.seq()))?;
        patch.set_range_and_values(new_start, values);
        if let Some(mirror) = mirror {
            mirror.set_range_and_values(new_start, vec![NO_ERROR; new_len]);
        }

        let changed_start = start.min(new_start);
        let changed_end = (start + len).max(new_start + new_len);
        cascade_refresh(tools, changed_start, changed_end)
    }
}

/// Check a revised patch range against buffer, settings, and neighbors
fn validate_revision(
    tools: &ScannerTools,
    settings: &ProcessingSettings,
    buffer_len: usize,
    seq: u64,
    start: usize,
    len: usize,
) -> RestoreResult<()> {
    if len > settings.max_correction_samples {
        return Err(RestoreError::RevisionRejected(format!(
            "length {len} exceeds the maximum correction length {}",
            settings.max_correction_samples
        )));
    }
    if start < settings.input_data_size() {
        return Err(RestoreError::RevisionRejected(format!(
            "start {start} leaves less than {} samples of prediction context",
            settings.input_data_size()
        )));
    }
    if start + len > buffer_len {
        return Err(RestoreError::RevisionRejected(format!(
            "range {start}..{} runs past the end of the buffer",
            start + len
        )));
    }
    for other in tools.input_registry.snapshot() {
        if other.seq() == seq {
            continue;
        }
        let (other_start, other_len) = other.range();
        if start < other_start + other_len && other_start < start + len {
            return Err(RestoreError::RevisionRejected(format!(
                "range {start}..{} overlaps the patch at {other_start}",
                start + len
            )));
        }
    }
    Ok(())
}

/// Refresh every patch after a revised span whose prediction context can
/// see the change, left to right so refreshed values feed later refreshes.
fn cascade_refresh(
    tools: &ScannerTools,
    changed_start: usize,
    changed_end: usize,
) -> RestoreResult<()> {
    let reach = tools.regenerator.context_len();
    let mut dirty_end = changed_end + reach;
    for patch in tools.input_registry.snapshot() {
        let (start, len) = patch.range();
        if start <= changed_start {
            continue;
        }
        if start >= dirty_end {
            break;
        }
        patch.refresh()?;
        dirty_end = dirty_end.max(start + len + reach);
    }
    Ok(())
}
