/*!
 * Batch translation scheduling.
 *
 * Entries are cut into fixed-size batches that run in small waves: at most
 * `MAX_CONCURRENT_BATCHES` batches are in flight, later batches of a wave start
 * after `BATCH_PACING`, and waves are separated by `WAVE_COOLDOWN`. These
 * values keep a job under typical free-tier rate limits and are not part of
 * the user configuration.
 */

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, warn};

use crate::errors::BatchError;
use crate::subtitle_processor::SubtitleEntry;

use super::client::{TranslationClient, TranslationMap};

/// Entries per external call
pub const BATCH_SIZE: usize = 50;

/// Batches in flight at the same time
pub const MAX_CONCURRENT_BATCHES: usize = 2;

/// Delay before the second and later batches of a wave start
pub const BATCH_PACING: Duration = Duration::from_millis(500);

/// Pause between two waves
pub const WAVE_COOLDOWN: Duration = Duration::from_millis(1000);

/// Progress reported as soon as a job starts
pub const INITIAL_PROGRESS: u8 = 5;

/// Progress points shared out across batches; 100 is left to the caller
const PROGRESS_SPAN: usize = 94;

/// Scheduling limits, defaulting to the fixed constants above
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Entries per batch
    pub batch_size: usize,
    /// Batches per wave
    pub max_concurrent_batches: usize,
    /// Start delay of later batches in a wave
    pub batch_pacing: Duration,
    /// Pause between waves
    pub wave_cooldown: Duration,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            max_concurrent_batches: MAX_CONCURRENT_BATCHES,
            batch_pacing: BATCH_PACING,
            wave_cooldown: WAVE_COOLDOWN,
        }
    }
}

/// Progress after `completed` of `total` entries came back
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return INITIAL_PROGRESS;
    }
    let completed = completed.min(total);
    INITIAL_PROGRESS + (PROGRESS_SPAN * completed / total) as u8
}

/// Replace text of entries found in `translations`, matching by id
///
/// Returns how many entries had no translation and kept their text.
pub fn merge_translations(chunk: &mut [SubtitleEntry], translations: &TranslationMap) -> usize {
    let mut missing = 0;
    for entry in chunk.iter_mut() {
        match translations.get(&entry.id) {
            Some(text) => entry.text = text.clone(),
            None => missing += 1,
        }
    }
    missing
}

/// Runs one job's entries through a translation client in paced waves
pub struct BatchScheduler {
    /// The client every batch is sent to
    client: Arc<dyn TranslationClient>,

    /// Batch size, concurrency and pacing
    limits: SchedulerLimits,
}

impl BatchScheduler {
    /// Create a scheduler with the default limits
    pub fn new(client: Arc<dyn TranslationClient>) -> Self {
        Self {
            client,
            limits: SchedulerLimits::default(),
        }
    }

    /// Override the scheduling limits
    pub fn with_limits(mut self, limits: SchedulerLimits) -> Self {
        self.limits = SchedulerLimits {
            batch_size: limits.batch_size.max(1),
            max_concurrent_batches: limits.max_concurrent_batches.max(1),
            ..limits
        };
        self
    }

    /// Split `total` entries into consecutive batch ranges
    pub fn batch_ranges(&self, total: usize) -> Vec<Range<usize>> {
        let size = self.limits.batch_size;
        (0..total)
            .step_by(size)
            .map(|start| start..(start + size).min(total))
            .collect()
    }

    /// Translate `entries`, returning a copy with translated text
    ///
    /// `on_progress` is called after every batch with the job's progress in
    /// percent. The first failing batch aborts the run; batches still in
    /// flight are dropped.
    pub async fn run(
        &self,
        entries: &[SubtitleEntry],
        style_hint: &str,
        mut on_progress: impl FnMut(u8),
    ) -> Result<Vec<SubtitleEntry>, BatchError> {
        let total = entries.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let ranges = self.batch_ranges(total);
        let concurrency = self.limits.max_concurrent_batches;
        let wave_count = ranges.len().div_ceil(concurrency);
        debug!(
            "Scheduling {} entries in {} batches over {} waves",
            total, ranges.len(), wave_count
        );

        let mut working = entries.to_vec();
        let mut completed = 0;

        for (wave_index, wave) in ranges.chunks(concurrency).enumerate() {
            let mut in_flight = FuturesUnordered::new();

            for (slot, range) in wave.iter().enumerate() {
                let batch_number = wave_index * concurrency + slot + 1;
                let batch = &entries[range.clone()];
                let range = range.clone();
                let client = &self.client;
                let pacing = if slot > 0 { self.limits.batch_pacing } else { Duration::ZERO };

                in_flight.push(async move {
                    if !pacing.is_zero() {
                        tokio::time::sleep(pacing).await;
                    }
                    let start_time = Instant::now();
                    let result = client.translate_batch(batch, style_hint).await;
                    debug!("Batch {} finished in {:?}", batch_number, start_time.elapsed());
                    (batch_number, range, result)
                });
            }

            while let Some((batch_number, range, result)) = in_flight.next().await {
                let translations = result.map_err(|source| {
                    error!("Batch {} failed: {}", batch_number, source);
                    BatchError::TranslationFailed { batch: batch_number, source }
                })?;

                let missing = merge_translations(&mut working[range.clone()], &translations);
                if missing > 0 {
                    warn!("Batch {}: {} entries came back untranslated", batch_number, missing);
                }

                completed += range.len();
                on_progress(progress_percent(completed, total));
            }

            if wave_index + 1 < wave_count {
                tokio::time::sleep(self.limits.wave_cooldown).await;
            }
        }

        Ok(working)
    }
}
