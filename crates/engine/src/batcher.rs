use model::records::{Batch, RawRecord};
use tokio::sync::mpsc;
use tracing::debug;

/// Folds the raw-record stream into fixed-size batches, preserving arrival
/// order. Present in every run; a batch length of 1 is the degenerate
/// per-record case.
pub struct Batcher {
    batch_len: usize,
}

impl Batcher {
    pub fn new(batch_len: usize) -> Self {
        debug_assert!(batch_len >= 1, "settings validation enforces this");
        Batcher { batch_len }
    }

    /// Consumes `rx` until it closes, emitting every full batch immediately
    /// and flushing a non-empty partial batch at the end. Dropping `tx` on
    /// return closes the batch channel. Returns the number of batches
    /// emitted.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<RawRecord>,
        tx: async_channel::Sender<Batch>,
    ) -> u64 {
        let mut rows = Vec::with_capacity(self.batch_len);
        let mut seq = 0u64;

        while let Some(record) = rx.recv().await {
            rows.push(record);
            if rows.len() == self.batch_len {
                let full = std::mem::replace(&mut rows, Vec::with_capacity(self.batch_len));
                if !Self::emit(&tx, &mut seq, full).await {
                    return seq;
                }
            }
        }
        if !rows.is_empty() {
            Self::emit(&tx, &mut seq, rows).await;
        }

        debug!(batches = seq, "Batcher drained");
        seq
    }

    async fn emit(tx: &async_channel::Sender<Batch>, seq: &mut u64, rows: Vec<RawRecord>) -> bool {
        let batch = Batch { seq: *seq, rows };
        *seq += 1;
        // A send error means every worker is gone; stop producing.
        tx.send(batch).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn batch_up(lines: Vec<&str>, batch_len: usize) -> Vec<Batch> {
        let (raw_tx, raw_rx) = mpsc::channel(64);
        let (batch_tx, batch_rx) = async_channel::unbounded();

        let batcher = tokio::spawn(Batcher::new(batch_len).run(raw_rx, batch_tx));
        for line in &lines {
            raw_tx.send(RawRecord::from(*line)).await.unwrap();
        }
        drop(raw_tx);

        let emitted = batcher.await.unwrap();
        let mut batches = Vec::new();
        while let Ok(batch) = batch_rx.recv().await {
            batches.push(batch);
        }
        assert_eq!(emitted, batches.len() as u64);
        batches
    }

    fn flatten(batches: &[Batch]) -> Vec<&str> {
        batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn emits_ceil_k_over_b_batches() {
        for (k, b, expected_sizes) in [
            (10, 4, vec![4, 4, 2]),
            (8, 4, vec![4, 4]),
            (3, 4, vec![3]),
            (5, 1, vec![1, 1, 1, 1, 1]),
        ] {
            let lines: Vec<String> = (0..k).map(|i| format!("line-{i}")).collect();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let batches = batch_up(refs, b).await;
            let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
            assert_eq!(sizes, expected_sizes, "K={k} B={b}");
        }
    }

    #[tokio::test]
    async fn preserves_arrival_order_without_loss_or_duplication() {
        let lines: Vec<String> = (0..23).map(|i| format!("record-{i:02}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let batches = batch_up(refs.clone(), 5).await;

        assert_eq!(flatten(&batches), refs);
        let seqs: Vec<u64> = batches.iter().map(|b| b.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_input_emits_no_batches() {
        let batches = batch_up(vec![], 4).await;
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn partial_final_batch_is_flushed_not_dropped() {
        let batches = batch_up(vec!["a", "b", "c"], 2).await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].rows[0].as_str(), "c");
    }
}
