//! Output sinks for rendered documents.

use parking_lot::Mutex;
use std::io::{self, Write};

/// Destination for rendered documents.
///
/// Implementations must write each document as one contiguous unit so that
/// documents from concurrent requests never interleave.
pub trait DocumentSink: Send + Sync {
    fn write_document(&self, document: &str) -> io::Result<()>;
}

/// Writes documents to the process's standard output, flushing after each.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl DocumentSink for StdoutSink {
    fn write_document(&self, document: &str) -> io::Result<()> {
        // The lock is held for the whole document, which keeps concurrent
        // requests from interleaving their output.
        let mut out = io::stdout().lock();
        out.write_all(document.as_bytes())?;
        if !document.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

/// Keeps documents in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

impl DocumentSink for MemorySink {
    fn write_document(&self, document: &str) -> io::Result<()> {
        self.documents.lock().push(document.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memory_sink_keeps_documents_whole() {
        let sink = Arc::new(MemorySink::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let doc = format!("--- # doc {i}\nline: {i}\n");
                    sink.write_document(&doc).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let documents = sink.documents();
        assert_eq!(documents.len(), 8);
        for doc in documents {
            assert!(doc.starts_with("--- # doc "));
            assert_eq!(doc.lines().count(), 2);
        }
    }

    #[test]
    fn stdout_sink_accepts_documents() {
        assert!(StdoutSink.write_document("--- # test\nok: true\n").is_ok());
    }
}
