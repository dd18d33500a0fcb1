//! Re-indexing a saved sheet.
//!
//! An update is load-snapshot, delete the sheet's documents, add the new
//! ones, persist, all under the [`StoreLock`] shared with allocation.
//! [`IndexUpdateQueue`] runs updates on one background thread, FIFO.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use ontocurate_table::Table;

use crate::allocator::StoreLock;
use crate::index::{IndexDocument, IndexError, TextIndex};

#[derive(Debug, Clone)]
pub struct SheetUpdate {
    pub repo: String,
    pub folder: String,
    pub sheet_name: String,
    pub table: Table,
}

impl SheetUpdate {
    pub fn sheet(&self) -> String {
        format!("{}/{}", self.folder, self.sheet_name)
    }
}

/// Index documents for every row with at least one content field.
pub fn documents_for_sheet(repo: &str, sheet: &str, table: &Table) -> Vec<IndexDocument> {
    let schema = table.schema();
    let parent_column = table.column(ontocurate_table::schema::PARENT);
    table
        .rows()
        .iter()
        .filter_map(|row| {
            let parent = parent_column
                .and_then(|c| row.get(c))
                .map(|p| p.trim())
                .filter(|p| !p.is_empty());
            let doc = IndexDocument {
                repo: repo.to_string(),
                sheet: sheet.to_string(),
                class_id: schema.id(row).map(str::to_string),
                label: schema.label(row).map(str::to_string),
                definition: schema.definition(row).map(str::to_string),
                parent: parent.map(str::to_string),
                reviewer: schema.reviewer(row).map(str::to_string),
            };
            let has_content = doc.class_id.is_some()
                || doc.label.is_some()
                || doc.definition.is_some()
                || doc.parent.is_some();
            has_content.then_some(doc)
        })
        .collect()
}

/// Replace the indexed rows of one sheet. Returns the number of documents written.
pub fn update_sheet(
    index: &dyn TextIndex,
    lock: &StoreLock,
    update: &SheetUpdate,
) -> Result<usize, IndexError> {
    let sheet = update.sheet();
    let _guard = lock.acquire();
    index.load()?;
    let removed = index.delete_sheet(&update.repo, &sheet)?;
    let docs = documents_for_sheet(&update.repo, &sheet, &update.table);
    let written = docs.len();
    for doc in docs {
        index.add(doc)?;
    }
    index.commit()?;
    tracing::info!(repo = %update.repo, sheet = %sheet, removed, written, "index update completed");
    Ok(written)
}

pub struct IndexUpdateQueue {
    sender: Option<mpsc::Sender<SheetUpdate>>,
    worker: Option<JoinHandle<()>>,
}

impl IndexUpdateQueue {
    pub fn spawn(index: Arc<dyn TextIndex>, lock: StoreLock) -> Result<Self, IndexError> {
        let (sender, receiver) = mpsc::channel::<SheetUpdate>();
        let worker = std::thread::Builder::new()
            .name("ontocurate_index_update".to_string())
            .spawn(move || {
                for update in receiver {
                    if let Err(e) = update_sheet(index.as_ref(), &lock, &update) {
                        tracing::warn!(
                            repo = %update.repo,
                            sheet = %update.sheet(),
                            error = %e,
                            "index update failed"
                        );
                    }
                }
            })
            .map_err(|e| IndexError::Io {
                path: "<index update worker>".to_string(),
                source: e,
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queue an update; it runs after every update queued before it.
    pub fn enqueue(&self, update: SheetUpdate) -> Result<(), IndexError> {
        let sender = self.sender.as_ref().ok_or(IndexError::QueueClosed)?;
        sender.send(update).map_err(|_| IndexError::QueueClosed)
    }

    /// Finish every queued update and stop the worker.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("index update worker panicked");
            }
        }
    }
}

impl Drop for IndexUpdateQueue {
    fn drop(&mut self) {
        self.close();
    }
}
