//! Ontocurate storage: text index, fast cache and identifier allocation.
//!
//! ```text
//!                 ┌──────────────── StoreLock ────────────────┐
//!                 │                                           │
//!  next_id ──▶ IdentifierAllocator ──▶ TextIndex (prefix)     │
//!                 │                └──▶ FastCache (latest id) │
//!  save ─────▶ IndexUpdateQueue ──▶ update_sheet ──▶ TextIndex│
//!                 └───────────────────────────────────────────┘
//! ```
//!
//! Allocation and index maintenance touch the same backing store and are
//! serialized by one [`StoreLock`].

pub mod allocator;
pub mod cache;
pub mod index;
pub mod maintenance;


pub use allocator::{
    cache_key, AllocError, IdScheme, IdentifierAllocator, StoreLock, DEFAULT_DIGIT_COUNT,
};
pub use cache::{CacheError, FastCache, MemoryCache};
pub use index::{
    IndexDocument, IndexError, MemoryTextIndex, SearchQuery, TextIndex, SEARCH_LIMIT,
};
pub use maintenance::{documents_for_sheet, update_sheet, IndexUpdateQueue, SheetUpdate};
