// Adapters layer: concrete implementations for external systems (local disk, remote backend).

pub mod storage;
pub mod supabase;

pub use storage::LocalStorage;
pub use supabase::{InsertOutcome, SupabaseClient};
