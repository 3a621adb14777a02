// handlers/protected/entries/mod.rs - Entry CRUD across the three categories
//
// The `table` field (or `selected_index` on reads) is resolved to an
// EntryCategory once, here at the boundary. Every operation is scoped to the
// caller's user id.

pub mod entries_get; // GET /entries[?selected_index=N]
pub mod entries_post; // POST /entries
pub mod entries_put; // PUT /entries
pub mod entry_delete; // DELETE /delete

pub use entries_get::entries_get;
pub use entries_post::entries_post;
pub use entries_put::entries_put;
pub use entry_delete::entry_delete;
