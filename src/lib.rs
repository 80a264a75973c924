//! chainmap: a single-threaded, separate-chaining hash map from string
//! keys to caller-supplied values, hashed with a deterministic 32-bit
//! MurmurHash3 digest and grown along a fixed prime capacity schedule.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small associative container whose behavior is easy to reason
//!   about: one hashing strategy, one collision policy, one growth policy.
//! - Layers:
//!   - murmur3: the hash engine. MurmurHash3 x86_32, bit-exact with the
//!     published variant, with explicit little-endian chunk reads.
//!   - primes: the capacity schedule. A fixed ascending prime list;
//!     growth steps through it one index at a time and saturates at the
//!     end rather than indexing past it.
//!   - ChainMap<V>: the table store. Bucket heads over a slotmap arena of
//!     chain nodes; prepend-on-insert, exact-match chain walk,
//!     occupied-bucket load accounting.
//!
//! Constraints
//! - Single-threaded use; no internal locking. Mutation requires `&mut`,
//!   so the need for external synchronization is enforced by the compiler
//!   instead of documented around.
//! - Keys are strings, owned by the table and immutable once stored.
//!   Values are opaque: never inspected, compared, or cloned by the table.
//! - Chains are most-recently-inserted-first. Duplicate keys are not
//!   deduplicated; a newer entry shadows an older one until removed.
//!
//! Load accounting
//! - The load factor is occupied buckets over capacity, not entries over
//!   capacity. It undercounts entry density whenever chains collide; the
//!   trade is that growth responds to bucket pressure only.
//!
//! Hashing and growth invariants
//! - Each entry stores its 32-bit digest and re-bucketing always uses the
//!   stored digest; key bytes are never rehashed after insertion.
//! - Crossing 0.8 occupancy during insert grows the table in place to the
//!   next prime. Entries keep their arena slots and are relinked with
//!   relative chain order preserved, so last-inserted-wins survives
//!   growth and callers never observe a reseated table handle.
//!
//! Notes and non-goals
//! - No deletion-triggered shrink, no persistence, no iteration-order
//!   guarantees, no collision-resistant hashing.
//! - Removal of an absent key is an error ([`TableError::KeyNotFound`]);
//!   absence on lookup is `None`, not an error.

mod chain_map;
mod chain_map_proptest;
mod error;
pub mod murmur3;
mod primes;

// Public surface
pub use chain_map::{ChainMap, Iter, IterMut, LOAD_FACTOR_LIMIT};
pub use error::TableError;
