pub mod intrusive_list;
pub mod slot_arena;

pub use intrusive_list::{AppendGuard, IntrusiveList};
pub use slot_arena::{SlotArena, SlotId};
