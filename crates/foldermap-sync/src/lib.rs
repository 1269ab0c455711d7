//! Directory synchronisation for foldermap.
//!
//! A [`Container`] mirrors a directory and a [`Leaf`] mirrors one file whose
//! contents pass through a text codec. Containers load lazily: unknown
//! directory entries are fabricated by a [`ContainerFactory`] according to
//! the container's configured kind. Saving reports one outcome per child in a
//! [`SaveReport`].

mod container;
mod entry;
mod factory;
mod leaf;
mod report;

pub use container::Container;
pub use entry::Entry;
pub use factory::ContainerFactory;
pub use leaf::Leaf;
pub use report::{ChildOutcome, Outcome, SaveReport};
