mod memory;
mod repository;
mod schema;
mod stories;
mod types;

pub use memory::MemoryStoryRepository;
pub use repository::StoryRepository;
pub use schema::{Database, IN_MEMORY};
pub use types::{DatabaseError, NewStory, Story, StoryError, StoryId};
