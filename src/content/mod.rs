pub mod service;
pub mod slug;
pub mod tags;

pub use service::{
    ContentError, ContentKind, ContentPatch, ContentService, ContentView, NewContent, NewLesson,
    NewModule, ARTICLES, COURSES, LESSONS, PROJECTS,
};
pub use slug::{slugify, Namespace, SlugAllocator};
pub use tags::{JunctionTable, Tag, TagError, TagService, TAG_JUNCTIONS};
