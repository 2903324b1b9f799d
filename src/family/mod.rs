mod model;
mod store;
mod tree;

pub use model::{Gender, LifeStatus, Member, MemberDraft, MemberId, Relationship, RelationshipKind};
pub use store::{load_family, sample_family, save_family};
pub use tree::FamilyTree;
