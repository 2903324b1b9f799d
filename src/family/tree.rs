use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::model::{Member, MemberDraft, MemberId, Relationship, RelationshipId, RelationshipKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FamilyError {
    #[error("no member with id {0}")]
    UnknownMember(MemberId),
    #[error("member ids are exhausted")]
    IdsExhausted,
}

#[derive(Clone, Debug, Default)]
pub struct FamilyTree {
    members: Vec<Member>,
    relationships: Vec<Relationship>,
    revision: u64,
}

impl FamilyTree {
    pub fn from_parts(members: Vec<Member>, relationships: Vec<Relationship>) -> Self {
        Self {
            members,
            relationships,
            revision: 0,
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn member_lookup(&self) -> HashMap<MemberId, &Member> {
        self.members
            .iter()
            .map(|member| (member.id, member))
            .collect()
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// `None` once the largest id is `MemberId::MAX`.
    pub fn next_member_id(&self) -> Option<MemberId> {
        match self.members.iter().map(|member| member.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    pub fn add_member(&mut self, draft: MemberDraft) -> Result<MemberId, FamilyError> {
        let id = self.next_member_id().ok_or(FamilyError::IdsExhausted)?;
        self.members.push(draft.into_member(id));
        self.touch();
        debug!(id, "member added");
        Ok(id)
    }

    pub fn update_member(&mut self, id: MemberId, draft: MemberDraft) -> Result<(), FamilyError> {
        let member = self
            .members
            .iter_mut()
            .find(|member| member.id == id)
            .ok_or(FamilyError::UnknownMember(id))?;

        *member = draft.into_member(id);
        self.touch();
        debug!(id, "member updated");
        Ok(())
    }

    pub fn relationship_exists(&self, a: MemberId, b: MemberId, kind: RelationshipKind) -> bool {
        self.relationships
            .iter()
            .any(|relationship| relationship.connects(a, b, kind))
    }

    pub fn relationships_of(&self, id: MemberId) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |relationship| relationship.involves(id))
    }

    /// Inserts a relationship. A divorce takes over the slot of the pair's
    /// spouse relationship, so callers never observe both at once.
    pub fn add_relationship(
        &mut self,
        from: MemberId,
        to: MemberId,
        kind: RelationshipKind,
    ) -> RelationshipId {
        let relationship = Relationship::new(from, to, kind);
        if let Some(existing) = self
            .relationships
            .iter()
            .find(|existing| existing.id == relationship.id)
        {
            return existing.id.clone();
        }

        let id = relationship.id.clone();
        if kind == RelationshipKind::Divorced
            && let Some(index) = self
                .relationships
                .iter()
                .position(|existing| existing.connects(from, to, RelationshipKind::Spouse))
        {
            self.relationships[index] = relationship;
            self.touch();
            debug!(%id, "spouse relationship converted to divorce");
            return id;
        }

        self.relationships.push(relationship);
        self.touch();
        debug!(%id, "relationship added");
        id
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Gender;

    fn couple() -> FamilyTree {
        let mut tree = FamilyTree::default();
        tree.add_member(MemberDraft::new("A", Gender::Male)).unwrap();
        tree.add_member(MemberDraft::new("B", Gender::Female)).unwrap();
        tree
    }

    #[test]
    fn member_ids_start_at_one_and_follow_the_maximum() {
        let mut tree = FamilyTree::default();
        assert_eq!(tree.next_member_id(), Some(1));
        assert_eq!(tree.add_member(MemberDraft::new("A", Gender::Male)), Ok(1));

        let sparse = FamilyTree::from_parts(
            vec![MemberDraft::new("Z", Gender::Female).into_member(41)],
            Vec::new(),
        );
        assert_eq!(sparse.next_member_id(), Some(42));
        tree.add_member(MemberDraft::new("B", Gender::Female)).unwrap();
        assert_eq!(tree.next_member_id(), Some(3));
    }

    #[test]
    fn adding_past_the_largest_id_fails_without_touching_the_tree() {
        let mut tree = FamilyTree::from_parts(
            vec![MemberDraft::new("Last", Gender::Male).into_member(MemberId::MAX)],
            Vec::new(),
        );
        let revision = tree.revision();

        assert_eq!(tree.next_member_id(), None);
        assert_eq!(
            tree.add_member(MemberDraft::new("Overflow", Gender::Female)),
            Err(FamilyError::IdsExhausted)
        );
        assert_eq!(tree.members().len(), 1);
        assert_eq!(tree.revision(), revision);
    }

    #[test]
    fn spouse_lookup_is_symmetric() {
        let mut tree = couple();
        let id = tree.add_relationship(1, 2, RelationshipKind::Spouse);

        assert_eq!(id.to_string(), "1-2");
        assert!(tree.relationship_exists(2, 1, RelationshipKind::Spouse));
        assert!(tree.relationship_exists(1, 2, RelationshipKind::Spouse));
    }

    #[test]
    fn divorce_replaces_the_spouse_relationship() {
        let mut tree = couple();
        tree.add_relationship(1, 2, RelationshipKind::Spouse);
        let id = tree.add_relationship(1, 2, RelationshipKind::Divorced);

        assert_eq!(id.to_string(), "1~2");
        assert_eq!(tree.relationships().len(), 1);
        assert!(!tree.relationship_exists(1, 2, RelationshipKind::Spouse));
        assert!(tree.relationship_exists(2, 1, RelationshipKind::Divorced));
    }

    #[test]
    fn divorce_matches_a_reversed_spouse_pair() {
        let mut tree = couple();
        tree.add_relationship(2, 1, RelationshipKind::Spouse);
        tree.add_relationship(1, 2, RelationshipKind::Divorced);

        assert_eq!(tree.relationships().len(), 1);
        assert_eq!(tree.relationships()[0].kind, RelationshipKind::Divorced);
    }

    #[test]
    fn parent_lookup_is_directional() {
        let mut tree = couple();
        tree.add_relationship(1, 2, RelationshipKind::Parent);

        assert!(tree.relationship_exists(1, 2, RelationshipKind::Parent));
        assert!(!tree.relationship_exists(2, 1, RelationshipKind::Parent));
    }

    #[test]
    fn duplicate_relationship_is_not_stored_twice() {
        let mut tree = couple();
        tree.add_relationship(1, 2, RelationshipKind::Spouse);
        let revision = tree.revision();
        tree.add_relationship(2, 1, RelationshipKind::Spouse);

        assert_eq!(tree.relationships().len(), 1);
        assert_eq!(tree.revision(), revision);
    }

    #[test]
    fn update_member_edits_in_place() {
        let mut tree = couple();
        let mut draft = MemberDraft::new("Beatrice", Gender::Female);
        draft.attributes.insert("born".to_owned(), "1931".to_owned());

        tree.update_member(2, draft).unwrap();

        let member = tree.member(2).unwrap();
        assert_eq!(member.name, "Beatrice");
        assert_eq!(member.attributes.get("born").map(String::as_str), Some("1931"));
        assert_eq!(tree.members().len(), 2);
    }

    #[test]
    fn update_unknown_member_fails() {
        let mut tree = couple();
        let result = tree.update_member(9, MemberDraft::new("X", Gender::Male));
        assert_eq!(result, Err(FamilyError::UnknownMember(9)));
    }
}
