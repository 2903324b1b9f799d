use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::model::{Member, MemberId, Relationship, RelationshipKind};
use super::tree::FamilyTree;

const SAMPLE_FAMILY: &str = include_str!("../../assets/sample_family.json");

#[derive(Debug, Deserialize, Serialize)]
struct FamilyFile {
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    relationships: Vec<RelationshipRecord>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RelationshipRecord {
    from: MemberId,
    to: MemberId,
    kind: RelationshipKind,
}

pub fn parse_family(raw: &str) -> Result<FamilyTree> {
    let file: FamilyFile = serde_json::from_str(raw).context("invalid family JSON")?;

    let mut member_ids = HashSet::with_capacity(file.members.len());
    for member in &file.members {
        if !member_ids.insert(member.id) {
            return Err(anyhow!("member id {} appears more than once", member.id));
        }
    }

    let mut seen = HashSet::new();
    let relationships = file
        .relationships
        .into_iter()
        .map(|record| Relationship::new(record.from, record.to, record.kind))
        .filter(|relationship| seen.insert(relationship.id.clone()))
        .collect::<Vec<_>>();

    Ok(FamilyTree::from_parts(file.members, relationships))
}

pub fn load_family(path: &Path) -> Result<FamilyTree> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read family file {}", path.display()))?;
    let tree = parse_family(&raw)
        .with_context(|| format!("failed to parse family file {}", path.display()))?;

    info!(
        path = %path.display(),
        members = tree.members().len(),
        relationships = tree.relationships().len(),
        "family loaded"
    );
    Ok(tree)
}

pub fn save_family(path: &Path, tree: &FamilyTree) -> Result<()> {
    let file = FamilyFile {
        members: tree.members().to_vec(),
        relationships: tree
            .relationships()
            .iter()
            .map(|relationship| RelationshipRecord {
                from: relationship.from,
                to: relationship.to,
                kind: relationship.kind,
            })
            .collect(),
    };

    let raw = serde_json::to_string_pretty(&file).context("failed to encode family JSON")?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write family file {}", path.display()))?;

    info!(path = %path.display(), "family saved");
    Ok(())
}

pub fn sample_family() -> Result<FamilyTree> {
    parse_family(SAMPLE_FAMILY).context("embedded sample family is malformed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::tree::FamilyError;
    use crate::family::{Gender, LifeStatus, MemberDraft};

    #[test]
    fn sample_family_parses() {
        let tree = sample_family().unwrap();

        assert_eq!(tree.members().len(), 10);
        assert_eq!(tree.relationships().len(), 13);
        assert_eq!(tree.member(1).map(|member| member.status), Some(LifeStatus::Deceased));
        assert!(tree.relationship_exists(6, 5, RelationshipKind::Divorced));
        assert_eq!(tree.next_member_id(), Some(11));
    }

    #[test]
    fn relationship_ids_are_derived_and_deduplicated() {
        let raw = r#"{
            "members": [
                { "id": 1, "name": "A", "gender": "male", "status": "Alive" },
                { "id": 2, "name": "B", "gender": "female", "status": "Alive" }
            ],
            "relationships": [
                { "from": 2, "to": 1, "kind": "spouse" },
                { "from": 1, "to": 2, "kind": "spouse" }
            ]
        }"#;

        let tree = parse_family(raw).unwrap();
        assert_eq!(tree.relationships().len(), 1);
        assert_eq!(tree.relationships()[0].id.to_string(), "1-2");
        assert!(tree.member(1).unwrap().attributes.is_empty());
    }

    #[test]
    fn duplicate_member_ids_are_rejected() {
        let raw = r#"{
            "members": [
                { "id": 3, "name": "A", "gender": "male", "status": "Alive" },
                { "id": 3, "name": "B", "gender": "female", "status": "Deceased" }
            ]
        }"#;

        assert!(parse_family(raw).is_err());
    }

    #[test]
    fn loaded_file_at_the_largest_id_refuses_new_members() {
        let raw = r#"{
            "members": [
                { "id": 4294967295, "name": "Last", "gender": "male", "status": "Alive" }
            ]
        }"#;

        let mut tree = parse_family(raw).unwrap();
        let result = tree.add_member(MemberDraft::new("Next", Gender::Female));

        assert_eq!(result, Err(FamilyError::IdsExhausted));
        assert_eq!(tree.members().len(), 1);
    }

    #[test]
    fn unknown_relationship_kind_is_rejected() {
        let raw = r#"{ "relationships": [ { "from": 1, "to": 2, "kind": "cousin" } ] }"#;
        assert!(parse_family(raw).is_err());
    }
}
