use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type MemberId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeStatus {
    Alive,
    Deceased,
}

impl LifeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Alive => "Alive",
            Self::Deceased => "Deceased",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub gender: Gender,
    pub status: LifeStatus,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
}

impl Member {
    pub fn is_deceased(&self) -> bool {
        self.status == LifeStatus::Deceased
    }

    /// Up to two uppercase initials, used as the node avatar.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberDraft {
    pub name: String,
    pub gender: Gender,
    pub status: LifeStatus,
    pub attributes: BTreeMap<String, String>,
    pub portrait: Option<String>,
}

impl MemberDraft {
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            gender,
            status: LifeStatus::Alive,
            attributes: BTreeMap::new(),
            portrait: None,
        }
    }

    pub(super) fn into_member(self, id: MemberId) -> Member {
        Member {
            id,
            name: self.name,
            gender: self.gender,
            status: self.status,
            attributes: self.attributes,
            portrait: self.portrait,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Parent,
    Spouse,
    Divorced,
}

impl RelationshipKind {
    pub const ALL: [Self; 3] = [Self::Parent, Self::Spouse, Self::Divorced];

    pub fn label(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Spouse => "spouse",
            Self::Divorced => "divorced",
        }
    }

    /// Spouse and divorced links have no meaningful direction.
    pub fn is_symmetric(self) -> bool {
        !matches!(self, Self::Parent)
    }

    fn separator(self) -> char {
        match self {
            Self::Parent => '>',
            Self::Spouse => '-',
            Self::Divorced => '~',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipId(String);

impl RelationshipId {
    fn derive(from: MemberId, to: MemberId, kind: RelationshipKind) -> Self {
        let (first, second) = if kind.is_symmetric() {
            (from.min(to), from.max(to))
        } else {
            (from, to)
        };
        Self(format!("{first}{}{second}", kind.separator()))
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: RelationshipId,
    pub from: MemberId,
    pub to: MemberId,
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(from: MemberId, to: MemberId, kind: RelationshipKind) -> Self {
        Self {
            id: RelationshipId::derive(from, to, kind),
            from,
            to,
            kind,
        }
    }

    pub fn connects(&self, a: MemberId, b: MemberId, kind: RelationshipKind) -> bool {
        if self.kind != kind {
            return false;
        }

        (self.from == a && self.to == b) || (kind.is_symmetric() && self.from == b && self.to == a)
    }

    pub fn involves(&self, id: MemberId) -> bool {
        self.from == id || self.to == id
    }
}
