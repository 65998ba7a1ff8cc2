// Visibility rules - pure, no I/O. Every read path that exposes a photo, a
// comment on a photo, or a count derived from photos goes through `is_visible`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who besides the owner may see a photo.
///
/// Stored and transmitted as an optional list of user ids:
/// absent = `Public`, `[]` = `OwnerOnly`, `[ids..]` = `Restricted`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum Sharing {
    #[default]
    Public,
    OwnerOnly,
    Restricted(BTreeSet<String>),
}

impl Sharing {
    pub fn from_list(list: Option<Vec<String>>) -> Self {
        match list {
            None => Sharing::Public,
            Some(ids) if ids.is_empty() => Sharing::OwnerOnly,
            Some(ids) => Sharing::Restricted(ids.into_iter().collect()),
        }
    }

    pub fn to_list(&self) -> Option<Vec<String>> {
        match self {
            Sharing::Public => None,
            Sharing::OwnerOnly => Some(Vec::new()),
            Sharing::Restricted(ids) => Some(ids.iter().cloned().collect()),
        }
    }

    /// Parse the column representation (NULL or a JSON array).
    pub fn from_column(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        match raw {
            None => Ok(Sharing::Public),
            Some(json) => Ok(Sharing::from_list(Some(serde_json::from_str(json)?))),
        }
    }

    pub fn to_column(&self) -> Result<Option<String>, serde_json::Error> {
        self.to_list()
            .map(|ids| serde_json::to_string(&ids))
            .transpose()
    }
}

impl From<Option<Vec<String>>> for Sharing {
    fn from(list: Option<Vec<String>>) -> Self {
        Sharing::from_list(list)
    }
}

impl From<Sharing> for Option<Vec<String>> {
    fn from(sharing: Sharing) -> Self {
        sharing.to_list()
    }
}

/// Whether `viewer_id` may see a photo owned by `owner_id` with the given sharing.
pub fn is_visible(owner_id: &str, sharing: &Sharing, viewer_id: &str) -> bool {
    if owner_id == viewer_id {
        return true;
    }
    match sharing {
        Sharing::Public => true,
        Sharing::OwnerOnly => false,
        Sharing::Restricted(ids) => ids.contains(viewer_id),
    }
}
