use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::visibility::{self, Sharing};

// --- Stored records ---

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub login_name: String,
    /// Stored credential, interpreted by the configured `PasswordScheme`.
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub sharing: Sharing,
}

impl Photo {
    pub fn is_visible_to(&self, viewer_id: &str) -> bool {
        visibility::is_visible(&self.user_id, &self.sharing, viewer_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub photo_id: String,
    pub user_id: String,
    pub comment: String,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    PhotoUpload,
    Comment,
    UserRegister,
    UserLogin,
    UserLogout,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PhotoUpload => "PHOTO_UPLOAD",
            ActivityKind::Comment => "COMMENT",
            ActivityKind::UserRegister => "USER_REGISTER",
            ActivityKind::UserLogin => "USER_LOGIN",
            ActivityKind::UserLogout => "USER_LOGOUT",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown activity kind: {0}")]
pub struct UnknownActivityKind(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PHOTO_UPLOAD" => Ok(ActivityKind::PhotoUpload),
            "COMMENT" => Ok(ActivityKind::Comment),
            "USER_REGISTER" => Ok(ActivityKind::UserRegister),
            "USER_LOGIN" => Ok(ActivityKind::UserLogin),
            "USER_LOGOUT" => Ok(ActivityKind::UserLogout),
            other => Err(UnknownActivityKind(other.to_string())),
        }
    }
}

// --- Wire views ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
}

impl From<User> for UserDetail {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            location: user.location,
            description: user.description,
            occupation: user.occupation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    #[serde(rename = "_id")]
    pub id: String,
    pub photo_count: usize,
    pub comment_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub sharing_list: Sharing,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
}

/// A comment as listed on its author's comment page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCommentView {
    pub comment: String,
    pub comment_id: String,
    pub photo_id: String,
    #[serde(rename = "file_name")]
    pub file_name: String,
    pub photo_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
}

/// An activity with its user and photo resolved, as pushed to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
    pub photo: Option<PhotoSummary>,
}

/// A stored activity with its photo's sharing settings still attached.
/// Turned into an [`ActivityView`] per viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub id: String,
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
    pub photo: Option<Photo>,
}

impl ActivityRecord {
    /// The activity as `viewer_id` may see it: a photo hidden from the
    /// viewer is reported as `null`.
    pub fn view_for(&self, viewer_id: &str) -> ActivityView {
        ActivityView {
            id: self.id.clone(),
            kind: self.kind,
            created_at: self.created_at,
            user: self.user.clone(),
            photo: self
                .photo
                .as_ref()
                .filter(|p| p.is_visible_to(viewer_id))
                .map(|p| PhotoSummary {
                    id: p.id.clone(),
                    file_name: p.file_name.clone(),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub likes: usize,
    pub liked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_kind_round_trips_through_str() {
        for kind in [
            ActivityKind::PhotoUpload,
            ActivityKind::Comment,
            ActivityKind::UserRegister,
            ActivityKind::UserLogin,
            ActivityKind::UserLogout,
        ] {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string())
            );
        }
        assert!("LIKE".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn counts_use_client_field_names() {
        let counts = UserCounts {
            id: "u1".into(),
            photo_count: 2,
            comment_count: 3,
        };
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["_id"], "u1");
        assert_eq!(json["photoCount"], 2);
        assert_eq!(json["commentCount"], 3);
    }

    #[test]
    fn activity_view_hides_photo_from_outsiders() {
        let record = ActivityRecord {
            id: "a1".into(),
            kind: ActivityKind::PhotoUpload,
            created_at: Utc::now(),
            user: UserSummary {
                id: "alice".into(),
                first_name: "Alice".into(),
                last_name: "A".into(),
            },
            photo: Some(Photo {
                id: "p1".into(),
                user_id: "alice".into(),
                file_name: "U1-1.png".into(),
                date_time: Utc::now(),
                sharing: Sharing::from_list(Some(vec!["bob".into()])),
            }),
        };

        let for_owner = record.view_for("alice");
        assert_eq!(for_owner.photo.unwrap().file_name, "U1-1.png");
        assert!(record.view_for("bob").photo.is_some());

        let for_carol = record.view_for("carol");
        assert!(for_carol.photo.is_none());
        assert_eq!(for_carol.kind, ActivityKind::PhotoUpload);
        assert_eq!(for_carol.user.id, "alice");
    }

    #[test]
    fn user_comment_view_field_names() {
        let view = UserCommentView {
            comment: "nice!".into(),
            comment_id: "c".into(),
            photo_id: "p".into(),
            file_name: "f.jpg".into(),
            photo_user_id: "u".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["commentId"], "c");
        assert_eq!(json["photoId"], "p");
        assert_eq!(json["file_name"], "f.jpg");
        assert_eq!(json["photoUserId"], "u");
    }
}
