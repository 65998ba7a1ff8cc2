//! Viewer-scoped read models.
//!
//! The photo list, a user's comment list and the per-user counts all filter
//! through [`Photo::is_visible_to`], so a photo hidden from a viewer is hidden
//! from every one of them.

use std::collections::HashMap;

use crate::db::models::{Comment, Photo, UserCommentView, UserCounts, UserSummary};

/// Photos the viewer may see, in input order.
pub fn visible_photos<'a>(
    photos: &'a [Photo],
    viewer_id: &'a str,
) -> impl Iterator<Item = &'a Photo> + 'a {
    photos.iter().filter(move |p| p.is_visible_to(viewer_id))
}

/// Comments written by `author_id`, restricted to photos the viewer may see.
/// Who wrote the comment plays no part in whether it is shown.
pub fn comments_of_user(
    photos: &[Photo],
    comments: &[Comment],
    author_id: &str,
    viewer_id: &str,
) -> Vec<UserCommentView> {
    let by_id: HashMap<&str, &Photo> = photos.iter().map(|p| (p.id.as_str(), p)).collect();

    comments
        .iter()
        .filter(|c| c.user_id == author_id)
        .filter_map(|c| {
            let photo = by_id.get(c.photo_id.as_str())?;
            if !photo.is_visible_to(viewer_id) {
                return None;
            }
            Some(UserCommentView {
                comment: c.comment.clone(),
                comment_id: c.id.clone(),
                photo_id: photo.id.clone(),
                file_name: photo.file_name.clone(),
                photo_user_id: photo.user_id.clone(),
            })
        })
        .collect()
}

/// Photo and comment counts per user, as seen by the viewer.
pub fn user_counts(
    users: &[UserSummary],
    photos: &[Photo],
    comments: &[Comment],
    viewer_id: &str,
) -> Vec<UserCounts> {
    let visible: HashMap<&str, &Photo> = visible_photos(photos, viewer_id)
        .map(|p| (p.id.as_str(), p))
        .collect();

    let mut photo_counts: HashMap<&str, usize> = HashMap::new();
    for photo in visible.values() {
        *photo_counts.entry(photo.user_id.as_str()).or_default() += 1;
    }

    let mut comment_counts: HashMap<&str, usize> = HashMap::new();
    for comment in comments {
        if visible.contains_key(comment.photo_id.as_str()) {
            *comment_counts.entry(comment.user_id.as_str()).or_default() += 1;
        }
    }

    users
        .iter()
        .map(|u| UserCounts {
            id: u.id.clone(),
            photo_count: photo_counts.get(u.id.as_str()).copied().unwrap_or(0),
            comment_count: comment_counts.get(u.id.as_str()).copied().unwrap_or(0),
        })
        .collect()
}
