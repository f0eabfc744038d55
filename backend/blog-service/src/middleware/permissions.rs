/// Authorization checks for blog content
///
/// Posts are readable by everyone; only their author may change them.
use super::CurrentUser;
use crate::error::AppError;
use crate::models::Post;

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

/// Whether the viewer may edit `post`; anonymous viewers never can.
pub fn can_edit(user: Option<&CurrentUser>, post: &Post) -> bool {
    user.map_or(false, |user| post.is_authored_by(user.id))
}

/// Check if a user owns a post
pub fn check_post_ownership(user_id: i64, post: &Post) -> PermissionResult {
    if post.is_authored_by(user_id) {
        Ok(())
    } else {
        Err(AppError::NotAuthor {
            post_id: post.id,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;

    fn post_by(author_id: i64) -> Post {
        Post {
            id: 1,
            text: "text".to_string(),
            pub_date: Utc::now(),
            author: User {
                id: author_id,
                username: format!("user{}", author_id),
            },
            group: None,
            image: None,
        }
    }

    #[test]
    fn only_the_author_can_edit() {
        let post = post_by(1);
        let author = CurrentUser {
            id: 1,
            username: "user1".to_string(),
        };
        let other = CurrentUser {
            id: 2,
            username: "user2".to_string(),
        };

        assert!(can_edit(Some(&author), &post));
        assert!(!can_edit(Some(&other), &post));
        assert!(!can_edit(None, &post));
    }

    #[test]
    fn ownership_check_names_the_post() {
        let err = check_post_ownership(2, &post_by(1)).unwrap_err();
        assert!(matches!(
            err,
            AppError::NotAuthor {
                post_id: 1,
                user_id: 2
            }
        ));
        assert!(check_post_ownership(1, &post_by(1)).is_ok());
    }
}
