//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod advertisement;
pub mod category;
pub mod comment;
pub mod contact;
pub mod group;
pub mod newsletter;
pub mod post;
pub mod session;
pub mod tag;
pub mod team_member;
pub mod user;
pub mod user_profile;

pub use advertisement::{AdvertisementRepository, SqlxAdvertisementRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use group::{GroupRepository, SqlxGroupRepository};
pub use newsletter::{NewsletterRepository, SqlxNewsletterRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use team_member::{SqlxTeamMemberRepository, TeamMemberRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use user_profile::{SqlxUserProfileRepository, UserProfileRepository};
