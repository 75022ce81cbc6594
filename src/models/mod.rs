//! Data models
//!
//! Plain data carried between the repositories, services and HTTP layers:
//! - Database entities (Post, Category, Tag, Comment, Contact, Newsletter,
//!   Advertisement, TeamMember, UserProfile, User, Group, Session)
//! - Input types for create/update operations
//! - Pagination helpers

mod advertisement;
mod category;
mod comment;
mod contact;
mod newsletter;
mod post;
mod session;
mod tag;
mod team_member;
mod user;
mod user_profile;

pub use advertisement::{Advertisement, AdvertisementInput};
pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use contact::{Contact, CreateContactInput};
pub use newsletter::Newsletter;
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostOrder, PostQuery, PostStatus,
    UpdatePostInput, Visibility,
};
pub use session::Session;
pub use tag::Tag;
pub use team_member::{TeamMember, TeamMemberInput};
pub use user::{CreateUserInput, Group, UpdateUserInput, User};
pub use user_profile::{UpdateProfileInput, UserProfile};
