//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Implementing the visibility and publishing rules
//! - Validating input and mapping failures to typed errors
//! - Coordinating several repositories for one operation

pub mod category;
pub mod comment;
pub mod contact;
pub mod group;
pub mod newsletter;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod site;
pub mod tag;
pub mod user;
pub mod validation;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use contact::{ContactService, ContactServiceError};
pub use group::{GroupService, GroupServiceError};
pub use newsletter::{NewsletterService, NewsletterServiceError};
pub use password::{hash_password, verify_password};
pub use post::{HomePosts, PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use site::{Sidebar, SiteService, SiteServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
