//! Per-resource, per-action access policy for the REST API
//!
//! Every API handler calls [`authorize`] with its resource and action
//! before touching a service, so the table in [`policy_for`] is the one
//! place that decides who may do what.

use crate::api::middleware::ApiError;
use crate::models::User;

/// What a request does to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    /// Stamp a post's publication time
    Publish,
}

impl Action {
    pub fn is_write(self) -> bool {
        !matches!(self, Action::List | Action::Retrieve)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Posts,
    Drafts,
    Tags,
    Categories,
    Users,
    Groups,
    Newsletter,
    Contact,
    Comments,
    Advertisements,
    Team,
}

/// Requirement a caller must meet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AllowAny,
    IsAuthenticated,
    IsStaff,
    /// Nobody may perform the action
    MethodNotAllowed,
}

impl Policy {
    /// Check a caller against this policy
    pub fn check(self, user: Option<&User>) -> Result<(), ApiError> {
        match self {
            Policy::AllowAny => Ok(()),
            Policy::IsAuthenticated => match user {
                Some(_) => Ok(()),
                None => Err(ApiError::unauthorized("Authentication credentials were not provided")),
            },
            Policy::IsStaff => match user {
                Some(u) if u.is_staff => Ok(()),
                Some(_) => Err(ApiError::forbidden("Staff privileges required")),
                None => Err(ApiError::unauthorized("Authentication credentials were not provided")),
            },
            Policy::MethodNotAllowed => Err(ApiError::method_not_allowed("Method not allowed")),
        }
    }
}

pub fn policy_for(resource: Resource, action: Action) -> Policy {
    use Action::*;
    use Resource::*;

    match (resource, action) {
        (Posts | Tags | Categories, List | Retrieve) => Policy::AllowAny,
        (Posts, Publish) => Policy::IsStaff,
        (Posts | Tags | Categories, _) => Policy::IsAuthenticated,

        (Users | Groups | Drafts, _) => Policy::IsAuthenticated,

        (Newsletter | Contact, Create) => Policy::AllowAny,
        (Newsletter | Contact, Update | PartialUpdate) => Policy::MethodNotAllowed,
        (Newsletter | Contact, _) => Policy::IsAuthenticated,

        (Comments, List | Retrieve) => Policy::AllowAny,
        (Comments, Create) => Policy::IsAuthenticated,
        (Comments, _) => Policy::IsStaff,

        (Advertisements | Team, List | Retrieve) => Policy::AllowAny,
        (Advertisements | Team, _) => Policy::IsStaff,
    }
}

/// Reject the request unless `user` may perform `action` on `resource`
pub fn authorize(resource: Resource, action: Action, user: Option<&User>) -> Result<(), ApiError> {
    let policy = policy_for(resource, action);
    policy.check(user).inspect_err(|_| {
        tracing::debug!(?resource, ?action, ?policy, authenticated = user.is_some(), "Request denied");
    })
}

/// Rejection for an action `resource` never performs
///
/// Callers the policy lets through still get a 405.
pub fn deny(resource: Resource, action: Action, user: Option<&User>) -> ApiError {
    match authorize(resource, action, user) {
        Err(error) => error,
        Ok(()) => ApiError::method_not_allowed("Method not allowed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use proptest::prelude::*;

    const ALL_ACTIONS: [Action; 7] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
        Action::Publish,
    ];

    const ALL_RESOURCES: [Resource; 11] = [
        Resource::Posts,
        Resource::Drafts,
        Resource::Tags,
        Resource::Categories,
        Resource::Users,
        Resource::Groups,
        Resource::Newsletter,
        Resource::Contact,
        Resource::Comments,
        Resource::Advertisements,
        Resource::Team,
    ];

    fn user(is_staff: bool) -> User {
        User {
            id: 1,
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
            is_staff,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    fn status(result: Result<(), ApiError>) -> Option<StatusCode> {
        result.err().map(|e| e.status())
    }

    #[test]
    fn test_public_reads_and_authenticated_writes() {
        for resource in [Resource::Posts, Resource::Tags, Resource::Categories] {
            assert!(authorize(resource, Action::List, None).is_ok());
            assert!(authorize(resource, Action::Retrieve, None).is_ok());
            assert_eq!(
                status(authorize(resource, Action::Create, None)),
                Some(StatusCode::UNAUTHORIZED)
            );
            assert!(authorize(resource, Action::Destroy, Some(&user(false))).is_ok());
        }
    }

    #[test]
    fn test_users_groups_drafts_need_auth_for_everything() {
        for resource in [Resource::Users, Resource::Groups, Resource::Drafts] {
            for action in ALL_ACTIONS {
                assert_eq!(policy_for(resource, action), Policy::IsAuthenticated);
            }
        }
    }

    #[test]
    fn test_newsletter_and_contact() {
        for resource in [Resource::Newsletter, Resource::Contact] {
            assert!(authorize(resource, Action::Create, None).is_ok());
            assert_eq!(
                status(authorize(resource, Action::List, None)),
                Some(StatusCode::UNAUTHORIZED)
            );
            assert!(authorize(resource, Action::Destroy, Some(&user(false))).is_ok());
        }
    }

    #[test]
    fn test_deny_never_succeeds() {
        for resource in ALL_RESOURCES {
            for caller in [None, Some(user(false)), Some(user(true))] {
                let error = deny(resource, Action::Update, caller.as_ref());
                let expected = authorize(resource, Action::Update, caller.as_ref())
                    .err()
                    .map(|e| e.status())
                    .unwrap_or(StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(error.status(), expected);
            }
        }
        assert_eq!(
            deny(Resource::Contact, Action::PartialUpdate, Some(&user(true))).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_publish_requires_staff() {
        assert_eq!(
            status(authorize(Resource::Posts, Action::Publish, None)),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            status(authorize(Resource::Posts, Action::Publish, Some(&user(false)))),
            Some(StatusCode::FORBIDDEN)
        );
        assert!(authorize(Resource::Posts, Action::Publish, Some(&user(true))).is_ok());
    }

    #[test]
    fn test_comments_and_site_content() {
        assert!(authorize(Resource::Comments, Action::List, None).is_ok());
        assert!(authorize(Resource::Comments, Action::Create, Some(&user(false))).is_ok());
        assert_eq!(
            status(authorize(Resource::Comments, Action::Destroy, Some(&user(false)))),
            Some(StatusCode::FORBIDDEN)
        );
        for resource in [Resource::Advertisements, Resource::Team] {
            assert!(authorize(resource, Action::List, None).is_ok());
            assert_eq!(
                status(authorize(resource, Action::Create, Some(&user(false)))),
                Some(StatusCode::FORBIDDEN)
            );
            assert!(authorize(resource, Action::Update, Some(&user(true))).is_ok());
        }
    }

    proptest! {
        #[test]
        fn newsletter_contact_updates_always_405(
            resource in prop::sample::select(vec![Resource::Newsletter, Resource::Contact]),
            action in prop::sample::select(vec![Action::Update, Action::PartialUpdate]),
            caller in prop::option::of(any::<bool>()),
        ) {
            let u = caller.map(user);
            prop_assert_eq!(
                status(authorize(resource, action, u.as_ref())),
                Some(StatusCode::METHOD_NOT_ALLOWED)
            );
        }

        #[test]
        fn staff_passes_everything_but_405(
            resource in prop::sample::select(ALL_RESOURCES.to_vec()),
            action in prop::sample::select(ALL_ACTIONS.to_vec()),
        ) {
            let policy = policy_for(resource, action);
            let allowed = authorize(resource, action, Some(&user(true))).is_ok();
            prop_assert_eq!(allowed, policy != Policy::MethodNotAllowed);
        }

        #[test]
        fn anonymous_never_writes_except_submissions(
            resource in prop::sample::select(ALL_RESOURCES.to_vec()),
            action in prop::sample::select(ALL_ACTIONS.to_vec()),
        ) {
            let allowed = authorize(resource, action, None).is_ok();
            if allowed && action.is_write() {
                prop_assert!(matches!(resource, Resource::Newsletter | Resource::Contact));
                prop_assert_eq!(action, Action::Create);
            }
        }
    }
}
