//! Page resolution and the login/admin guards in front of it.

use crate::client::SessionSnapshot;

/// Where unauthenticated visitors to a protected page are sent.
pub const LOGIN_PATH: &str = "/login";
/// Where non-admins trying an admin page are sent.
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Home,
    CarListing,
    CarDetails { id: String },
    About,
    Contact,
    Login,
    Register,
    Dashboard,
    Profile,
    Orders,
    Favorites,
    /// Everything under `/admin`. Holds the remainder of the path.
    Admin { section: String },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

impl Page {
    /// Resolve a path (query string and trailing slash ignored) to a page.
    pub fn resolve(path: &str) -> Page {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Page::Home,
            ["cars"] => Page::CarListing,
            ["cars", id] => Page::CarDetails { id: id.to_string() },
            ["about"] => Page::About,
            ["contact"] => Page::Contact,
            ["login"] => Page::Login,
            ["register"] => Page::Register,
            ["dashboard"] => Page::Dashboard,
            ["profile"] => Page::Profile,
            ["orders"] => Page::Orders,
            ["favorites"] => Page::Favorites,
            ["admin", rest @ ..] => Page::Admin {
                section: rest.join("/"),
            },
            _ => Page::NotFound,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Page::Dashboard | Page::Profile | Page::Orders | Page::Favorites => {
                Access::Authenticated
            }
            Page::Admin { .. } => Access::Admin,
            _ => Access::Public,
        }
    }
}

/// What the renderer should do for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still restoring; show a spinner and ask again later.
    Pending,
    Redirect(&'static str),
    Render(Page),
}

/// Decide what to show for `path` given the current session.
pub fn guard(path: &str, session: &SessionSnapshot) -> GuardDecision {
    let page = Page::resolve(path);
    let access = page.access();
    if access == Access::Public {
        return GuardDecision::Render(page);
    }
    if session.loading {
        return GuardDecision::Pending;
    }
    if !session.is_authenticated() {
        return GuardDecision::Redirect(LOGIN_PATH);
    }
    if access == Access::Admin && !session.is_admin() {
        return GuardDecision::Redirect(HOME_PATH);
    }
    GuardDecision::Render(page)
}
